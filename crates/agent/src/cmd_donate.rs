//! On-chain donation command: runs the full workflow and prints each
//! lifecycle transition as it happens.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use fundra_common::{format_wei, Config, EthProvider, WalletProvider};
use fundra_donation::{ContractAbi, ContractBinding, DonationState, DonationWorkflow};
use fundra_wallet::{FileStore, WalletConnector};

fn describe(state: &DonationState) -> String {
    match state {
        DonationState::Idle => "idle".to_string(),
        DonationState::AmountSelected { amount_wei } => {
            format!("amount selected: {} ETH", format_wei(*amount_wei))
        }
        DonationState::Estimating { .. } => "estimating gas and checking balance".to_string(),
        DonationState::InsufficientFunds { shortfall_wei, .. } => {
            format!("insufficient funds, short {} ETH", format_wei(*shortfall_wei))
        }
        DonationState::Submitting { .. } => "submitting transaction".to_string(),
        DonationState::Pending { tx_hash } => format!("pending: {}", tx_hash),
        DonationState::Confirmed {
            tx_hash,
            confirmations,
        } => format!("confirmed: {} ({} confirmations)", tx_hash, confirmations),
        DonationState::Failed { error, .. } => format!("failed: {}", error),
    }
}

pub async fn handle_donate(config: &Config, amount: &str, json: bool) -> Result<()> {
    let contract_address = config
        .contract_address
        .as_deref()
        .context("contract_address is not configured (set FUNDRA_CONTRACT_ADDRESS)")?;
    let abi_path = config
        .abi_path
        .as_deref()
        .context("abi_path is not configured (set FUNDRA_ABI_PATH)")?;

    let provider = Arc::new(
        EthProvider::new(config.rpc_url.clone(), config.request_timeout_ms)
            .context("failed to build RPC provider")?,
    );
    let store =
        FileStore::open(&config.session_path).context("failed to open wallet session store")?;
    let connector = WalletConnector::new(provider.clone(), Arc::new(store));
    let session = connector
        .restore_session()
        .context("session read failed")?
        .context("not connected; run `wallet connect` first")?;

    if let Some(expected) = config.chain_id {
        let actual = provider.chain_id().await.context("chain id query failed")?;
        if actual != expected {
            bail!(
                "provider is on chain {}, config expects chain {}",
                actual,
                expected
            );
        }
    }

    let abi = ContractAbi::load(abi_path)
        .with_context(|| format!("failed to load contract interface from {}", abi_path))?;
    let contract = Arc::new(ContractBinding::new(contract_address, abi, provider.clone()));
    let workflow = Arc::new(DonationWorkflow::new(contract, provider));

    workflow
        .select_amount(amount)
        .context("invalid donation amount")?;

    // Print transitions while the attempt runs.
    let mut states = workflow.watch();
    let printer = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let line = describe(&states.borrow().clone());
            println!("[donate] {}", line);
        }
    });

    let outcome = workflow.donate(&session.address).await;
    printer.abort();

    let receipt = outcome.context("donation failed")?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "tx_hash": receipt.tx_hash,
                "confirmations": receipt.block_confirmations,
            }))?
        );
    } else {
        println!(
            "Donation confirmed: {} ({} confirmations)",
            receipt.tx_hash, receipt.block_confirmations
        );
    }
    Ok(())
}
