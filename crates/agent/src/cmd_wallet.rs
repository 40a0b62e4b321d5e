//! Wallet command handlers: connect, status, balance, disconnect.

use std::sync::Arc;

use anyhow::{Context, Result};
use fundra_common::{format_wei, Config, EthProvider};
use fundra_wallet::{FileStore, WalletConnector};

fn connector(config: &Config) -> Result<WalletConnector> {
    let provider = EthProvider::new(config.rpc_url.clone(), config.request_timeout_ms)
        .context("failed to build RPC provider")?;
    let store =
        FileStore::open(&config.session_path).context("failed to open wallet session store")?;
    Ok(WalletConnector::new(Arc::new(provider), Arc::new(store)))
}

pub async fn handle_connect(config: &Config, json: bool) -> Result<()> {
    let connector = connector(config)?;
    let session = connector.connect().await.context("wallet connect failed")?;
    let balance = connector.get_balance().await.ok();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "address": session.address,
                "chain_id": session.chain_id,
                "balance_eth": balance.map(format_wei),
            }))?
        );
    } else {
        println!("Connected: {}", session.address);
        if let Some(chain_id) = session.chain_id {
            println!("Chain id:  {}", chain_id);
        }
        if let Some(wei) = balance {
            println!("Balance:   {} ETH", format_wei(wei));
        }
    }
    Ok(())
}

pub fn handle_status(config: &Config, json: bool) -> Result<()> {
    let connector = connector(config)?;
    let session = connector.restore_session().context("session read failed")?;

    match session {
        Some(session) if json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "connected": true,
                "address": session.address,
            }))?
        ),
        Some(session) => println!("Connected: {}", session.address),
        None if json => println!("{}", serde_json::json!({ "connected": false })),
        None => println!("Not connected"),
    }
    Ok(())
}

pub async fn handle_balance(config: &Config, json: bool) -> Result<()> {
    let connector = connector(config)?;
    connector
        .restore_session()
        .context("session read failed")?
        .context("not connected; run `wallet connect` first")?;
    let wei = connector.get_balance().await.context("balance query failed")?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "balance_wei": wei.to_string(), "balance_eth": format_wei(wei) })
        );
    } else {
        println!("{} ETH", format_wei(wei));
    }
    Ok(())
}

pub fn handle_disconnect(config: &Config) -> Result<()> {
    let connector = connector(config)?;
    connector.disconnect().context("disconnect failed")?;
    println!("Disconnected");
    Ok(())
}
