//! # Fundra Agent CLI
//!
//! Command-line interface for the Fundra donation platform.
//!
//! ## Commands
//!
//! ### Wallet
//! - `wallet connect`: Request accounts and persist the session
//! - `wallet status`: Show the persisted session, if any
//! - `wallet balance`: Show the connected account's balance
//! - `wallet disconnect`: Forget the persisted session
//!
//! ### Campaigns (backend)
//! - `funds list`: List campaigns (`--limit`, `--offset`)
//! - `funds show <id>`: Show one campaign
//! - `funds create`: Create a campaign (`--title`, `--target`, ...)
//! - `funds update <id>`: Partially update a campaign
//! - `funds delete <id>`: Delete a campaign
//! - `funds donate <id> --amount`: Record an off-chain donation in the
//!   backend's bookkeeping units
//!
//! ### On-chain
//! - `donate --amount <eth>`: Run the full donation workflow against the
//!   platform contract: estimate, affordability check, submit, confirm.
//!   Requires `contract_address` and `abi_path` in the config.
//!
//! Most commands accept `--json` for machine-readable output.
//!
//! ## Configuration
//!
//! `--config <path>` loads a TOML file; without it, configuration comes
//! from environment variables over defaults:
//!
//! - `FUNDRA_BACKEND_URL`: backend REST API (default: http://localhost:3001)
//! - `FUNDRA_RPC_URL`: wallet JSON-RPC endpoint (default: http://localhost:8545)
//! - `FUNDRA_CONTRACT_ADDRESS`: donation contract address
//! - `FUNDRA_ABI_PATH`: contract interface description (JSON)
//! - `FUNDRA_SESSION_PATH`: wallet session file (default: ./session.json)

mod cmd_donate;
mod cmd_funds;
mod cmd_wallet;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fundra_common::Config;

#[derive(Parser)]
#[command(version, about = "Fundra donation platform CLI")]
struct Cli {
    /// Path to a TOML config file; environment variables otherwise.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wallet connection and session commands
    Wallet {
        #[command(subcommand)]
        wallet_cmd: WalletCommands,
    },

    /// Campaign commands against the backend REST API
    Funds {
        #[command(subcommand)]
        funds_cmd: FundsCommands,
    },

    /// Donate on-chain through the platform contract
    Donate {
        /// Amount in ETH, decimal (e.g. "0.5")
        #[arg(long)]
        amount: String,
        /// Output the final result in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum WalletCommands {
    /// Request accounts from the provider and persist the session
    Connect {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show the persisted session without contacting the provider
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show the connected account's balance
    Balance {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Forget the persisted session
    Disconnect,
}

#[derive(Subcommand)]
enum FundsCommands {
    /// List campaigns
    List {
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show one campaign by id
    Show {
        fund_id: i64,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Create a campaign
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        target: u64,
        #[arg(long)]
        category_id: Option<i64>,
        #[arg(long)]
        photo_url: Option<String>,
    },
    /// Partially update a campaign
    Update {
        fund_id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        target: Option<u64>,
        #[arg(long)]
        category_id: Option<i64>,
        #[arg(long)]
        photo_url: Option<String>,
    },
    /// Delete a campaign
    Delete { fund_id: i64 },
    /// Record an off-chain donation (backend bookkeeping units, not wei)
    Donate {
        fund_id: i64,
        #[arg(long)]
        amount: u64,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(p) => Ok(fundra_common::load_from_file(p)?),
        None => Ok(Config::from_env()?),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.cmd {
        Commands::Wallet { wallet_cmd } => match wallet_cmd {
            WalletCommands::Connect { json } => cmd_wallet::handle_connect(&config, json).await,
            WalletCommands::Status { json } => cmd_wallet::handle_status(&config, json),
            WalletCommands::Balance { json } => cmd_wallet::handle_balance(&config, json).await,
            WalletCommands::Disconnect => cmd_wallet::handle_disconnect(&config),
        },

        Commands::Funds { funds_cmd } => match funds_cmd {
            FundsCommands::List {
                limit,
                offset,
                json,
            } => cmd_funds::handle_list(&config, limit, offset, json).await,
            FundsCommands::Show { fund_id, json } => {
                cmd_funds::handle_show(&config, fund_id, json).await
            }
            FundsCommands::Create {
                title,
                description,
                target,
                category_id,
                photo_url,
            } => {
                cmd_funds::handle_create(&config, title, description, target, category_id, photo_url)
                    .await
            }
            FundsCommands::Update {
                fund_id,
                title,
                description,
                target,
                category_id,
                photo_url,
            } => {
                cmd_funds::handle_update(
                    &config,
                    fund_id,
                    title,
                    description,
                    target,
                    category_id,
                    photo_url,
                )
                .await
            }
            FundsCommands::Delete { fund_id } => cmd_funds::handle_delete(&config, fund_id).await,
            FundsCommands::Donate { fund_id, amount } => {
                cmd_funds::handle_donate(&config, fund_id, amount).await
            }
        },

        Commands::Donate { amount, json } => cmd_donate::handle_donate(&config, &amount, json).await,
    }
}
