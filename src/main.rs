//! ERC20 Minter
//!
//! Command-line front end for a deployed mintable/burnable token.
//!
//! # Architecture Overview
//!
//! ```text
//!   CLI command
//!       │
//!       ▼
//!  ┌─────────────┐     ┌────────────────┐     ┌─────────────────┐
//!  │ Coordinator │────▶│ TokenContract  │────▶│ ProviderAdapter │────▶ LocalWallet ──▶ JSON-RPC
//!  │ (state,     │     │ (ABI, units)   │     │ (session,       │      (signing key
//!  │  actions)   │     └────────────────┘     │  signer/reader) │       from env)
//!  └──────┬──────┘                            └─────────────────┘
//!         │ watch channel
//!         ▼
//!   pending hash / outcome printed here
//! ```

use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use erc20_minter::config::{load_config, MinterConfig};
use erc20_minter::observability::{init_logging, metrics};
use erc20_minter::token::{display_units, parse_recipient};
use erc20_minter::{ActionOutcome, Coordinator, LocalWallet, ProviderAdapter};

#[derive(Parser)]
#[command(name = "erc20-minter")]
#[command(about = "Mint, burn and transfer tokens of a deployed ERC20 contract", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show token name, symbol, decimals and total supply
    Info,
    /// Show the connected account's balance
    Balance,
    /// Mint tokens to the connected account
    Mint { amount: String },
    /// Burn tokens from the connected account
    Burn { amount: String },
    /// Transfer tokens to another address
    Transfer { to: String, amount: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match start(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", describe_error(e.as_ref()));
            ExitCode::FAILURE
        }
    }
}

/// Human-readable failure line for the terminal.
fn describe_error(error: &(dyn std::error::Error + 'static)) -> String {
    format!("Error: {}", error)
}

async fn start(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => MinterConfig::default(),
    };

    init_logging(&config.observability)?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let token_address = parse_recipient(&config.token.address)?;
    let wallet = LocalWallet::from_env(&config.chain, &config.wallet.private_key_env)?;
    let adapter = ProviderAdapter::new(Some(Arc::new(wallet)));
    let coordinator = Coordinator::create(adapter, token_address, config.token.display_decimals);

    let result = run(&coordinator, cli.command).await;
    coordinator.teardown();
    result
}

async fn run(coordinator: &Arc<Coordinator>, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    let places = coordinator.display_decimals();
    let snapshot = coordinator.load_metadata().await?;
    let symbol = snapshot.symbol.clone().unwrap_or_else(|| "tokens".to_string());

    if let Commands::Info = command {
        let decimals = snapshot.decimals.unwrap_or(18);
        println!("Contract:     {}", coordinator.token_address());
        println!("Name:         {}", snapshot.name.as_deref().unwrap_or("unknown"));
        println!("Symbol:       {}", snapshot.symbol.as_deref().unwrap_or("unknown"));
        println!(
            "Decimals:     {}",
            snapshot.decimals.map(|d| d.to_string()).unwrap_or_else(|| "unknown".to_string())
        );
        println!(
            "Total supply: {}",
            snapshot
                .total_supply
                .and_then(|s| display_units(s, decimals, places).ok())
                .unwrap_or_else(|| "unknown".to_string())
        );
        return Ok(());
    }

    let session = coordinator.connect().await?;
    println!(
        "Connected account: {} ({})",
        session.account.map(|a| a.to_string()).unwrap_or_default(),
        session.network.as_deref().unwrap_or("unknown network")
    );

    let watcher = spawn_pending_printer(coordinator);

    let outcome = match command {
        Commands::Info | Commands::Balance => {
            coordinator.refresh_balance().await?;
            None
        }
        Commands::Mint { amount } => Some(coordinator.mint(&amount).await?),
        Commands::Burn { amount } => Some(coordinator.burn(&amount).await?),
        Commands::Transfer { to, amount } => Some(coordinator.transfer(&to, &amount).await?),
    };

    watcher.abort();

    if let Some(outcome) = &outcome {
        print_outcome(outcome, &symbol);
    }
    match coordinator.view().display_balance(places) {
        Some(balance) => println!("Your current balance: {} {}", balance, symbol),
        None => println!("Your current balance: unknown"),
    }
    Ok(())
}

/// Print each transaction hash as soon as the coordinator exposes it.
fn spawn_pending_printer(coordinator: &Arc<Coordinator>) -> tokio::task::JoinHandle<()> {
    let mut rx = coordinator.subscribe();
    tokio::spawn(async move {
        let mut shown = HashSet::new();
        while rx.changed().await.is_ok() {
            let pending = rx.borrow_and_update().actions.pending_hashes();
            for (kind, hash) in pending {
                if shown.insert(hash) {
                    println!("Transaction pending ({}): {}", kind, hash);
                    println!("Waiting for the transaction to be confirmed on the blockchain...");
                }
            }
        }
    })
}

fn print_outcome(outcome: &ActionOutcome, symbol: &str) {
    let verb = match outcome.kind {
        erc20_minter::ActionKind::Mint => "minted",
        erc20_minter::ActionKind::Burn => "burned",
        erc20_minter::ActionKind::Transfer => "transferred",
    };
    match outcome.recipient {
        Some(to) => println!("Successfully {} {} {} to {}", verb, outcome.amount, symbol, to),
        None => println!("Successfully {} {} {}", verb, outcome.amount, symbol),
    }
    println!(
        "Transaction {} confirmed in block {}",
        outcome.tx_hash,
        outcome.block_number.map(|b| b.to_string()).unwrap_or_else(|| "?".to_string())
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use erc20_minter::MinterError;

    #[test]
    fn test_errors_render_human_readable() {
        let err: Box<dyn std::error::Error> = Box::new(MinterError::TxReverted("0xabc in block 7".to_string()));
        assert_eq!(describe_error(err.as_ref()), "Error: Transaction reverted: 0xabc in block 7");

        let err: Box<dyn std::error::Error> = Box::new(MinterError::NotConnected);
        assert_eq!(
            describe_error(err.as_ref()),
            "Error: Wallet not connected: connect your wallet first"
        );
    }

    #[test]
    fn test_cli_parses_transfer() {
        let cli = Cli::try_parse_from(["erc20-minter", "transfer", "0xabc", "1.5"]).unwrap();
        assert!(matches!(cli.command, Commands::Transfer { ref to, ref amount } if to == "0xabc" && amount == "1.5"));
    }
}
