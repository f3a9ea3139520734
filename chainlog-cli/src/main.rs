//! Chainlog CLI - wallet session and transfer log from the terminal.

#![allow(clippy::print_stdout, clippy::print_stderr)] // CLI program intentionally uses stdout

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use chainlog::prelude::*;
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Chainlog - send value and keep an on-chain transfer log
#[derive(Parser)]
#[command(name = "chainlog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = "CHAINLOG_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the account, record count and records
    Status,

    /// Ask the wallet to connect an account
    Connect,

    /// Send value and append a record
    Send(SendArgs),

    /// List records
    Records(RecordsArgs),
}

/// Arguments for the send command
#[derive(Args)]
struct SendArgs {
    /// Receiver address
    #[arg(long)]
    to: String,

    /// Amount in ether (e.g. 0.01)
    #[arg(long)]
    amount: String,

    /// Keyword stored with the record
    #[arg(long, default_value = "")]
    keyword: String,

    /// Message stored with the record
    #[arg(long, default_value = "")]
    message: String,
}

/// Arguments for the records command
#[derive(Args)]
struct RecordsArgs {
    /// Print records as JSON
    #[arg(long)]
    json: bool,
}

/// Prints the advisory to stderr.
struct StderrAdvisory;

impl Advisory for StderrAdvisory {
    fn advise(&self, message: &str) {
        eprintln!("{message}");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging with the given verbosity level.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "chainlog={level},chainlog_cli={level},{}",
            if verbosity >= 2 { "debug" } else { "warn" }
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())
        .await
        .context("failed to load configuration")?;
    let ctx = TransactionContext::from_config(&config, Arc::new(StderrAdvisory))
        .await
        .context("failed to mount session")?;

    let result = match cli.command {
        Commands::Status => {
            print_status(&ctx);
            Ok(())
        }
        Commands::Connect => cmd_connect(&ctx).await,
        Commands::Send(args) => cmd_send(&ctx, args).await,
        Commands::Records(args) => print_records(&ctx, args.json),
    };
    ctx.unmount();
    result
}

async fn cmd_connect(ctx: &TransactionContext) -> anyhow::Result<()> {
    match ctx.connect_wallet().await {
        Ok(account) => {
            println!("Connected: {account}");
            Ok(())
        }
        Err(e) if e.is_advisory() => Ok(()),
        Err(e) => Err(anyhow::anyhow!("{}", DisplayError(&e))),
    }
}

async fn cmd_send(ctx: &TransactionContext, args: SendArgs) -> anyhow::Result<()> {
    ctx.handle_change(FormField::AddressTo, args.to);
    ctx.handle_change(FormField::Amount, args.amount);
    ctx.handle_change(FormField::Keyword, args.keyword);
    ctx.handle_change(FormField::Message, args.message);

    let form = ctx.form_data();
    for field in FormField::ALL {
        tracing::debug!(field = %field, value = form.get(field), "form");
    }

    match ctx.send_transaction().await {
        Ok(receipt) => {
            println!("Confirmed: {}", receipt.transaction_hash);
            if let Some(block) = receipt.block_number {
                println!("Block:     {block}");
            }
            print_status(ctx);
            Ok(())
        }
        Err(e) if e.is_advisory() => Ok(()),
        Err(e) => Err(anyhow::anyhow!("{}", DisplayError(&e))),
    }
}

fn print_status(ctx: &TransactionContext) {
    let snapshot = ctx.snapshot();
    match snapshot.current_account {
        Some(account) => println!("Account:   {account}"),
        None => println!("Account:   (not connected)"),
    }
    match snapshot.transaction_count {
        Some(count) => println!("Records:   {count}"),
        None => println!("Records:   (unknown)"),
    }
    for record in &snapshot.transactions {
        print_record(record);
    }
}

fn print_records(ctx: &TransactionContext, json: bool) -> anyhow::Result<()> {
    let records = ctx.transactions();
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No records.");
    }
    for record in &records {
        print_record(record);
    }
    Ok(())
}

fn print_record(record: &TransactionRecord) {
    println!(
        "- {} | {} -> {} | {} ETH | {} | {}",
        record.timestamp,
        record.address_from,
        record.address_to,
        record.amount,
        record.keyword,
        record.message
    );
}
