//! Swap Signer
//!
//! Command-line entry point. `sign` runs one request through the signing
//! pipeline and prints the response JSON on stdout; `inspect` decodes a
//! transaction and prints its account roles without touching the network.
//! Logs go to stderr.

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(dead_code)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use swap_signer::config::{Config, LoggingConfig};
use swap_signer::ledger::RpcLedgerClient;
use swap_signer::metrics::Metrics;
use swap_signer::pipeline::{decode_base64_transaction, inspect_account_roles};
use swap_signer::{SignRequest, SigningPipeline};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print Prometheus metrics to stderr before exiting
    #[arg(long, global = true)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign, submit and confirm one swap transaction
    Sign {
        /// Request JSON file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        request: String,
    },
    /// Show account roles of a transaction against a reference key
    Inspect {
        /// Base64 transaction
        #[arg(short, long)]
        transaction: String,

        /// Public key expected to sign
        #[arg(short, long)]
        reference: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration before logging so the log format can come from it
    let (config, from_file) = load_config(&args.config)?;

    // Initialize logging
    init_logging(&config.logging, args.verbose)?;

    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    if from_file {
        info!("Configuration loaded from: {}", args.config);
    } else {
        warn!("Config file '{}' not found, using defaults", args.config);
    }

    match args.command {
        Command::Sign { request } => run_sign(&config, &request, args.print_metrics).await,
        Command::Inspect {
            transaction,
            reference,
        } => run_inspect(&transaction, &reference),
    }
}

/// Initialize logging subsystem
fn init_logging(logging: &LoggingConfig, verbose: bool) -> Result<()> {
    let default_filter = if verbose {
        "swap_signer=debug,info".to_string()
    } else {
        logging.filter.clone()
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<(Config, bool)> {
    let (config, from_file) = if std::path::Path::new(path).exists() {
        let config = Config::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))?;
        (config, true)
    } else {
        dotenvy::dotenv().ok();
        let mut config = Config::default();
        config
            .apply_env_overrides()
            .context("Invalid environment override")?;
        (config, false)
    };
    config.validate().context("Invalid configuration")?;
    Ok((config, from_file))
}

async fn read_request(source: &str) -> Result<SignRequest> {
    let raw = if source == "-" {
        let mut buffer = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buffer)
            .await
            .context("Failed to read request from stdin")?;
        buffer
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("Failed to read request file {}", source))?
    };
    serde_json::from_str(&raw).context("Request is not a valid signing request document")
}

async fn run_sign(config: &Config, source: &str, print_metrics: bool) -> Result<()> {
    let request = read_request(source).await?;

    info!("Connecting to RPC endpoint: {}", config.rpc.url);
    let ledger = Arc::new(RpcLedgerClient::from_config(&config.rpc));
    let metrics = Metrics::new().context("Failed to initialize metrics")?;

    let pipeline = SigningPipeline::new(ledger.as_ref(), &metrics, config);
    let response = pipeline.execute(request).await;

    println!(
        "{}",
        serde_json::to_string_pretty(&response).context("Failed to encode response")?
    );

    if print_metrics {
        eprintln!("{}", metrics.export_text()?);
    }

    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}

fn run_inspect(transaction: &str, reference: &str) -> Result<()> {
    let reference = Pubkey::from_str(reference.trim())
        .with_context(|| format!("Invalid reference public key '{}'", reference))?;
    let envelope = decode_base64_transaction(transaction).context("Failed to decode transaction")?;
    let report = inspect_account_roles(&envelope, &reference);

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to encode report")?
    );
    Ok(())
}
