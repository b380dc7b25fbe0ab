//! # scango CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scango_cli::order::{run_checkout, CheckoutArgs};
use scango_cli::staff::{
    run_mark_paid, run_verify_exit, run_verify_proof, MarkPaidArgs, VerifyExitArgs,
    VerifyProofArgs,
};
use scango_cli::status::{run_balance, run_status, BalanceArgs, StatusArgs};
use scango_client::{ClientConfig, ScanGoClient};

/// ScanGo self-checkout command line.
#[derive(Parser, Debug)]
#[command(name = "scango", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// ScanGo API base URL.
    #[arg(long, env = "SCANGO_API_URL", default_value = "http://localhost:8080", global = true)]
    api_url: String,

    /// Staff bearer token, `{role}:{secret}`.
    #[arg(long, env = "SCANGO_STAFF_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit a cart and print the receipt.
    Checkout(CheckoutArgs),

    /// Cashier: confirm a cash payment.
    MarkPaid(MarkPaidArgs),

    /// Guard: verify an exit by order hash.
    VerifyExit(VerifyExitArgs),

    /// Guard: verify an exit from a raw QR payload.
    VerifyProof(VerifyProofArgs),

    /// Show a receipt's status.
    Status(StatusArgs),

    /// Show a wallet's reward balance.
    Balance(BalanceArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match ClientConfig::new(&cli.api_url) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::from(1);
        }
    };
    if let Some(token) = cli.token {
        config = config.with_staff_token(token);
    }
    tracing::debug!(?config, "scango CLI starting");

    let client = match ScanGoClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::from(1);
        }
    };

    let result = match &cli.command {
        Commands::Checkout(args) => run_checkout(&client, args).await,
        Commands::MarkPaid(args) => run_mark_paid(&client, args).await,
        Commands::VerifyExit(args) => run_verify_exit(&client, args).await,
        Commands::VerifyProof(args) => run_verify_proof(&client, args).await,
        Commands::Status(args) => run_status(&client, args).await,
        Commands::Balance(args) => run_balance(&client, args).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_checkout() {
        let cli = Cli::try_parse_from([
            "scango",
            "checkout",
            "--store",
            "store-blr-01",
            "--cart",
            "cart.json",
            "--total",
            "300",
            "--method",
            "upi",
        ])
        .unwrap();
        match cli.command {
            Commands::Checkout(args) => {
                assert_eq!(args.store, "store-blr-01");
                assert_eq!(args.total, 300.0);
                assert_eq!(args.method.as_deref(), Some("upi"));
                assert!(args.wallet.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "scango",
            "status",
            "RCP-004211",
            "--watch",
            "--api-url",
            "http://store.local:9000",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.api_url, "http://store.local:9000");
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Status(args) => assert!(args.watch),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn checkout_requires_store_and_total() {
        assert!(Cli::try_parse_from(["scango", "checkout", "--cart", "c.json"]).is_err());
    }
}
