//! # Status and Balance Subcommands

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use scango_client::{PollerConfig, ScanGoClient, StatusPoller};
use scango_core::{ReceiptNumber, ReceiptStatus, WalletAddress};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Receipt number, e.g. RCP-004211.
    pub receipt: String,
    /// Keep polling until the guard has verified the receipt.
    #[arg(long)]
    pub watch: bool,
}

#[derive(Args, Debug)]
pub struct BalanceArgs {
    /// Wallet address (0x + 40 hex digits).
    pub wallet: String,
}

pub async fn run_status(client: &ScanGoClient, args: &StatusArgs) -> Result<u8> {
    let receipt = ReceiptNumber::new(args.receipt.as_str())?;
    let view = client
        .receipt(&receipt)
        .await
        .context("status lookup failed")?;
    println!(
        "{}  {}  {} item(s)  total {:.2}",
        view.receipt_number, view.status, view.item_count, view.total_amount
    );

    if !args.watch || view.status == ReceiptStatus::Verified {
        return Ok(0);
    }

    // The receipt was just read, so the initial delay is not needed.
    let config = PollerConfig {
        initial_delay: std::time::Duration::ZERO,
        ..PollerConfig::default()
    };
    let mut handle = StatusPoller::new(Arc::new(client.clone()))
        .with_config(config)
        .spawn(receipt, Some(view.status));
    let mut updates = handle.subscribe();

    let mut last = Some(view.status);
    let mut warned = false;
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                if state.status != last {
                    if let Some(status) = state.status {
                        println!("{status}");
                    }
                    last = state.status;
                }
                if state.degraded && !warned {
                    eprintln!("status unavailable; still retrying");
                }
                warned = state.degraded;
                if state.finished {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                handle.stop();
                break;
            }
        }
    }
    Ok(0)
}

pub async fn run_balance(client: &ScanGoClient, args: &BalanceArgs) -> Result<u8> {
    let wallet = WalletAddress::parse(args.wallet.as_str())?;
    println!("{}", client.reward_balance(&wallet).await);
    Ok(0)
}
