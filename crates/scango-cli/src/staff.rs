//! # Staff Subcommands
//!
//! Cashier and guard actions. Both need a staff token (`--token` or
//! `SCANGO_STAFF_TOKEN`) when the server has authentication enabled.

use anyhow::{Context, Result};
use clap::Args;

use scango_client::types::ExitVerdict;
use scango_client::ScanGoClient;
use scango_core::{OrderHash, ReceiptNumber};

use crate::EXIT_DENIED;

#[derive(Args, Debug)]
pub struct MarkPaidArgs {
    /// Receipt number, e.g. RCP-004211.
    pub receipt: String,
    /// Order hash printed on the receipt; the server rejects a mismatch.
    #[arg(long)]
    pub order_hash: Option<String>,
}

#[derive(Args, Debug)]
pub struct VerifyExitArgs {
    /// Order hash as scanned.
    pub order_hash: String,
}

#[derive(Args, Debug)]
pub struct VerifyProofArgs {
    /// Raw scanned QR payload.
    pub payload: String,
}

pub async fn run_mark_paid(client: &ScanGoClient, args: &MarkPaidArgs) -> Result<u8> {
    let receipt = ReceiptNumber::new(args.receipt.as_str())?;
    let order_hash = args
        .order_hash
        .as_deref()
        .map(OrderHash::parse)
        .transpose()?;

    let resp = client
        .mark_paid(&receipt, order_hash.as_ref())
        .await
        .context("mark-paid failed")?;
    println!("{} ({})", resp.result, resp.status);
    Ok(0)
}

pub async fn run_verify_exit(client: &ScanGoClient, args: &VerifyExitArgs) -> Result<u8> {
    let verdict = client
        .verify_exit(&args.order_hash)
        .await
        .context("verify-exit failed")?;
    Ok(report(&verdict))
}

pub async fn run_verify_proof(client: &ScanGoClient, args: &VerifyProofArgs) -> Result<u8> {
    let verdict = client
        .verify_proof(&args.payload)
        .await
        .context("verify-proof failed")?;
    Ok(report(&verdict))
}

fn report(verdict: &ExitVerdict) -> u8 {
    match (&verdict.receipt_number, verdict.item_count) {
        (Some(receipt), Some(items)) => println!("{}  {receipt}  {items} item(s)", verdict.status),
        _ => println!("{}", verdict.status),
    }
    if verdict.allowed {
        0
    } else {
        EXIT_DENIED
    }
}
