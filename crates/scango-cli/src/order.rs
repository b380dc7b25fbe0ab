//! # Checkout Subcommand

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use scango_client::types::CheckoutRequest;
use scango_client::ScanGoClient;
use scango_core::LineItem;

/// Arguments for `scango checkout`.
#[derive(Args, Debug)]
pub struct CheckoutArgs {
    /// Store identifier.
    #[arg(long)]
    pub store: String,
    /// JSON file holding the cart: an array of line items.
    #[arg(long)]
    pub cart: PathBuf,
    /// Order total.
    #[arg(long)]
    pub total: f64,
    /// CASH, CARD, or UPI. The server defaults to CASH.
    #[arg(long)]
    pub method: Option<String>,
    /// Wallet to credit with the loyalty reward.
    #[arg(long)]
    pub wallet: Option<String>,
    /// Minutes spent in store.
    #[arg(long)]
    pub time_spent: Option<f64>,
}

/// Parse a cart file body. Accepts either a bare array of line items or an
/// object with a `cart` array.
pub fn parse_cart(raw: &str) -> Result<Vec<LineItem>> {
    let value: serde_json::Value = serde_json::from_str(raw).context("cart file is not JSON")?;
    let items = match value {
        serde_json::Value::Object(mut obj) => obj
            .remove("cart")
            .context("cart object has no \"cart\" field")?,
        other => other,
    };
    serde_json::from_value(items).context("cart is not an array of line items")
}

pub async fn run_checkout(client: &ScanGoClient, args: &CheckoutArgs) -> Result<u8> {
    let raw = std::fs::read_to_string(&args.cart)
        .with_context(|| format!("failed to read cart file {}", args.cart.display()))?;
    let cart = parse_cart(&raw)?;

    let req = CheckoutRequest {
        cart,
        total: args.total,
        store_id: args.store.clone(),
        payment_method: args.method.clone(),
        time_spent: args.time_spent,
        wallet_address: args.wallet.clone(),
    };
    let resp = client.checkout(&req).await.context("checkout failed")?;

    println!("receipt:      {}", resp.receipt_number);
    println!("order hash:   {}", resp.order_hash);
    println!("status:       {}", resp.status);
    println!("tx:           {}", resp.tx_hash);
    if !resp.chain_synced {
        println!("ledger:       not yet synced (will be reconciled)");
    }
    Ok(0)
}
