//! # Order Hash Generator
//!
//! `orderHash = "0x" + hex(sha256(json({cart, nonce, storeId, timestamp, total})))`
//!
//! The nonce is 16 bytes from the OS entropy source, so two checkouts of the
//! same cart in the same millisecond still yield distinct hashes, and a hash
//! cannot be guessed ahead of the checkout that mints it.

use chrono::Utc;
use rand_core::{OsRng, RngCore};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{EntropyError, OrderHashError};
use crate::identity::{OrderHash, StoreId};
use crate::order::LineItem;

/// Nonce length in bytes.
pub const NONCE_LEN: usize = 16;

/// Hash preimage. Fields are declared in sorted key order so the JSON
/// encoding is stable.
#[derive(Serialize)]
struct Preimage<'a> {
    cart: &'a [LineItem],
    nonce: String,
    #[serde(rename = "storeId")]
    store_id: &'a str,
    timestamp: i64,
    total: f64,
}

/// Mint a fresh order hash using the current time and an OS nonce.
///
/// # Errors
///
/// Fails only if the entropy source is unavailable, which callers treat as
/// fatal for the request.
pub fn generate_order_hash(
    cart: &[LineItem],
    total: f64,
    store_id: &StoreId,
) -> Result<OrderHash, OrderHashError> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|e| EntropyError(e.to_string()))?;
    order_hash_with(cart, total, store_id, Utc::now().timestamp_millis(), &nonce)
}

/// Deterministic core of [`generate_order_hash`] with explicit time and nonce.
pub fn order_hash_with(
    cart: &[LineItem],
    total: f64,
    store_id: &StoreId,
    timestamp_ms: i64,
    nonce: &[u8],
) -> Result<OrderHash, OrderHashError> {
    let preimage = Preimage {
        cart,
        nonce: to_hex(nonce),
        store_id: store_id.as_str(),
        timestamp: timestamp_ms,
        total,
    };
    let bytes = serde_json::to_vec(&preimage)?;
    let digest: [u8; 32] = Sha256::digest(&bytes).into();
    Ok(OrderHash::from_digest(&digest))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn cart() -> Vec<LineItem> {
        vec![LineItem {
            product_id: "milk-1l".into(),
            name: Some("Milk 1L".into()),
            quantity: 2,
            unit_price: 54.0,
            unit_mrp: 60.0,
        }]
    }

    fn store() -> StoreId {
        StoreId::new("store-blr-01").unwrap()
    }

    #[test]
    fn same_inputs_same_hash() {
        let a = order_hash_with(&cart(), 108.0, &store(), 1_700_000_000_000, &[7; 16]).unwrap();
        let b = order_hash_with(&cart(), 108.0, &store(), 1_700_000_000_000, &[7; 16]).unwrap();
        assert_eq!(a, b);
        assert!(OrderHash::parse(a.as_str()).is_ok());
    }

    #[test]
    fn nonce_changes_hash() {
        let a = order_hash_with(&cart(), 108.0, &store(), 1_700_000_000_000, &[7; 16]).unwrap();
        let b = order_hash_with(&cart(), 108.0, &store(), 1_700_000_000_000, &[8; 16]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn every_input_is_bound() {
        let base = order_hash_with(&cart(), 108.0, &store(), 1, &[0; 16]).unwrap();
        let other_store = StoreId::new("store-blr-02").unwrap();
        assert_ne!(base, order_hash_with(&cart(), 108.0, &other_store, 1, &[0; 16]).unwrap());
        assert_ne!(base, order_hash_with(&cart(), 108.5, &store(), 1, &[0; 16]).unwrap());
        assert_ne!(base, order_hash_with(&cart(), 108.0, &store(), 2, &[0; 16]).unwrap());
        assert_ne!(base, order_hash_with(&[], 108.0, &store(), 1, &[0; 16]).unwrap());
    }

    #[test]
    fn identical_carts_never_collide() {
        let mut seen = HashSet::new();
        for _ in 0..1_000 {
            let h = generate_order_hash(&cart(), 108.0, &store()).unwrap();
            assert!(seen.insert(h), "duplicate order hash generated");
        }
    }

    proptest::proptest! {
        #[test]
        fn generated_hash_is_well_formed(total in 0.01f64..100_000.0, qty in 1u32..50) {
            let mut c = cart();
            c[0].quantity = qty;
            let h = generate_order_hash(&c, total, &store()).unwrap();
            proptest::prop_assert_eq!(h.as_str().len(), 66);
            proptest::prop_assert!(h.as_str().starts_with("0x"));
        }
    }
}
