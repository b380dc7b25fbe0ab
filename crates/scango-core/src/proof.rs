//! # Exit Proof Codec
//!
//! The QR payload shown to the shopper and re-scanned by staff:
//!
//! ```text
//! {"orderHash": "0x…", "txHash": "0x…" | "OFFLINE-RCP-…", "receiptNumber": "RCP-…"}
//! ```
//!
//! The proof is a capability token, not a signed artifact: its validity is
//! derived entirely from the receipt it references. Decoding is strict so
//! that nothing malformed ever reaches a ledger lookup.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ProofDecodeError;
use crate::identity::{OrderHash, ReceiptNumber, TxRef};

const ORDER_HASH: &str = "orderHash";
const TX_HASH: &str = "txHash";
const RECEIPT_NUMBER: &str = "receiptNumber";

/// Decoded exit proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitProof {
    pub order_hash: OrderHash,
    pub tx_hash: TxRef,
    pub receipt_number: ReceiptNumber,
}

impl ExitProof {
    pub fn new(order_hash: OrderHash, tx_hash: TxRef, receipt_number: ReceiptNumber) -> Self {
        Self {
            order_hash,
            tx_hash,
            receipt_number,
        }
    }

    /// Decode a scanned payload.
    ///
    /// # Errors
    ///
    /// Any missing, mistyped, empty, malformed, or unexpected field is an
    /// error. Nothing is defaulted.
    pub fn decode(raw: &str) -> Result<Self, ProofDecodeError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| ProofDecodeError::Malformed(e.to_string()))?;
        let obj = value.as_object().ok_or(ProofDecodeError::NotAnObject)?;

        if let Some(extra) = obj
            .keys()
            .find(|k| ![ORDER_HASH, TX_HASH, RECEIPT_NUMBER].contains(&k.as_str()))
        {
            return Err(ProofDecodeError::UnexpectedField(extra.clone()));
        }

        let order_hash = OrderHash::parse(required_str(obj, ORDER_HASH)?)
            .map_err(|_| ProofDecodeError::InvalidField(ORDER_HASH))?;
        let tx_hash = TxRef::new(required_str(obj, TX_HASH)?)
            .map_err(|_| ProofDecodeError::InvalidField(TX_HASH))?;
        let receipt_number = ReceiptNumber::new(required_str(obj, RECEIPT_NUMBER)?)
            .map_err(|_| ProofDecodeError::InvalidField(RECEIPT_NUMBER))?;

        Ok(Self {
            order_hash,
            tx_hash,
            receipt_number,
        })
    }

    /// Encode to the wire form rendered into the QR code.
    pub fn encode(&self) -> String {
        // Three string fields; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn required_str<'a>(
    obj: &'a Map<String, Value>,
    key: &'static str,
) -> Result<&'a str, ProofDecodeError> {
    match obj.get(key) {
        None => Err(ProofDecodeError::MissingField(key)),
        Some(Value::String(s)) if !s.is_empty() => Ok(s.as_str()),
        Some(_) => Err(ProofDecodeError::InvalidField(key)),
    }
}
