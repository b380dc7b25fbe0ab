//! # Order Primitives
//!
//! Line items, payment methods, and the two status vocabularies: the local
//! [`ReceiptStatus`] and the external ledger's [`ChainOrderStatus`].

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One scanned product in a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub quantity: u32,
    #[serde(alias = "price")]
    pub unit_price: f64,
    #[serde(alias = "mrp")]
    pub unit_mrp: f64,
}

impl LineItem {
    fn validate(&self, index: usize) -> Result<(), ValidationError> {
        let fail = |reason: &str| ValidationError::InvalidLineItem {
            index,
            reason: reason.to_string(),
        };
        if self.product_id.trim().is_empty() {
            return Err(fail("product id must be non-empty"));
        }
        if self.quantity == 0 {
            return Err(fail("quantity must be positive"));
        }
        if !self.unit_price.is_finite() || self.unit_price < 0.0 {
            return Err(fail("unit price must be a finite non-negative amount"));
        }
        if !self.unit_mrp.is_finite() || self.unit_mrp < 0.0 {
            return Err(fail("unit MRP must be a finite non-negative amount"));
        }
        Ok(())
    }
}

/// Validate a cart and its declared total before anything is written.
pub fn validate_cart(items: &[LineItem], total: f64) -> Result<(), ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::EmptyCart);
    }
    for (index, item) in items.iter().enumerate() {
        item.validate(index)?;
    }
    if !total.is_finite() || total <= 0.0 {
        return Err(ValidationError::InvalidTotal(total));
    }
    Ok(())
}

/// Total number of units across all line items.
pub fn item_count(items: &[LineItem]) -> u32 {
    items.iter().map(|i| i.quantity).sum()
}

// -- PaymentMethod ------------------------------------------------------------

/// How the shopper pays. Non-cash methods are settled before checkout returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Upi,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::Card => "CARD",
            Self::Upi => "UPI",
        }
    }

    /// Cash is the only method that requires a cashier before exit.
    pub fn is_cash(&self) -> bool {
        matches!(self, Self::Cash)
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CASH" => Ok(Self::Cash),
            "CARD" => Ok(Self::Card),
            "UPI" => Ok(Self::Upi),
            _ => Err(ValidationError::UnknownPaymentMethod(s.to_string())),
        }
    }
}

impl TryFrom<String> for PaymentMethod {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// -- ReceiptStatus ------------------------------------------------------------

/// Receipt lifecycle status.
///
/// The `Ord` derivation follows declaration order:
/// `Pending < Paid < Verified`. Status never moves backwards.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReceiptStatus {
    /// Created for a cash order, awaiting the cashier.
    Pending,
    /// Payment settled, awaiting the exit guard.
    Paid,
    /// Exit admitted. Terminal.
    Verified,
}

impl ReceiptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Verified => "VERIFIED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified)
    }

    /// Status a freshly checked-out receipt starts in.
    pub fn initial_for(method: PaymentMethod) -> Self {
        if method.is_cash() {
            Self::Pending
        } else {
            Self::Paid
        }
    }
}

impl std::str::FromStr for ReceiptStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "VERIFIED" => Ok(Self::Verified),
            other => Err(ValidationError::UnknownReceiptStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// -- ChainOrderStatus ---------------------------------------------------------

/// An order's state as reported by the append-only ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainOrderStatus {
    Created,
    Paid,
    /// The ledger has no record of the order.
    Unknown,
}

impl ChainOrderStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

impl std::fmt::Display for ChainOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Paid => "paid",
            Self::Unknown => "unknown",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(qty: u32, price: f64) -> LineItem {
        LineItem {
            product_id: "sku-1".into(),
            name: None,
            quantity: qty,
            unit_price: price,
            unit_mrp: price,
        }
    }

    #[test]
    fn status_order_is_total() {
        assert!(ReceiptStatus::Pending < ReceiptStatus::Paid);
        assert!(ReceiptStatus::Paid < ReceiptStatus::Verified);
        assert!(ReceiptStatus::Verified.is_terminal());
    }

    #[test]
    fn initial_status_depends_on_method() {
        assert_eq!(ReceiptStatus::initial_for(PaymentMethod::Cash), ReceiptStatus::Pending);
        assert_eq!(ReceiptStatus::initial_for(PaymentMethod::Card), ReceiptStatus::Paid);
        assert_eq!(ReceiptStatus::initial_for(PaymentMethod::Upi), ReceiptStatus::Paid);
    }

    #[test]
    fn payment_method_parses_case_insensitively() {
        let m: PaymentMethod = serde_json::from_str("\"upi\"").unwrap();
        assert_eq!(m, PaymentMethod::Upi);
        assert_eq!(serde_json::to_string(&m).unwrap(), "\"UPI\"");
        assert!(serde_json::from_str::<PaymentMethod>("\"CHEQUE\"").is_err());
    }

    #[test]
    fn line_item_accepts_short_price_aliases() {
        let json = r#"{"productId":"p1","quantity":2,"price":10.5,"mrp":12.0}"#;
        let li: LineItem = serde_json::from_str(json).unwrap();
        assert_eq!(li.unit_price, 10.5);
        assert_eq!(li.unit_mrp, 12.0);
    }

    #[test]
    fn cart_validation() {
        assert_eq!(validate_cart(&[], 10.0), Err(ValidationError::EmptyCart));
        assert!(validate_cart(&[item(1, 10.0)], 0.0).is_err());
        assert!(validate_cart(&[item(1, 10.0)], f64::NAN).is_err());
        assert!(validate_cart(&[item(0, 10.0)], 10.0).is_err());
        assert!(validate_cart(&[item(1, -1.0)], 10.0).is_err());
        assert!(validate_cart(&[item(2, 5.0)], 10.0).is_ok());
    }

    #[test]
    fn item_count_sums_quantities() {
        assert_eq!(item_count(&[item(2, 1.0), item(3, 1.0)]), 5);
    }

    #[test]
    fn chain_status_wire_names() {
        assert_eq!(serde_json::to_string(&ChainOrderStatus::Paid).unwrap(), "\"paid\"");
        let s: ChainOrderStatus = serde_json::from_str("\"created\"").unwrap();
        assert_eq!(s, ChainOrderStatus::Created);
    }
}
