//! # Cashier and Guard Rules
//!
//! Pure decisions over `(local status, chain status)`. The guard never
//! admits on local state alone: a PAID receipt is only admitted when the
//! append-only ledger also reports the order as paid.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use scango_core::{ChainOrderStatus, ReceiptStatus};

/// Outcome of the cashier's mark-paid action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashierDecision {
    /// Receipt is PENDING: confirm on chain and advance to PAID.
    PaymentConfirmed,
    /// Receipt is already PAID or VERIFIED: succeed without mutation.
    AlreadyPaid,
}

pub fn cashier_decision(local: ReceiptStatus) -> CashierDecision {
    match local {
        ReceiptStatus::Pending => CashierDecision::PaymentConfirmed,
        ReceiptStatus::Paid | ReceiptStatus::Verified => CashierDecision::AlreadyPaid,
    }
}

/// Why the guard refused an exit proof.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDenied {
    #[error("no receipt matches the presented proof")]
    ReceiptNotFound,
    #[error("payment pending, exit denied")]
    PaymentPending,
    #[error("exit proof already used")]
    ProofAlreadyUsed,
}

/// Guard-facing verdict, as reported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitStatus {
    InvalidQr,
    PaymentPending,
    QrUsed,
    ExitAllowed,
}

impl ExitStatus {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::ExitAllowed)
    }
}

impl From<ExitDenied> for ExitStatus {
    fn from(denied: ExitDenied) -> Self {
        match denied {
            ExitDenied::ReceiptNotFound => Self::InvalidQr,
            ExitDenied::PaymentPending => Self::PaymentPending,
            ExitDenied::ProofAlreadyUsed => Self::QrUsed,
        }
    }
}

impl From<Result<(), ExitDenied>> for ExitStatus {
    fn from(verdict: Result<(), ExitDenied>) -> Self {
        match verdict {
            Ok(()) => Self::ExitAllowed,
            Err(denied) => denied.into(),
        }
    }
}

/// Decide whether the guard may admit an exit.
///
/// `chain` is `None` when the ledger was not consulted or could not be
/// reached; that is never enough to admit.
pub fn guard_decision(
    local: ReceiptStatus,
    chain: Option<ChainOrderStatus>,
) -> Result<(), ExitDenied> {
    match local {
        ReceiptStatus::Verified => Err(ExitDenied::ProofAlreadyUsed),
        ReceiptStatus::Pending => Err(ExitDenied::PaymentPending),
        ReceiptStatus::Paid => match chain {
            Some(ChainOrderStatus::Paid) => Ok(()),
            _ => Err(ExitDenied::PaymentPending),
        },
    }
}

/// Chain tie-break for status reads: advance a PENDING receipt when the
/// ledger already reports it paid. The ledger never moves a receipt back.
pub fn chain_advance(local: ReceiptStatus, chain: ChainOrderStatus) -> Option<ReceiptStatus> {
    match (local, chain) {
        (ReceiptStatus::Pending, ChainOrderStatus::Paid) => Some(ReceiptStatus::Paid),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cashier_is_idempotent() {
        assert_eq!(cashier_decision(ReceiptStatus::Pending), CashierDecision::PaymentConfirmed);
        assert_eq!(cashier_decision(ReceiptStatus::Paid), CashierDecision::AlreadyPaid);
        assert_eq!(cashier_decision(ReceiptStatus::Verified), CashierDecision::AlreadyPaid);
    }

    #[test]
    fn guard_requires_chain_paid() {
        assert_eq!(guard_decision(ReceiptStatus::Paid, Some(ChainOrderStatus::Paid)), Ok(()));
        for chain in [
            None,
            Some(ChainOrderStatus::Created),
            Some(ChainOrderStatus::Unknown),
        ] {
            assert_eq!(
                guard_decision(ReceiptStatus::Paid, chain),
                Err(ExitDenied::PaymentPending)
            );
        }
    }

    #[test]
    fn guard_rejects_pending_and_used_regardless_of_chain() {
        assert_eq!(
            guard_decision(ReceiptStatus::Pending, Some(ChainOrderStatus::Paid)),
            Err(ExitDenied::PaymentPending)
        );
        assert_eq!(
            guard_decision(ReceiptStatus::Verified, Some(ChainOrderStatus::Paid)),
            Err(ExitDenied::ProofAlreadyUsed)
        );
    }

    #[test]
    fn verdict_maps_to_wire_status() {
        assert_eq!(ExitStatus::from(Ok(())), ExitStatus::ExitAllowed);
        assert_eq!(ExitStatus::from(ExitDenied::ReceiptNotFound), ExitStatus::InvalidQr);
        assert_eq!(
            serde_json::to_string(&ExitStatus::QrUsed).unwrap(),
            "\"QR_USED\""
        );
        assert_eq!(
            serde_json::to_string(&ExitStatus::InvalidQr).unwrap(),
            "\"INVALID_QR\""
        );
        assert_eq!(
            serde_json::to_string(&CashierDecision::AlreadyPaid).unwrap(),
            "\"ALREADY_PAID\""
        );
    }

    #[test]
    fn chain_only_advances() {
        assert_eq!(
            chain_advance(ReceiptStatus::Pending, ChainOrderStatus::Paid),
            Some(ReceiptStatus::Paid)
        );
        assert_eq!(chain_advance(ReceiptStatus::Pending, ChainOrderStatus::Created), None);
        assert_eq!(chain_advance(ReceiptStatus::Verified, ChainOrderStatus::Created), None);
        assert_eq!(chain_advance(ReceiptStatus::Paid, ChainOrderStatus::Paid), None);
    }
}
