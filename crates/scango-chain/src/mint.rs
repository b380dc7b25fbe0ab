//! Reward mint requests.
//!
//! A `MintRequest` can only be built from a positive amount and a well-formed
//! wallet address, so invalid mints fail locally before any network call.

use serde::Serialize;

use scango_core::{OrderHash, ValidationError, WalletAddress};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    wallet: WalletAddress,
    amount: u64,
    /// Order hash of the rewarded checkout; the ledger's idempotency key.
    session_id: OrderHash,
}

impl MintRequest {
    /// # Errors
    ///
    /// [`ValidationError::NonPositiveRewardAmount`] for a zero amount,
    /// [`ValidationError::InvalidWalletAddress`] for a malformed wallet.
    pub fn new(wallet: &str, amount: u64, session: &OrderHash) -> Result<Self, ValidationError> {
        if amount == 0 {
            return Err(ValidationError::NonPositiveRewardAmount);
        }
        Ok(Self {
            wallet: WalletAddress::parse(wallet)?,
            amount,
            session_id: session.clone(),
        })
    }

    pub fn wallet(&self) -> &WalletAddress {
        &self.wallet
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn session_id(&self) -> &OrderHash {
        &self.session_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

    #[test]
    fn zero_amount_rejected_before_wallet_check() {
        let err = MintRequest::new("garbage", 0, &OrderHash::from_digest(&[1; 32])).unwrap_err();
        assert_eq!(err, ValidationError::NonPositiveRewardAmount);
    }

    #[test]
    fn invalid_wallet_rejected() {
        let err = MintRequest::new("0x1234", 5, &OrderHash::from_digest(&[1; 32])).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidWalletAddress(_)));
    }

    #[test]
    fn wire_shape() {
        let req = MintRequest::new(WALLET, 11, &OrderHash::from_digest(&[2; 32])).unwrap();
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["wallet"], WALLET.to_ascii_lowercase());
        assert_eq!(json["amount"], 11);
        assert_eq!(json["sessionId"].as_str().unwrap().len(), 66);
    }
}
