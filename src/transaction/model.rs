use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{Amount, Timestamp};
use crate::error::{LedgerError, Result};
use crate::wallet::{address_of, normalize_address, sign_digest_hex, verify_signature_hex};

/// The atomic unit of ledger change: either a signed transfer between two
/// addresses or a reward that creates value out of nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireRecord", into = "WireRecord")]
pub enum TransactionRecord {
    Transfer {
        from: String,
        to: String,
        amount: Amount,
        timestamp: Timestamp,
        /// Hex DER ECDSA signature over [`TransactionRecord::sighash`].
        signature: Option<String>,
    },
    Reward {
        to: String,
        amount: Amount,
        timestamp: Timestamp,
    },
}

/// Flat JSON shape exchanged with peers. A null `fromAddress` is a reward.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRecord {
    from_address: Option<String>,
    to_address: String,
    amount: Amount,
    timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
}

impl From<WireRecord> for TransactionRecord {
    fn from(w: WireRecord) -> Self {
        match w.from_address {
            Some(from) => TransactionRecord::Transfer {
                from,
                to: w.to_address,
                amount: w.amount,
                timestamp: w.timestamp,
                signature: w.signature,
            },
            None => TransactionRecord::Reward {
                to: w.to_address,
                amount: w.amount,
                timestamp: w.timestamp,
            },
        }
    }
}

impl From<TransactionRecord> for WireRecord {
    fn from(tx: TransactionRecord) -> Self {
        match tx {
            TransactionRecord::Transfer {
                from,
                to,
                amount,
                timestamp,
                signature,
            } => WireRecord {
                from_address: Some(from),
                to_address: to,
                amount,
                timestamp,
                signature,
            },
            TransactionRecord::Reward {
                to,
                amount,
                timestamp,
            } => WireRecord {
                from_address: None,
                to_address: to,
                amount,
                timestamp,
                signature: None,
            },
        }
    }
}

impl TransactionRecord {
    /// Build an unsigned transfer stamped with the current time.
    pub fn transfer(from: impl Into<String>, to: impl Into<String>, amount: Amount) -> Self {
        TransactionRecord::Transfer {
            from: from.into(),
            to: to.into(),
            amount,
            timestamp: Utc::now().timestamp_millis(),
            signature: None,
        }
    }

    /// Build a reward paid to `to`.
    pub fn reward(to: impl Into<String>, amount: Amount) -> Self {
        TransactionRecord::Reward {
            to: to.into(),
            amount,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn from_address(&self) -> Option<&str> {
        match self {
            TransactionRecord::Transfer { from, .. } => Some(from),
            TransactionRecord::Reward { .. } => None,
        }
    }

    pub fn to_address(&self) -> &str {
        match self {
            TransactionRecord::Transfer { to, .. } | TransactionRecord::Reward { to, .. } => to,
        }
    }

    pub fn amount(&self) -> Amount {
        match self {
            TransactionRecord::Transfer { amount, .. } | TransactionRecord::Reward { amount, .. } => {
                *amount
            }
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            TransactionRecord::Transfer { timestamp, .. }
            | TransactionRecord::Reward { timestamp, .. } => *timestamp,
        }
    }

    pub fn signature(&self) -> Option<&str> {
        match self {
            TransactionRecord::Transfer { signature, .. } => signature.as_deref(),
            TransactionRecord::Reward { .. } => None,
        }
    }

    pub fn is_reward(&self) -> bool {
        matches!(self, TransactionRecord::Reward { .. })
    }

    /// Canonical payload: sorted-key JSON of (from, to, amount, timestamp).
    /// Signatures are never part of it.
    pub fn signing_payload(&self) -> Vec<u8> {
        let payload = serde_json::json!({
            "from": self.from_address(),
            "to": self.to_address(),
            "amount": self.amount(),
            "timestamp": self.timestamp(),
        });
        payload.to_string().into_bytes()
    }

    /// SHA-256 of the canonical payload.
    pub fn sighash(&self) -> [u8; 32] {
        Sha256::digest(self.signing_payload()).into()
    }

    /// Identity digest used for lookup by hash.
    pub fn calculate_hash(&self) -> String {
        hex::encode(self.sighash())
    }

    /// Sign a transfer with the sender's private key. The key must own `from`.
    pub fn sign(&mut self, private_key_hex: &str) -> Result<()> {
        let digest = self.sighash();
        let TransactionRecord::Transfer {
            from, signature, ..
        } = self
        else {
            return Err(LedgerError::InvalidTransaction(
                "reward records carry no signature".into(),
            ));
        };

        let owner = address_of(private_key_hex)?;
        if normalize_address(from).as_deref() != Some(owner.as_str()) {
            return Err(LedgerError::InvalidKey(
                "key does not belong to the sending address".into(),
            ));
        }

        *signature = Some(sign_digest_hex(private_key_hex, digest)?);
        Ok(())
    }

    /// Structural and cryptographic check with the rejection reason.
    pub fn validate(&self) -> Result<()> {
        if self.amount() == 0 {
            return Err(LedgerError::InvalidTransaction(
                "amount must be positive".into(),
            ));
        }
        if self.to_address().trim().is_empty() {
            return Err(LedgerError::InvalidTransaction("missing recipient".into()));
        }

        match self {
            TransactionRecord::Reward { .. } => Ok(()),
            TransactionRecord::Transfer {
                from, signature, ..
            } => {
                if normalize_address(from).is_none() {
                    return Err(LedgerError::InvalidTransaction(
                        "malformed sender address".into(),
                    ));
                }
                let sig = signature
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| LedgerError::InvalidTransaction("missing signature".into()))?;
                if !verify_signature_hex(from, sig, self.sighash()) {
                    return Err(LedgerError::InvalidTransaction(
                        "signature does not match sender".into(),
                    ));
                }
                Ok(())
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::generate_keypair;

    fn signed(amount: Amount) -> (TransactionRecord, String) {
        let alice = generate_keypair();
        let mut tx = TransactionRecord::transfer(&alice.address, "bob", amount);
        tx.sign(&alice.private_key).unwrap();
        (tx, alice.private_key)
    }

    #[test]
    fn signed_transfer_is_valid() {
        let (tx, _) = signed(40);
        assert!(tx.is_valid());
    }

    #[test]
    fn unsigned_transfer_is_invalid() {
        let alice = generate_keypair();
        let tx = TransactionRecord::transfer(&alice.address, "bob", 5);
        assert_eq!(
            tx.validate(),
            Err(LedgerError::InvalidTransaction("missing signature".into()))
        );
    }

    #[test]
    fn reward_needs_no_signature() {
        let tx = TransactionRecord::reward("miner", 10);
        assert!(tx.is_valid());
        assert!(tx.signature().is_none());
    }

    #[test]
    fn zero_amount_is_invalid() {
        assert!(!TransactionRecord::reward("miner", 0).is_valid());
    }

    #[test]
    fn signing_with_foreign_key_fails() {
        let alice = generate_keypair();
        let mallory = generate_keypair();
        let mut tx = TransactionRecord::transfer(&alice.address, "bob", 5);
        let err = tx.sign(&mallory.private_key).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidKey(_)));
        assert!(tx.signature().is_none());
    }

    #[test]
    fn tampering_amount_breaks_signature() {
        let (tx, _) = signed(40);
        let TransactionRecord::Transfer {
            from,
            to,
            timestamp,
            signature,
            ..
        } = tx
        else {
            unreachable!()
        };
        let forged = TransactionRecord::Transfer {
            from,
            to,
            amount: 4000,
            timestamp,
            signature,
        };
        assert!(!forged.is_valid());
    }

    #[test]
    fn wire_format_uses_nullable_sender() {
        let reward = TransactionRecord::reward("miner", 10);
        let json = serde_json::to_value(&reward).unwrap();
        assert!(json["fromAddress"].is_null());
        assert_eq!(json["toAddress"], "miner");

        let (tx, _) = signed(3);
        let text = serde_json::to_string(&tx).unwrap();
        let back: TransactionRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back, tx);
        assert!(back.is_valid());
    }

    #[test]
    fn hash_ignores_signature() {
        let alice = generate_keypair();
        let mut tx = TransactionRecord::transfer(&alice.address, "bob", 5);
        let before = tx.calculate_hash();
        tx.sign(&alice.private_key).unwrap();
        assert_eq!(before, tx.calculate_hash());
    }
}
