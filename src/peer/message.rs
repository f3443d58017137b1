use crate::error::PeerError;
use crate::transaction::TransactionRecord;

pub const TX_PREFIX: &str = "TX:";
pub const ALERT_PREFIX: &str = "ALERT:";

/// One delivery on the peer wire. Prefixes are case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerMessage {
    /// `TX:{json}`: propose a transaction. Always re-validated by the receiver.
    Tx(TransactionRecord),
    /// `ALERT:{text}`: informational, no ledger effect.
    Alert(String),
}

impl PeerMessage {
    pub fn encode(&self) -> String {
        match self {
            // Plain strings and integers always serialize.
            PeerMessage::Tx(tx) => format!(
                "{TX_PREFIX}{}",
                serde_json::to_string(tx).unwrap_or_default()
            ),
            PeerMessage::Alert(text) => format!("{ALERT_PREFIX}{text}"),
        }
    }

    pub fn decode(raw: &str) -> Result<Self, PeerError> {
        if let Some(body) = raw.strip_prefix(TX_PREFIX) {
            let tx: TransactionRecord = serde_json::from_str(body)?;
            Ok(PeerMessage::Tx(tx))
        } else if let Some(text) = raw.strip_prefix(ALERT_PREFIX) {
            Ok(PeerMessage::Alert(text.to_string()))
        } else {
            let head: String = raw.chars().take(16).collect();
            Err(PeerError::UnknownPrefix(head))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_roundtrip() {
        let msg = PeerMessage::Alert("node-2 connected".into());
        assert_eq!(msg.encode(), "ALERT:node-2 connected");
        assert_eq!(PeerMessage::decode(&msg.encode()).unwrap(), msg);
    }

    #[test]
    fn tx_decodes_flat_record() {
        let raw = r#"TX:{"fromAddress":null,"toAddress":"miner","amount":10,"timestamp":5}"#;
        let PeerMessage::Tx(tx) = PeerMessage::decode(raw).unwrap() else {
            panic!("expected TX");
        };
        assert!(tx.is_reward());
        assert_eq!(tx.amount(), 10);
    }

    #[test]
    fn prefixes_are_case_sensitive() {
        assert!(matches!(
            PeerMessage::decode("tx:{}"),
            Err(PeerError::UnknownPrefix(_))
        ));
        assert!(matches!(
            PeerMessage::decode("PING"),
            Err(PeerError::UnknownPrefix(_))
        ));
    }

    #[test]
    fn negative_or_garbage_amount_is_malformed() {
        let raw = r#"TX:{"fromAddress":null,"toAddress":"m","amount":-3,"timestamp":5}"#;
        assert!(matches!(
            PeerMessage::decode(raw),
            Err(PeerError::MalformedTransaction(_))
        ));
        assert!(PeerMessage::decode("TX:not json").is_err());
    }
}
