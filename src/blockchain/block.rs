use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::GENESIS_TIMESTAMP;
use crate::error::{LedgerError, Result};
use crate::transaction::{Timestamp, TransactionRecord};

/// How many nonces to try between two looks at the cancellation flag.
const CANCEL_POLL_INTERVAL: u64 = 1024;

/// A single block in the chain holding an ordered list of transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    pub timestamp: Timestamp,
    pub transactions: Vec<TransactionRecord>,
    pub previous_hash: String,
    pub nonce: u64,
    pub difficulty: u32,
    pub hash: String,
}

impl Block {
    /// The genesis block. Every field is fixed so that chains produced by
    /// independent processes share the same root.
    pub fn genesis() -> Self {
        let mut block = Self {
            index: 0,
            timestamp: GENESIS_TIMESTAMP,
            transactions: Vec::new(),
            previous_hash: String::from("0"),
            nonce: 0,
            difficulty: 0,
            hash: String::new(),
        };
        block.hash = block.calculate_hash();
        block
    }

    /// Create a new block (not mined yet). Call `mine()` to perform PoW.
    pub fn new(
        index: u64,
        previous_hash: String,
        transactions: Vec<TransactionRecord>,
        difficulty: u32,
    ) -> Self {
        Self::new_with_timestamp(
            index,
            previous_hash,
            transactions,
            difficulty,
            Utc::now().timestamp_millis(),
        )
    }

    pub fn new_with_timestamp(
        index: u64,
        previous_hash: String,
        transactions: Vec<TransactionRecord>,
        difficulty: u32,
        timestamp: Timestamp,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp,
            transactions,
            previous_hash,
            nonce: 0,
            difficulty,
            hash: String::new(),
        };
        block.hash = block.calculate_hash();
        block
    }

    /// SHA-256 over every field except `hash` itself. Transactions are
    /// serialized as JSON in inclusion order.
    pub fn calculate_hash(&self) -> String {
        // Serializing plain strings and integers cannot fail.
        let txs_json = serde_json::to_string(&self.transactions).unwrap_or_default();
        let preimage = format!(
            "{}:{}:{}:{}:{}:{}",
            self.index, self.timestamp, self.previous_hash, self.nonce, self.difficulty, txs_json
        );
        hex::encode(Sha256::digest(preimage.as_bytes()))
    }

    /// Proof-of-work: walk nonces upward from 0 until the hash has
    /// `difficulty` leading zero hex digits. Unbounded.
    pub fn mine(&mut self, difficulty: u32) {
        self.difficulty = difficulty;
        self.nonce = 0;
        loop {
            self.hash = self.calculate_hash();
            if hash_meets_difficulty(&self.hash, difficulty) {
                break;
            }
            self.nonce = self.nonce.wrapping_add(1);
        }
    }

    /// Same search order as [`Block::mine`], but gives up once `cancel` is
    /// raised.
    pub fn mine_cancellable(&mut self, difficulty: u32, cancel: &AtomicBool) -> Result<()> {
        self.difficulty = difficulty;
        self.nonce = 0;
        loop {
            if self.nonce % CANCEL_POLL_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
                return Err(LedgerError::MiningFailed(format!(
                    "cancelled at nonce {}",
                    self.nonce
                )));
            }
            self.hash = self.calculate_hash();
            if hash_meets_difficulty(&self.hash, difficulty) {
                return Ok(());
            }
            self.nonce = self.nonce.checked_add(1).ok_or_else(|| {
                LedgerError::MiningFailed("nonce space exhausted".into())
            })?;
        }
    }

    pub fn meets_difficulty(&self) -> bool {
        hash_meets_difficulty(&self.hash, self.difficulty)
    }

    pub fn has_valid_transactions(&self) -> bool {
        self.transactions.iter().all(TransactionRecord::is_valid)
    }

    /// Self-contained checks: cached hash, PoW, and every transaction.
    /// Linkage is the chain's business.
    pub fn validate(&self) -> Result<()> {
        if self.hash != self.calculate_hash() {
            return Err(LedgerError::InvalidBlock(format!(
                "hash mismatch on block #{}",
                self.index
            )));
        }
        if !self.meets_difficulty() {
            return Err(LedgerError::InvalidBlock(format!(
                "block #{} does not meet difficulty {}",
                self.index, self.difficulty
            )));
        }
        for tx in &self.transactions {
            tx.validate().map_err(|e| {
                LedgerError::InvalidBlock(format!(
                    "transaction {} in block #{}: {}",
                    tx.calculate_hash(),
                    self.index,
                    e
                ))
            })?;
        }
        Ok(())
    }
}

pub fn hash_meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let wanted = difficulty as usize;
    hash.len() >= wanted && hash.chars().take(wanted).all(|c| c == '0')
}
