use serde::Serialize;
use std::collections::HashMap;

use super::{Block, Ledger, TOP_MINERS};
use crate::transaction::{Amount, Balance, Timestamp, TransactionRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinerCount {
    pub address: String,
    pub blocks: usize,
}

/// Chain-wide figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainStats {
    pub total_blocks: usize,
    pub pending_transactions: usize,
    pub difficulty: u32,
    pub mining_reward: Amount,
    /// Mean gap between consecutive mined blocks; genesis is excluded
    /// because its timestamp is fixed.
    pub average_block_time_ms: Option<f64>,
    pub total_transactions: usize,
    pub transaction_volume: u128,
    pub total_rewards: u128,
    pub top_miners: Vec<MinerCount>,
}

/// Per-address activity, computed from the chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressStats {
    pub address: String,
    pub balance: Balance,
    pub sent_transactions: usize,
    pub received_transactions: usize,
    pub mined_blocks: usize,
    pub last_active: Option<Timestamp>,
}

/// The miner of a block is the recipient of its closing reward.
fn miner_of(block: &Block) -> Option<&str> {
    match block.transactions.last() {
        Some(TransactionRecord::Reward { to, .. }) => Some(to),
        _ => None,
    }
}

impl Ledger {
    pub fn stats(&self) -> ChainStats {
        let chain = self.chain();

        let mined = chain.get(1..).unwrap_or_default();
        let average_block_time_ms = if mined.len() >= 2 {
            let total: i64 = mined
                .windows(2)
                .map(|w| (w[1].timestamp - w[0].timestamp).max(0))
                .sum();
            Some(total as f64 / (mined.len() - 1) as f64)
        } else {
            None
        };

        let txs = chain.iter().flat_map(|b| b.transactions.iter());
        let (mut total_transactions, mut transaction_volume, mut total_rewards) = (0, 0u128, 0u128);
        for tx in txs {
            total_transactions += 1;
            transaction_volume += u128::from(tx.amount());
            if tx.is_reward() {
                total_rewards += u128::from(tx.amount());
            }
        }

        let mut per_miner: HashMap<&str, usize> = HashMap::new();
        for miner in chain.iter().filter_map(miner_of) {
            *per_miner.entry(miner).or_default() += 1;
        }
        let mut top_miners: Vec<MinerCount> = per_miner
            .into_iter()
            .map(|(address, blocks)| MinerCount {
                address: address.to_string(),
                blocks,
            })
            .collect();
        top_miners.sort_by(|a, b| b.blocks.cmp(&a.blocks).then_with(|| a.address.cmp(&b.address)));
        top_miners.truncate(TOP_MINERS);

        ChainStats {
            total_blocks: chain.len(),
            pending_transactions: self.get_pending_transactions().len(),
            difficulty: self.difficulty(),
            mining_reward: self.mining_reward(),
            average_block_time_ms,
            total_transactions,
            transaction_volume,
            total_rewards,
            top_miners,
        }
    }

    pub fn address_stats(&self, address: &str) -> AddressStats {
        let mut sent = 0usize;
        let mut received = 0usize;
        let mut last_seen: Option<Timestamp> = None;
        for block in self.chain() {
            for tx in &block.transactions {
                let is_sender = tx.from_address() == Some(address);
                let is_recipient = tx.to_address() == address;
                sent += usize::from(is_sender);
                received += usize::from(is_recipient);
                if is_sender || is_recipient {
                    last_seen = Some(block.timestamp);
                }
            }
        }

        let mined_blocks = self
            .chain()
            .iter()
            .filter(|b| miner_of(b) == Some(address))
            .count();
        let last_active = self
            .registry()
            .get(address)
            .map(|e| e.last_active)
            .max(last_seen);

        AddressStats {
            address: address.to_string(),
            balance: self.get_balance_of_address(address),
            sent_transactions: sent,
            received_transactions: received,
            mined_blocks,
            last_active,
        }
    }
}
