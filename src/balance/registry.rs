use serde::Serialize;
use std::collections::HashMap;

use crate::blockchain::Block;
use crate::transaction::{Balance, Timestamp, TransactionRecord};

/// One balance movement seen by an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub tx_hash: String,
    pub block_index: u64,
    /// Signed change applied to the balance (negative for sends).
    pub delta: Balance,
    /// The other side of a transfer; `None` for rewards.
    pub counterparty: Option<String>,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountEntry {
    pub address: String,
    pub balance: Balance,
    pub created_at: Timestamp,
    pub last_active: Timestamp,
    pub history: Vec<HistoryEntry>,
    #[serde(skip)]
    pub private_key: Option<String>,
}

impl AccountEntry {
    fn new(address: &str, created_at: Timestamp) -> Self {
        Self {
            address: address.to_string(),
            balance: 0,
            created_at,
            last_active: created_at,
            history: Vec::new(),
            private_key: None,
        }
    }
}

/// Per-address projection of the chain.
///
/// This is a cache: the chain is the record of truth and every cached
/// balance must equal a fold of the chain from genesis. It is advanced one
/// block at a time with [`BalanceRegistry::apply_block`] and recomputed
/// wholesale with [`BalanceRegistry::rebuild`] whenever the chain is replaced.
/// Key associations and creation times are registry-local and survive a
/// rebuild; balances and history do not.
#[derive(Debug, Default)]
pub struct BalanceRegistry {
    map: HashMap<String, AccountEntry>,
}

impl BalanceRegistry {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Seed an entry for `address`. Returns `false` if it already exists.
    pub fn register(
        &mut self,
        address: &str,
        balance: Balance,
        private_key: Option<String>,
        now: Timestamp,
    ) -> bool {
        if self.map.contains_key(address) {
            return false;
        }
        let mut entry = AccountEntry::new(address, now);
        entry.balance = balance;
        entry.private_key = private_key;
        self.map.insert(address.to_string(), entry);
        true
    }

    /// Drop an address from the cache. The chain is untouched, so the
    /// address comes back with its chain balance on the next replay or the
    /// next block that mentions it.
    pub fn deregister(&mut self, address: &str) -> Option<AccountEntry> {
        self.map.remove(address)
    }

    pub fn get(&self, address: &str) -> Option<&AccountEntry> {
        self.map.get(address)
    }

    pub fn balance_of(&self, address: &str) -> Option<Balance> {
        self.map.get(address).map(|e| e.balance)
    }

    pub fn private_key(&self, address: &str) -> Option<&str> {
        self.map.get(address).and_then(|e| e.private_key.as_deref())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccountEntry> {
        self.map.values()
    }

    pub fn total_balance(&self) -> Balance {
        self.map.values().map(|e| e.balance).sum()
    }

    /// Entries whose last activity is at or after `since`.
    pub fn active_since(&self, since: Timestamp) -> Vec<&AccountEntry> {
        self.map.values().filter(|e| e.last_active >= since).collect()
    }

    fn entry_mut(&mut self, address: &str, ts: Timestamp) -> &mut AccountEntry {
        self.map
            .entry(address.to_string())
            .or_insert_with(|| AccountEntry::new(address, ts))
    }

    /// Advance the projection by one accepted block.
    pub fn apply_block(&mut self, block: &Block) {
        for tx in &block.transactions {
            let tx_hash = tx.calculate_hash();
            let amount = Balance::from(tx.amount());
            let to = tx.to_address();

            if let TransactionRecord::Transfer { from, .. } = tx {
                let sender = self.entry_mut(from, block.timestamp);
                sender.balance -= amount;
                sender.last_active = sender.last_active.max(block.timestamp);
                sender.history.push(HistoryEntry {
                    tx_hash: tx_hash.clone(),
                    block_index: block.index,
                    delta: -amount,
                    counterparty: Some(to.to_string()),
                    timestamp: tx.timestamp(),
                });
            }

            let counterparty = tx.from_address().map(str::to_string);
            let recipient = self.entry_mut(to, block.timestamp);
            recipient.balance += amount;
            recipient.last_active = recipient.last_active.max(block.timestamp);
            recipient.history.push(HistoryEntry {
                tx_hash,
                block_index: block.index,
                delta: amount,
                counterparty,
                timestamp: tx.timestamp(),
            });
        }
    }

    /// Recompute every balance by folding `chain` from genesis.
    pub fn rebuild(&mut self, chain: &[Block]) {
        for entry in self.map.values_mut() {
            entry.balance = 0;
            entry.history.clear();
            entry.last_active = entry.created_at;
        }
        for block in chain {
            self.apply_block(block);
        }
    }
}
