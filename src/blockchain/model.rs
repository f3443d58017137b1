use chrono::Utc;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;

use super::{Block, DIFF_MAX, DIFF_MIN};
use crate::balance::{AccountEntry, BalanceRegistry};
use crate::error::{LedgerError, Result};
use crate::transaction::{Amount, Balance, TransactionRecord};
use crate::wallet::address_of;

/// In-memory ledger: the chain of record, the pending queue and the balance
/// cache derived from the chain.
///
/// A process owns exactly one `Ledger` and serializes access to it; none of
/// the methods take internal locks.
#[derive(Debug)]
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<TransactionRecord>,
    difficulty: u32,
    mining_reward: Amount,
    registry: BalanceRegistry,
}

impl Ledger {
    /// Initialize a ledger holding only the genesis block.
    pub fn new(difficulty: u32, mining_reward: Amount) -> Self {
        let mut ledger = Self {
            chain: vec![Block::genesis()],
            pending: Vec::new(),
            difficulty: difficulty.clamp(DIFF_MIN, DIFF_MAX),
            mining_reward,
            registry: BalanceRegistry::new(),
        };
        ledger.registry.rebuild(&ledger.chain);
        ledger
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Affects future blocks only. Returns the difficulty actually applied.
    pub fn set_difficulty(&mut self, difficulty: u32) -> u32 {
        self.difficulty = difficulty.clamp(DIFF_MIN, DIFF_MAX);
        self.difficulty
    }

    pub fn mining_reward(&self) -> Amount {
        self.mining_reward
    }

    pub fn registry(&self) -> &BalanceRegistry {
        &self.registry
    }

    pub fn get_latest_block(&self) -> &Block {
        self.chain
            .last()
            .expect("ledger always holds at least the genesis block")
    }

    pub fn get_pending_transactions(&self) -> &[TransactionRecord] {
        &self.pending
    }

    pub fn get_block_by_index(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.chain.get(i))
    }

    pub fn get_block_by_hash(&self, hash: &str) -> Option<&Block> {
        self.chain.iter().find(|b| b.hash == hash)
    }

    /// Look a transaction up in the chain first, then in the pending queue.
    pub fn get_transaction_by_hash(&self, hash: &str) -> Option<&TransactionRecord> {
        self.chain
            .iter()
            .flat_map(|b| b.transactions.iter())
            .chain(self.pending.iter())
            .find(|tx| tx.calculate_hash() == hash)
    }

    /// Ground truth: fold the whole chain, debiting sends and crediting
    /// receipts of `address`.
    pub fn get_balance_of_address(&self, address: &str) -> Balance {
        let mut balance: Balance = 0;
        for tx in self.chain.iter().flat_map(|b| b.transactions.iter()) {
            if tx.from_address() == Some(address) {
                balance -= Balance::from(tx.amount());
            }
            if tx.to_address() == address {
                balance += Balance::from(tx.amount());
            }
        }
        balance
    }

    /// Sum of transfers from `address` still waiting in the queue.
    fn queued_debits(&self, address: &str) -> Balance {
        self.pending
            .iter()
            .filter(|tx| tx.from_address() == Some(address))
            .map(|tx| Balance::from(tx.amount()))
            .sum()
    }

    fn is_known(&self, hash: &str) -> bool {
        self.pending.iter().any(|tx| tx.calculate_hash() == hash)
            || self
                .chain
                .iter()
                .flat_map(|b| b.transactions.iter())
                .any(|tx| tx.calculate_hash() == hash)
    }

    /// Queue a transaction for the next block. Returns its hash.
    pub fn add_transaction(&mut self, tx: TransactionRecord) -> Result<String> {
        tx.validate()?;

        let hash = tx.calculate_hash();
        if self.is_known(&hash) {
            return Err(LedgerError::InvalidTransaction(format!(
                "transaction {hash} is already known"
            )));
        }

        if let Some(from) = tx.from_address() {
            let available = self.get_balance_of_address(from) - self.queued_debits(from);
            if available < Balance::from(tx.amount()) {
                warn!(
                    "rejected tx {} from {}: available {}, requested {}",
                    hash,
                    from,
                    available,
                    tx.amount()
                );
                return Err(LedgerError::InsufficientFunds {
                    available,
                    requested: tx.amount(),
                });
            }
        }

        self.pending.push(tx);
        debug!(
            "queued tx {} (pending size now {})",
            hash,
            self.pending.len()
        );
        Ok(hash)
    }

    /// Snapshot the pending queue plus a reward for `miner_address` into an
    /// unmined block on top of the current tip.
    pub fn prepare_block(&self, miner_address: &str) -> Result<Block> {
        let miner_address = miner_address.trim();
        if miner_address.is_empty() {
            return Err(LedgerError::MiningFailed("miner address required".into()));
        }

        // Block and reward are stamped strictly after the tip so back-to-back
        // rewards to one miner never share a hash.
        let tip = self.get_latest_block();
        let timestamp = Utc::now().timestamp_millis().max(tip.timestamp + 1);
        let reward = TransactionRecord::Reward {
            to: miner_address.to_string(),
            amount: self.mining_reward,
            timestamp,
        };

        let mut txs = Vec::with_capacity(self.pending.len() + 1);
        txs.extend(self.pending.iter().cloned());
        txs.push(reward);

        Ok(Block::new_with_timestamp(
            tip.index + 1,
            tip.hash.clone(),
            txs,
            self.difficulty,
            timestamp,
        ))
    }

    /// Append a block mined from [`Ledger::prepare_block`]. Only the
    /// transactions it contains leave the pending queue.
    pub fn commit_block(&mut self, block: Block) -> Result<&Block> {
        let tip = self.get_latest_block();
        if block.previous_hash != tip.hash || block.index != tip.index + 1 {
            return Err(LedgerError::MiningFailed(format!(
                "chain tip moved to #{} while mining block #{}",
                tip.index, block.index
            )));
        }
        if block.difficulty < DIFF_MIN {
            return Err(LedgerError::InvalidBlock(format!(
                "difficulty {} below minimum {}",
                block.difficulty, DIFF_MIN
            )));
        }
        block.validate()?;

        let included: HashSet<String> = block
            .transactions
            .iter()
            .map(TransactionRecord::calculate_hash)
            .collect();
        let before = self.pending.len();
        self.pending
            .retain(|tx| !included.contains(&tx.calculate_hash()));
        debug!(
            "pending cleaned: {} -> {} (removed {})",
            before,
            self.pending.len(),
            before.saturating_sub(self.pending.len())
        );

        // Addresses missing from the cache (never seen, or deregistered) are
        // seeded from the chain before the block moves them.
        for tx in &block.transactions {
            for address in tx.from_address().into_iter().chain([tx.to_address()]) {
                if self.registry.get(address).is_none() {
                    let balance = self.get_balance_of_address(address);
                    self.registry
                        .register(address, balance, None, block.timestamp);
                }
            }
        }
        self.registry.apply_block(&block);
        info!(
            "sealed block #{} (hash={}, nonce={}, txs={})",
            block.index,
            block.hash,
            block.nonce,
            block.transactions.len()
        );
        self.chain.push(block);
        Ok(self.get_latest_block())
    }

    /// Mine everything pending into one block paying `miner_address`.
    pub fn mine_pending_transactions(&mut self, miner_address: &str) -> Result<Block> {
        let mut block = self.prepare_block(miner_address)?;
        block.mine(self.difficulty);
        self.commit_block(block).cloned()
    }

    pub fn mine_pending_transactions_cancellable(
        &mut self,
        miner_address: &str,
        cancel: &AtomicBool,
    ) -> Result<Block> {
        let mut block = self.prepare_block(miner_address)?;
        block.mine_cancellable(self.difficulty, cancel)?;
        self.commit_block(block).cloned()
    }

    /// Full structural check of a candidate chain.
    pub fn validate_chain(&self, candidate: &[Block]) -> Result<()> {
        let Some(genesis) = candidate.first() else {
            return Err(LedgerError::InvalidChain {
                index: 0,
                reason: "chain is empty".into(),
            });
        };
        if *genesis != self.chain[0] {
            return Err(LedgerError::InvalidChain {
                index: 0,
                reason: "genesis block differs".into(),
            });
        }

        for (i, pair) in candidate.windows(2).enumerate() {
            let (prev, current) = (&pair[0], &pair[1]);
            let index = i + 1;
            let fail = |reason: String| LedgerError::InvalidChain { index, reason };

            if current.index != index as u64 {
                return Err(fail(format!("index field is {}", current.index)));
            }
            if current.previous_hash != prev.hash {
                return Err(fail("previous hash does not link".into()));
            }
            if current.difficulty < DIFF_MIN {
                return Err(fail(format!(
                    "difficulty {} below minimum {}",
                    current.difficulty, DIFF_MIN
                )));
            }
            current.validate().map_err(|e| fail(e.to_string()))?;
        }
        Ok(())
    }

    pub fn is_chain_valid(&self, candidate: &[Block]) -> bool {
        self.validate_chain(candidate).is_ok()
    }

    /// Validate this ledger's own chain.
    pub fn is_valid(&self) -> bool {
        self.is_chain_valid(&self.chain)
    }

    /// Longest-valid-chain rule: adopt `candidate` only if it is valid and
    /// strictly longer. Ties keep the current chain.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> Result<()> {
        if candidate.len() <= self.chain.len() {
            return Err(LedgerError::ChainNotLonger {
                candidate: candidate.len(),
                current: self.chain.len(),
            });
        }
        self.validate_chain(&candidate)?;

        let included: HashSet<String> = candidate
            .iter()
            .flat_map(|b| b.transactions.iter())
            .map(TransactionRecord::calculate_hash)
            .collect();

        let old_len = self.chain.len();
        self.chain = candidate;
        self.registry.rebuild(&self.chain);

        // Re-admit what is left in FIFO order against the new chain.
        let stale = std::mem::take(&mut self.pending);
        for tx in stale {
            if included.contains(&tx.calculate_hash()) {
                continue;
            }
            if let Err(e) = self.add_transaction(tx) {
                warn!("dropped pending tx after chain replacement: {e}");
            }
        }

        info!(
            "replaced chain: {} -> {} blocks ({} pending remain)",
            old_len,
            self.chain.len(),
            self.pending.len()
        );
        Ok(())
    }

    /// Create a registry entry for `address` and, for a non-zero
    /// `initial_balance`, queue a funding reward so the seed becomes part of
    /// the chain with the next block.
    pub fn register_address(
        &mut self,
        address: &str,
        initial_balance: Amount,
        private_key: Option<String>,
    ) -> Result<()> {
        let address = address.trim();
        if address.is_empty() {
            return Err(LedgerError::InvalidTransaction("malformed address".into()));
        }
        if let Some(key) = private_key.as_deref() {
            if address_of(key)? != address.to_lowercase() {
                return Err(LedgerError::InvalidKey(
                    "key does not belong to the registered address".into(),
                ));
            }
        }
        if self.registry.get(address).is_some() {
            return Err(LedgerError::InvalidTransaction(format!(
                "address {address} is already registered"
            )));
        }

        if initial_balance > 0 {
            self.add_transaction(TransactionRecord::reward(address, initial_balance))?;
        }
        let chain_balance = self.get_balance_of_address(address);
        self.registry.register(
            address,
            chain_balance,
            private_key,
            Utc::now().timestamp_millis(),
        );
        info!("registered address {address} (initial funding {initial_balance})");
        Ok(())
    }

    /// Registry-only removal; the chain keeps every record.
    pub fn deregister_address(&mut self, address: &str) -> Option<AccountEntry> {
        let removed = self.registry.deregister(address);
        if removed.is_some() {
            info!("deregistered address {address}");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::{KeyPair, generate_keypair};

    const DIFF: u32 = 1;
    const REWARD: Amount = 10;

    fn ledger() -> Ledger {
        Ledger::new(DIFF, REWARD)
    }

    fn funded(ledger: &mut Ledger, amount: Amount) -> KeyPair {
        let kp = generate_keypair();
        ledger
            .add_transaction(TransactionRecord::reward(&kp.address, amount))
            .unwrap();
        ledger.mine_pending_transactions("faucet").unwrap();
        kp
    }

    fn pay(from: &KeyPair, to: &str, amount: Amount) -> TransactionRecord {
        let mut tx = TransactionRecord::transfer(&from.address, to, amount);
        tx.sign(&from.private_key).unwrap();
        tx
    }

    fn assert_cache_matches_replay(ledger: &Ledger) {
        for entry in ledger.registry().iter() {
            assert_eq!(
                entry.balance,
                ledger.get_balance_of_address(&entry.address),
                "cache drifted for {}",
                entry.address
            );
        }
    }

    #[test]
    fn starts_with_genesis_only() {
        let l = ledger();
        assert_eq!(l.len(), 1);
        assert_eq!(*l.get_latest_block(), Block::genesis());
        assert!(l.is_valid());
        assert!(l.get_pending_transactions().is_empty());
    }

    #[test]
    fn transfer_scenario_settles_balances() {
        let mut l = ledger();
        let a = funded(&mut l, 100);
        assert_eq!(l.get_balance_of_address(&a.address), 100);

        l.add_transaction(pay(&a, "B", 40)).unwrap();
        let block = l.mine_pending_transactions("M").unwrap();

        assert_eq!(block.index, 2);
        assert_eq!(l.get_balance_of_address(&a.address), 60);
        assert_eq!(l.get_balance_of_address("B"), 40);
        assert_eq!(l.get_balance_of_address("M"), 10);
        assert!(l.get_pending_transactions().is_empty());
        assert_cache_matches_replay(&l);
    }

    #[test]
    fn rejects_signature_from_other_key() {
        let mut l = ledger();
        let a = funded(&mut l, 100);
        let mallory = generate_keypair();

        let mut forged = TransactionRecord::transfer(&a.address, "B", 5);
        let sig = crate::wallet::sign_digest_hex(&mallory.private_key, forged.sighash()).unwrap();
        if let TransactionRecord::Transfer { signature, .. } = &mut forged {
            *signature = Some(sig);
        }

        assert!(matches!(
            l.add_transaction(forged),
            Err(LedgerError::InvalidTransaction(_))
        ));
        assert!(l.get_pending_transactions().is_empty());
    }

    #[test]
    fn queued_sends_count_against_balance() {
        let mut l = ledger();
        let a = funded(&mut l, 100);

        l.add_transaction(pay(&a, "B", 70)).unwrap();
        let err = l.add_transaction(pay(&a, "C", 40)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                available: 30,
                requested: 40
            }
        );
        l.add_transaction(pay(&a, "C", 30)).unwrap();
        assert_eq!(l.get_pending_transactions().len(), 2);
    }

    #[test]
    fn duplicate_submission_is_rejected() {
        let mut l = ledger();
        let a = funded(&mut l, 100);
        let tx = pay(&a, "B", 1);

        l.add_transaction(tx.clone()).unwrap();
        assert!(matches!(
            l.add_transaction(tx.clone()),
            Err(LedgerError::InvalidTransaction(_))
        ));
        l.mine_pending_transactions("M").unwrap();
        assert!(l.add_transaction(tx).is_err());
    }

    #[test]
    fn transactions_queued_after_snapshot_stay_pending() {
        let mut l = ledger();
        let a = funded(&mut l, 100);
        l.add_transaction(pay(&a, "B", 10)).unwrap();

        let mut block = l.prepare_block("M").unwrap();
        let late = pay(&a, "C", 5);
        l.add_transaction(late.clone()).unwrap();
        block.mine(l.difficulty());
        l.commit_block(block).unwrap();

        assert_eq!(l.get_pending_transactions(), &[late]);
        assert_eq!(l.get_balance_of_address("B"), 10);
    }

    #[test]
    fn commit_fails_when_tip_moved() {
        let mut l = ledger();
        let mut stale = l.prepare_block("M1").unwrap();
        l.mine_pending_transactions("M2").unwrap();
        stale.mine(l.difficulty());

        assert!(matches!(
            l.commit_block(stale),
            Err(LedgerError::MiningFailed(_))
        ));
        assert_eq!(l.len(), 2);
    }

    #[test]
    fn cancelled_mining_leaves_queue_untouched() {
        let mut l = Ledger::new(DIFF_MAX, REWARD);
        l.add_transaction(TransactionRecord::reward("x", 1)).unwrap();
        let cancel = AtomicBool::new(true);

        let err = l.mine_pending_transactions_cancellable("M", &cancel).unwrap_err();
        assert!(matches!(err, LedgerError::MiningFailed(_)));
        assert_eq!(l.len(), 1);
        assert_eq!(l.get_pending_transactions().len(), 1);
    }

    #[test]
    fn mined_chain_is_valid_and_tampering_is_detected() {
        let mut l = ledger();
        let a = funded(&mut l, 50);
        l.add_transaction(pay(&a, "B", 20)).unwrap();
        l.mine_pending_transactions("M").unwrap();
        assert!(l.is_valid());

        let mut amount_forged = l.chain().to_vec();
        if let TransactionRecord::Transfer { amount, .. } = &mut amount_forged[2].transactions[0] {
            *amount = 21;
        }
        assert!(!l.is_chain_valid(&amount_forged));

        let mut nonce_forged = l.chain().to_vec();
        nonce_forged[1].nonce += 1;
        assert!(!l.is_chain_valid(&nonce_forged));

        let mut relinked = l.chain().to_vec();
        relinked[2].previous_hash = "f".repeat(64);
        relinked[2].mine(DIFF);
        assert!(matches!(
            l.validate_chain(&relinked),
            Err(LedgerError::InvalidChain { index: 2, .. })
        ));

        let mut foreign_genesis = l.chain().to_vec();
        foreign_genesis[0].timestamp += 1;
        assert!(!l.is_chain_valid(&foreign_genesis));
    }

    #[test]
    fn rewards_are_the_only_source_of_value() {
        let mut l = ledger();
        let a = funded(&mut l, 100);
        let b = funded(&mut l, 30);
        l.add_transaction(pay(&a, &b.address, 25)).unwrap();
        l.add_transaction(pay(&b, "C", 20)).unwrap();
        l.mine_pending_transactions("M").unwrap();

        let issued: Balance = l
            .chain()
            .iter()
            .flat_map(|blk| blk.transactions.iter())
            .filter(|tx| tx.is_reward())
            .map(|tx| Balance::from(tx.amount()))
            .sum();

        let mut replay = BalanceRegistry::new();
        replay.rebuild(l.chain());
        assert_eq!(replay.total_balance(), issued);
        assert_eq!(l.registry().total_balance(), issued);
    }

    #[test]
    fn replace_chain_follows_longest_valid_rule() {
        let mut ours = ledger();
        let mut theirs = ledger();
        let a = funded(&mut theirs, 80);
        theirs.add_transaction(pay(&a, "B", 30)).unwrap();
        theirs.mine_pending_transactions("M").unwrap();

        ours.mine_pending_transactions("X").unwrap();
        ours.mine_pending_transactions("X").unwrap();
        ours.mine_pending_transactions("X").unwrap();

        // equal length: rejected even though valid
        assert_eq!(theirs.len(), 3);
        let equal: Vec<Block> = ours.chain()[..3].to_vec();
        let mut short = ledger();
        short.mine_pending_transactions("Y").unwrap();
        short.mine_pending_transactions("Y").unwrap();
        assert!(matches!(
            short.replace_chain(equal),
            Err(LedgerError::ChainNotLonger { .. })
        ));

        // shorter: rejected
        assert!(ours.replace_chain(theirs.chain().to_vec()).is_err());
        assert_eq!(ours.len(), 4);

        // strictly longer and valid: accepted
        theirs.mine_pending_transactions("M").unwrap();
        theirs.mine_pending_transactions("M").unwrap();
        ours.replace_chain(theirs.chain().to_vec()).unwrap();
        assert_eq!(ours.chain(), theirs.chain());
        assert_eq!(ours.get_balance_of_address("X"), 0);
        assert_eq!(ours.registry().balance_of("X"), Some(0));
        assert_eq!(ours.get_balance_of_address("B"), 30);
        assert_cache_matches_replay(&ours);
    }

    #[test]
    fn invalid_longer_chain_leaves_state_untouched() {
        let mut ours = ledger();
        ours.mine_pending_transactions("X").unwrap();

        let mut theirs = ledger();
        for _ in 0..3 {
            theirs.mine_pending_transactions("M").unwrap();
        }
        let mut forged = theirs.chain().to_vec();
        forged[2].transactions[0] = TransactionRecord::reward("M", 1_000_000);

        assert!(matches!(
            ours.replace_chain(forged),
            Err(LedgerError::InvalidChain { index: 2, .. })
        ));
        assert_eq!(ours.len(), 2);
        assert_eq!(ours.get_balance_of_address("X"), 10);
    }

    #[test]
    fn replacement_drops_now_included_pending() {
        let mut theirs = ledger();
        let a = funded(&mut theirs, 50);
        let tx = pay(&a, "B", 5);

        let mut ours = Ledger::new(DIFF, REWARD);
        ours.replace_chain(theirs.chain().to_vec()).unwrap();
        ours.add_transaction(tx.clone()).unwrap();

        theirs.add_transaction(tx).unwrap();
        theirs.mine_pending_transactions("M").unwrap();
        theirs.mine_pending_transactions("M").unwrap();

        ours.replace_chain(theirs.chain().to_vec()).unwrap();
        assert!(ours.get_pending_transactions().is_empty());
    }

    #[test]
    fn replacement_drops_pending_the_new_chain_cannot_fund() {
        let mut ours = ledger();
        let a = funded(&mut ours, 100);
        let overspend = pay(&a, "B", 100);
        ours.add_transaction(overspend).unwrap();
        let reward = TransactionRecord::reward("D", 3);
        ours.add_transaction(reward.clone()).unwrap();

        // A peer chain where `a` was never funded but is longer.
        let mut theirs = ledger();
        for _ in 0..4 {
            theirs.mine_pending_transactions("P").unwrap();
        }
        assert!(theirs.len() > ours.len());

        ours.replace_chain(theirs.chain().to_vec()).unwrap();
        assert_eq!(ours.get_pending_transactions(), &[reward]);

        ours.mine_pending_transactions("M").unwrap();
        assert_eq!(ours.get_balance_of_address(&a.address), 0);
        assert_eq!(ours.get_balance_of_address("B"), 0);
        assert_cache_matches_replay(&ours);
    }

    #[test]
    fn back_to_back_rewards_have_distinct_hashes() {
        let mut l = ledger();
        let blocks: Vec<Block> = (0..5)
            .map(|_| l.mine_pending_transactions("M").unwrap())
            .collect();

        let hashes: HashSet<String> = blocks
            .iter()
            .map(|b| b.transactions[0].calculate_hash())
            .collect();
        assert_eq!(hashes.len(), blocks.len());
        for (i, block) in blocks.iter().enumerate() {
            let hash = block.transactions[0].calculate_hash();
            assert_eq!(
                l.get_transaction_by_hash(&hash),
                Some(&block.transactions[0]),
                "block #{} reward resolved to another record",
                i + 1
            );
        }
        assert!(blocks.windows(2).all(|w| w[1].timestamp > w[0].timestamp));
        assert!(l.is_valid());
    }

    #[test]
    fn lookups_by_hash_and_index() {
        let mut l = ledger();
        let a = funded(&mut l, 10);
        let tx = pay(&a, "B", 3);
        let hash = l.add_transaction(tx.clone()).unwrap();
        assert_eq!(l.get_transaction_by_hash(&hash), Some(&tx));

        let block = l.mine_pending_transactions("M").unwrap();
        assert_eq!(l.get_block_by_hash(&block.hash), Some(&block));
        assert_eq!(l.get_block_by_index(2), Some(&block));
        assert!(l.get_block_by_index(3).is_none());
        assert_eq!(l.get_transaction_by_hash(&hash), Some(&tx));
        assert!(l.get_transaction_by_hash("nope").is_none());
    }

    #[test]
    fn seeded_address_is_funded_by_next_block() {
        let mut l = ledger();
        let kp = generate_keypair();
        l.register_address(&kp.address, 100, Some(kp.private_key.clone()))
            .unwrap();
        assert_eq!(l.registry().balance_of(&kp.address), Some(0));
        assert_eq!(l.registry().private_key(&kp.address), Some(kp.private_key.as_str()));

        l.mine_pending_transactions("M").unwrap();
        assert_eq!(l.registry().balance_of(&kp.address), Some(100));
        assert!(l.register_address(&kp.address, 5, None).is_err());
    }

    #[test]
    fn register_rejects_foreign_key() {
        let mut l = ledger();
        let a = generate_keypair();
        let b = generate_keypair();
        assert!(matches!(
            l.register_address(&a.address, 0, Some(b.private_key)),
            Err(LedgerError::InvalidKey(_))
        ));
    }

    #[test]
    fn deregistration_does_not_touch_the_chain() {
        let mut l = ledger();
        let a = funded(&mut l, 40);
        assert!(l.deregister_address(&a.address).is_some());
        assert!(l.registry().get(&a.address).is_none());
        assert_eq!(l.get_balance_of_address(&a.address), 40);
        assert!(l.is_valid());

        l.add_transaction(pay(&a, "B", 15)).unwrap();
        l.mine_pending_transactions("M").unwrap();
        assert_eq!(l.registry().balance_of(&a.address), Some(25));
    }

    #[test]
    fn difficulty_is_clamped() {
        let mut l = ledger();
        assert_eq!(l.set_difficulty(0), DIFF_MIN);
        assert_eq!(l.set_difficulty(99), DIFF_MAX);
        assert_eq!(Ledger::new(0, 1).difficulty(), DIFF_MIN);
    }
}
