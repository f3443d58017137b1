use crate::balance::HistoryEntry;
use crate::blockchain::{AddressStats, Block, ChainStats, Ledger};
use crate::config::NodeConfig;
use crate::peer::{DeliveryReport, PeerChannel};
use crate::transaction::{Amount, Balance, Timestamp, TransactionRecord};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Shared application state: the one ledger of this process, its peers and
/// one cancel flag per in-flight mine.
pub struct AppState {
    pub ledger: Mutex<Ledger>,
    pub peers: PeerChannel,
    mining: Mutex<Vec<Arc<AtomicBool>>>,
}

impl AppState {
    pub fn from_config(config: &NodeConfig) -> Self {
        Self {
            ledger: Mutex::new(Ledger::new(config.difficulty, config.mining_reward)),
            peers: PeerChannel::new(config.node_name.clone(), config.peers.clone()),
            mining: Mutex::new(Vec::new()),
        }
    }

    /// Register a new mine and hand back its own cancel flag.
    pub fn start_mining(&self) -> Arc<AtomicBool> {
        let flag = Arc::new(AtomicBool::new(false));
        self.mining
            .lock()
            .expect("mutex poisoned")
            .push(flag.clone());
        flag
    }

    pub fn finish_mining(&self, flag: &Arc<AtomicBool>) {
        self.mining
            .lock()
            .expect("mutex poisoned")
            .retain(|f| !Arc::ptr_eq(f, flag));
    }

    /// Raise the flag of every mine currently running. Returns how many.
    pub fn cancel_mining(&self) -> usize {
        let mining = self.mining.lock().expect("mutex poisoned");
        for flag in mining.iter() {
            flag.store(true, Ordering::Relaxed);
        }
        mining.len()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::from_config(&NodeConfig::default())
    }
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ChainResponse<'a> {
    pub length: usize,
    pub difficulty: u32,
    pub chain: &'a [Block],
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
    pub difficulty: u32,
}

#[derive(Deserialize)]
pub struct ReplaceChainRequest {
    pub chain: Vec<Block>,
}

#[derive(Serialize)]
pub struct ReplaceChainResponse {
    pub replaced: bool,
    pub length: usize,
}

#[derive(Deserialize)]
pub struct MineRequest {
    pub miner_address: String,
}

#[derive(Serialize)]
pub struct MineResponse {
    pub mined_index: u64,
    pub hash: String,
    pub nonce: u64,
    pub difficulty: u32,
    pub transactions: usize,
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub cancel_requested: bool,
    pub interrupted: usize,
}

#[derive(Serialize)]
pub struct DifficultyResponse {
    pub difficulty: u32,
}

#[derive(Deserialize)]
pub struct SetDifficultyRequest {
    pub difficulty: u32,
}

/* ---------- TX API Models ---------- */

#[derive(Serialize)]
pub struct NewTxResponse {
    pub hash: String,
}

#[derive(Deserialize)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    pub amount: Amount,
}

#[derive(Serialize)]
pub struct MempoolResponse<'a> {
    pub size: usize,
    pub transactions: &'a [TransactionRecord],
}

/* ---------- Balance / Account API Models ---------- */

#[derive(Serialize)]
pub struct BalanceResponse {
    pub address: String,
    /// Folded from the chain.
    pub balance: Balance,
    /// What the registry currently caches, if the address is registered.
    pub cached_balance: Option<Balance>,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub address: String,
    #[serde(default)]
    pub initial_balance: Amount,
    pub private_key: Option<String>,
}

#[derive(Serialize)]
pub struct AccountView<'a> {
    #[serde(flatten)]
    pub stats: AddressStats,
    pub cached_balance: Balance,
    pub created_at: Timestamp,
    pub history: &'a [HistoryEntry],
}

#[derive(Serialize)]
pub struct AccountsResponse<'a> {
    pub total: usize,
    pub active_last_hour: usize,
    pub total_balance: Balance,
    pub accounts: Vec<AccountView<'a>>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub chain: ChainStats,
    pub registered_addresses: usize,
    pub peers: usize,
}

/* ---------- Peer API Models ---------- */

#[derive(Deserialize)]
pub struct ConnectRequest {
    pub url: String,
}

#[derive(Deserialize)]
pub struct AlertRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct BroadcastResponse {
    pub reports: Vec<DeliveryReport>,
}

#[derive(Serialize)]
pub struct InboundResponse {
    pub outcome: &'static str,
    pub detail: Option<String>,
}

#[derive(Serialize)]
pub struct PeersResponse {
    pub node_name: String,
    pub peers: Vec<String>,
}
