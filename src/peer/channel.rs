use futures::future::join_all;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, RwLock};

use super::message::PeerMessage;
use crate::blockchain::{Block, Ledger};
use crate::error::{LedgerError, PeerError};

/// Path every node serves inbound wire messages on.
pub const MESSAGE_PATH: &str = "/api/v1/peers/message/";
/// Path every node serves its full chain on.
pub const CHAIN_PATH: &str = "/api/v1/chain/";

/// Outcome of one delivery attempt. Broadcast returns one per peer.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReport {
    pub peer: String,
    pub delivered: bool,
    pub status: Option<u16>,
    pub error: Option<String>,
}

/// What the receiving side did with an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Queued(String),
    Rejected(LedgerError),
    Malformed(String),
    Alert(String),
    Dropped,
}

/// Result of [`PeerChannel::connect`].
#[derive(Debug, Clone, Serialize)]
pub struct ConnectReport {
    pub peer: String,
    pub chain_adopted: bool,
    pub sync_error: Option<String>,
    pub announcements: Vec<DeliveryReport>,
}

#[derive(Deserialize)]
struct RemoteChain {
    chain: Vec<Block>,
}

/// Best-effort, at-most-once propagation to a list of HTTP peers.
pub struct PeerChannel {
    node_name: String,
    peers: RwLock<Vec<String>>,
    client: reqwest::Client,
}

fn normalize(peer: &str) -> String {
    peer.trim().trim_end_matches('/').to_string()
}

impl PeerChannel {
    pub fn new(node_name: impl Into<String>, peers: Vec<String>) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(peers.len());
        for p in peers.iter().map(|p| normalize(p)).filter(|p| !p.is_empty()) {
            if !unique.contains(&p) {
                unique.push(p);
            }
        }
        Self {
            node_name: node_name.into(),
            peers: RwLock::new(unique),
            client: reqwest::Client::new(),
        }
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn peers(&self) -> Vec<String> {
        self.peers.read().expect("peer list poisoned").clone()
    }

    /// Remember a peer. Returns `false` if it was already known.
    pub fn add_peer(&self, peer: &str) -> bool {
        let peer = normalize(peer);
        if peer.is_empty() {
            return false;
        }
        let mut peers = self.peers.write().expect("peer list poisoned");
        if peers.contains(&peer) {
            return false;
        }
        peers.push(peer);
        true
    }

    /// Apply an inbound wire message to `ledger`. Transactions go through
    /// the normal admission path; unknown prefixes are logged and dropped.
    pub fn dispatch(&self, ledger: &mut Ledger, raw: &str) -> Inbound {
        match PeerMessage::decode(raw) {
            Ok(PeerMessage::Tx(tx)) => match ledger.add_transaction(tx) {
                Ok(hash) => {
                    info!("received transaction {hash} from network");
                    Inbound::Queued(hash)
                }
                Err(e) => {
                    warn!("rejected network transaction: {e}");
                    Inbound::Rejected(e)
                }
            },
            Ok(PeerMessage::Alert(text)) => {
                info!("ALERT: {text}");
                Inbound::Alert(text)
            }
            Err(PeerError::UnknownPrefix(head)) => {
                debug!("dropping message with unknown prefix: {head:?}");
                Inbound::Dropped
            }
            Err(e) => {
                warn!("failed to handle message: {e}");
                Inbound::Malformed(e.to_string())
            }
        }
    }

    async fn send_to(&self, peer: &str, body: String) -> Result<u16, PeerError> {
        let resp = self
            .client
            .post(format!("{peer}{MESSAGE_PATH}"))
            .header("content-type", "text/plain")
            .body(body)
            .send()
            .await
            .map_err(|source| PeerError::Unreachable {
                peer: peer.to_string(),
                source,
            })?;
        Ok(resp.status().as_u16())
    }

    /// Send `msg` to every known peer concurrently. A failure on one peer
    /// never affects the others.
    pub async fn broadcast(&self, msg: &PeerMessage) -> Vec<DeliveryReport> {
        let body = msg.encode();
        let peers = self.peers();
        let sends = peers.iter().map(|peer| {
            let body = body.clone();
            async move {
                match self.send_to(peer, body).await {
                    Ok(status) => DeliveryReport {
                        peer: peer.clone(),
                        delivered: true,
                        status: Some(status),
                        error: None,
                    },
                    Err(e) => {
                        warn!("broadcast to {peer} failed: {e}");
                        DeliveryReport {
                            peer: peer.clone(),
                            delivered: false,
                            status: None,
                            error: Some(e.to_string()),
                        }
                    }
                }
            }
        });
        let reports = join_all(sends).await;
        debug!(
            "broadcast reached {}/{} peers",
            reports.iter().filter(|r| r.delivered).count(),
            reports.len()
        );
        reports
    }

    pub async fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>, PeerError> {
        let peer = normalize(peer);
        let resp = self
            .client
            .get(format!("{peer}{CHAIN_PATH}"))
            .send()
            .await
            .map_err(|source| PeerError::Unreachable {
                peer: peer.clone(),
                source,
            })?;
        if !resp.status().is_success() {
            return Err(PeerError::BadStatus {
                peer,
                status: resp.status().as_u16(),
            });
        }
        let remote: RemoteChain = resp
            .json()
            .await
            .map_err(|source| PeerError::Unreachable {
                peer: peer.clone(),
                source,
            })?;
        Ok(remote.chain)
    }

    /// Register `peer`, reconcile with its chain, then announce ourselves.
    /// The ledger lock is only taken around the replacement itself.
    pub async fn connect(&self, ledger: &Mutex<Ledger>, peer: &str) -> ConnectReport {
        let peer = normalize(peer);
        self.add_peer(&peer);

        let (chain_adopted, sync_error) = match self.fetch_chain(&peer).await {
            Ok(candidate) => {
                let mut ledger = ledger.lock().expect("mutex poisoned");
                match ledger.replace_chain(candidate) {
                    Ok(()) => (true, None),
                    Err(e) => {
                        debug!("kept local chain after syncing with {peer}: {e}");
                        (false, Some(e.to_string()))
                    }
                }
            }
            Err(e) => {
                warn!("could not fetch chain from {peer}: {e}");
                (false, Some(e.to_string()))
            }
        };

        let announcements = self
            .broadcast(&PeerMessage::Alert(format!(
                "Node {} connected to the network",
                self.node_name
            )))
            .await;

        ConnectReport {
            peer,
            chain_adopted,
            sync_error,
            announcements,
        }
    }
}
