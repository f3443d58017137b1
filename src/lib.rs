//! Proof-of-work ledger node: signed transfers and rewards, a pending queue,
//! a longest-valid-chain ledger with a balance cache, and HTTP peer gossip.

pub mod api;
pub mod balance;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod peer;
pub mod transaction;
pub mod wallet;
