pub mod registry;

pub use registry::{AccountEntry, BalanceRegistry, HistoryEntry};
