pub mod model;

pub use model::TransactionRecord;

/// Transferred value. Always strictly positive inside a valid record.
pub type Amount = u64;

/// Signed running total. A chain accepted from a peer is not checked for
/// overspend, so folded balances may go negative.
pub type Balance = i128;

/// Milliseconds since the Unix epoch (UTC).
pub type Timestamp = i64;
