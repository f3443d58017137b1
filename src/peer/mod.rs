pub mod channel;
pub mod message;

pub use channel::{ConnectReport, DeliveryReport, Inbound, PeerChannel};
pub use message::PeerMessage;
