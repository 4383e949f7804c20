//! UDP multicast transport for status messages.

pub mod listener;
pub mod sender;

pub use listener::{Datagram, MulticastListener};
pub use sender::MulticastSender;

/// Largest payload a single IPv4 UDP datagram can carry.
pub const MAX_DATAGRAM: usize = 65_507;
