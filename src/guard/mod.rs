//! PeerLink - Abuse mitigation
//!
//! - [`AccessControl`]: allow list, token check, and per-IP bans for handshakes
//! - [`PeerGuardian`]: locks the session to one peer once authenticated

mod access;
mod guardian;

pub use access::*;
pub use guardian::*;
