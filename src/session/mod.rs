//! PeerLink - Session layer
//!
//! Ties transport, crypto and access control into one peer-to-peer session:
//!
//! - [`Handshake`]: HS1 / HS2 / HS_ACK state machine
//! - [`SessionState`]: receive-path dispatcher and owner of the session keys
//! - [`HolePuncher`]: periodic NAT keepalive
//! - [`SessionCache`]: non-secret metadata file, reset on teardown
//! - [`run_session`]: blocking entry point running all of the above

mod cache;
mod handshake;
mod lifecycle;
mod punch;
mod retry;
mod state;

pub use cache::*;
pub use handshake::*;
pub use lifecycle::*;
pub use punch::*;
pub use retry::*;
pub use state::*;
