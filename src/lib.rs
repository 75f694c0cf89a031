//! # PeerLink
//!
//! Direct, encrypted, peer-to-peer text chat between two hosts behind NATs,
//! over raw UDP and without a relay server.
//!
//! - **Rendezvous**: the host shares a 16-digit session code and its public
//!   address out of band; only the SHA-256 of the code goes on the wire
//! - **NAT traversal**: both sides punch keepalive datagrams at each other
//! - **Key exchange**: fresh X25519 keys per session, split with HKDF-SHA256
//! - **Channel**: XChaCha20-Poly1305 inside an HMAC-SHA256 envelope
//! - **Abuse mitigation**: allow-listed client ids, per-IP bans, and a
//!   guardian that pins the session to the first authenticated peer
//!
//! ## Feature Flags
//!
//! - `discovery` (default): public address lookup over HTTP
//!
//! ## Modules
//!
//! - [`core`]: constants, configuration, and error types
//! - [`transport`]: UDP socket, frame codec, address discovery
//! - [`crypto`]: key exchange, session token, secure channel
//! - [`guard`]: allow list, ban table, peer guardian
//! - [`session`]: handshake, receive dispatcher, lifecycle
//! - [`identity`]: client identifiers
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::io::{self, BufReader};
//!
//! use peerlink::prelude::*;
//!
//! fn main() -> Result<(), SessionError> {
//!     let config = SessionConfig::default().apply_env()?;
//!     let report = run_session(
//!         RoleSelection::host(),
//!         SessionEnv::new(config),
//!         BufReader::new(io::stdin()),
//!         io::stdout(),
//!     )?;
//!     eprintln!("exchanged {} messages", report.messages_sent + report.messages_received);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod core;
pub mod crypto;
pub mod guard;
pub mod identity;
pub mod session;
pub mod transport;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;
    pub use crate::crypto::*;
    pub use crate::guard::*;
    pub use crate::identity::*;
    pub use crate::session::*;
    pub use crate::transport::*;
}

// Re-export commonly used items at crate root
pub use core::{SessionConfig, SessionError};
pub use session::{RoleSelection, SessionEnv, SessionReport, run_session};
