//! PeerLink - Security Layer
//!
//! Implements the cryptographic primitives for PeerLink:
//! - Ephemeral X25519 key exchange, one keypair per session
//! - HKDF-SHA256 split into an AEAD key and a MAC key
//! - Session code and the token derived from it
//! - Secure channel: XChaCha20-Poly1305 plus an outer HMAC-SHA256

mod channel;
mod keys;
mod token;

pub use channel::*;
pub use keys::*;
pub use token::*;
