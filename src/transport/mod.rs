//! PeerLink - Transport Layer
//!
//! This module owns everything that touches the wire:
//!
//! - **UDP socket**: [`PeerSocket`], a tokio UDP wrapper with bounded receive
//! - **Frame codec**: [`Frame`], strict encode/decode of the five frame kinds
//! - **Address discovery**: [`PublicIpLookup`] and [`discover_public_addr`]
//!
//! # Wire format
//!
//! ```text
//! HS1:<client_id>:<session_token_hex>:<dh_pub_b64>:<random_nonce_int>
//! HS2:<dh_pub_b64>
//! HS_ACK
//! PUNCH
//! MSG:<nonce_b64>:<ciphertext_b64>:<tag_b64>:<mac_b64>
//! ```

mod discovery;
mod frame;
mod socket;

pub use discovery::*;
pub use frame::*;
pub use socket::*;
