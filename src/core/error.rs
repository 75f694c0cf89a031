//! Error types for PeerLink.

use std::io;

use thiserror::Error;

use super::config::ConfigError;

/// Errors produced while decoding a wire frame.
///
/// Any of these means the datagram is discarded as a whole.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The datagram is empty.
    #[error("empty datagram")]
    Empty,

    /// The datagram is not valid UTF-8.
    #[error("datagram is not valid UTF-8")]
    NotUtf8,

    /// The leading tag names no known frame kind.
    #[error("unknown frame tag: {0:?}")]
    UnknownTag(String),

    /// Wrong number of colon-separated fields for the frame kind.
    #[error("{tag} frame expects {expected} fields, got {actual}")]
    FieldCount {
        /// Frame tag.
        tag: &'static str,
        /// Required field count, tag included.
        expected: usize,
        /// Field count found.
        actual: usize,
    },

    /// Client identifier is empty, too long, or contains forbidden characters.
    #[error("invalid client id")]
    InvalidClientId,

    /// Session token is not 64 hex digits.
    #[error("invalid session token")]
    InvalidToken,

    /// Handshake nonce is not an unsigned integer.
    #[error("invalid handshake nonce")]
    InvalidNonce,

    /// A binary field is not canonical base64.
    #[error("invalid base64 in {0} field")]
    InvalidBase64(&'static str),

    /// A binary field decoded to the wrong length.
    #[error("{field} must be {expected} bytes, got {actual}")]
    InvalidLength {
        /// Field name.
        field: &'static str,
        /// Required length.
        expected: usize,
        /// Decoded length.
        actual: usize,
    },
}

/// Errors in the crypto layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Peer public key is a low-order point.
    #[error("key exchange failed: non-contributory peer key")]
    KeyExchangeFailed,

    /// Key derivation failed.
    #[error("key derivation failed")]
    KeyDerivationFailed,

    /// AEAD encryption failed.
    #[error("AEAD encryption failed")]
    EncryptionFailed,

    /// Plaintext exceeds the per-message limit.
    #[error("message of {size} bytes exceeds the {max} byte limit")]
    MessageTooLarge {
        /// Plaintext size.
        size: usize,
        /// Limit.
        max: usize,
    },

    /// Message authentication code did not verify.
    #[error("message authentication failed")]
    MacMismatch,

    /// AEAD decryption failed (invalid tag or corrupted).
    #[error("AEAD decryption failed (invalid tag or corrupted)")]
    DecryptionFailed,
}

/// Why a handshake attempt was refused by access control.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Source IP is currently banned.
    #[error("source address is banned")]
    Banned,

    /// Client identifier is not on the allow list.
    #[error("client id is not allow-listed")]
    UnknownClient,

    /// Session token does not match the host's.
    #[error("session token mismatch")]
    TokenMismatch,
}

/// Errors reading or writing the allow list and session cache files.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File could not be read or written.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// File content is not the expected JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level session errors.
///
/// Only these are surfaced to the user; everything on the receive path is
/// logged and dropped.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The local UDP socket could not be bound.
    #[error("failed to bind local socket: {0}")]
    Bind(#[source] io::Error),

    /// Guest-supplied session code is not exactly 16 digits.
    #[error("session code must be exactly 16 digits")]
    InvalidSessionCode,

    /// Guest-supplied host address does not parse.
    #[error("invalid host address: {0}")]
    InvalidHostAddress(String),

    /// The async runtime could not be created.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Crypto error.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Handshake driven out of order.
    #[error("handshake error: {0}")]
    Handshake(#[from] crate::session::HandshakeError),

    /// No authenticated peer yet.
    #[error("peer not yet known")]
    PeerUnknown,

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}
