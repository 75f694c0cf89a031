//! Protocol constants for PeerLink.
//!
//! Sizes are fixed by the wire format. Timing values are the defaults used by
//! [`SessionConfig`](super::SessionConfig) and can be overridden there.

use std::time::Duration;

// =============================================================================
// CRYPTOGRAPHIC CONSTANTS
// =============================================================================

/// X25519 public key size.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Raw Diffie-Hellman shared secret size.
pub const SHARED_SECRET_SIZE: usize = 32;

/// XChaCha20-Poly1305 key size.
pub const AEAD_KEY_SIZE: usize = 32;

/// XChaCha20 nonce size.
pub const AEAD_NONCE_SIZE: usize = 24;

/// Poly1305 authentication tag size.
pub const AEAD_TAG_SIZE: usize = 16;

/// HMAC-SHA256 key size.
pub const MAC_KEY_SIZE: usize = 32;

/// HMAC-SHA256 output size.
pub const MAC_SIZE: usize = 32;

/// SHA-256 session token size.
pub const SESSION_TOKEN_SIZE: usize = 32;

/// HKDF info label for the session key split.
pub const KDF_INFO: &[u8] = b"peerlink v1 session keys";

/// HKDF salt for the session key split.
pub const KDF_SALT: &[u8] = b"peerlink v1";

// =============================================================================
// SESSION CODE
// =============================================================================

/// Number of decimal digits in a session code.
pub const SESSION_CODE_DIGITS: usize = 16;

/// Lower bound (inclusive) of the random handshake nonce.
pub const HANDSHAKE_NONCE_MIN: u64 = 100_000;

/// Upper bound (inclusive) of the random handshake nonce.
pub const HANDSHAKE_NONCE_MAX: u64 = 999_999;

// =============================================================================
// WIRE FORMAT
// =============================================================================

/// Field separator of the textual wire format.
pub const FIELD_SEPARATOR: char = ':';

/// Tag of the guest's handshake frame.
pub const TAG_HANDSHAKE1: &str = "HS1";

/// Tag of the host's handshake reply.
pub const TAG_HANDSHAKE2: &str = "HS2";

/// Tag of the guest's handshake acknowledgment.
pub const TAG_HANDSHAKE_ACK: &str = "HS_ACK";

/// Tag of the NAT keepalive frame.
pub const TAG_PUNCH: &str = "PUNCH";

/// Tag of an encrypted message frame.
pub const TAG_MESSAGE: &str = "MSG";

/// Longest accepted client identifier, in bytes.
pub const MAX_CLIENT_ID_LEN: usize = 128;

/// Longest plaintext a single message may carry, in bytes.
pub const MAX_PLAINTEXT_SIZE: usize = 4096;

/// Receive buffer size (largest UDP payload).
pub const RECV_BUFFER_SIZE: usize = 65535;

// =============================================================================
// TIMING DEFAULTS
// =============================================================================

/// Bounded wait of a single receive call.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// Interval between NAT keepalive frames.
pub const PUNCH_INTERVAL: Duration = Duration::from_secs(2);

/// Interval between guest handshake retries.
pub const GUEST_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// How long the guest keeps resending its handshake.
pub const GUEST_HANDSHAKE_DEADLINE: Duration = Duration::from_secs(60);

/// How long the host waits before reporting that nobody joined.
pub const HOST_HANDSHAKE_DEADLINE: Duration = Duration::from_secs(120);

/// Timeout of the HTTP public address lookup.
pub const IP_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Public address lookup endpoint, answering `{"ip": "<addr>"}`.
pub const IP_LOOKUP_URL: &str = "https://api.ipify.org?format=json";

// =============================================================================
// ABUSE MITIGATION DEFAULTS
// =============================================================================

/// Failed handshakes from one IP before it is banned.
pub const FAILURE_THRESHOLD: u32 = 5;

/// How long a ban lasts.
pub const BAN_DURATION: Duration = Duration::from_secs(300);

/// Longest ban a configuration may ask for (one week).
pub const MAX_BAN_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Source IPs tracked by the ban table at once.
pub const MAX_BAN_ENTRIES: usize = 4096;
