//! Frame encoding and decoding for the PeerLink wire protocol.
//!
//! Frames are UTF-8 text, colon-delimited, with binary fields in standard
//! base64. Decoding is strict: the tag must be known, the field count exact,
//! and every field well-formed. Anything else is a [`FrameError`] and the
//! datagram is dropped whole.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::core::{
    AEAD_NONCE_SIZE, AEAD_TAG_SIZE, FIELD_SEPARATOR, FrameError, MAC_SIZE, PUBLIC_KEY_SIZE,
    TAG_HANDSHAKE_ACK, TAG_HANDSHAKE1, TAG_HANDSHAKE2, TAG_MESSAGE, TAG_PUNCH,
};
use crate::crypto::SessionToken;
use crate::identity::ClientId;

/// Frame kind, used for logging and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Guest's handshake offer.
    Handshake1,
    /// Host's handshake reply.
    Handshake2,
    /// Guest's acknowledgment of the reply.
    HandshakeAck,
    /// NAT keepalive.
    Punch,
    /// Encrypted user message.
    Message,
}

impl FrameKind {
    /// Wire tag of this kind.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Handshake1 => TAG_HANDSHAKE1,
            Self::Handshake2 => TAG_HANDSHAKE2,
            Self::HandshakeAck => TAG_HANDSHAKE_ACK,
            Self::Punch => TAG_PUNCH,
            Self::Message => TAG_MESSAGE,
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Encrypted message body: AEAD output plus an outer MAC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedMessage {
    /// Random XChaCha20 nonce.
    pub nonce: [u8; AEAD_NONCE_SIZE],
    /// Ciphertext, same length as the plaintext.
    pub ciphertext: Vec<u8>,
    /// Detached Poly1305 tag.
    pub tag: [u8; AEAD_TAG_SIZE],
    /// HMAC-SHA256 over `nonce || ciphertext || tag`.
    pub mac: [u8; MAC_SIZE],
}

/// A decoded wire frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// `HS1:<client_id>:<session_token_hex>:<dh_pub_b64>:<random_nonce_int>`
    Handshake1 {
        /// Guest's client identifier.
        client_id: ClientId,
        /// Hash of the shared session code.
        token: SessionToken,
        /// Guest's ephemeral X25519 public key.
        public_key: [u8; PUBLIC_KEY_SIZE],
        /// Random attempt nonce (carried, not verified).
        nonce: u64,
    },
    /// `HS2:<dh_pub_b64>`
    Handshake2 {
        /// Host's ephemeral X25519 public key.
        public_key: [u8; PUBLIC_KEY_SIZE],
    },
    /// `HS_ACK`
    HandshakeAck,
    /// `PUNCH`
    Punch,
    /// `MSG:<nonce_b64>:<ciphertext_b64>:<tag_b64>:<mac_b64>`
    Message(SealedMessage),
}

impl Frame {
    /// Kind of this frame.
    pub fn kind(&self) -> FrameKind {
        match self {
            Self::Handshake1 { .. } => FrameKind::Handshake1,
            Self::Handshake2 { .. } => FrameKind::Handshake2,
            Self::HandshakeAck => FrameKind::HandshakeAck,
            Self::Punch => FrameKind::Punch,
            Self::Message(_) => FrameKind::Message,
        }
    }

    /// Serialize to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Parse wire bytes into exactly one frame.
    pub fn decode(data: &[u8]) -> Result<Self, FrameError> {
        if data.is_empty() {
            return Err(FrameError::Empty);
        }
        let text = std::str::from_utf8(data).map_err(|_| FrameError::NotUtf8)?;
        let fields: Vec<&str> = text.split(FIELD_SEPARATOR).collect();

        match fields[0] {
            TAG_HANDSHAKE1 => {
                expect_fields(TAG_HANDSHAKE1, &fields, 5)?;
                Ok(Self::Handshake1 {
                    client_id: ClientId::new(fields[1])?,
                    token: SessionToken::from_hex(fields[2]).ok_or(FrameError::InvalidToken)?,
                    public_key: decode_fixed("dh_pub", fields[3])?,
                    nonce: parse_nonce(fields[4])?,
                })
            }
            TAG_HANDSHAKE2 => {
                expect_fields(TAG_HANDSHAKE2, &fields, 2)?;
                Ok(Self::Handshake2 {
                    public_key: decode_fixed("dh_pub", fields[1])?,
                })
            }
            TAG_HANDSHAKE_ACK => {
                expect_fields(TAG_HANDSHAKE_ACK, &fields, 1)?;
                Ok(Self::HandshakeAck)
            }
            TAG_PUNCH => {
                expect_fields(TAG_PUNCH, &fields, 1)?;
                Ok(Self::Punch)
            }
            TAG_MESSAGE => {
                expect_fields(TAG_MESSAGE, &fields, 5)?;
                Ok(Self::Message(SealedMessage {
                    nonce: decode_fixed("nonce", fields[1])?,
                    ciphertext: STANDARD
                        .decode(fields[2])
                        .map_err(|_| FrameError::InvalidBase64("ciphertext"))?,
                    tag: decode_fixed("tag", fields[3])?,
                    mac: decode_fixed("mac", fields[4])?,
                }))
            }
            other => Err(FrameError::UnknownTag(other.chars().take(16).collect())),
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handshake1 {
                client_id,
                token,
                public_key,
                nonce,
            } => write!(
                f,
                "{TAG_HANDSHAKE1}:{client_id}:{}:{}:{nonce}",
                token.to_hex(),
                STANDARD.encode(public_key)
            ),
            Self::Handshake2 { public_key } => {
                write!(f, "{TAG_HANDSHAKE2}:{}", STANDARD.encode(public_key))
            }
            Self::HandshakeAck => f.write_str(TAG_HANDSHAKE_ACK),
            Self::Punch => f.write_str(TAG_PUNCH),
            Self::Message(sealed) => write!(
                f,
                "{TAG_MESSAGE}:{}:{}:{}:{}",
                STANDARD.encode(sealed.nonce),
                STANDARD.encode(&sealed.ciphertext),
                STANDARD.encode(sealed.tag),
                STANDARD.encode(sealed.mac)
            ),
        }
    }
}

fn expect_fields(tag: &'static str, fields: &[&str], expected: usize) -> Result<(), FrameError> {
    if fields.len() != expected {
        return Err(FrameError::FieldCount {
            tag,
            expected,
            actual: fields.len(),
        });
    }
    Ok(())
}

fn decode_fixed<const N: usize>(field: &'static str, value: &str) -> Result<[u8; N], FrameError> {
    let bytes = STANDARD
        .decode(value)
        .map_err(|_| FrameError::InvalidBase64(field))?;
    bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| FrameError::InvalidLength {
            field,
            expected: N,
            actual: bytes.len(),
        })
}

fn parse_nonce(value: &str) -> Result<u64, FrameError> {
    // `u64::from_str` accepts a leading '+', the wire format does not.
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FrameError::InvalidNonce);
    }
    value.parse().map_err(|_| FrameError::InvalidNonce)
}
