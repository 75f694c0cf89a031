//! Handshake state machine.
//!
//! ```text
//! Guest                                   Host
//!   |  HS1(client_id, token, g_pub, n)  ->  |  access check, keypair, derive
//!   |  <-                     HS2(h_pub)    |  Established
//!   |  derive, Established                  |
//!   |  HS_ACK                           ->  |
//! ```
//!
//! The guest resends the same HS1 until HS2 arrives. The host caches its HS2
//! so a retransmitted HS1 from the same guest key can be answered again
//! without deriving a second set of keys.

use std::fmt;

use rand::Rng;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::core::{CryptoError, HANDSHAKE_NONCE_MAX, HANDSHAKE_NONCE_MIN, PUBLIC_KEY_SIZE};
use crate::crypto::{EphemeralKeypair, SessionKeys, SessionToken, derive_shared_secret};
use crate::identity::ClientId;
use crate::transport::Frame;

/// Which side of the session this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Generates the code and waits for the guest.
    Host,
    /// Joins a host with a shared code.
    Guest,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => f.write_str("host"),
            Self::Guest => f.write_str("guest"),
        }
    }
}

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Not started.
    Idle,
    /// Waiting for the peer.
    Handshaking,
    /// Keys derived; the channel is usable.
    Established,
    /// Session torn down.
    Closed,
}

/// Errors driving the handshake.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// The operation belongs to the other role.
    #[error("operation not valid for the {0} role")]
    WrongRole(Role),

    /// The operation is not valid in the current state.
    #[error("operation not valid in state {0:?}")]
    WrongState(HandshakeState),

    /// Key exchange failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

#[derive(Debug)]
struct GuestOffer {
    client_id: ClientId,
    token: SessionToken,
    keypair: EphemeralKeypair,
    hello: Frame,
}

impl GuestOffer {
    fn new(client_id: ClientId, token: SessionToken) -> Self {
        let keypair = EphemeralKeypair::generate();
        let hello = Frame::Handshake1 {
            client_id: client_id.clone(),
            token,
            public_key: *keypair.public_key(),
            nonce: OsRng.gen_range(HANDSHAKE_NONCE_MIN..=HANDSHAKE_NONCE_MAX),
        };
        Self {
            client_id,
            token,
            keypair,
            hello,
        }
    }
}

/// One side of a handshake.
#[derive(Debug)]
pub struct Handshake {
    role: Role,
    state: HandshakeState,
    offer: Option<GuestOffer>,
    reply: Option<([u8; PUBLIC_KEY_SIZE], Frame)>,
}

impl Handshake {
    /// Create an idle handshake for `role`.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            state: HandshakeState::Idle,
            offer: None,
            reply: None,
        }
    }

    /// Role of this side.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Current state.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Begin as guest: generate the keypair and the HS1 to resend.
    pub fn start_guest(
        &mut self,
        client_id: ClientId,
        token: SessionToken,
    ) -> Result<(), HandshakeError> {
        self.require(Role::Guest, HandshakeState::Idle)?;
        self.offer = Some(GuestOffer::new(client_id, token));
        self.state = HandshakeState::Handshaking;
        Ok(())
    }

    /// Begin as host: wait for HS1.
    pub fn start_host(&mut self) -> Result<(), HandshakeError> {
        self.require(Role::Host, HandshakeState::Idle)?;
        self.state = HandshakeState::Handshaking;
        Ok(())
    }

    /// The guest's pending HS1, while handshaking.
    pub fn hello(&self) -> Option<&Frame> {
        match self.state {
            HandshakeState::Handshaking => self.offer.as_ref().map(|offer| &offer.hello),
            _ => None,
        }
    }

    /// Host: answer an admitted HS1.
    ///
    /// Generates the host keypair, derives the session keys and returns them
    /// with the HS2 to send back.
    pub fn accept_hello(
        &mut self,
        guest_public: &[u8; PUBLIC_KEY_SIZE],
    ) -> Result<(SessionKeys, Frame), HandshakeError> {
        self.require(Role::Host, HandshakeState::Handshaking)?;

        let keypair = EphemeralKeypair::generate();
        let reply = Frame::Handshake2 {
            public_key: *keypair.public_key(),
        };
        let shared = derive_shared_secret(keypair, guest_public)?;
        let keys = SessionKeys::derive(&shared)?;

        self.reply = Some((*guest_public, reply.clone()));
        self.state = HandshakeState::Established;
        Ok((keys, reply))
    }

    /// Host: the cached HS2, if `guest_public` is the key it answered.
    pub fn cached_reply(&self, guest_public: &[u8; PUBLIC_KEY_SIZE]) -> Option<&Frame> {
        match (&self.state, &self.reply) {
            (HandshakeState::Established, Some((key, reply))) if key == guest_public => Some(reply),
            _ => None,
        }
    }

    /// Guest: complete the exchange with the host's HS2 key.
    ///
    /// A failed exchange consumes the keypair, so a fresh keypair and HS1 are
    /// prepared and the guest keeps handshaking.
    pub fn accept_reply(
        &mut self,
        host_public: &[u8; PUBLIC_KEY_SIZE],
    ) -> Result<SessionKeys, HandshakeError> {
        self.require(Role::Guest, HandshakeState::Handshaking)?;
        let offer = self
            .offer
            .take()
            .ok_or(HandshakeError::WrongState(self.state))?;
        let GuestOffer {
            client_id,
            token,
            keypair,
            ..
        } = offer;

        let keys = derive_shared_secret(keypair, host_public)
            .and_then(|shared| SessionKeys::derive(&shared));
        match keys {
            Ok(keys) => {
                self.state = HandshakeState::Established;
                Ok(keys)
            }
            Err(err) => {
                debug!(%err, "key exchange failed, regenerating handshake offer");
                self.offer = Some(GuestOffer::new(client_id, token));
                Err(err.into())
            }
        }
    }

    /// Tear down, dropping any pending key material.
    pub fn close(&mut self) {
        self.offer = None;
        self.reply = None;
        self.state = HandshakeState::Closed;
    }

    fn require(&self, role: Role, state: HandshakeState) -> Result<(), HandshakeError> {
        if self.role != role {
            return Err(HandshakeError::WrongRole(self.role));
        }
        if self.state != state {
            return Err(HandshakeError::WrongState(self.state));
        }
        Ok(())
    }
}
