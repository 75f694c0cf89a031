//! Session state and the receive-path dispatcher.
//!
//! [`SessionState`] is owned by the receive loop: it is the only writer of
//! the peer address, the keys, the guardian lock and the ban table. Every
//! inbound datagram goes through [`SessionState::handle_datagram`], which
//! never fails; anything unexpected is logged and dropped.

use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

use tracing::{debug, info, trace};

use crate::core::{SessionConfig, SessionError};
use crate::crypto::{SecureChannel, SessionToken};
use crate::guard::{AccessControl, AllowList, BanTable, PeerGuardian};
use crate::identity::ClientId;
use crate::transport::{Frame, SealedMessage};

use super::handshake::{Handshake, HandshakeState, Role};

/// Something the user should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Keys are derived and the peer is locked in.
    Established {
        /// Peer address.
        peer: SocketAddr,
    },
    /// Host: the guest confirmed the handshake.
    PeerAcknowledged,
    /// A decrypted message from the peer.
    Message(String),
}

/// Result of handling one datagram.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Frame to send back, and where.
    pub reply: Option<(Frame, SocketAddr)>,
    /// Event to report.
    pub event: Option<SessionEvent>,
}

impl Outcome {
    fn drop_packet() -> Self {
        Self::default()
    }

    fn reply(frame: Frame, to: SocketAddr) -> Self {
        Self {
            reply: Some((frame, to)),
            event: None,
        }
    }
}

/// Mutable state of one session.
#[derive(Debug)]
pub struct SessionState {
    handshake: Handshake,
    access: Option<AccessControl>,
    guardian: PeerGuardian,
    channel: Option<SecureChannel>,
    peer_addr: Option<SocketAddr>,
    candidate: Option<SocketAddr>,
    acknowledged: bool,
}

impl SessionState {
    /// Host state waiting for HS1.
    pub fn host(
        config: &SessionConfig,
        allow_list: AllowList,
        token: SessionToken,
    ) -> Result<Self, SessionError> {
        let mut handshake = Handshake::new(Role::Host);
        handshake.start_host()?;
        let bans = BanTable::new(config.failure_threshold, config.ban_duration);
        Ok(Self {
            handshake,
            access: Some(AccessControl::new(allow_list, token, bans)),
            guardian: PeerGuardian::new(config.stealth),
            channel: None,
            peer_addr: None,
            candidate: None,
            acknowledged: false,
        })
    }

    /// Guest state with an HS1 ready for `host_addr`.
    pub fn guest(
        config: &SessionConfig,
        client_id: ClientId,
        token: SessionToken,
        host_addr: SocketAddr,
    ) -> Result<Self, SessionError> {
        let mut handshake = Handshake::new(Role::Guest);
        handshake.start_guest(client_id, token)?;
        Ok(Self {
            handshake,
            access: None,
            guardian: PeerGuardian::new(config.stealth),
            channel: None,
            peer_addr: None,
            candidate: Some(host_addr),
            acknowledged: false,
        })
    }

    /// Dispatch one inbound datagram.
    pub fn handle_datagram(&mut self, data: &[u8], from: SocketAddr, now: Instant) -> Outcome {
        let ip = from.ip();
        if self.access.as_ref().is_some_and(|a| a.is_banned(ip, now)) {
            trace!(%from, "dropping datagram from banned source");
            return Outcome::drop_packet();
        }

        let frame = match Frame::decode(data) {
            Ok(frame) => frame,
            Err(err) => {
                debug!(%from, %err, "dropping malformed datagram");
                return Outcome::drop_packet();
            }
        };
        trace!(%from, kind = %frame.kind(), "received frame");

        match frame {
            Frame::Punch => self.on_punch(from),
            Frame::Handshake1 {
                client_id,
                token,
                public_key,
                ..
            } => self.on_hello(from, &client_id, &token, &public_key, now),
            Frame::Handshake2 { public_key } => self.on_reply(from, &public_key),
            Frame::HandshakeAck => self.on_ack(ip),
            Frame::Message(sealed) => self.on_message(from, &sealed),
        }
    }

    fn on_punch(&self, from: SocketAddr) -> Outcome {
        // Only an unlocked host answers; once locked, foreign punches go unanswered.
        if self.role() == Role::Host
            && self.guardian.locked_peer().is_none()
            && !self.guardian.stealth()
        {
            return Outcome::reply(Frame::Punch, from);
        }
        Outcome::drop_packet()
    }

    fn on_hello(
        &mut self,
        from: SocketAddr,
        client_id: &ClientId,
        token: &SessionToken,
        public_key: &[u8; 32],
        now: Instant,
    ) -> Outcome {
        let Some(access) = self.access.as_mut() else {
            debug!(%from, "guest ignoring HS1");
            return Outcome::drop_packet();
        };

        if self.handshake.state() != HandshakeState::Handshaking {
            // Retransmitted HS1: our HS2 may have been lost.
            if self.guardian.is_authorized(from.ip()) {
                if let Some(reply) = self.handshake.cached_reply(public_key) {
                    return Outcome::reply(reply.clone(), from);
                }
            }
            return Outcome::drop_packet();
        }

        if access
            .check_handshake(from.ip(), client_id, token, now)
            .is_err()
        {
            return Outcome::drop_packet();
        }

        match self.handshake.accept_hello(public_key) {
            Ok((keys, reply)) => {
                self.guardian.lock_to(from.ip());
                self.peer_addr = Some(from);
                self.channel = Some(SecureChannel::new(keys));
                info!(%from, %client_id, "handshake accepted");
                Outcome {
                    reply: Some((reply, from)),
                    event: Some(SessionEvent::Established { peer: from }),
                }
            }
            Err(err) => {
                debug!(%from, %err, "key exchange with guest failed");
                access.record_failure(from.ip(), now);
                Outcome::drop_packet()
            }
        }
    }

    fn on_reply(&mut self, from: SocketAddr, public_key: &[u8; 32]) -> Outcome {
        if self.role() != Role::Guest {
            return Outcome::drop_packet();
        }
        if self.handshake.state() == HandshakeState::Established {
            // Duplicate HS2: re-acknowledge so the host sees our ACK.
            if self.guardian.is_authorized(from.ip()) {
                return Outcome::reply(Frame::HandshakeAck, from);
            }
            return Outcome::drop_packet();
        }
        if self.candidate.map(|c| c.ip()) != Some(from.ip()) {
            debug!(%from, "HS2 from unexpected address");
            return Outcome::drop_packet();
        }

        match self.handshake.accept_reply(public_key) {
            Ok(keys) => {
                self.guardian.lock_to(from.ip());
                self.peer_addr = Some(from);
                self.channel = Some(SecureChannel::new(keys));
                info!(%from, "handshake completed");
                Outcome {
                    reply: Some((Frame::HandshakeAck, from)),
                    event: Some(SessionEvent::Established { peer: from }),
                }
            }
            Err(err) => {
                debug!(%from, %err, "rejecting HS2");
                Outcome::drop_packet()
            }
        }
    }

    fn on_ack(&mut self, ip: IpAddr) -> Outcome {
        if self.role() != Role::Host || !self.guardian.is_authorized(ip) || self.acknowledged {
            return Outcome::drop_packet();
        }
        self.acknowledged = true;
        Outcome {
            reply: None,
            event: Some(SessionEvent::PeerAcknowledged),
        }
    }

    fn on_message(&self, from: SocketAddr, sealed: &SealedMessage) -> Outcome {
        if !self.guardian.is_authorized(from.ip()) {
            debug!(%from, "dropping message from unauthorized source");
            return Outcome::drop_packet();
        }
        let Some(channel) = self.channel.as_ref() else {
            return Outcome::drop_packet();
        };
        match channel.decrypt(sealed) {
            Ok(plaintext) => Outcome {
                reply: None,
                event: Some(SessionEvent::Message(
                    String::from_utf8_lossy(&plaintext).into_owned(),
                )),
            },
            Err(err) => {
                debug!(%from, %err, "dropping message that failed authentication");
                Outcome::drop_packet()
            }
        }
    }

    /// Encrypt a line of user text for the peer.
    pub fn seal(&self, text: &str) -> Result<(Frame, SocketAddr), SessionError> {
        match (self.channel.as_ref(), self.peer_addr) {
            (Some(channel), Some(peer)) => {
                Ok((Frame::Message(channel.encrypt(text.as_bytes())?), peer))
            }
            _ => Err(SessionError::PeerUnknown),
        }
    }

    /// Guest: the HS1 to (re)send and its destination, while handshaking.
    pub fn hello(&self) -> Option<(Frame, SocketAddr)> {
        let frame = self.handshake.hello()?.clone();
        Some((frame, self.candidate?))
    }

    /// Where keepalive punches go: the peer, or the host address before that.
    pub fn punch_target(&self) -> Option<SocketAddr> {
        if self.handshake.state() == HandshakeState::Closed {
            return None;
        }
        self.peer_addr.or(self.candidate)
    }

    /// Tear down: drop the keys and stop accepting frames.
    pub fn close(&mut self) {
        self.channel = None;
        self.handshake.close();
    }

    /// Whether the secure channel is up.
    pub fn is_established(&self) -> bool {
        self.handshake.state() == HandshakeState::Established
    }

    /// Role of this side.
    pub fn role(&self) -> Role {
        self.handshake.role()
    }

    /// Handshake progress.
    pub fn handshake_state(&self) -> HandshakeState {
        self.handshake.state()
    }

    /// Authenticated peer address.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Host access control.
    pub fn access(&self) -> Option<&AccessControl> {
        self.access.as_ref()
    }

    /// The peer guardian.
    pub fn guardian(&self) -> &PeerGuardian {
        &self.guardian
    }
}
