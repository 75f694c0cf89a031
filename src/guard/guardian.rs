//! Peer guardian: pins a session to the first authenticated peer.

use std::net::IpAddr;

use tracing::info;

/// Locks the session to a single peer IP.
#[derive(Debug, Clone, Default)]
pub struct PeerGuardian {
    locked: Option<IpAddr>,
    stealth: bool,
}

impl PeerGuardian {
    /// Create an unlocked guardian.
    pub fn new(stealth: bool) -> Self {
        Self {
            locked: None,
            stealth,
        }
    }

    /// Lock to `ip`. The first lock wins; later calls only report whether
    /// `ip` is the locked peer.
    pub fn lock_to(&mut self, ip: IpAddr) -> bool {
        match self.locked {
            Some(locked) => locked == ip,
            None => {
                info!(%ip, "guardian locked to peer");
                self.locked = Some(ip);
                true
            }
        }
    }

    /// Whether frames from `ip` may be processed past the handshake.
    pub fn is_authorized(&self, ip: IpAddr) -> bool {
        self.locked == Some(ip)
    }

    /// The locked peer, if any.
    pub fn locked_peer(&self) -> Option<IpAddr> {
        self.locked
    }

    /// Whether replies to unsolicited traffic are suppressed.
    pub fn stealth(&self) -> bool {
        self.stealth
    }
}
