//! NAT keepalive.
//!
//! Sends `PUNCH` to the current punch target on a fixed interval so both NAT
//! mappings stay open. Send failures are logged and otherwise ignored.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::transport::{Frame, PeerSocket};

use super::retry::{RunFlag, repeat_every};
use super::state::SessionState;

/// Periodic `PUNCH` sender for one session.
#[derive(Debug, Clone)]
pub struct HolePuncher {
    socket: Arc<PeerSocket>,
    state: Arc<RwLock<SessionState>>,
    interval: Duration,
}

impl HolePuncher {
    /// Create a puncher sharing the session's socket and state.
    pub fn new(socket: Arc<PeerSocket>, state: Arc<RwLock<SessionState>>, interval: Duration) -> Self {
        Self {
            socket,
            state,
            interval,
        }
    }

    /// Send one punch if there is a target. Returns whether one was sent.
    pub async fn punch_once(&self) -> bool {
        let Some(target) = self.state.read().await.punch_target() else {
            return false;
        };
        match self.socket.send_frame(&Frame::Punch, target).await {
            Ok(_) => {
                trace!(%target, "punch sent");
                true
            }
            Err(err) => {
                debug!(%target, %err, "punch send failed");
                false
            }
        }
    }

    /// Punch every interval until `flag` is stopped.
    pub async fn run(&self, flag: &RunFlag) {
        repeat_every(self.interval, flag, move || async move {
            self.punch_once().await;
        })
        .await;
    }
}
