//! Client identifiers.
//!
//! A guest names itself with an opaque client identifier in its handshake;
//! the host only admits identifiers on its allow list. By default the
//! identifier is a fingerprint of the device, stable across sessions.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::{FIELD_SEPARATOR, FrameError, MAX_CLIENT_ID_LEN};

/// Opaque client identifier.
///
/// Non-empty, at most 128 bytes, no whitespace, control characters, or field
/// separators, so it always survives a round trip through the wire format.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientId(String);

impl ClientId {
    /// Validate and wrap an identifier.
    pub fn new(id: &str) -> Result<Self, FrameError> {
        let valid = !id.is_empty()
            && id.len() <= MAX_CLIENT_ID_LEN
            && !id
                .chars()
                .any(|c| c.is_whitespace() || c.is_control() || c == FIELD_SEPARATOR);
        if !valid {
            return Err(FrameError::InvalidClientId);
        }
        Ok(Self(id.to_string()))
    }

    /// The identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ClientId {
    type Error = FrameError;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        Self::new(&id)
    }
}

impl From<ClientId> for String {
    fn from(id: ClientId) -> Self {
        id.0
    }
}

/// Source of the local client identifier.
pub trait ClientIdProvider: Send + Sync {
    /// The identifier this device presents to hosts.
    fn client_id(&self) -> ClientId;
}

/// A fixed identifier, e.g. from `PEERLINK_CLIENT_ID`.
#[derive(Debug, Clone)]
pub struct StaticClientId(pub ClientId);

impl ClientIdProvider for StaticClientId {
    fn client_id(&self) -> ClientId {
        self.0.clone()
    }
}

/// Identifier derived from the machine id and the host/user environment.
///
/// ```text
/// id = hex(SHA-256(machine_id || 0 || HOSTNAME || 0 || ... )[..16])
/// ```
#[derive(Debug, Clone)]
pub struct DeviceFingerprint {
    machine_id_path: PathBuf,
}

const FINGERPRINT_VARS: [&str; 4] = ["HOSTNAME", "COMPUTERNAME", "USER", "USERNAME"];

impl DeviceFingerprint {
    /// Fingerprint using `/etc/machine-id`.
    pub fn new() -> Self {
        Self::with_machine_id_path("/etc/machine-id")
    }

    /// Fingerprint reading the machine id from another file.
    pub fn with_machine_id_path(path: impl Into<PathBuf>) -> Self {
        Self {
            machine_id_path: path.into(),
        }
    }

    /// Hash the given parts. Missing parts hash as empty.
    pub fn compute<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> ClientId {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.unwrap_or_default().trim().as_bytes());
            hasher.update([0u8]);
        }
        let digest = hasher.finalize();
        ClientId(hex::encode(&digest[..16]))
    }
}

impl Default for DeviceFingerprint {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientIdProvider for DeviceFingerprint {
    fn client_id(&self) -> ClientId {
        let machine_id = std::fs::read_to_string(&self.machine_id_path).ok();
        let vars: Vec<Option<String>> = FINGERPRINT_VARS
            .iter()
            .map(|var| std::env::var(var).ok())
            .collect();

        Self::compute(
            std::iter::once(machine_id.as_deref()).chain(vars.iter().map(|v| v.as_deref())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_validation() {
        assert!(ClientId::new("guest-laptop").is_ok());
        assert!(ClientId::new(&"a".repeat(MAX_CLIENT_ID_LEN)).is_ok());

        for bad in ["", "with space", "tab\there", "new\nline", "a:b"] {
            assert_eq!(ClientId::new(bad), Err(FrameError::InvalidClientId), "{bad:?}");
        }
        assert_eq!(
            ClientId::new(&"a".repeat(MAX_CLIENT_ID_LEN + 1)),
            Err(FrameError::InvalidClientId)
        );
    }

    #[test]
    fn test_client_id_serde_validates() {
        let id: ClientId = serde_json::from_str("\"guest-laptop\"").unwrap();
        assert_eq!(id.as_str(), "guest-laptop");
        assert!(serde_json::from_str::<ClientId>("\"a b\"").is_err());
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = DeviceFingerprint::compute([Some("machine"), Some("host"), None]);
        let b = DeviceFingerprint::compute([Some("machine"), Some("host"), None]);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_separates_parts() {
        let a = DeviceFingerprint::compute([Some("ab"), Some("c")]);
        let b = DeviceFingerprint::compute([Some("a"), Some("bc")]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_device_fingerprint_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("machine-id");
        std::fs::write(&path, "0123456789abcdef\n").unwrap();

        let provider = DeviceFingerprint::with_machine_id_path(&path);
        assert_eq!(provider.client_id(), provider.client_id());
        assert!(ClientId::new(provider.client_id().as_str()).is_ok());
    }

    #[test]
    fn test_static_client_id() {
        let id = ClientId::new("pinned").unwrap();
        assert_eq!(StaticClientId(id.clone()).client_id(), id);
    }
}
