//! Ephemeral X25519 key exchange and session key derivation.
//!
//! Every session generates a fresh keypair, so compromise of one session's
//! keys says nothing about another. The raw DH output is never used directly:
//! HKDF-SHA256 splits it into two independent 256-bit keys, one for the AEAD
//! and one for the outer MAC.

use hkdf::Hkdf;
use rand::rngs::OsRng;
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey};
use zeroize::Zeroize;

use crate::core::{
    AEAD_KEY_SIZE, CryptoError, KDF_INFO, KDF_SALT, MAC_KEY_SIZE, PUBLIC_KEY_SIZE,
    SHARED_SECRET_SIZE,
};

/// An ephemeral X25519 keypair.
///
/// The secret half is consumed by [`derive_shared_secret`] and zeroized on
/// drop by `x25519-dalek`.
pub struct EphemeralKeypair {
    secret: EphemeralSecret,
    public: PublicKey,
}

impl EphemeralKeypair {
    /// Generate a new random keypair from the OS RNG.
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Get the public key.
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        self.public.as_bytes()
    }
}

impl std::fmt::Debug for EphemeralKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralKeypair")
            .field("public", self.public.as_bytes())
            .finish_non_exhaustive()
    }
}

/// Raw Diffie-Hellman output. Zeroized on drop.
pub struct SharedSecret {
    bytes: [u8; SHARED_SECRET_SIZE],
}

impl SharedSecret {
    /// Get the raw bytes.
    ///
    /// # Security
    /// Handle with care - this exposes sensitive key material.
    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_SIZE] {
        &self.bytes
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

/// Compute the DH shared value from our keypair and the peer's public key.
///
/// Consumes the keypair. Fails for low-order peer keys, which would yield
/// an all-zero, attacker-known secret.
pub fn derive_shared_secret(
    private: EphemeralKeypair,
    peer_public: &[u8; PUBLIC_KEY_SIZE],
) -> Result<SharedSecret, CryptoError> {
    let peer = PublicKey::from(*peer_public);
    let shared = private.secret.diffie_hellman(&peer);
    if !shared.was_contributory() {
        return Err(CryptoError::KeyExchangeFailed);
    }
    Ok(SharedSecret {
        bytes: *shared.as_bytes(),
    })
}

/// Keys derived from one key exchange. Zeroized on drop.
pub struct SessionKeys {
    aead_key: [u8; AEAD_KEY_SIZE],
    mac_key: [u8; MAC_KEY_SIZE],
}

impl SessionKeys {
    /// Split a shared secret into an AEAD key and a MAC key.
    ///
    /// ```text
    /// okm      = HKDF-SHA256(salt = "peerlink v1", ikm = shared, info = "peerlink v1 session keys", 64)
    /// aead_key = okm[..32]
    /// mac_key  = okm[32..]
    /// ```
    pub fn derive(shared: &SharedSecret) -> Result<Self, CryptoError> {
        let hk = Hkdf::<Sha256>::new(Some(KDF_SALT), shared.as_bytes());
        let mut okm = [0u8; AEAD_KEY_SIZE + MAC_KEY_SIZE];
        hk.expand(KDF_INFO, &mut okm)
            .map_err(|_| CryptoError::KeyDerivationFailed)?;

        let mut aead_key = [0u8; AEAD_KEY_SIZE];
        let mut mac_key = [0u8; MAC_KEY_SIZE];
        aead_key.copy_from_slice(&okm[..AEAD_KEY_SIZE]);
        mac_key.copy_from_slice(&okm[AEAD_KEY_SIZE..]);
        okm.zeroize();

        Ok(Self { aead_key, mac_key })
    }

    /// Create keys from raw bytes.
    pub fn from_bytes(aead_key: [u8; AEAD_KEY_SIZE], mac_key: [u8; MAC_KEY_SIZE]) -> Self {
        Self { aead_key, mac_key }
    }

    /// Key for XChaCha20-Poly1305.
    pub fn aead_key(&self) -> &[u8; AEAD_KEY_SIZE] {
        &self.aead_key
    }

    /// Key for HMAC-SHA256.
    pub fn mac_key(&self) -> &[u8; MAC_KEY_SIZE] {
        &self.mac_key
    }
}

impl Drop for SessionKeys {
    fn drop(&mut self) {
        self.aead_key.zeroize();
        self.mac_key.zeroize();
    }
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKeys([redacted])")
    }
}
