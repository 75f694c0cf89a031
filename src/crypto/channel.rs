//! Secure channel for user messages.
//!
//! Encrypt-then-MAC on top of an AEAD:
//!
//! ```text
//! (ciphertext, tag) = XChaCha20-Poly1305(aead_key, nonce, plaintext)
//! mac               = HMAC-SHA256(mac_key, nonce || ciphertext || tag)
//! ```
//!
//! Decryption verifies the MAC in constant time before the AEAD is touched,
//! so forged packets are rejected without running the cipher.

use chacha20poly1305::{
    Tag, XChaCha20Poly1305, XNonce,
    aead::{AeadInPlace, KeyInit},
};
use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;

use crate::core::{AEAD_NONCE_SIZE, AEAD_TAG_SIZE, CryptoError, MAC_SIZE, MAX_PLAINTEXT_SIZE};
use crate::transport::SealedMessage;

use super::SessionKeys;

type HmacSha256 = Hmac<Sha256>;

/// An established channel: the derived keys of one session.
///
/// Dropping the channel zeroizes the keys.
#[derive(Debug)]
pub struct SecureChannel {
    keys: SessionKeys,
}

impl SecureChannel {
    /// Create a channel from freshly derived keys.
    pub fn new(keys: SessionKeys) -> Self {
        Self { keys }
    }

    /// Encrypt and authenticate a plaintext.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<SealedMessage, CryptoError> {
        if plaintext.len() > MAX_PLAINTEXT_SIZE {
            return Err(CryptoError::MessageTooLarge {
                size: plaintext.len(),
                max: MAX_PLAINTEXT_SIZE,
            });
        }

        let mut nonce = [0u8; AEAD_NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let cipher = XChaCha20Poly1305::new(self.keys.aead_key().into());
        let mut ciphertext = plaintext.to_vec();
        let aead_tag = cipher
            .encrypt_in_place_detached(XNonce::from_slice(&nonce), b"", &mut ciphertext)
            .map_err(|_| CryptoError::EncryptionFailed)?;

        let mut tag = [0u8; AEAD_TAG_SIZE];
        tag.copy_from_slice(&aead_tag);

        let mut sealed = SealedMessage {
            nonce,
            ciphertext,
            tag,
            mac: [0u8; MAC_SIZE],
        };
        let mac = self.authenticator(&sealed)?.finalize().into_bytes();
        sealed.mac.copy_from_slice(&mac);
        Ok(sealed)
    }

    /// Verify and decrypt a sealed message.
    ///
    /// The MAC is checked first; the AEAD only runs on authenticated input.
    pub fn decrypt(&self, sealed: &SealedMessage) -> Result<Vec<u8>, CryptoError> {
        self.authenticator(sealed)?
            .verify_slice(&sealed.mac)
            .map_err(|_| CryptoError::MacMismatch)?;

        let cipher = XChaCha20Poly1305::new(self.keys.aead_key().into());
        let mut plaintext = sealed.ciphertext.clone();
        cipher
            .decrypt_in_place_detached(
                XNonce::from_slice(&sealed.nonce),
                b"",
                &mut plaintext,
                Tag::from_slice(&sealed.tag),
            )
            .map_err(|_| CryptoError::DecryptionFailed)?;
        Ok(plaintext)
    }

    /// HMAC state over `nonce || ciphertext || tag`.
    fn authenticator(&self, sealed: &SealedMessage) -> Result<HmacSha256, CryptoError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.keys.mac_key())
            .map_err(|_| CryptoError::KeyDerivationFailed)?;
        mac.update(&sealed.nonce);
        mac.update(&sealed.ciphertext);
        mac.update(&sealed.tag);
        Ok(mac)
    }
}
