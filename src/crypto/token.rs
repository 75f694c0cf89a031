//! Session code and session token.
//!
//! The host generates a 16-digit decimal code and shares it out of band. Only
//! its SHA-256 hash, the session token, ever goes on the wire.
//!
//! The token is a plain hash, not a challenge-response proof: anyone who
//! observes it can replay it for the lifetime of the code.

use std::fmt;

use rand::Rng;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::core::{SESSION_CODE_DIGITS, SESSION_TOKEN_SIZE, SessionError};

/// A 16-digit decimal session code. Zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCode(String);

impl SessionCode {
    /// Generate a random code from the OS RNG.
    pub fn generate() -> Self {
        let mut rng = OsRng;
        let code = (0..SESSION_CODE_DIGITS)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect();
        Self(code)
    }

    /// Validate user input: exactly 16 ASCII digits after trimming.
    pub fn parse(input: &str) -> Result<Self, SessionError> {
        let code = input.trim();
        if code.len() != SESSION_CODE_DIGITS || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SessionError::InvalidSessionCode);
        }
        Ok(Self(code.to_string()))
    }

    /// The code as shown to the user.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the token sent on the wire.
    pub fn token(&self) -> SessionToken {
        SessionToken::derive(self)
    }
}

impl fmt::Debug for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionCode([redacted])")
    }
}

impl Drop for SessionCode {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// SHA-256 of a session code.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken([u8; SESSION_TOKEN_SIZE]);

impl SessionToken {
    /// Hash a session code.
    pub fn derive(code: &SessionCode) -> Self {
        Self(Sha256::digest(code.as_str().as_bytes()).into())
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; SESSION_TOKEN_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse exactly 64 hex digits.
    pub fn from_hex(hex_str: &str) -> Option<Self> {
        if hex_str.len() != SESSION_TOKEN_SIZE * 2 {
            return None;
        }
        let mut bytes = [0u8; SESSION_TOKEN_SIZE];
        hex::decode_to_slice(hex_str, &mut bytes).ok()?;
        Some(Self(bytes))
    }

    /// Lowercase hex encoding used on the wire.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; SESSION_TOKEN_SIZE] {
        &self.0
    }

    /// Compare in constant time.
    pub fn matches(&self, other: &SessionToken) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken({}..)", &self.to_hex()[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_shape() {
        let code = SessionCode::generate();
        assert_eq!(code.as_str().len(), 16);
        assert!(code.as_str().bytes().all(|b| b.is_ascii_digit()));
        assert!(SessionCode::parse(code.as_str()).is_ok());
    }

    #[test]
    fn test_parse_rejects_non_16_digit_codes() {
        for bad in ["", "123456789012345", "12345678901234567", "12345678901234a6", "1234 567890123456"] {
            assert!(
                matches!(SessionCode::parse(bad), Err(SessionError::InvalidSessionCode)),
                "{bad:?} should be rejected"
            );
        }
        assert!(SessionCode::parse("  1234567890123456\n").is_ok());
    }

    #[test]
    fn test_token_is_sha256_of_code() {
        let code = SessionCode::parse("1234567890123456").unwrap();
        let expected: [u8; 32] = Sha256::digest(b"1234567890123456").into();
        assert_eq!(code.token().as_bytes(), &expected);
        assert!(!code.token().to_hex().contains("1234567890123456"));
    }

    #[test]
    fn test_token_hex_parsing() {
        let token = SessionCode::parse("1234567890123456").unwrap().token();
        let hex_str = token.to_hex();
        assert_eq!(hex_str.len(), 64);
        assert_eq!(SessionToken::from_hex(&hex_str), Some(token));
        assert_eq!(SessionToken::from_hex(&hex_str.to_uppercase()), Some(token));
        assert_eq!(SessionToken::from_hex(&hex_str[..62]), None);
        assert_eq!(SessionToken::from_hex(&"zz".repeat(32)), None);
    }

    #[test]
    fn test_token_matching() {
        let a = SessionCode::parse("1234567890123456").unwrap().token();
        let b = SessionCode::parse("6543210987654321").unwrap().token();
        assert!(a.matches(&a));
        assert!(!a.matches(&b));
    }
}
