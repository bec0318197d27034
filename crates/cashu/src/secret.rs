//! The byte string hidden inside a blinded message: either 32 random bytes
//! (hex-encoded) or a well-known spending-condition envelope (itself a
//! UTF-8 JSON string once more hex/byte-encoded at the proof layer).

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A Cashu secret: the pre-image whose hash-to-curve image is blinded and
/// signed. Stored as its canonical string form (64 lowercase hex chars for
/// a random secret, or a `["Kind", {...}]` JSON array for a well-known
/// secret) so bytes round-trip exactly through every wire encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Generate a fresh random 32-byte secret, hex-encoded.
    pub fn generate() -> Self {
        use bitcoin::secp256k1::rand::RngCore;
        let mut bytes = [0u8; 32];
        bitcoin::secp256k1::rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wrap an already-formatted secret string (random hex or well-known
    /// JSON envelope).
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The bytes that are actually fed to `hash_to_curve` and stored on
    /// the wire: the UTF-8 bytes of the canonical string form.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }

    /// Whether this secret's string form parses as a well-known
    /// `["Kind", {...}]` envelope rather than a bare random hex string.
    pub fn is_well_known(&self) -> bool {
        self.0.trim_start().starts_with('[')
    }
}

impl FromStr for Secret {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_secret_is_64_hex_chars() {
        let s = Secret::generate();
        assert_eq!(s.to_bytes().len(), 64);
        assert!(!s.is_well_known());
    }

    #[test]
    fn well_known_secret_detected_by_leading_bracket() {
        let s = Secret::new(r#"["P2PK",{"nonce":"00","data":"02ab","tags":[]}]"#);
        assert!(s.is_well_known());
    }
}
