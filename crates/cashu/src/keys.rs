//! Public and private key wrappers over `secp256k1`, with the hex
//! (de)serialization Cashu's wire formats expect.

use core::fmt;
use core::ops::Deref;
use core::str::FromStr;

use bitcoin::hashes::sha256::Hash as Sha256Hash;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::rand::rngs::OsRng;
use bitcoin::secp256k1::schnorr::Signature;
use bitcoin::secp256k1::{self, Keypair, Message, Scalar, XOnlyPublicKey};
use serde::de::Visitor;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;
use crate::SECP256K1;

/// A compressed secp256k1 public key, as used for mint keys, P2PK locks,
/// and ephemeral P2BK keys.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey {
    inner: secp256k1::PublicKey,
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl Deref for PublicKey {
    type Target = secp256k1::PublicKey;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl From<secp256k1::PublicKey> for PublicKey {
    fn from(inner: secp256k1::PublicKey) -> Self {
        Self { inner }
    }
}

impl PublicKey {
    /// Parse from compressed SEC1 bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self, Error> {
        Ok(Self {
            inner: secp256k1::PublicKey::from_slice(slice)?,
        })
    }

    /// Parse from a 66-character hex string.
    pub fn from_hex<S: AsRef<str>>(hex: S) -> Result<Self, Error> {
        let hex = hex.as_ref();
        if hex.len() != 33 * 2 {
            return Err(Error::InvalidWitness(format!(
                "public key must be 33 bytes, got {}",
                hex.len() / 2
            )));
        }
        Ok(Self {
            inner: secp256k1::PublicKey::from_str(hex)?,
        })
    }

    /// Compressed SEC1 bytes.
    pub fn to_bytes(&self) -> [u8; 33] {
        self.inner.serialize()
    }

    /// The BIP-340 x-only form, dropping the leading parity byte.
    pub fn x_only_public_key(&self) -> XOnlyPublicKey {
        self.inner.x_only_public_key().0
    }

    /// The BIP-340 x-only form along with the dropped parity, needed to
    /// recover a matching BIP-340 signing key from a plain secp256k1 one.
    pub fn x_only_public_key_with_parity(&self) -> (XOnlyPublicKey, secp256k1::Parity) {
        self.inner.x_only_public_key()
    }

    /// Whether this key's y-coordinate is odd (`secp256k1::Parity::Odd`).
    pub fn parity(&self) -> secp256k1::Parity {
        self.inner.x_only_public_key().1
    }

    /// Uncompressed SEC1 bytes, used as the DLEQ hash input.
    pub fn to_uncompressed_bytes(&self) -> [u8; 65] {
        self.inner.serialize_uncompressed()
    }

    /// Hex-encoded compressed form.
    pub fn to_hex(&self) -> String {
        self.inner.to_string()
    }

    /// Verify a BIP-340 Schnorr signature over `SHA256(msg)`.
    pub fn verify(&self, msg: &[u8], sig: &Signature) -> Result<(), Error> {
        let hash = Sha256Hash::hash(msg);
        let msg = Message::from_digest_slice(hash.as_ref())?;
        SECP256K1.verify_schnorr(sig, &msg, &self.inner.x_only_public_key().0)?;
        Ok(())
    }

    /// `self + other`, as required when deriving P2BK blinded keys.
    pub fn combine(&self, other: &PublicKey) -> Result<PublicKey, Error> {
        Ok(self.inner.combine(&other.inner)?.into())
    }

    /// `self` negated (the point with the same x-coordinate and opposite
    /// parity).
    pub fn negate(&self) -> PublicKey {
        self.inner.negate(&SECP256K1).into()
    }

    /// `scalar * self`.
    pub fn mul_tweak(&self, scalar: &Scalar) -> Result<PublicKey, Error> {
        Ok(self.inner.mul_tweak(&SECP256K1, scalar)?.into())
    }
}

impl FromStr for PublicKey {
    type Err = Error;
    fn from_str(hex: &str) -> Result<Self, Self::Err> {
        Self::from_hex(hex)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(s).map_err(serde::de::Error::custom)
    }
}

/// A secp256k1 private key: a blinding factor, a signing key for P2PK, or
/// a keyset's own private share.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey {
    inner: secp256k1::SecretKey,
}

impl Deref for SecretKey {
    type Target = secp256k1::SecretKey;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl From<secp256k1::SecretKey> for SecretKey {
    fn from(inner: secp256k1::SecretKey) -> Self {
        Self { inner }
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey").field("inner", &"[REDACTED]").finish()
    }
}

impl SecretKey {
    /// Parse from 32 raw bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self, Error> {
        Ok(Self {
            inner: secp256k1::SecretKey::from_slice(slice)?,
        })
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex<S: AsRef<str>>(hex: S) -> Result<Self, Error> {
        Ok(Self {
            inner: secp256k1::SecretKey::from_str(hex.as_ref())?,
        })
    }

    /// Generate a fresh random key using the OS RNG.
    pub fn generate() -> Self {
        let (secret_key, _) = SECP256K1.generate_keypair(&mut OsRng);
        Self { inner: secret_key }
    }

    /// Hex-encoded 32 bytes.
    pub fn to_secret_hex(&self) -> String {
        self.inner.display_secret().to_string()
    }

    /// Raw 32 bytes.
    pub fn to_secret_bytes(&self) -> [u8; 32] {
        self.inner.secret_bytes()
    }

    /// BIP-340 Schnorr signature over `SHA256(msg)`.
    pub fn sign(&self, msg: &[u8]) -> Result<Signature, Error> {
        let hash = Sha256Hash::hash(msg);
        let msg = Message::from_digest_slice(hash.as_ref())?;
        Ok(SECP256K1.sign_schnorr(&msg, &Keypair::from_secret_key(&SECP256K1, &self.inner)))
    }

    /// The corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        self.inner.public_key(&SECP256K1).into()
    }

    /// As a [`Scalar`] for tweak operations.
    pub fn as_scalar(&self) -> Scalar {
        Scalar::from(self.inner)
    }

    /// `self` negated modulo the curve order.
    pub fn negate(&self) -> SecretKey {
        self.inner.negate().into()
    }

    /// `self + scalar` modulo the curve order.
    pub fn add_tweak(&self, scalar: &Scalar) -> Result<SecretKey, Error> {
        Ok(self.inner.add_tweak(scalar)?.into())
    }
}

impl FromStr for SecretKey {
    type Err = Error;
    fn from_str(hex: &str) -> Result<Self, Self::Err> {
        Self::from_hex(hex)
    }
}

impl Serialize for SecretKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match serializer.is_human_readable() {
            true => serializer.serialize_str(&self.to_secret_hex()),
            false => serializer.serialize_bytes(&self.to_secret_bytes()),
        }
    }
}

impl<'de> Deserialize<'de> for SecretKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            SecretKey::from_hex(s).map_err(serde::de::Error::custom)
        } else {
            struct BytesVisitor;
            impl Visitor<'_> for BytesVisitor {
                type Value = SecretKey;
                fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    f.write_str("32 bytes")
                }
                fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                    SecretKey::from_slice(v).map_err(serde::de::Error::custom)
                }
            }
            deserializer.deserialize_bytes(BytesVisitor)
        }
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.inner.non_secure_erase();
    }
}
