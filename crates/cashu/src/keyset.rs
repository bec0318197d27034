//! Keyset identifiers and the per-denomination public key maps they name.

use std::collections::BTreeMap;
use std::str::FromStr;

use bitcoin::base64::engine::general_purpose::{STANDARD, URL_SAFE};
use bitcoin::base64::Engine as _;
use bitcoin::hashes::{sha256, Hash};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::{Amount, PublicKey};

/// Which derivation and id-computation scheme a keyset uses, selected by
/// the id's leading version byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySetVersion {
    /// Legacy: BIP-32 hardened derivation, 7-byte truncated hash body.
    Version00,
    /// Current: HMAC-SHA256 derivation, full 32-byte hash body.
    Version01,
}

/// A mint keyset id: a version byte followed by a hash of the keyset's
/// public keys, or (for the oldest mints) a bare 9-byte base64 id with no
/// version marker, which this crate also treats as legacy.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id {
    version: KeySetVersion,
    bytes: IdBytes,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum IdBytes {
    /// 8 bytes total: version byte + 7-byte hash body.
    Legacy([u8; 8]),
    /// 9 raw bytes, predates the version-byte convention entirely.
    LegacyBase64([u8; 9]),
    /// 33 bytes total: version byte + 32-byte hash body.
    Current([u8; 33]),
}

impl std::fmt::Debug for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Id({})", self)
    }
}

impl Id {
    /// Which derivation scheme this id selects.
    pub fn get_version(&self) -> KeySetVersion {
        self.version
    }

    /// Raw bytes as they appear on the wire (binary token encoding, KDF
    /// input). For the base64 legacy form this is the 9 raw bytes; it is
    /// never hex-printed.
    pub fn to_bytes(&self) -> Vec<u8> {
        match &self.bytes {
            IdBytes::Legacy(b) => b.to_vec(),
            IdBytes::LegacyBase64(b) => b.to_vec(),
            IdBytes::Current(b) => b.to_vec(),
        }
    }

    /// Parse a hex-encoded id (`00`-prefixed 8 bytes, or `01`-prefixed 33
    /// bytes).
    pub fn from_hex(hex: &str) -> Result<Self, Error> {
        let bytes = crate::util::hex::decode(hex)
            .map_err(|e| Error::InvalidKeysetId(e.to_string()))?;
        match bytes.first() {
            Some(0x00) if bytes.len() == 8 => {
                let mut arr = [0u8; 8];
                arr.copy_from_slice(&bytes);
                Ok(Self {
                    version: KeySetVersion::Version00,
                    bytes: IdBytes::Legacy(arr),
                })
            }
            Some(0x01) if bytes.len() == 33 => {
                let mut arr = [0u8; 33];
                arr.copy_from_slice(&bytes);
                Ok(Self {
                    version: KeySetVersion::Version01,
                    bytes: IdBytes::Current(arr),
                })
            }
            _ => Err(Error::InvalidKeysetId(hex.to_string())),
        }
    }

    /// Parse raw id bytes as they appear in a binary token or RPC payload:
    /// 8 bytes for a `00`-prefixed legacy id, 9 for a legacy base64 id, or
    /// 33 for a `01`-prefixed current id.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        match bytes.len() {
            8 => {
                let mut arr = [0u8; 8];
                arr.copy_from_slice(bytes);
                Ok(Self {
                    version: KeySetVersion::Version00,
                    bytes: IdBytes::Legacy(arr),
                })
            }
            9 => {
                let mut arr = [0u8; 9];
                arr.copy_from_slice(bytes);
                Ok(Self {
                    version: KeySetVersion::Version00,
                    bytes: IdBytes::LegacyBase64(arr),
                })
            }
            33 => {
                let mut arr = [0u8; 33];
                arr.copy_from_slice(bytes);
                Ok(Self {
                    version: KeySetVersion::Version01,
                    bytes: IdBytes::Current(arr),
                })
            }
            _ => Err(Error::InvalidKeysetId(format!(
                "unexpected id length {}",
                bytes.len()
            ))),
        }
    }

    /// Parse a 12-character base64 id (9 raw bytes, no version marker).
    pub fn from_base64(b64: &str) -> Result<Self, Error> {
        if b64.len() != 12 {
            return Err(Error::InvalidKeysetId(b64.to_string()));
        }
        let bytes = URL_SAFE
            .decode(b64)
            .or_else(|_| STANDARD.decode(b64))
            .map_err(|_| Error::InvalidKeysetId(b64.to_string()))?;
        if bytes.len() != 9 {
            return Err(Error::InvalidKeysetId(b64.to_string()));
        }
        let mut arr = [0u8; 9];
        arr.copy_from_slice(&bytes);
        Ok(Self {
            version: KeySetVersion::Version00,
            bytes: IdBytes::LegacyBase64(arr),
        })
    }

    /// Compute the id for a keyset's public keys, using the given version.
    /// `unit` and `expiry` only feed the hash for [`KeySetVersion::Version01`];
    /// the legacy scheme hashes the keys alone.
    pub fn from_keys(keys: &Keys, unit: &str, expiry: Option<u64>, version: KeySetVersion) -> Self {
        let mut amounts: Vec<&Amount> = keys.0.keys().collect();
        amounts.sort();
        let mut concat = Vec::new();
        for amount in amounts {
            concat.extend_from_slice(&keys.0[amount].to_bytes());
        }

        match version {
            KeySetVersion::Version00 => {
                let hash = sha256::Hash::hash(&concat).to_byte_array();
                let mut arr = [0u8; 8];
                arr[0] = 0x00;
                arr[1..].copy_from_slice(&hash[0..7]);
                Self {
                    version,
                    bytes: IdBytes::Legacy(arr),
                }
            }
            KeySetVersion::Version01 => {
                concat.extend_from_slice(unit.as_bytes());
                if let Some(expiry) = expiry {
                    concat.extend_from_slice(&expiry.to_be_bytes());
                }
                let hash = sha256::Hash::hash(&concat).to_byte_array();
                let mut arr = [0u8; 33];
                arr[0] = 0x01;
                arr[1..].copy_from_slice(&hash[0..32]);
                Self {
                    version,
                    bytes: IdBytes::Current(arr),
                }
            }
        }
    }

    /// Verify that `self` is the id `keys` (published under `unit`, with
    /// `expiry`) would produce.
    pub fn verify(&self, keys: &Keys, unit: &str, expiry: Option<u64>) -> bool {
        *self == Self::from_keys(keys, unit, expiry, self.version)
    }

    /// Reduce the id to an integer modulo `2^31 - 1`, the range legacy
    /// BIP-32 hardened derivation indexes into.
    pub(crate) fn legacy_index(&self) -> u32 {
        let bytes = self.to_bytes();
        let mut acc: u128 = 0;
        for b in &bytes {
            acc = (acc << 8) | *b as u128;
        }
        (acc % ((1u128 << 31) - 1)) as u32
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.bytes {
            IdBytes::Legacy(b) => write!(f, "{}", crate::util::hex::encode(b)),
            IdBytes::Current(b) => write!(f, "{}", crate::util::hex::encode(b)),
            IdBytes::LegacyBase64(b) => {
                write!(f, "{}", STANDARD.encode(b))
            }
        }
    }
}

impl FromStr for Id {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 12 {
            Self::from_base64(s)
        } else {
            Self::from_hex(s)
        }
    }
}

impl Serialize for Id {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Maps a denomination to the mint's public key for that denomination,
/// within one keyset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keys(BTreeMap<Amount, PublicKey>);

impl Keys {
    /// Build from an amount-to-pubkey map.
    pub fn new(map: BTreeMap<Amount, PublicKey>) -> Self {
        Self(map)
    }

    /// The mint's public key for a denomination, if this keyset has one.
    pub fn amount_key(&self, amount: Amount) -> Option<&PublicKey> {
        self.0.get(&amount)
    }

    /// Iterate `(amount, pubkey)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Amount, &PublicKey)> {
        self.0.iter()
    }
}

/// Non-secret metadata about a keyset, as advertised by `/v1/keysets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySetInfo {
    /// Keyset id.
    pub id: Id,
    /// Unit this keyset issues (e.g. `"sat"`).
    pub unit: String,
    /// Whether new outputs may be minted against this keyset.
    pub active: bool,
    /// Per-input fee, in parts-per-thousand, charged when this keyset's
    /// proofs are spent.
    #[serde(default)]
    pub input_fee_ppk: u64,
    /// Unix time after which this keyset's signatures should no longer be
    /// trusted, if the mint advertises one. Feeds `0x01` id verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_hex_roundtrips() {
        let id = Id::from_hex("009a1f293253e41e").unwrap();
        assert_eq!(id.to_string(), "009a1f293253e41e");
        assert_eq!(id.get_version(), KeySetVersion::Version00);
    }

    #[test]
    fn current_hex_roundtrips() {
        let id = Id::from_hex(
            "012e23479a0029432eaad0d2040c09be53bab592d5cbf1d55e0dd26c9495951b30",
        )
        .unwrap();
        assert_eq!(id.get_version(), KeySetVersion::Version01);
        assert_eq!(id.to_bytes().len(), 33);
    }

    #[test]
    fn legacy_index_matches_derivation_vector() {
        let id = Id::from_hex("009a1f293253e41e").unwrap();
        assert_eq!(id.legacy_index(), 864_559_728);
    }

    #[test]
    fn rejects_unknown_version_byte() {
        assert!(Id::from_hex("0200000000000000").is_err());
    }

    #[test]
    fn version01_id_hashes_in_unit_and_expiry() {
        let mut map = BTreeMap::new();
        map.insert(Amount::from(1u64), PublicKey::from_hex(
            "02194603ffa36356f4a56b7df9371fc3192472351453ec7398b8da8117e7c3e104",
        ).unwrap());
        let keys = Keys::new(map);

        let sat = Id::from_keys(&keys, "sat", Some(1_700_000_000), KeySetVersion::Version01);
        assert!(sat.verify(&keys, "sat", Some(1_700_000_000)));
        assert!(!sat.verify(&keys, "usd", Some(1_700_000_000)));
        assert!(!sat.verify(&keys, "sat", Some(1_700_000_001)));
        assert!(!sat.verify(&keys, "sat", None));

        let no_expiry = Id::from_keys(&keys, "sat", None, KeySetVersion::Version01);
        assert_ne!(sat, no_expiry);
        assert!(no_expiry.verify(&keys, "sat", None));
    }
}
