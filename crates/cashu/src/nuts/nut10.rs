//! Well-known secrets: a `["Kind", {nonce, data, tags}]` JSON envelope
//! carried inside [`crate::secret::Secret`] whenever a proof is locked to
//! a spending condition instead of being a bare random secret.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::Error;
use crate::secret::Secret;

/// Which spending condition a well-known secret encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// NUT-11 pay-to-public-key.
    P2PK,
    /// NUT-26 pay-to-blinded-key.
    P2BK,
}

/// The second element of the envelope: the condition's parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretData {
    nonce: String,
    data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<Vec<Vec<String>>>,
}

impl SecretData {
    /// Build a fresh random nonce with the given `data` and `tags`.
    pub fn new(data: impl Into<String>, tags: Option<Vec<Vec<String>>>) -> Self {
        Self {
            nonce: hex::encode(random_nonce()),
            data: data.into(),
            tags,
        }
    }

    /// The lock's principal datum (a pubkey, typically).
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Extension tags, each a `[key, values...]` array.
    pub fn tags(&self) -> Option<&[Vec<String>]> {
        self.tags.as_deref()
    }

    /// First value of the tag named `key`, if present.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .as_ref()?
            .iter()
            .find(|t| t.first().map(String::as_str) == Some(key))?
            .get(1)
            .map(String::as_str)
    }

    /// All values of the tag named `key` after the key itself.
    pub fn tag_values(&self, key: &str) -> Vec<&str> {
        self.tags
            .as_ref()
            .into_iter()
            .flatten()
            .filter(|t| t.first().map(String::as_str) == Some(key))
            .flat_map(|t| t[1..].iter().map(String::as_str))
            .collect()
    }
}

fn random_nonce() -> [u8; 16] {
    use bitcoin::secp256k1::rand::RngCore;
    let mut bytes = [0u8; 16];
    bitcoin::secp256k1::rand::rngs::OsRng.fill_bytes(&mut bytes);
    bytes
}

/// A parsed well-known secret: `[Kind, SecretData]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WellKnownSecret {
    kind: Kind,
    data: SecretData,
}

impl WellKnownSecret {
    /// Build a new well-known secret with a fresh nonce.
    pub fn new(kind: Kind, data: impl Into<String>, tags: Option<Vec<Vec<String>>>) -> Self {
        Self {
            kind,
            data: SecretData::new(data, tags),
        }
    }

    /// Which condition this secret encodes.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// The condition's parameters.
    pub fn secret_data(&self) -> &SecretData {
        &self.data
    }
}

impl Serialize for WellKnownSecret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_tuple(2)?;
        s.serialize_element(&self.kind)?;
        s.serialize_element(&self.data)?;
        s.end()
    }
}

struct WellKnownSecretVisitor;

impl<'de> Visitor<'de> for WellKnownSecretVisitor {
    type Value = WellKnownSecret;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a tuple [Kind, SecretData]")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let kind = seq.next_element()?.ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let data = seq.next_element()?.ok_or_else(|| de::Error::invalid_length(1, &self))?;
        if seq.next_element::<de::IgnoredAny>()?.is_some() {
            return Err(de::Error::invalid_length(3, &self));
        }
        Ok(WellKnownSecret { kind, data })
    }
}

impl<'de> Deserialize<'de> for WellKnownSecret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(WellKnownSecretVisitor)
    }
}

impl FromStr for WellKnownSecret {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s).map_err(|e| Error::MalformedSecret(e.to_string()))
    }
}

impl TryFrom<&Secret> for WellKnownSecret {
    type Error = Error;
    fn try_from(secret: &Secret) -> Result<Self, Self::Error> {
        let s = String::from_utf8(secret.to_bytes())
            .map_err(|e| Error::MalformedSecret(e.to_string()))?;
        Self::from_str(&s)
    }
}

impl TryFrom<WellKnownSecret> for Secret {
    type Error = Error;
    fn try_from(value: WellKnownSecret) -> Result<Self, Self::Error> {
        let json = serde_json::to_string(&value)?;
        Ok(Secret::new(json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_json() {
        let secret = WellKnownSecret {
            kind: Kind::P2PK,
            data: SecretData {
                nonce: "5d11913ee0f92fefdc82a6764fd2457a".to_string(),
                data: "026562efcfadc8e86d44da6a8adf80633d974302e62c850774db1fb36ff4cc7198"
                    .to_string(),
                tags: Some(vec![vec![
                    "key".to_string(),
                    "value1".to_string(),
                    "value2".to_string(),
                ]]),
            },
        };
        let json = serde_json::to_string(&secret).unwrap();
        assert_eq!(
            json,
            r#"["P2PK",{"nonce":"5d11913ee0f92fefdc82a6764fd2457a","data":"026562efcfadc8e86d44da6a8adf80633d974302e62c850774db1fb36ff4cc7198","tags":[["key","value1","value2"]]}]"#
        );
        let back: WellKnownSecret = serde_json::from_str(&json).unwrap();
        assert_eq!(back, secret);
    }

    #[test]
    fn tag_lookup_returns_first_value() {
        let secret = WellKnownSecret::new(
            Kind::P2PK,
            "02ab",
            Some(vec![vec!["locktime".to_string(), "99999".to_string()]]),
        );
        assert_eq!(secret.secret_data().tag("locktime"), Some("99999"));
        assert_eq!(secret.secret_data().tag("missing"), None);
    }
}
