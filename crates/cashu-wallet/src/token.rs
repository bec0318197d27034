//! The portable, copy-pasteable encoding of a set of proofs: a binary
//! `cashuB...` form (preferred) and a legacy JSON `cashuA...` form that
//! decoders must still accept.

use bitcoin::base64::engine::{general_purpose, GeneralPurpose};
use bitcoin::base64::{alphabet, Engine as _};
use cashu::{Amount, Id, PublicKey, Secret};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A decoded token: proofs from one mint, ready to hand to `receive`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Mint the proofs were issued by.
    pub mint_url: String,
    /// Unit the proofs are denominated in.
    pub unit: String,
    /// Optional note attached by the sender.
    pub memo: Option<String>,
    /// The proofs themselves.
    pub proofs: cashu::Proofs,
}

impl Token {
    /// Build a token, deduplicating proofs by `(keyset_id, secret)` and
    /// dropping nothing else — callers are expected to pass one mint's
    /// proofs; `clean` is applied automatically.
    pub fn new(mint_url: impl Into<String>, unit: impl Into<String>, proofs: cashu::Proofs, memo: Option<String>) -> Self {
        let token = Self {
            mint_url: mint_url.into(),
            unit: unit.into(),
            memo,
            proofs,
        };
        token.clean()
    }

    /// Deduplicate proofs by `(keyset_id, secret)`, keeping the first
    /// occurrence of each.
    pub fn clean(mut self) -> Self {
        let mut seen = std::collections::HashSet::new();
        self.proofs
            .retain(|p| seen.insert((p.keyset_id, p.secret.to_string())));
        self
    }

    /// Total value of the token's proofs.
    pub fn value(&self) -> Amount {
        self.proofs.iter().map(|p| p.amount).sum()
    }

    /// Encode as the preferred binary `cashuB...` form.
    pub fn encode_binary(&self) -> Result<String, Error> {
        let repr = BinaryToken::try_from(self)?;
        let mut bytes = Vec::new();
        ciborium::into_writer(&repr, &mut bytes)
            .map_err(|e| Error::Protocol(format!("cbor encode: {e}")))?;
        Ok(format!("cashuB{}", url_safe_no_pad().encode(bytes)))
    }

    /// Encode as the legacy JSON `cashuA...` form, for mints/wallets that
    /// have not adopted the binary encoding.
    pub fn encode_legacy(&self) -> Result<String, Error> {
        let repr = LegacyToken::from(self);
        let json = serde_json::to_string(&repr)
            .map_err(|e| Error::Protocol(format!("json encode: {e}")))?;
        Ok(format!("cashuA{}", url_safe_no_pad().encode(json)))
    }

    /// Decode either wire form.
    pub fn decode(s: &str) -> Result<Self, Error> {
        if let Some(rest) = s.strip_prefix("cashuB") {
            let bytes = decode_base64_tolerant(rest)?;
            let repr: BinaryToken = ciborium::from_reader(&bytes[..])
                .map_err(|e| Error::Protocol(format!("cbor decode: {e}")))?;
            repr.into_token()
        } else if let Some(rest) = s.strip_prefix("cashuA") {
            let bytes = decode_base64_tolerant(rest)?;
            let json = String::from_utf8(bytes)
                .map_err(|e| Error::Protocol(format!("token is not valid utf-8: {e}")))?;
            let repr: LegacyToken = serde_json::from_str(&json)
                .map_err(|e| Error::Protocol(format!("json decode: {e}")))?;
            repr.into_token()
        } else {
            Err(Error::Validation(
                "token must start with cashuA or cashuB".into(),
            ))
        }
    }
}

fn url_safe_no_pad() -> GeneralPurpose {
    let config = general_purpose::GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(bitcoin::base64::engine::DecodePaddingMode::Indifferent);
    GeneralPurpose::new(&alphabet::URL_SAFE, config)
}

fn decode_base64_tolerant(s: &str) -> Result<Vec<u8>, Error> {
    url_safe_no_pad()
        .decode(s)
        .map_err(|e| Error::Validation(format!("invalid base64url: {e}")))
}

// --- legacy JSON wire shape -------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct LegacyToken {
    token: Vec<LegacyMintEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    memo: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LegacyMintEntry {
    mint: String,
    proofs: Vec<cashu::Proof>,
}

impl From<&Token> for LegacyToken {
    fn from(token: &Token) -> Self {
        Self {
            token: vec![LegacyMintEntry {
                mint: token.mint_url.clone(),
                proofs: token.proofs.clone(),
            }],
            unit: Some(token.unit.clone()),
            memo: token.memo.clone(),
        }
    }
}

impl LegacyToken {
    fn into_token(self) -> Result<Token, Error> {
        if self.token.iter().any(|entry| entry.proofs.is_empty()) {
            return Err(Error::Protocol("token entry has no proofs".into()));
        }
        let mint_url = self
            .token
            .first()
            .ok_or_else(|| Error::Protocol("token has no mint entries".into()))?
            .mint
            .clone();
        let proofs = self
            .token
            .into_iter()
            .flat_map(|entry| entry.proofs)
            .collect();
        Ok(Token::new(
            mint_url,
            self.unit.unwrap_or_else(|| "sat".to_string()),
            proofs,
            self.memo,
        ))
    }
}

// --- binary CBOR wire shape ---------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct BinaryToken {
    #[serde(rename = "m")]
    mint_url: String,
    #[serde(rename = "u")]
    unit: String,
    #[serde(rename = "t")]
    entries: Vec<BinaryEntry>,
    #[serde(rename = "d", skip_serializing_if = "Option::is_none")]
    memo: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BinaryEntry {
    #[serde(rename = "i", with = "id_bytes")]
    keyset_id: Id,
    #[serde(rename = "p")]
    proofs: Vec<BinaryProof>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BinaryProof {
    #[serde(rename = "a")]
    amount: Amount,
    #[serde(rename = "s", with = "utf8_bytes")]
    secret: String,
    #[serde(rename = "c", with = "pubkey_bytes")]
    c: PublicKey,
    #[serde(rename = "d", skip_serializing_if = "Option::is_none")]
    dleq: Option<cashu::dhke::DleqProof>,
    #[serde(rename = "w", skip_serializing_if = "Option::is_none")]
    witness: Option<String>,
}

mod id_bytes {
    use cashu::Id;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &Id, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&id.to_bytes())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Id, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        Id::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

mod utf8_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(s: &String, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(s.as_bytes())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        String::from_utf8(bytes).map_err(serde::de::Error::custom)
    }
}

mod pubkey_bytes {
    use cashu::PublicKey;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(key: &PublicKey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&key.to_bytes())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PublicKey, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        PublicKey::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<&Token> for BinaryToken {
    type Error = Error;

    fn try_from(token: &Token) -> Result<Self, Error> {
        let mut by_keyset: Vec<(Id, Vec<BinaryProof>)> = Vec::new();
        for proof in &token.proofs {
            let witness = proof
                .witness
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(|e| Error::Protocol(format!("witness encode: {e}")))?;
            let binary_proof = BinaryProof {
                amount: proof.amount,
                secret: proof.secret.to_string(),
                c: proof.c,
                dleq: proof.dleq.clone(),
                witness,
            };
            match by_keyset.iter_mut().find(|(id, _)| *id == proof.keyset_id) {
                Some((_, proofs)) => proofs.push(binary_proof),
                None => by_keyset.push((proof.keyset_id, vec![binary_proof])),
            }
        }

        Ok(Self {
            mint_url: token.mint_url.clone(),
            unit: token.unit.clone(),
            entries: by_keyset
                .into_iter()
                .map(|(keyset_id, proofs)| BinaryEntry { keyset_id, proofs })
                .collect(),
            memo: token.memo.clone(),
        })
    }
}

impl BinaryToken {
    fn into_token(self) -> Result<Token, Error> {
        let mut proofs = cashu::Proofs::new();
        for entry in self.entries {
            for proof in entry.proofs {
                let witness = proof
                    .witness
                    .map(|w| serde_json::from_str(&w))
                    .transpose()
                    .map_err(|e| Error::Protocol(format!("witness decode: {e}")))?;
                let mut full = cashu::Proof::new(
                    proof.amount,
                    entry.keyset_id,
                    Secret::new(proof.secret),
                    proof.c,
                );
                full.witness = witness;
                full.dleq = proof.dleq;
                proofs.push(full);
            }
        }
        Ok(Token::new(self.mint_url, self.unit, proofs, self.memo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashu::keys::SecretKey;

    fn sample_proof(amount: u64, keyset_id: Id) -> cashu::Proof {
        cashu::Proof::new(
            Amount::from(amount),
            keyset_id,
            Secret::generate(),
            SecretKey::generate().public_key(),
        )
    }

    #[test]
    fn binary_round_trips_through_itself() {
        let keyset_id = Id::from_hex("009a1f293253e41e").unwrap();
        let token = Token::new(
            "https://mint.example",
            "sat",
            vec![sample_proof(4, keyset_id), sample_proof(8, keyset_id)],
            Some("thanks".into()),
        );
        let encoded = token.encode_binary().unwrap();
        assert!(encoded.starts_with("cashuB"));
        let decoded = Token::decode(&encoded).unwrap();
        assert_eq!(decoded.value(), token.value());
        assert_eq!(decoded.mint_url, token.mint_url);
        assert_eq!(decoded.memo, token.memo);
    }

    #[test]
    fn legacy_json_round_trips_through_itself() {
        let keyset_id = Id::from_hex("009a1f293253e41e").unwrap();
        let token = Token::new(
            "https://mint.example",
            "sat",
            vec![sample_proof(2, keyset_id)],
            None,
        );
        let encoded = token.encode_legacy().unwrap();
        assert!(encoded.starts_with("cashuA"));
        let decoded = Token::decode(&encoded).unwrap();
        assert_eq!(decoded.value(), token.value());
    }

    #[test]
    fn decoding_legacy_fixture_recovers_expected_proof() {
        // Keyset id and secret shape match a real legacy-mint token; the
        // secp256k1 point is the curve generator (any valid compressed
        // point would do — only the wire round-trip is under test).
        let keyset_id = Id::from_base64("0NI3TUAs1Sfy").unwrap();
        let secret = Secret::new("H5jmg3pDRkTJabcdef0123456789abcdef0123456789abcdef0123456789ab");
        let c = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
            .parse::<PublicKey>()
            .unwrap();
        let fixture = Token::new(
            "https://mint.example",
            "sat",
            vec![cashu::Proof::new(Amount::from(1), keyset_id, secret.clone(), c)],
            None,
        );
        let legacy = fixture.encode_legacy().unwrap();
        let decoded = Token::decode(&legacy).unwrap();
        assert_eq!(decoded.proofs.len(), 1);
        assert_eq!(decoded.proofs[0].amount, Amount::from(1));
        assert_eq!(decoded.proofs[0].secret, secret);
        assert_eq!(decoded.proofs[0].c, c);
        assert_eq!(decoded.proofs[0].keyset_id, keyset_id);

        let binary = decoded.encode_binary().unwrap();
        let redecoded = Token::decode(&binary).unwrap();
        assert_eq!(redecoded.proofs, decoded.proofs);
    }

    #[test]
    fn clean_drops_duplicate_proofs_by_keyset_and_secret() {
        let keyset_id = Id::from_hex("009a1f293253e41e").unwrap();
        let proof = sample_proof(1, keyset_id);
        let token = Token::new(
            "https://mint.example",
            "sat",
            vec![proof.clone(), proof],
            None,
        );
        assert_eq!(token.proofs.len(), 1);
    }
}
