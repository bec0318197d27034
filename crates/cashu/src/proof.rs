//! The wire types exchanged with a mint: blinded messages going out,
//! blind signatures coming back, and the proofs a holder assembles from
//! the two.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::dhke::{hash_to_curve, DleqProof};
use crate::error::Error;
use crate::keyset::Id;
use crate::keys::PublicKey;
use crate::secret::Secret;
use crate::Amount;

/// A blinded message (`B_`), sent to the mint to be signed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlindedMessage {
    /// Requested denomination.
    pub amount: Amount,
    /// Keyset this message should be signed against.
    #[serde(rename = "id")]
    pub keyset_id: Id,
    /// The blinded point itself.
    #[serde(rename = "B_")]
    pub blinded_secret: PublicKey,
    /// Present when the output is locked to a NUT-20 mint-quote pubkey.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness: Option<Witness>,
}

impl BlindedMessage {
    /// Build a new, witness-less blinded message.
    pub fn new(amount: Amount, keyset_id: Id, blinded_secret: PublicKey) -> Self {
        Self {
            amount,
            keyset_id,
            blinded_secret,
            witness: None,
        }
    }
}

/// A mint's signature over a blinded message (`C_`), also called a promise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindSignature {
    /// Denomination the mint signed.
    pub amount: Amount,
    /// Keyset that produced the signature.
    #[serde(rename = "id")]
    pub keyset_id: Id,
    /// The blind signature point.
    #[serde(rename = "C_")]
    pub c: PublicKey,
    /// DLEQ proof tying `C_` to the mint's per-denomination key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dleq: Option<DleqProof>,
}

/// Unlocking data attached to a proof or output: signatures for P2PK/P2BK.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Witness {
    /// Hex-encoded BIP-340 Schnorr signatures.
    #[serde(default)]
    pub signatures: Vec<String>,
}

impl Witness {
    /// Append a signature, skipping it if an identical one is already
    /// present.
    pub fn add_signature(&mut self, sig_hex: String) {
        if !self.signatures.contains(&sig_hex) {
            self.signatures.push(sig_hex);
        }
    }
}

/// An unblinded, spendable ecash proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Denomination.
    pub amount: Amount,
    /// Keyset the signature was issued from.
    #[serde(rename = "id")]
    pub keyset_id: Id,
    /// The secret hidden inside the proof.
    pub secret: Secret,
    /// The unblinded mint signature.
    #[serde(rename = "C")]
    pub c: PublicKey,
    /// Spending-condition witness, if the secret requires one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness: Option<Witness>,
    /// DLEQ proof, re-blindable by the holder to verify `C` without
    /// trusting whoever handed them the proof.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dleq: Option<DleqProof>,
}

impl Proof {
    /// Build a new, witness-less, DLEQ-less proof.
    pub fn new(amount: Amount, keyset_id: Id, secret: Secret, c: PublicKey) -> Self {
        Self {
            amount,
            keyset_id,
            secret,
            c,
            witness: None,
            dleq: None,
        }
    }

    /// `Y = hash_to_curve(secret)`, the value a mint uses to look up spend
    /// state without learning the secret's plaintext form.
    pub fn y(&self) -> Result<PublicKey, Error> {
        hash_to_curve(&self.secret.to_bytes())
    }

    /// Whether this proof's keyset is in the given active set.
    pub fn is_active(&self, active_keyset_ids: &[Id]) -> bool {
        active_keyset_ids.contains(&self.keyset_id)
    }
}

impl Hash for Proof {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.secret.hash(state);
    }
}

impl Ord for Proof {
    fn cmp(&self, other: &Self) -> Ordering {
        self.amount
            .cmp(&other.amount)
            .then_with(|| self.keyset_id.to_string().cmp(&other.keyset_id.to_string()))
            .then_with(|| self.secret.to_string().cmp(&other.secret.to_string()))
    }
}

impl PartialOrd for Proof {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A bag of proofs, typically all from the same mint.
pub type Proofs = Vec<Proof>;

/// Bulk helpers over a [`Proofs`] collection.
pub trait ProofsMethods {
    /// Sum of all proof amounts. Errors on overflow.
    fn total_amount(&self) -> Amount;
    /// Proof count grouped by keyset.
    fn count_by_keyset(&self) -> HashMap<Id, u64>;
    /// Amount sum grouped by keyset.
    fn sum_by_keyset(&self) -> HashMap<Id, Amount>;
    /// `Y = hash_to_curve(secret)` for every proof, in order.
    fn ys(&self) -> Result<Vec<PublicKey>, Error>;
}

impl ProofsMethods for Proofs {
    fn total_amount(&self) -> Amount {
        self.iter().map(|p| p.amount).sum()
    }

    fn count_by_keyset(&self) -> HashMap<Id, u64> {
        let mut map = HashMap::new();
        for proof in self {
            *map.entry(proof.keyset_id).or_insert(0) += 1;
        }
        map
    }

    fn sum_by_keyset(&self) -> HashMap<Id, Amount> {
        let mut map: HashMap<Id, Amount> = HashMap::new();
        for proof in self {
            *map.entry(proof.keyset_id).or_insert(Amount::ZERO) += proof.amount;
        }
        map
    }

    fn ys(&self) -> Result<Vec<PublicKey>, Error> {
        self.iter().map(Proof::y).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_amount_sums_all_proofs() {
        let proofs: Proofs = vec![
            Proof::new(Amount::from(1), dummy_id(), Secret::generate(), dummy_pk()),
            Proof::new(Amount::from(4), dummy_id(), Secret::generate(), dummy_pk()),
        ];
        assert_eq!(proofs.total_amount().to_u64(), 5);
    }

    fn dummy_id() -> Id {
        Id::from_hex("009a1f293253e41e").unwrap()
    }

    fn dummy_pk() -> PublicKey {
        crate::keys::SecretKey::generate().public_key()
    }
}
