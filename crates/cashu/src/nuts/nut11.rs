//! Pay to Public Key: lock a proof's secret to one or more public keys so
//! only a holder of the matching private key(s) can produce a valid witness.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use bitcoin::secp256k1::schnorr::Signature;
use serde::{Deserialize, Serialize};

use super::nut10::{Kind, WellKnownSecret};
use crate::error::Error;
use crate::keys::{PublicKey, SecretKey};
use crate::proof::{BlindedMessage, Proof, Witness};
use crate::util::unix_time;

/// Whether a signature threshold applies only to a transaction's inputs, or
/// to both its inputs and outputs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SigFlag {
    /// Require valid signatures on every input (the default).
    #[default]
    SigInputs,
    /// Require valid signatures on every input and every output.
    SigAll,
}

impl fmt::Display for SigFlag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::SigInputs => "SIG_INPUTS",
            Self::SigAll => "SIG_ALL",
        })
    }
}

impl FromStr for SigFlag {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SIG_INPUTS" => Ok(Self::SigInputs),
            "SIG_ALL" => Ok(Self::SigAll),
            _ => Err(Error::UnknownSigFlag),
        }
    }
}

/// The optional tags a P2PK secret can carry, beyond its single required
/// locking pubkey.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Conditions {
    /// Unix time after which `refund_keys` become usable instead of the
    /// primary keys.
    pub locktime: Option<u64>,
    /// Additional pubkeys, alongside the secret's own `data` pubkey.
    pub pubkeys: Vec<PublicKey>,
    /// Pubkeys that may reclaim the ecash once `locktime` has passed.
    pub refund_keys: Vec<PublicKey>,
    /// Signatures required before `locktime`. Defaults to 1.
    pub num_sigs: u64,
    /// Signatures required after `locktime`, from `refund_keys`. Defaults to 1.
    pub num_sigs_refund: u64,
    /// Whether outputs must also be signed.
    pub sig_flag: SigFlag,
}

impl Conditions {
    /// Build new conditions, rejecting a locktime already in the past.
    pub fn new(
        locktime: Option<u64>,
        pubkeys: Vec<PublicKey>,
        refund_keys: Vec<PublicKey>,
        num_sigs: Option<u64>,
        num_sigs_refund: Option<u64>,
        sig_flag: SigFlag,
    ) -> Result<Self, Error> {
        if let Some(locktime) = locktime {
            if locktime < unix_time() {
                return Err(Error::LocktimeInPast);
            }
        }
        Ok(Self {
            locktime,
            pubkeys,
            refund_keys,
            num_sigs: num_sigs.unwrap_or(1),
            num_sigs_refund: num_sigs_refund.unwrap_or(1),
            sig_flag,
        })
    }

    fn to_tags(&self) -> Vec<Vec<String>> {
        let mut tags = Vec::new();
        if !self.pubkeys.is_empty() {
            let mut tag = vec!["pubkeys".to_string()];
            tag.extend(self.pubkeys.iter().map(PublicKey::to_hex));
            tags.push(tag);
        }
        if let Some(locktime) = self.locktime {
            tags.push(vec!["locktime".to_string(), locktime.to_string()]);
        }
        if !self.pubkeys.is_empty() && self.num_sigs > 1 {
            tags.push(vec!["n_sigs".to_string(), self.num_sigs.to_string()]);
        }
        if !self.refund_keys.is_empty() {
            let mut tag = vec!["refund".to_string()];
            tag.extend(self.refund_keys.iter().map(PublicKey::to_hex));
            tags.push(tag);
            if self.num_sigs_refund > 1 {
                tags.push(vec!["n_sigs_refund".to_string(), self.num_sigs_refund.to_string()]);
            }
        }
        tags.push(vec!["sigflag".to_string(), self.sig_flag.to_string()]);
        tags
    }

    fn from_tags(tags: &[Vec<String>]) -> Result<Self, Error> {
        let mut conditions = Conditions {
            num_sigs: 1,
            num_sigs_refund: 1,
            ..Default::default()
        };
        for tag in tags {
            let Some((key, values)) = tag.split_first() else {
                continue;
            };
            match key.as_str() {
                "pubkeys" => {
                    conditions.pubkeys = values
                        .iter()
                        .map(|v| PublicKey::from_hex(v))
                        .collect::<Result<_, _>>()?
                }
                "locktime" => {
                    conditions.locktime =
                        values.first().and_then(|v| v.parse().ok())
                }
                "n_sigs" => {
                    conditions.num_sigs = values
                        .first()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(1)
                }
                "n_sigs_refund" => {
                    conditions.num_sigs_refund = values
                        .first()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(1)
                }
                "refund" => {
                    conditions.refund_keys = values
                        .iter()
                        .map(|v| PublicKey::from_hex(v))
                        .collect::<Result<_, _>>()?
                }
                "sigflag" => {
                    if let Some(v) = values.first() {
                        conditions.sig_flag = SigFlag::from_str(v)?;
                    }
                }
                _ => {}
            }
        }
        Ok(conditions)
    }
}

/// Build the well-known secret for locking `amount`-denominated ecash to
/// `pubkey`, with optional extra [`Conditions`].
pub fn lock_to_pubkey(pubkey: PublicKey, conditions: Option<Conditions>) -> WellKnownSecret {
    let tags = conditions.map(|c| c.to_tags());
    WellKnownSecret::new(Kind::P2PK, pubkey.to_hex(), tags)
}

fn authorized_pubkeys(secret: &WellKnownSecret) -> Result<(Vec<PublicKey>, Conditions), Error> {
    if secret.kind() != Kind::P2PK {
        return Err(Error::IncorrectSecretKind(secret.kind()));
    }
    let conditions = match secret.secret_data().tags() {
        Some(tags) => Conditions::from_tags(tags)?,
        None => Conditions {
            num_sigs: 1,
            num_sigs_refund: 1,
            ..Default::default()
        },
    };
    let owner = PublicKey::from_hex(secret.secret_data().data())?;
    let expired = conditions.locktime.is_some_and(|t| unix_time() >= t);
    let keys = if expired {
        conditions.refund_keys.clone()
    } else if conditions.num_sigs < 1 {
        vec![owner]
    } else {
        let mut keys = vec![owner];
        keys.extend(conditions.pubkeys.iter().copied());
        keys
    };
    Ok((keys, conditions))
}

/// Count distinct pubkeys in `pubkeys` with a valid signature over `msg` in
/// `signatures`. A pubkey with more than one valid signature is an error:
/// that can only happen if the witness was tampered with or duplicated.
pub fn count_valid_signatures(
    msg: &[u8],
    pubkeys: &[PublicKey],
    signatures: &[String],
) -> Result<u64, Error> {
    let mut verified = HashSet::new();
    for sig_hex in signatures {
        let sig = Signature::from_str(sig_hex)?;
        for pubkey in pubkeys {
            if pubkey.verify(msg, &sig).is_ok() && !verified.insert(*pubkey) {
                return Err(Error::DuplicateSignature);
            }
        }
    }
    Ok(verified.len() as u64)
}

impl Proof {
    /// Sign this proof's secret with `key`, appending to its witness.
    pub fn sign_p2pk(&mut self, key: &SecretKey) -> Result<(), Error> {
        let sig = key.sign(&self.secret.to_bytes())?;
        self.witness
            .get_or_insert_with(Witness::default)
            .add_signature(sig.to_string());
        Ok(())
    }

    /// Verify this proof's P2PK witness satisfies its secret's conditions.
    pub fn verify_p2pk(&self) -> Result<(), Error> {
        let secret = WellKnownSecret::try_from(&self.secret)?;
        let (pubkeys, conditions) = authorized_pubkeys(&secret)?;

        if conditions.locktime.is_some_and(|t| unix_time() >= t) && conditions.refund_keys.is_empty() {
            return Ok(());
        }

        let signatures = &self
            .witness
            .as_ref()
            .ok_or(Error::InvalidWitness("no witness on locked proof".into()))?
            .signatures;
        let required = if conditions.locktime.is_some_and(|t| unix_time() >= t) {
            conditions.num_sigs_refund
        } else {
            conditions.num_sigs
        };
        let valid = count_valid_signatures(&self.secret.to_bytes(), &pubkeys, signatures)?;
        if valid >= required {
            Ok(())
        } else {
            Err(Error::SpendConditionsNotMet)
        }
    }
}

impl BlindedMessage {
    /// Sign this output's blinded point with `key`, for `SIG_ALL` enforcement.
    pub fn sign_p2pk(&mut self, key: &SecretKey) -> Result<(), Error> {
        let sig = key.sign(&self.blinded_secret.to_bytes())?;
        self.witness
            .get_or_insert_with(Witness::default)
            .add_signature(sig.to_string());
        Ok(())
    }

    /// Verify this output carries at least `required` valid signatures from
    /// `pubkeys` over its blinded point.
    pub fn verify_p2pk(&self, pubkeys: &[PublicKey], required: u64) -> Result<(), Error> {
        let signatures = &self
            .witness
            .as_ref()
            .ok_or(Error::InvalidWitness("no witness on SIG_ALL output".into()))?
            .signatures;
        let valid = count_valid_signatures(&self.blinded_secret.to_bytes(), pubkeys, signatures)?;
        if valid >= required {
            Ok(())
        } else {
            Err(Error::SpendConditionsNotMet)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyset::Id;
    use crate::Amount;

    fn dummy_id() -> Id {
        Id::from_hex("009a1f293253e41e").unwrap()
    }

    #[test]
    fn sign_then_verify_single_key() {
        let key = SecretKey::generate();
        let secret_json = lock_to_pubkey(key.public_key(), None);
        let secret = secret_json.try_into().unwrap();
        let mut proof = Proof::new(Amount::from(1), dummy_id(), secret, key.public_key());
        assert!(proof.verify_p2pk().is_err());
        proof.sign_p2pk(&key).unwrap();
        assert!(proof.verify_p2pk().is_ok());
    }

    #[test]
    fn wrong_key_signature_is_rejected() {
        let owner = SecretKey::generate();
        let attacker = SecretKey::generate();
        let secret = lock_to_pubkey(owner.public_key(), None).try_into().unwrap();
        let mut proof = Proof::new(Amount::from(1), dummy_id(), secret, owner.public_key());
        proof.sign_p2pk(&attacker).unwrap();
        assert!(proof.verify_p2pk().is_err());
    }

    #[test]
    fn multisig_requires_threshold() {
        let a = SecretKey::generate();
        let b = SecretKey::generate();
        let c = SecretKey::generate();
        let conditions = Conditions::new(
            None,
            vec![b.public_key(), c.public_key()],
            vec![],
            Some(2),
            None,
            SigFlag::SigInputs,
        )
        .unwrap();
        let secret = lock_to_pubkey(a.public_key(), Some(conditions))
            .try_into()
            .unwrap();
        let mut proof = Proof::new(Amount::from(1), dummy_id(), secret, a.public_key());
        proof.sign_p2pk(&a).unwrap();
        assert!(proof.verify_p2pk().is_err());
        proof.sign_p2pk(&b).unwrap();
        assert!(proof.verify_p2pk().is_ok());
    }

    #[test]
    fn expired_locktime_falls_back_to_refund_keys() {
        let owner = SecretKey::generate();
        let refund = SecretKey::generate();
        // Built directly rather than via `Conditions::new`, which rejects a
        // locktime already in the past — exactly the state under test.
        let conditions = Conditions {
            locktime: Some(1),
            refund_keys: vec![refund.public_key()],
            num_sigs: 1,
            num_sigs_refund: 1,
            ..Default::default()
        };
        let secret = lock_to_pubkey(owner.public_key(), Some(conditions))
            .try_into()
            .unwrap();
        let mut proof = Proof::new(Amount::from(1), dummy_id(), secret, owner.public_key());
        proof.sign_p2pk(&owner).unwrap();
        assert!(proof.verify_p2pk().is_err());
        proof.witness = None;
        proof.sign_p2pk(&refund).unwrap();
        assert!(proof.verify_p2pk().is_ok());
    }
}
