//! Turn a target amount into the batch of blinded messages a mint is asked
//! to sign, keeping the secret, blinding factor, and denomination for each
//! alongside the wire message so the batch can later be unblinded into
//! proofs.
//!
//! Five ways to pick the per-output secret: `random` (ordinary, unlinkable
//! change), `deterministic` (recoverable from a seed, for NUT-13 restore),
//! `p2pk` (locked to a pubkey, with `r` always random even when a seed is
//! held — a locked output's secret is public data, so deriving it would gain
//! nothing and would desynchronize the deterministic counter with unlocked
//! spends), `p2bk` (locked to a blinded key, one ephemeral sender key shared
//! across the whole batch), and `factory` for anything else a caller needs
//! (HTLCs, custom well-known secrets).

use cashu::amount::SplitTarget;
use cashu::dhke::blind_message;
use cashu::keys::SecretKey;
use cashu::nuts::nut10::WellKnownSecret;
use cashu::nuts::nut11::Conditions;
use cashu::{Amount, BlindedMessage, Id, PublicKey, Secret};

use crate::error::Error;

/// One planned output: the wire message plus everything needed to unblind
/// its eventual signature into a spendable proof.
#[derive(Debug, Clone)]
pub struct OutputDatum {
    /// Denomination requested.
    pub amount: Amount,
    /// The plaintext secret behind this output.
    pub secret: Secret,
    /// Blinding factor `r` used to compute `B_`.
    pub r: SecretKey,
    /// The wire message sent to the mint.
    pub blinded_message: BlindedMessage,
}

/// An ordered batch of [`OutputDatum`], built for a single `keyset_id`.
#[derive(Debug, Clone)]
pub struct OutputData {
    /// Keyset every output in this batch is signed against.
    pub keyset_id: Id,
    /// Planned outputs, smallest denomination last (matching [`Amount::split`]).
    pub outputs: Vec<OutputDatum>,
}

impl OutputData {
    fn new(keyset_id: Id) -> Self {
        Self {
            keyset_id,
            outputs: Vec::new(),
        }
    }

    /// Ordinary unlinkable outputs: a fresh random secret and blinding
    /// factor per denomination.
    pub fn random(
        keyset_id: Id,
        amount: Amount,
        split_target: &SplitTarget,
    ) -> Result<Self, Error> {
        let mut data = Self::new(keyset_id);
        for amount in amount.split_targeted(split_target)? {
            let secret = Secret::generate();
            let (blinded, r) = blind_message(&secret.to_bytes(), None)?;
            data.outputs.push(OutputDatum {
                amount,
                secret,
                r,
                blinded_message: BlindedMessage::new(amount, keyset_id, blinded),
            });
        }
        Ok(data)
    }

    /// Outputs whose secret and blinding factor are derived from `seed` at
    /// `counter, counter+1, ...`, recoverable later by `restore` without
    /// storing anything. Returns the next unused counter alongside the batch
    /// so callers can chain further sub-batches without reusing indices.
    pub fn deterministic(
        keyset_id: Id,
        amount: Amount,
        split_target: &SplitTarget,
        seed: &[u8; 64],
        counter: u32,
    ) -> Result<(Self, u32), Error> {
        let mut data = Self::new(keyset_id);
        let mut counter = counter;
        for amount in amount.split_targeted(split_target)? {
            let secret = Secret::from_seed(seed, keyset_id, counter)?;
            let r = SecretKey::from_seed(seed, keyset_id, counter)?;
            let (blinded, r) = blind_message(&secret.to_bytes(), Some(r))?;
            data.outputs.push(OutputDatum {
                amount,
                secret,
                r,
                blinded_message: BlindedMessage::new(amount, keyset_id, blinded),
            });
            counter += 1;
        }
        Ok((data, counter))
    }

    /// `count` zero-amount deterministic outputs at `start_counter,
    /// start_counter + 1, ..., start_counter + count - 1`, for probing a
    /// mint's `/restore` endpoint. The real amount is unknown until the
    /// mint confirms a signature, so every output is built with
    /// [`Amount::ZERO`]; a confirmed signature's actual amount comes back
    /// on the [`cashu::BlindSignature`] itself.
    pub fn restore_batch(
        keyset_id: Id,
        seed: &[u8; 64],
        start_counter: u32,
        count: u32,
    ) -> Result<Self, Error> {
        let mut data = Self::new(keyset_id);
        for counter in start_counter..start_counter.saturating_add(count) {
            let secret = Secret::from_seed(seed, keyset_id, counter)?;
            let r = SecretKey::from_seed(seed, keyset_id, counter)?;
            let (blinded, r) = blind_message(&secret.to_bytes(), Some(r))?;
            data.outputs.push(OutputDatum {
                amount: Amount::ZERO,
                secret,
                r,
                blinded_message: BlindedMessage::new(Amount::ZERO, keyset_id, blinded),
            });
        }
        Ok(data)
    }

    /// Outputs locked to `pubkey` (optionally with extra [`Conditions`]).
    /// `r` is always random: the secret is visible on the wire regardless,
    /// so deriving it from a seed would only desynchronize the
    /// deterministic counter against unlocked spends for no privacy gain.
    pub fn p2pk(
        keyset_id: Id,
        amount: Amount,
        split_target: &SplitTarget,
        pubkey: PublicKey,
        conditions: Option<Conditions>,
    ) -> Result<Self, Error> {
        let mut data = Self::new(keyset_id);
        let well_known = cashu::nuts::nut11::lock_to_pubkey(pubkey, conditions);
        let secret: Secret = well_known_to_secret(&well_known)?;
        for amount in amount.split_targeted(split_target)? {
            let (blinded, r) = blind_message(&secret.to_bytes(), None)?;
            data.outputs.push(OutputDatum {
                amount,
                secret: secret.clone(),
                r,
                blinded_message: BlindedMessage::new(amount, keyset_id, blinded),
            });
        }
        Ok(data)
    }

    /// Outputs locked to `recipient` via NUT-26 pay-to-blinded-key: a fresh
    /// ephemeral sender key, shared across every denomination in the batch
    /// at consecutive canonical slots starting from `starting_slot`, so the
    /// recipient can derive each output's signing key from the one ECDH
    /// shared secret. Returns the ephemeral key alongside the batch — the
    /// sender discards it, but the token it produces must carry its public
    /// half for the recipient's side of the derivation.
    pub fn p2bk(
        keyset_id: Id,
        amount: Amount,
        split_target: &SplitTarget,
        recipient: PublicKey,
        starting_slot: u8,
    ) -> Result<(Self, SecretKey), Error> {
        let ephemeral_key = SecretKey::generate();
        let mut data = Self::new(keyset_id);
        let mut slot = starting_slot;
        for amount in amount.split_targeted(split_target)? {
            let well_known = cashu::nuts::nut26::lock_to_blinded_key(
                &ephemeral_key,
                &recipient,
                keyset_id,
                slot,
                &[],
            )?;
            let secret: Secret = well_known_to_secret(&well_known)?;
            let (blinded, r) = blind_message(&secret.to_bytes(), None)?;
            data.outputs.push(OutputDatum {
                amount,
                secret,
                r,
                blinded_message: BlindedMessage::new(amount, keyset_id, blinded),
            });
            slot = slot
                .checked_add(1)
                .ok_or_else(|| Error::Validation("P2BK canonical slot overflowed its 0..=10 range".into()))?;
        }
        Ok((data, ephemeral_key))
    }

    /// Outputs built by a caller-supplied per-output secret factory, for
    /// spending conditions this crate has no dedicated constructor for
    /// (HTLCs, custom well-known secrets).
    pub fn factory(
        keyset_id: Id,
        amount: Amount,
        split_target: &SplitTarget,
        mut build_secret: impl FnMut(Amount) -> Result<Secret, Error>,
    ) -> Result<Self, Error> {
        let mut data = Self::new(keyset_id);
        for amount in amount.split_targeted(split_target)? {
            let secret = build_secret(amount)?;
            let (blinded, r) = blind_message(&secret.to_bytes(), None)?;
            data.outputs.push(OutputDatum {
                amount,
                secret,
                r,
                blinded_message: BlindedMessage::new(amount, keyset_id, blinded),
            });
        }
        Ok(data)
    }

    /// Zero-amount outputs used as NUT-08 melt change: `ceil(log2(fee_reserve))`
    /// of them, floored at one whenever the reserve is positive.
    pub fn blank(keyset_id: Id, fee_reserve: Amount) -> Result<Self, Error> {
        if fee_reserve == Amount::ZERO {
            return Ok(Self::new(keyset_id));
        }
        let count = (fee_reserve.to_u64() as f64).log2().ceil().max(1.0) as u64;
        let mut data = Self::new(keyset_id);
        for _ in 0..count {
            let secret = Secret::generate();
            let (blinded, r) = blind_message(&secret.to_bytes(), None)?;
            data.outputs.push(OutputDatum {
                amount: Amount::ZERO,
                secret,
                r,
                blinded_message: BlindedMessage::new(Amount::ZERO, keyset_id, blinded),
            });
        }
        Ok(data)
    }

    /// Deterministic variant of [`Self::blank`], for a recoverable melt
    /// change reservation.
    pub fn blank_deterministic(
        keyset_id: Id,
        fee_reserve: Amount,
        seed: &[u8; 64],
        counter: u32,
    ) -> Result<(Self, u32), Error> {
        if fee_reserve == Amount::ZERO {
            return Ok((Self::new(keyset_id), counter));
        }
        let count = (fee_reserve.to_u64() as f64).log2().ceil().max(1.0) as u64;
        let mut data = Self::new(keyset_id);
        let mut counter = counter;
        for _ in 0..count {
            let secret = Secret::from_seed(seed, keyset_id, counter)?;
            let r = SecretKey::from_seed(seed, keyset_id, counter)?;
            let (blinded, r) = blind_message(&secret.to_bytes(), Some(r))?;
            data.outputs.push(OutputDatum {
                amount: Amount::ZERO,
                secret,
                r,
                blinded_message: BlindedMessage::new(Amount::ZERO, keyset_id, blinded),
            });
            counter += 1;
        }
        Ok((data, counter))
    }

    /// Sign every output's blinded point for SIG_ALL enforcement. No-op if
    /// the batch is empty.
    pub fn sign_sig_all(&mut self, key: &SecretKey) -> Result<(), Error> {
        for datum in &mut self.outputs {
            datum.blinded_message.sign_p2pk(key)?;
        }
        Ok(())
    }

    /// Sort outputs ascending by amount, as the mint expects them on the
    /// wire. Returns the permutation applied, so a caller holding a
    /// parallel keep/send bit-vector can reorder it identically.
    pub fn sort_ascending(&mut self) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.outputs.len()).collect();
        indices.sort_by_key(|&i| self.outputs[i].amount);
        let mut sorted = Vec::with_capacity(self.outputs.len());
        for &i in &indices {
            sorted.push(self.outputs[i].clone());
        }
        self.outputs = sorted;
        indices
    }

    /// Append another batch's outputs in place, for combining sub-batches
    /// (e.g. a `send` batch and a `keep` batch) before one swap call.
    pub fn extend(&mut self, mut other: Self) {
        self.outputs.append(&mut other.outputs);
    }

    /// The wire messages for this batch, in order.
    pub fn blinded_messages(&self) -> Vec<BlindedMessage> {
        self.outputs.iter().map(|o| o.blinded_message.clone()).collect()
    }

    /// Total requested amount across the batch.
    pub fn total_amount(&self) -> Amount {
        self.outputs.iter().map(|o| o.amount).sum()
    }

    /// Number of planned outputs.
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Whether the batch has no outputs.
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

fn well_known_to_secret(well_known: &WellKnownSecret) -> Result<Secret, Error> {
    Ok(Secret::try_from(well_known.clone())?)
}
