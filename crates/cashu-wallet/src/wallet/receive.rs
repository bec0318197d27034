//! Turn a received token into wallet-controlled proofs: decode, optionally
//! verify each proof's DLEQ against the issuing keyset, then swap into
//! fresh outputs so the sender can no longer recognize them on the wire.

use cashu::amount::SplitTarget;
use cashu::dhke::dleq_reblind_verify;
use cashu::proof::ProofsMethods;
use cashu::{Amount, Proofs};

use super::Wallet;
use crate::error::Error;
use crate::token::Token;

/// Controls over how strictly a received token is checked before being
/// swapped.
#[derive(Debug, Clone)]
pub struct ReceiveOptions {
    /// Reject any proof missing a DLEQ proof, rather than merely skipping
    /// the check for it.
    pub require_dleq: bool,
    /// How the freshly received proofs should be denominated.
    pub split_target: SplitTarget,
}

impl Default for ReceiveOptions {
    fn default() -> Self {
        Self {
            require_dleq: false,
            split_target: SplitTarget::None,
        }
    }
}

impl Wallet {
    /// Decode `token`, verify it, and swap its proofs into ones only this
    /// wallet can spend. Returns only the newly minted proofs.
    pub async fn receive(&self, token: &str, options: &ReceiveOptions) -> Result<Proofs, Error> {
        let decoded = Token::decode(token)?;
        let proofs = decoded.proofs;
        if proofs.is_empty() {
            return Ok(Proofs::new());
        }

        let keyset_id = proofs[0].keyset_id;
        let keys = self
            .keysets
            .keys(keyset_id)
            .await
            .ok_or_else(|| Error::State(format!("keys for keyset {keyset_id} not cached")))?;

        for proof in &proofs {
            match &proof.dleq {
                Some(dleq) => {
                    let a = keys
                        .amount_key(proof.amount)
                        .ok_or_else(|| Error::Validation(format!("no mint key for amount {:?}", proof.amount)))?;
                    dleq_reblind_verify(&proof.secret, &proof.c, a, dleq)?;
                }
                None if options.require_dleq => {
                    return Err(Error::Validation("proof is missing its DLEQ proof".into()));
                }
                None => {}
            }
        }

        let fee_rates = self.keysets.fee_rates().await;
        let total_ppk: u64 = proofs
            .iter()
            .map(|p| fee_rates.get(&p.keyset_id).copied().unwrap_or(0))
            .sum();
        let fee = Amount::fee_for_count(1, total_ppk);

        let keep_split = options.split_target.clone();
        let outcome = self
            .swap(proofs, Amount::ZERO, fee, &keep_split, &SplitTarget::None)
            .await?;
        debug_assert!(outcome.send.is_empty());
        Ok(outcome.keep)
    }
}
