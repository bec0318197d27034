//! Re-issue proofs: split a set of inputs into a "keep" batch and a "send"
//! batch of the caller's choosing, in one round-trip to the mint.
//!
//! Outputs are sorted ascending by amount before being sent, per the wire
//! convention; a parallel `keep`/`send` tag (recorded alongside each output
//! before the sort) lets the unblinded proofs be reclassified afterwards.

use cashu::amount::SplitTarget;
use cashu::dhke::construct_proofs;
use cashu::proof::ProofsMethods;
use cashu::{Amount, Proofs};

use super::Wallet;
use crate::error::Error;
use crate::output_data::OutputData;
use crate::rpc::SwapRequest;

/// The two proof batches a swap produces.
#[derive(Debug, Clone, Default)]
pub struct SwapOutcome {
    /// Proofs to hand to whoever is being paid.
    pub send: Proofs,
    /// Proofs the wallet retains.
    pub keep: Proofs,
}

impl Wallet {
    /// Swap `inputs` into `send_amount` worth of sendable proofs plus
    /// whatever change is left over (`sum(inputs) - send_amount - fee`),
    /// built with `keep_split`/`send_split`. `fee` is the caller's
    /// already-computed input fee for `inputs` (see
    /// [`crate::selection::select`]), since the mint charges it regardless
    /// of how the remainder is denominated.
    pub async fn swap(
        &self,
        inputs: Proofs,
        send_amount: Amount,
        fee: Amount,
        keep_split: &SplitTarget,
        send_split: &SplitTarget,
    ) -> Result<SwapOutcome, Error> {
        let total = inputs.total_amount();
        if send_amount + fee > total {
            return Err(Error::InsufficientFunds {
                needed: (send_amount + fee).to_u64(),
                available: total.to_u64(),
            });
        }
        let keep_amount = total - send_amount - fee;

        let keyset_id = self.active_keyset_id().await?;
        let mut send_data = OutputData::random(keyset_id, send_amount, send_split)?;
        let keep_data = OutputData::random(keyset_id, keep_amount, keep_split)?;

        let send_count = send_data.len();
        send_data.extend(keep_data);
        let mut combined = send_data;
        let is_send: Vec<bool> = (0..combined.len()).map(|i| i < send_count).collect();
        let permutation = combined.sort_ascending();

        let tags: Vec<bool> = permutation.iter().map(|&i| is_send[i]).collect();

        let outputs = combined.blinded_messages();
        let response = self
            .connector
            .post_swap(SwapRequest {
                inputs,
                outputs: outputs.clone(),
            })
            .await?;

        if response.signatures.len() != outputs.len() {
            cashu_log::log_error!(
                "swap failed: mint returned {} signatures for {} outputs",
                response.signatures.len(),
                outputs.len()
            );
            return Err(Error::Protocol(format!(
                "mint returned {} signatures for {} outputs",
                response.signatures.len(),
                outputs.len()
            )));
        }

        let keys = self
            .keysets
            .keys(keyset_id)
            .await
            .ok_or_else(|| Error::State(format!("keys for keyset {keyset_id} not cached")))?;
        let rs = combined.outputs.iter().map(|o| o.r.clone()).collect();
        let secrets = combined.outputs.iter().map(|o| o.secret.clone()).collect();
        let proofs = construct_proofs(response.signatures, rs, secrets, &keys)?;

        let mut outcome = SwapOutcome::default();
        for (proof, is_send) in proofs.into_iter().zip(tags) {
            if is_send {
                outcome.send.push(proof);
            } else {
                outcome.keep.push(proof);
            }
        }
        Ok(outcome)
    }
}
