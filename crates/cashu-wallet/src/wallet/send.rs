//! Prepare proofs to hand to a payee: reuse them as-is when they already
//! sum exactly right, otherwise select and swap.

use std::collections::HashMap;

use cashu::amount::SplitTarget;
use cashu::proof::ProofsMethods;
use cashu::{Amount, Id, Proofs};

use super::Wallet;
use crate::error::Error;
use crate::selection;

/// Prepared proofs, ready to encode into a token.
#[derive(Debug, Clone, Default)]
pub struct SendOutcome {
    /// Proofs to hand to the payee.
    pub send: Proofs,
    /// Proofs the wallet retains (unchanged when no swap was needed).
    pub keep: Proofs,
}

impl Wallet {
    /// Produce `amount` worth of proofs to send from `available`. If a
    /// subset of `available` already sums exactly to `amount` (honoring
    /// `include_fees`), those proofs are returned unchanged with no mint
    /// round-trip. Otherwise the wallet selects inputs and swaps for
    /// freshly denominated change and send proofs.
    pub async fn send(
        &self,
        available: Proofs,
        amount: Amount,
        include_fees: bool,
        keep_split: &SplitTarget,
        send_split: &SplitTarget,
    ) -> Result<SendOutcome, Error> {
        let fee_rates: HashMap<Id, u64> = self.keysets.fee_rates().await;
        let selection = selection::select(&available, amount, &fee_rates, include_fees)?;
        cashu_log::log_debug!("selected {} proofs for send", selection.send.len());

        let fee = if include_fees {
            fee_for_inputs(&selection.send, &fee_rates)
        } else {
            Amount::ZERO
        };
        if selection.send.total_amount() == amount + fee {
            return Ok(SendOutcome {
                send: selection.send,
                keep: selection.keep,
            });
        }

        let inputs = selection.send;
        let swap_fee = fee_for_inputs(&inputs, &fee_rates);
        let outcome = self
            .swap(inputs, amount, swap_fee, keep_split, send_split)
            .await?;
        let mut keep = outcome.keep;
        keep.extend(selection.keep);
        Ok(SendOutcome {
            send: outcome.send,
            keep,
        })
    }
}

fn fee_for_inputs(proofs: &Proofs, fee_rates: &HashMap<Id, u64>) -> Amount {
    let total_ppk: u64 = proofs
        .iter()
        .map(|p| fee_rates.get(&p.keyset_id).copied().unwrap_or(0))
        .sum();
    Amount::fee_for_count(1, total_ppk)
}
