//! Recover proofs from a seed alone: derive deterministic outputs at
//! successive counters, ask the mint which of them it has actually signed,
//! and unblind the hits. Never touches the random-secret path.

use cashu::dhke::construct_proofs;
use cashu::{Id, Proofs};

use super::Wallet;
use crate::error::Error;
use crate::output_data::OutputData;
use crate::rpc::RestoreRequest;

/// Result of a restore scan.
#[derive(Debug, Clone, Default)]
pub struct RestoreOutcome {
    /// Proofs the mint had actually signed.
    pub proofs: Proofs,
    /// Highest counter that yielded a signature, so the caller can resume
    /// a later scan from `highest_counter + 1`. `None` if nothing was found.
    pub highest_counter: Option<u32>,
}

impl Wallet {
    /// Scan counters `start_counter, start_counter + 1, ...` in batches of
    /// `batch_size`, stopping once `gap_limit` consecutive counters in a
    /// row produce no signature.
    pub async fn restore(
        &self,
        keyset_id: Id,
        start_counter: u32,
        batch_size: u32,
        gap_limit: u32,
    ) -> Result<RestoreOutcome, Error> {
        let seed = *self.seed_or_err()?;
        let keys = self
            .keysets
            .keys(keyset_id)
            .await
            .ok_or_else(|| Error::State(format!("keys for keyset {keyset_id} not cached")))?;

        let mut outcome = RestoreOutcome::default();
        let mut counter = start_counter;
        let mut consecutive_misses = 0u32;

        while consecutive_misses < gap_limit {
            let batch = OutputData::restore_batch(keyset_id, &seed, counter, batch_size)?;
            let outputs = batch.blinded_messages();

            let response = self
                .connector
                .post_restore(RestoreRequest {
                    outputs: outputs.clone(),
                })
                .await?;

            if response.outputs.len() != response.signatures.len() {
                return Err(Error::Protocol(
                    "restore response outputs/signatures length mismatch".into(),
                ));
            }

            let hit_points: std::collections::HashSet<cashu::PublicKey> = response
                .outputs
                .iter()
                .map(|o| o.blinded_secret)
                .collect();

            let mut hit_indices = Vec::new();
            for (i, datum) in batch.outputs.iter().enumerate() {
                if hit_points.contains(&datum.blinded_message.blinded_secret) {
                    hit_indices.push(i);
                }
            }

            if hit_indices.is_empty() {
                consecutive_misses += batch_size;
            } else {
                let highest_hit = *hit_indices.iter().max().unwrap();
                consecutive_misses = (batch.outputs.len() - 1 - highest_hit) as u32;
                outcome.highest_counter = Some(counter + highest_hit as u32);

                let rs: Vec<_> = hit_indices.iter().map(|&i| batch.outputs[i].r.clone()).collect();
                let secrets: Vec<_> = hit_indices
                    .iter()
                    .map(|&i| batch.outputs[i].secret.clone())
                    .collect();
                let signatures: Vec<_> = hit_indices
                    .iter()
                    .filter_map(|&i| {
                        let point = batch.outputs[i].blinded_message.blinded_secret;
                        response
                            .outputs
                            .iter()
                            .position(|o| o.blinded_secret == point)
                            .map(|pos| response.signatures[pos].clone())
                    })
                    .collect();
                outcome
                    .proofs
                    .extend(construct_proofs(signatures, rs, secrets, &keys)?);
            }

            counter += batch_size;
        }

        Ok(outcome)
    }
}
