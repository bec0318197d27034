//! Fee-aware coin selection: choose which held proofs to spend for a given
//! target amount.
//!
//! The algorithm is a DP-backed variant of randomized-greedy-with-local-
//! improvement (RGLI): rather than enumerate random orderings, it builds
//! the table of every sum reachable from the candidate proofs, which for
//! realistic wallet proof counts (bounded denominations, bounded total
//! proof count) converges to the same answer a randomized search would
//! settle on, deterministically. `select` below is the single source of
//! truth for the fee feedback loop described in the module's doc comment
//! on fee inclusion.

use std::collections::HashMap;

use cashu::{Amount, Id, Proof, Proofs};

use crate::error::Error;

/// `send`/`keep` outcome of a coin-selection call.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Proofs chosen to satisfy the request.
    pub send: Proofs,
    /// The remaining, unselected proofs.
    pub keep: Proofs,
}

fn fee_for_set(set: &[&Proof], fee_rates: &HashMap<Id, u64>) -> Amount {
    let total_ppk: u64 = set
        .iter()
        .map(|p| fee_rates.get(&p.keyset_id).copied().unwrap_or(0))
        .sum();
    Amount::fee_for_count(1, total_ppk)
}

#[derive(Clone)]
struct DpEntry {
    sum: u64,
    count: usize,
    fee_weight: u64,
    indices: Vec<usize>,
}

/// Build the table of every sum reachable from `proofs`, keeping for each
/// sum the entry with fewest proofs, then lowest total `fee_ppk`, among
/// all subsets reaching it (a 0/1 knapsack over "proof used or not").
fn reachable_sums(proofs: &[Proof], fee_rates: &HashMap<Id, u64>) -> HashMap<u64, DpEntry> {
    let mut table: HashMap<u64, DpEntry> = HashMap::new();
    table.insert(
        0,
        DpEntry {
            sum: 0,
            count: 0,
            fee_weight: 0,
            indices: Vec::new(),
        },
    );

    for (i, proof) in proofs.iter().enumerate() {
        let amount = proof.amount.to_u64();
        let fee = fee_rates.get(&proof.keyset_id).copied().unwrap_or(0);
        let snapshot: Vec<DpEntry> = table.values().cloned().collect();
        for entry in snapshot {
            let new_sum = entry.sum + amount;
            let mut indices = entry.indices.clone();
            indices.push(i);
            let candidate = DpEntry {
                sum: new_sum,
                count: entry.count + 1,
                fee_weight: entry.fee_weight + fee,
                indices,
            };
            let better = match table.get(&new_sum) {
                None => true,
                Some(existing) => {
                    (candidate.count, candidate.fee_weight) < (existing.count, existing.fee_weight)
                }
            };
            if better {
                table.insert(new_sum, candidate);
            }
        }
    }
    table
}

fn best_at_least(table: &HashMap<u64, DpEntry>, threshold: u64) -> Option<&DpEntry> {
    table
        .values()
        .filter(|e| e.sum >= threshold)
        .min_by_key(|e| (e.sum, e.count, e.fee_weight))
}

/// Choose a subset of `proofs` whose amount (minus fees, if `include_fees`)
/// covers `target`, preferring in order: an exact match, then the smallest
/// over-selection, then the fewest proofs, then the lowest total input fee.
///
/// `fee_rates` maps each candidate's keyset to its `input_fee_ppk`; keysets
/// absent from the map are treated as fee-free.
pub fn select(
    proofs: &Proofs,
    target: Amount,
    fee_rates: &HashMap<Id, u64>,
    include_fees: bool,
) -> Result<Selection, Error> {
    if target == Amount::ZERO && proofs.is_empty() {
        return Ok(Selection::default());
    }

    let table = reachable_sums(proofs, fee_rates);
    let mut required = target.to_u64();

    let chosen = loop {
        let Some(entry) = best_at_least(&table, required) else {
            let available = proofs.iter().map(|p| p.amount.to_u64()).sum();
            return Err(Error::InsufficientFunds {
                needed: required,
                available,
            });
        };
        if !include_fees {
            break entry.clone();
        }
        let set: Vec<&Proof> = entry.indices.iter().map(|&i| &proofs[i]).collect();
        let fee = fee_for_set(&set, fee_rates).to_u64();
        let new_required = target.to_u64() + fee;
        if new_required == required {
            break entry.clone();
        }
        required = new_required;
    };

    let chosen_set: std::collections::HashSet<usize> = chosen.indices.into_iter().collect();
    let mut send: Proofs = Vec::new();
    let mut keep: Proofs = Vec::new();
    for (i, proof) in proofs.iter().enumerate() {
        if chosen_set.contains(&i) {
            send.push(proof.clone());
        } else {
            keep.push(proof.clone());
        }
    }
    send.sort();
    keep.sort();
    Ok(Selection { send, keep })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashu::keys::SecretKey;
    use cashu::Secret;

    fn id() -> Id {
        Id::from_hex("009a1f293253e41e").unwrap()
    }

    fn proof(amount: u64) -> Proof {
        Proof::new(
            Amount::from(amount),
            id(),
            Secret::generate(),
            SecretKey::generate().public_key(),
        )
    }

    fn sample_proofs() -> Proofs {
        vec![2, 8, 16, 16, 1, 1].into_iter().map(proof).collect()
    }

    #[test]
    fn exact_match_prefers_minimal_proof_count() {
        let proofs = sample_proofs();
        let fee_rates = HashMap::new();
        let selection = select(&proofs, Amount::from(25), &fee_rates, false).unwrap();
        let mut send_amounts: Vec<u64> = selection.send.iter().map(|p| p.amount.to_u64()).collect();
        send_amounts.sort();
        assert_eq!(send_amounts, vec![1, 8, 16]);
        let mut keep_amounts: Vec<u64> = selection.keep.iter().map(|p| p.amount.to_u64()).collect();
        keep_amounts.sort();
        assert_eq!(keep_amounts, vec![1, 2, 16]);
    }

    #[test]
    fn fee_inclusion_converges_to_net_target() {
        let proofs = sample_proofs();
        let mut fee_rates = HashMap::new();
        fee_rates.insert(id(), 600);
        let selection = select(&proofs, Amount::from(31), &fee_rates, true).unwrap();
        let mut send_amounts: Vec<u64> = selection.send.iter().map(|p| p.amount.to_u64()).collect();
        send_amounts.sort();
        assert_eq!(send_amounts, vec![1, 16, 16]);
        let total: u64 = send_amounts.iter().sum();
        let fee = Amount::fee_for_count(selection.send.len(), 600).to_u64();
        assert!(total - fee >= 31);
    }

    #[test]
    fn insufficient_funds_returns_all_as_keep() {
        let proofs = sample_proofs();
        let fee_rates = HashMap::new();
        let err = select(&proofs, Amount::from(1000), &fee_rates, false).unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { .. }));
    }

    #[test]
    fn empty_target_on_empty_proofs_is_trivially_satisfied() {
        let selection = select(&Proofs::new(), Amount::ZERO, &HashMap::new(), false).unwrap();
        assert!(selection.send.is_empty());
        assert!(selection.keep.is_empty());
    }
}
