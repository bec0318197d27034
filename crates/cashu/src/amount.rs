//! Ecash denominations.
//!
//! Every proof amount is a power of two. A total is represented canonically
//! as the minimum set of powers of two that sum to it (the binary
//! expansion), which is also what the mint expects when it hands out
//! per-denomination public keys.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A non-negative ecash amount, denominated in the mint's base unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// The zero amount, used for blank/change outputs.
    pub const ZERO: Amount = Amount(0);

    /// Wrap a raw integer amount.
    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    /// Unwrap to a raw integer.
    pub const fn to_u64(self) -> u64 {
        self.0
    }

    /// Split into the minimum number of powers of two summing to `self`,
    /// largest denomination first.
    pub fn split(&self) -> Vec<Self> {
        (0_u32..64)
            .rev()
            .filter_map(|bit| {
                let part = 1_u64 << bit;
                ((self.0 & part) == part).then_some(Self(part))
            })
            .collect()
    }

    /// Fee, in the base unit, for spending `count` inputs each carrying
    /// `fee_ppk` parts-per-thousand. `ceil(count * fee_ppk / 1000)`.
    pub fn fee_for_count(count: usize, fee_ppk: u64) -> Self {
        let total_ppk = count as u64 * fee_ppk;
        Self((total_ppk + 999) / 1000)
    }

    /// Whether this is a valid single-proof denomination (a power of two,
    /// or zero for blank outputs).
    pub fn is_valid_denomination(&self) -> bool {
        self.0 == 0 || self.0.is_power_of_two()
    }
}

impl Default for Amount {
    fn default() -> Self {
        Amount::ZERO
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Amount> for u64 {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Amount(iter.map(|a| a.0).sum())
    }
}

impl std::ops::Add for Amount {
    type Output = Amount;
    fn add(self, rhs: Amount) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Amount {
    type Output = Amount;
    fn sub(self, rhs: Amount) -> Self::Output {
        Amount(self.0.saturating_sub(rhs.0))
    }
}

/// How a requested total should be broken into individual output amounts.
#[derive(Debug, Clone, Default)]
pub enum SplitTarget {
    /// Binary expansion of the total (the default).
    #[default]
    None,
    /// Bias towards refilling the given denominations up to `target_count`
    /// copies each before falling back to the binary expansion for the
    /// remainder.
    Denominated {
        /// Denominations the wallet would like to hold after the split.
        keep_denominations: Vec<Amount>,
        /// How many proofs of each denomination to aim for.
        target_count: usize,
    },
    /// An explicit, caller-chosen split. Must sum to the requested total and
    /// every element must be a valid denomination.
    Values(Vec<Amount>),
}

impl Amount {
    /// Apply a [`SplitTarget`] to this amount, returning the ordered list of
    /// output amounts (smallest denomination last, matching [`Amount::split`]).
    pub fn split_targeted(&self, target: &SplitTarget) -> Result<Vec<Amount>, Error> {
        match target {
            SplitTarget::None => Ok(self.split()),
            SplitTarget::Values(values) => {
                let sum: Amount = values.iter().copied().sum();
                if sum != *self {
                    return Err(Error::InvalidAmount);
                }
                if values.iter().any(|a| !a.is_valid_denomination()) {
                    return Err(Error::InvalidAmount);
                }
                Ok(values.clone())
            }
            SplitTarget::Denominated {
                keep_denominations,
                target_count,
            } => {
                let mut remaining = self.0;
                let mut out = Vec::new();
                for denom in keep_denominations {
                    if denom.0 == 0 || !denom.0.is_power_of_two() {
                        continue;
                    }
                    for _ in 0..*target_count {
                        if remaining < denom.0 {
                            break;
                        }
                        remaining -= denom.0;
                        out.push(*denom);
                    }
                }
                out.extend(Amount(remaining).split());
                out.sort();
                Ok(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_is_minimal_binary_expansion() {
        assert_eq!(
            Amount::from(13).split(),
            vec![Amount::from(8), Amount::from(4), Amount::from(1)]
        );
        assert_eq!(Amount::from(0).split(), Vec::<Amount>::new());
        assert_eq!(Amount::from(1).split(), vec![Amount::from(1)]);
    }

    #[test]
    fn fee_rounds_up() {
        assert_eq!(Amount::fee_for_count(0, 600).to_u64(), 0);
        assert_eq!(Amount::fee_for_count(1, 600).to_u64(), 1);
        assert_eq!(Amount::fee_for_count(3, 600).to_u64(), 2);
        assert_eq!(Amount::fee_for_count(5, 200).to_u64(), 1);
    }

    #[test]
    fn explicit_split_must_sum_and_be_valid() {
        let good = SplitTarget::Values(vec![Amount::from(8), Amount::from(4), Amount::from(1)]);
        assert_eq!(Amount::from(13).split_targeted(&good).unwrap().len(), 3);

        let bad_sum = SplitTarget::Values(vec![Amount::from(8)]);
        assert!(Amount::from(13).split_targeted(&bad_sum).is_err());

        let bad_denom = SplitTarget::Values(vec![Amount::from(13)]);
        assert!(Amount::from(13).split_targeted(&bad_denom).is_err());
    }
}
