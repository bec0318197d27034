//! NUT-13: deterministic secret and blinding-factor derivation from a
//! seed, so a wallet can regenerate every output it ever produced without
//! persisting secrets itself.

use bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv};
use bitcoin::hashes::{hmac, sha256, Hash, HashEngine, HmacEngine};
use bitcoin::Network;

use crate::error::Error;
use crate::keys::SecretKey;
use crate::keyset::{Id, KeySetVersion};
use crate::secret::Secret;
use crate::SECP256K1;

const HMAC_DOMAIN: &[u8] = b"Cashu_KDF_HMAC_SHA256";

/// Which of the two values a given counter derives: the secret itself, or
/// the blinding scalar `r` used to blind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DerivationType {
    Secret,
    Blinding,
}

impl DerivationType {
    fn legacy_child(self) -> ChildNumber {
        match self {
            DerivationType::Secret => ChildNumber::from_normal_idx(0).expect("0 is a valid index"),
            DerivationType::Blinding => ChildNumber::from_normal_idx(1).expect("1 is a valid index"),
        }
    }

    fn domain_byte(self) -> u8 {
        match self {
            DerivationType::Secret => 0x00,
            DerivationType::Blinding => 0x01,
        }
    }
}

fn legacy_path(id: Id, counter: u32) -> Result<DerivationPath, Error> {
    Ok(DerivationPath::from(vec![
        ChildNumber::from_hardened_idx(129_372)?,
        ChildNumber::from_hardened_idx(0)?,
        ChildNumber::from_hardened_idx(id.legacy_index())?,
        ChildNumber::from_hardened_idx(counter)?,
    ]))
}

fn legacy_derive(seed: &[u8; 64], id: Id, counter: u32, kind: DerivationType) -> Result<[u8; 32], Error> {
    let xpriv = Xpriv::new_master(Network::Bitcoin, seed)?;
    let path = legacy_path(id, counter)?.child(kind.legacy_child());
    let derived = xpriv.derive_priv(&SECP256K1, &path)?;
    Ok(derived.private_key.secret_bytes())
}

const CURVE_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// HMAC output lands outside `[1, n)` for roughly 1 in 2^128 draws; rather
/// than erroring on that draw, subtract the curve order once the same way a
/// BIP-32 derivation would retry with a bumped counter.
fn reduce_mod_curve_order(mut bytes: [u8; 32]) -> [u8; 32] {
    if bytes >= CURVE_ORDER {
        let mut borrow = 0i16;
        for i in (0..32).rev() {
            let mut diff = bytes[i] as i16 - CURVE_ORDER[i] as i16 - borrow;
            if diff < 0 {
                diff += 256;
                borrow = 1;
            } else {
                borrow = 0;
            }
            bytes[i] = diff as u8;
        }
    }
    bytes
}

fn current_derive(seed: &[u8; 64], id: Id, counter: u32, kind: DerivationType) -> [u8; 32] {
    let mut message = Vec::with_capacity(HMAC_DOMAIN.len() + 33 + 8 + 1);
    message.extend_from_slice(HMAC_DOMAIN);
    message.extend_from_slice(&id.to_bytes());
    message.extend_from_slice(&(counter as u64).to_be_bytes());
    message.push(kind.domain_byte());

    let mut engine = HmacEngine::<sha256::Hash>::new(seed);
    engine.input(&message);
    hmac::Hmac::<sha256::Hash>::from_engine(engine).to_byte_array()
}

impl Secret {
    /// Derive the secret for `(seed, keyset_id, counter)`, choosing the
    /// legacy BIP-32 or current HMAC scheme by the keyset id's version.
    pub fn from_seed(seed: &[u8; 64], keyset_id: Id, counter: u32) -> Result<Self, Error> {
        let bytes = match keyset_id.get_version() {
            KeySetVersion::Version00 => legacy_derive(seed, keyset_id, counter, DerivationType::Secret)?,
            KeySetVersion::Version01 => current_derive(seed, keyset_id, counter, DerivationType::Secret),
        };
        Ok(Self::new(hex::encode(bytes)))
    }
}

impl SecretKey {
    /// Derive the blinding factor `r` for `(seed, keyset_id, counter)`.
    pub fn from_seed(seed: &[u8; 64], keyset_id: Id, counter: u32) -> Result<Self, Error> {
        match keyset_id.get_version() {
            KeySetVersion::Version00 => {
                let bytes = legacy_derive(seed, keyset_id, counter, DerivationType::Blinding)?;
                Ok(SecretKey::from_slice(&bytes)?)
            }
            KeySetVersion::Version01 => {
                let bytes = current_derive(seed, keyset_id, counter, DerivationType::Blinding);
                Ok(SecretKey::from_slice(&reduce_mod_curve_order(bytes))?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bip39::Mnemonic;

    use super::*;

    fn test_seed() -> [u8; 64] {
        let mnemonic = Mnemonic::from_str(
            "half depart obvious quality work element tank gorilla view sugar picture humble",
        )
        .unwrap();
        mnemonic.to_seed("")
    }

    #[test]
    fn legacy_secret_derivation_matches_vectors() {
        let seed = test_seed();
        let keyset_id = Id::from_hex("009a1f293253e41e").unwrap();
        let expected = [
            "485875df74771877439ac06339e284c3acfcd9be7abf3bc20b516faeadfe77ae",
            "8f2b39e8e594a4056eb1e6dbb4b0c38ef13b1b2c751f64f810ec04ee35b77270",
            "bc628c79accd2364fd31511216a0fab62afd4a18ff77a20deded7b858c9860c8",
            "59284fd1650ea9fa17db2b3acf59ecd0f2d52ec3261dd4152785813ff27a33bf",
            "576c23393a8b31cc8da6688d9c9a96394ec74b40fdaf1f693a6bb84284334ea0",
        ];
        for (i, exp) in expected.iter().enumerate() {
            let secret = Secret::from_seed(&seed, keyset_id, i as u32).unwrap();
            assert_eq!(secret, Secret::from_str(exp).unwrap());
        }
    }

    #[test]
    fn legacy_blinding_factor_matches_vectors() {
        let seed = test_seed();
        let keyset_id = Id::from_hex("009a1f293253e41e").unwrap();
        let expected = [
            "ad00d431add9c673e843d4c2bf9a778a5f402b985b8da2d5550bf39cda41d679",
            "967d5232515e10b81ff226ecf5a9e2e2aff92d66ebc3edf0987eb56357fd6248",
            "b20f47bb6ae083659f3aa986bfa0435c55c6d93f687d51a01f26862d9b9a4899",
            "fb5fca398eb0b1deb955a2988b5ac77d32956155f1c002a373535211a2dfdc29",
            "5f09bfbfe27c439a597719321e061e2e40aad4a36768bb2bcc3de547c9644bf9",
        ];
        for (i, exp) in expected.iter().enumerate() {
            let r = SecretKey::from_seed(&seed, keyset_id, i as u32).unwrap();
            assert_eq!(r, SecretKey::from_hex(exp).unwrap());
        }
    }

    #[test]
    fn blinding_scalar_above_curve_order_is_reduced_not_rejected() {
        let mut above_order = CURVE_ORDER;
        above_order[31] += 5;
        let reduced = reduce_mod_curve_order(above_order);
        assert!(SecretKey::from_slice(&reduced).is_ok());
        assert_eq!(reduced[31], 5);
    }

    #[test]
    fn different_keysets_never_collide() {
        let seed = test_seed();
        let id_a = Id::from_hex(
            "012e23479a0029432eaad0d2040c09be53bab592d5cbf1d55e0dd26c9495951b30",
        )
        .unwrap();
        let id_b = Id::from_hex("009a1f293253e41e").unwrap();
        for counter in 0..3 {
            assert_ne!(
                Secret::from_seed(&seed, id_a, counter).unwrap(),
                Secret::from_seed(&seed, id_b, counter).unwrap()
            );
        }
    }
}
