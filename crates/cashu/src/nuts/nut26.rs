//! Pay to Blinded Key: a privacy layer over P2PK that locks ecash to a
//! public key without revealing which key, even to the mint, by having
//! sender and receiver derive the same per-output blinding scalar through
//! an ECDH shared secret instead of a visible pubkey in the secret.

use bitcoin::hashes::sha256::Hash as Sha256;
use bitcoin::hashes::{Hash, HashEngine};

use super::nut10::{Kind, WellKnownSecret};
use crate::error::Error;
use crate::keys::{PublicKey, SecretKey};
use crate::keyset::Id;

const DOMAIN_TAG: &[u8] = b"Cashu_P2BK_v1";

/// Maximum canonical slot index: an output locked to the same recipient in
/// the same keyset can occupy at most 11 distinct, independently blinded
/// slots (0..=10) before a counter collision becomes likely enough to matter.
pub const MAX_CANONICAL_SLOT: u8 = 10;

/// Derive the blinding scalar `r` both sides of a P2BK transfer agree on
/// without communicating: `KDF(domain || x_only(ECDH) || keyset_id || slot)`,
/// with a single retry appending a counter byte if the digest isn't a valid
/// scalar.
pub fn ecdh_kdf(
    secret_key: &SecretKey,
    pubkey: &PublicKey,
    keyset_id: Id,
    canonical_slot: u8,
) -> Result<SecretKey, Error> {
    if canonical_slot > MAX_CANONICAL_SLOT {
        return Err(Error::InvalidWitness(format!(
            "canonical slot {canonical_slot} exceeds {MAX_CANONICAL_SLOT}"
        )));
    }

    let shared = pubkey.mul_tweak(&secret_key.as_scalar())?;
    let z_x = shared.x_only_public_key().serialize();

    let mut engine = Sha256::engine();
    engine.input(DOMAIN_TAG);
    engine.input(&z_x);
    engine.input(&keyset_id.to_bytes());
    engine.input(&[canonical_slot]);

    let digest = Sha256::from_engine(engine.clone());
    if let Ok(key) = SecretKey::from_slice(digest.as_byte_array()) {
        return Ok(key);
    }
    engine.input(&[0xFF]);
    let digest = Sha256::from_engine(engine);
    SecretKey::from_slice(digest.as_byte_array())
}

/// `P' = P + r*G`: blind a public key with the scalar [`ecdh_kdf`] produced.
pub fn blind_public_key(pubkey: &PublicKey, r: &SecretKey) -> Result<PublicKey, Error> {
    pubkey.combine(&r.public_key())
}

/// Recover the BIP-340 signing key for a blinded output, or `None` if
/// `privkey` is not the key it was locked to. Tries both `sk1 = privkey + r`
/// and `sk2 = -privkey + r`, comparing each candidate's x-only public key
/// against `blinded_pubkey` without short-circuiting on the first match, so
/// a caller probing many candidate keys can't learn which branch matched
/// from timing alone.
pub fn derive_signing_key_bip340(
    privkey: &SecretKey,
    r: &SecretKey,
    blinded_pubkey: &PublicKey,
) -> Result<Option<SecretKey>, Error> {
    let target = blinded_pubkey.x_only_public_key().serialize();

    let sk1 = privkey.add_tweak(&r.as_scalar())?;
    let sk2 = privkey.negate().add_tweak(&r.as_scalar())?;

    let sk1_matches = constant_time_eq(&sk1.public_key().x_only_public_key().serialize(), &target);
    let sk2_matches = constant_time_eq(&sk2.public_key().x_only_public_key().serialize(), &target);

    Ok(match (sk1_matches, sk2_matches) {
        (true, _) => Some(sk1),
        (false, true) => Some(sk2),
        (false, false) => None,
    })
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Build the P2BK secret locking an output to `recipient` at `canonical_slot`
/// of `keyset_id`, blinded through an ECDH shared secret with `ephemeral_key`.
/// `extra_recipients` carries additional blinded co-signer keys (already
/// blinded by the caller under their own ECDH) for a multisig P2BK lock.
pub fn lock_to_blinded_key(
    ephemeral_key: &SecretKey,
    recipient: &PublicKey,
    keyset_id: Id,
    canonical_slot: u8,
    extra_recipients: &[PublicKey],
) -> Result<WellKnownSecret, Error> {
    let r = ecdh_kdf(ephemeral_key, recipient, keyset_id, canonical_slot)?;
    let primary = blind_public_key(recipient, &r)?;

    let mut tags = Vec::new();
    if !extra_recipients.is_empty() {
        let mut tag = vec!["pubkeys".to_string()];
        tag.extend(extra_recipients.iter().map(PublicKey::to_hex));
        tags.push(tag);
    }
    tags.push(vec!["e".to_string(), ephemeral_key.public_key().to_hex()]);

    Ok(WellKnownSecret::new(Kind::P2BK, primary.to_hex(), Some(tags)))
}

/// Parse a P2BK secret and, if `recipient_key` is the key it was locked to
/// under `(keyset_id, canonical_slot)`, derive its signing key. Returns
/// `None` — never an error — when `recipient_key` doesn't match; an output
/// locked to someone else is simply not this wallet's to restore.
pub fn derive_receiver_signing_key(
    secret: &WellKnownSecret,
    recipient_key: &SecretKey,
    keyset_id: Id,
    canonical_slot: u8,
) -> Result<Option<SecretKey>, Error> {
    if secret.kind() != Kind::P2BK {
        return Err(Error::IncorrectSecretKind(secret.kind()));
    }
    let ephemeral_pubkey_hex = secret
        .secret_data()
        .tag("e")
        .ok_or_else(|| Error::MalformedSecret("P2BK secret missing \"e\" tag".into()))?;
    let ephemeral_pubkey = PublicKey::from_hex(ephemeral_pubkey_hex)?;
    let blinded_pubkey = PublicKey::from_hex(secret.secret_data().data())?;

    let r = ecdh_kdf(recipient_key, &ephemeral_pubkey, keyset_id, canonical_slot)?;
    derive_signing_key_bip340(recipient_key, &r, &blinded_pubkey)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyset_id() -> Id {
        Id::from_hex("009a1f293253e41e").unwrap()
    }

    fn ephemeral_secret_key() -> SecretKey {
        SecretKey::from_hex("1cedb9df0c6872188b560ace9e35fd55c2532d53e19ae65b46159073886482ca")
            .unwrap()
    }

    fn ephemeral_public_key() -> PublicKey {
        PublicKey::from_hex("02a8cda4cf448bfce9a9e46e588c06ea1780fcb94e3bbdf3277f42995d403a8b0c")
            .unwrap()
    }

    fn receiver_secret_key() -> SecretKey {
        SecretKey::from_hex("ad37e8abd800be3e8272b14045873f4353327eedeb702b72ddcc5c5adff5129c")
            .unwrap()
    }

    fn receiver_public_key() -> PublicKey {
        PublicKey::from_hex("02771fed6cb88aaac38b8b32104a942bf4b8f4696bc361171b3c7d06fa2ebddf06")
            .unwrap()
    }

    const EXPECTED_BLINDING_SCALARS: [&str; 11] = [
        "41b5f15975f787bd5bd8d91753cbbe56d0d7aface851b1063e8011f68551862d",
        "c4d68c79b8676841f767bcd53437af3f43d51b205f351d5cdfe5cb866ec41494",
        "04ecf53095882f28965f267e46d2c555f15bcd74c3a84f42cf0de8ebfb712c7c",
        "4163bc31b3087901b8b28249213b0ecc447cee3ea1f0c04e4dd5934e0c3f78ad",
        "f5d6d20c399887f29bdda771660f87226e3a0d4ef36a90f40d3f717085957b60",
        "f275404a115cd720ee099f5d6b7d5dc705d1c95ac6ae01c917031b64f7dccc72",
        "39dffa9f0160bcda63920305fc12f88d824f5b654970dbd579c08367c12fcd78",
        "3331338e87608c7f36265c9b52bb5ebeac1bb3e2220d2682370f4b7c09dccd4b",
        "44947bd36c0200fb5d5d05187861364f6b666aac8ce37b368e27f01cea7cf147",
        "cf4e69842833e0dab8a7302933d648fee98de80284af2d7ead71b420a8f0ebde",
        "3638eae8a9889bbd96769637526010b34cd1e121805eaaaaa0602405529ca92f",
    ];

    const EXPECTED_BLINDED_PUBKEYS: [&str; 11] = [
        "03f221b62aa21ee45982d14505de2b582716ae95c265168f586dc547f0ea8f135f",
        "0299692178029fe08c49e8123bb0e84d6e960b27f82c8aed43013526489d46c0d5",
        "03ae189850bda004f9723e17372c99ff9df9e29750d2147d40efb45ac8ab2cdd2c",
        "03109838d718fbe02e9458ffa423f25bae0388146542534f8e2a094de6f7b697fa",
        "0339d5ed7ea93292e60a4211b2daf20dff53f050835614643a43edccc35c8313db",
        "0237861efcd52fe959bce07c33b5607aeae0929749b8339f68ba4365f2fb5d2d8d",
        "026d5500988a62cde23096047db61e9fb5ef2fea5c521019e23862108ea4e14d72",
        "039024fd20b26e73143509537d7c18595cfd101da4b18bb86ddd30e944aac6ef1b",
        "03017ec4218ca2ed0fbe050e3f1a91221407bf8c896b803a891c3a52d162867ef8",
        "0380dc0d2c79249e47b5afb61b7d40e37b9b0370ec7c80b50c62111021b886ab31",
        "0261a8a32e718f5f27610a2b7c2069d6bab05d1ead7da21aa9dd2a3c758bdf6479",
    ];

    #[test]
    fn ecdh_kdf_agrees_both_directions_and_matches_vectors() {
        let id = keyset_id();
        for slot in 0..=MAX_CANONICAL_SLOT {
            let r_sender =
                ecdh_kdf(&ephemeral_secret_key(), &receiver_public_key(), id, slot).unwrap();
            let r_receiver =
                ecdh_kdf(&receiver_secret_key(), &ephemeral_public_key(), id, slot).unwrap();
            assert_eq!(r_sender, r_receiver);
            assert_eq!(
                r_sender,
                SecretKey::from_hex(EXPECTED_BLINDING_SCALARS[slot as usize]).unwrap()
            );
        }
    }

    #[test]
    fn blind_public_key_matches_vectors() {
        for slot in 0..=MAX_CANONICAL_SLOT {
            let r = SecretKey::from_hex(EXPECTED_BLINDING_SCALARS[slot as usize]).unwrap();
            let blinded = blind_public_key(&receiver_public_key(), &r).unwrap();
            assert_eq!(
                blinded,
                PublicKey::from_hex(EXPECTED_BLINDED_PUBKEYS[slot as usize]).unwrap()
            );
        }
    }

    #[test]
    fn derive_signing_key_recovers_a_key_that_matches_the_blinded_point() {
        let r = SecretKey::from_hex(EXPECTED_BLINDING_SCALARS[0]).unwrap();
        let blinded = PublicKey::from_hex(EXPECTED_BLINDED_PUBKEYS[0]).unwrap();
        let signing_key = derive_signing_key_bip340(&receiver_secret_key(), &r, &blinded)
            .unwrap()
            .unwrap();
        assert_eq!(signing_key.public_key().x_only_public_key(), blinded.x_only_public_key());
    }

    #[test]
    fn derive_signing_key_returns_none_for_the_wrong_key() {
        let r = SecretKey::from_hex(EXPECTED_BLINDING_SCALARS[0]).unwrap();
        let blinded = PublicKey::from_hex(EXPECTED_BLINDED_PUBKEYS[0]).unwrap();
        let wrong_key = SecretKey::generate();
        assert!(derive_signing_key_bip340(&wrong_key, &r, &blinded).unwrap().is_none());
    }

    #[test]
    fn lock_and_derive_receiver_signing_key_round_trips() {
        let ephemeral = ephemeral_secret_key();
        let recipient = receiver_secret_key();
        let id = keyset_id();

        let secret = lock_to_blinded_key(&ephemeral, &recipient.public_key(), id, 0, &[]).unwrap();
        let signing_key = derive_receiver_signing_key(&secret, &recipient, id, 0)
            .unwrap()
            .unwrap();

        let blinded = PublicKey::from_hex(secret.secret_data().data()).unwrap();
        assert_eq!(signing_key.public_key().x_only_public_key(), blinded.x_only_public_key());
    }

    #[test]
    fn derive_receiver_signing_key_returns_none_for_a_different_recipient() {
        let ephemeral = ephemeral_secret_key();
        let id = keyset_id();
        let secret =
            lock_to_blinded_key(&ephemeral, &receiver_public_key(), id, 0, &[]).unwrap();
        let someone_else = SecretKey::generate();
        assert!(derive_receiver_signing_key(&secret, &someone_else, id, 0)
            .unwrap()
            .is_none());
    }

    #[test]
    fn rejects_slot_past_the_maximum() {
        assert!(ecdh_kdf(&ephemeral_secret_key(), &receiver_public_key(), keyset_id(), 11).is_err());
    }

}
