//! Blind Diffie-Hellman key exchange: the blind-signature scheme mints use
//! to sign ecash without learning the secret inside it, plus the DLEQ
//! proof that lets a holder verify a signature without trusting whoever
//! handed them the token.

use bitcoin::hashes::{sha256, Hash};

use crate::error::Error;
use crate::keys::{PublicKey, SecretKey};
use crate::proof::{BlindSignature, Proof};
use crate::secret::Secret;
use crate::Keys;

const DOMAIN_SEPARATOR: &[u8; 28] = b"Secp256k1_HashToCurve_Cashu_";

/// Map an arbitrary secret to a curve point via try-and-increment. The
/// first SHA-256 candidate that lifts to a valid point wins; this
/// terminates almost always on the first or second try.
pub fn hash_to_curve(message: &[u8]) -> Result<PublicKey, Error> {
    let h = sha256::Hash::hash(&[DOMAIN_SEPARATOR.as_slice(), message].concat()).to_byte_array();

    for counter in 0u32..(1 << 16) {
        let mut buf = Vec::with_capacity(36);
        buf.extend_from_slice(&h);
        buf.extend_from_slice(&counter.to_le_bytes());
        let candidate = sha256::Hash::hash(&buf).to_byte_array();

        let mut sec1 = [0u8; 33];
        sec1[0] = 0x02;
        sec1[1..].copy_from_slice(&candidate);
        if let Ok(point) = PublicKey::from_slice(&sec1) {
            return Ok(point);
        }
    }
    Err(Error::NoValidPoint)
}

/// `SHA256` over the concatenated uncompressed hex encodings of the given
/// points, used as the DLEQ Fiat-Shamir challenge.
fn hash_e(points: &[PublicKey]) -> [u8; 32] {
    let mut concat = String::new();
    for point in points {
        concat.push_str(&hex::encode(point.to_uncompressed_bytes()));
    }
    sha256::Hash::hash(concat.as_bytes()).to_byte_array()
}

/// Step 1 (Alice): blind `secret` with blinding factor `r`, returning
/// `(B_, r)`. A random `r` is generated if none is supplied.
pub fn blind_message(
    secret: &[u8],
    blinding_factor: Option<SecretKey>,
) -> Result<(PublicKey, SecretKey), Error> {
    let y = hash_to_curve(secret)?;
    let r = blinding_factor.unwrap_or_else(SecretKey::generate);
    let b = y.combine(&r.public_key())?;
    Ok((b, r))
}

/// Step 3 (Alice): unblind a mint's signature `C_` using the blinding
/// factor `r` and the mint's public key `A` for this denomination.
pub fn unblind_message(
    blinded_key: &PublicKey,
    r: &SecretKey,
    mint_pubkey: &PublicKey,
) -> Result<PublicKey, Error> {
    let r_a = mint_pubkey.mul_tweak(&r.as_scalar())?;
    blinded_key.combine(&r_a.negate())
}

/// Unblind a batch of mint signatures into spendable proofs, matching each
/// signature to the secret and blinding factor that produced its blinded
/// message.
pub fn construct_proofs(
    signatures: Vec<BlindSignature>,
    rs: Vec<SecretKey>,
    secrets: Vec<Secret>,
    keys: &Keys,
) -> Result<Vec<Proof>, Error> {
    if signatures.len() != rs.len() || signatures.len() != secrets.len() {
        return Err(Error::InvalidAmount);
    }
    let mut proofs = Vec::with_capacity(signatures.len());
    for ((signature, r), secret) in signatures.into_iter().zip(rs).zip(secrets) {
        let a = keys
            .amount_key(signature.amount)
            .ok_or(Error::AmountKey(signature.amount))?;
        let c = unblind_message(&signature.c, &r, a)?;
        proofs.push(Proof {
            amount: signature.amount,
            keyset_id: signature.keyset_id,
            secret,
            c,
            witness: None,
            dleq: None,
        });
    }
    Ok(proofs)
}

/// Mint-side: sign a blinded message with the mint's private key for this
/// denomination, returning `C_ = a*B_`.
pub fn sign_message(a: &SecretKey, blinded_message: &PublicKey) -> Result<PublicKey, Error> {
    blinded_message.mul_tweak(&a.as_scalar())
}

/// A DLEQ proof tying a blind signature to the mint's private key, without
/// revealing it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DleqProof {
    /// Fiat-Shamir challenge.
    pub e: SecretKey,
    /// Response.
    pub s: SecretKey,
    /// Blinding factor, carried only on proofs so receivers can re-blind
    /// and verify without access to the original session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r: Option<SecretKey>,
}

/// Mint-side: produce a DLEQ proof that `C_ = a*B_` uses the same `a` as
/// `A = a*G`, without revealing `a`. `s = p + e*a`, `e = hash_e(p*G, p*B_, A, C_)`.
pub fn dleq_create(b_: &PublicKey, a_priv: &SecretKey) -> Result<DleqProof, Error> {
    let a_pub = a_priv.public_key();
    let c_ = sign_message(a_priv, b_)?;

    let p = SecretKey::generate();
    let r1 = p.public_key();
    let r2 = b_.mul_tweak(&p.as_scalar())?;

    let e_bytes = hash_e(&[r1, r2, a_pub, c_]);
    let e = SecretKey::from_slice(&e_bytes)?;
    let e_times_a = a_priv.mul_scalar(&e.as_scalar())?;
    let s = p.add_tweak(&e_times_a.as_scalar())?;

    Ok(DleqProof { e, s, r: None })
}

impl SecretKey {
    /// `self * scalar`, treating both as field elements mod the curve
    /// order. Used for DLEQ's `e*a` term.
    fn mul_scalar(&self, other: &bitcoin::secp256k1::Scalar) -> Result<SecretKey, Error> {
        Ok(self.mul_tweak(other)?.into())
    }
}

/// Verify a DLEQ proof `(e, s)` against `(B_, C_, A)`: accept iff
/// `hash_e(s*G - e*A, s*B_ - e*C_, A, C_) == e`.
pub fn dleq_verify(b_: &PublicKey, c_: &PublicKey, a_pub: &PublicKey, proof: &DleqProof) -> Result<(), Error> {
    let s_g = proof.s.public_key();
    let e_a = a_pub.mul_tweak(&proof.e.as_scalar())?;
    let r1 = s_g.combine(&e_a.negate())?;

    let s_b = b_.mul_tweak(&proof.s.as_scalar())?;
    let e_c = c_.mul_tweak(&proof.e.as_scalar())?;
    let r2 = s_b.combine(&e_c.negate())?;

    let e_prime = hash_e(&[r1, r2, *a_pub, *c_]);
    if crate::util::ct_eq(&e_prime, &proof.e.to_secret_bytes()) {
        Ok(())
    } else {
        Err(Error::DleqInvalid)
    }
}

/// Re-derive `B_` and `C_` from a proof's `(secret, C, r)` and the DLEQ's
/// carried blinding factor, then run the standard verify. This is what a
/// receiver applies to proofs inside a token, without ever having seen
/// the original blinding session.
pub fn dleq_reblind_verify(
    secret: &Secret,
    c: &PublicKey,
    a_pub: &PublicKey,
    proof: &DleqProof,
) -> Result<(), Error> {
    let r = proof
        .r
        .as_ref()
        .ok_or_else(|| Error::InvalidWitness("DLEQ proof missing blinding factor".into()))?;
    let y = hash_to_curve(&secret.to_bytes())?;
    let b_ = y.combine(&r.public_key())?;
    let r_a = a_pub.mul_tweak(&r.as_scalar())?;
    let c_ = c.combine(&r_a)?;
    dleq_verify(&b_, &c_, a_pub, proof)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_to_curve_matches_fixed_vectors() {
        let secret = hex::decode(
            "0000000000000000000000000000000000000000000000000000000000000000",
        )
        .unwrap();
        let y = hash_to_curve(&secret).unwrap();
        assert_eq!(
            y.to_hex(),
            "02c03ade6f7345a213ea11acde3fda8514f2b7d836a32dfac38f9596c07258f9a9"
        );

        let secret = hex::decode(
            "0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        let y = hash_to_curve(&secret).unwrap();
        assert_eq!(
            y.to_hex(),
            "02a5525df57a880f880f28903f32b421df848b3dc1d2cf0bf3d718d7bd772c2df9"
        );
    }

    #[test]
    fn blind_unblind_roundtrips() {
        let secret = b"test_message".to_vec();
        let a = SecretKey::generate();
        let (b_, r) = blind_message(&secret, None).unwrap();
        let c_ = sign_message(&a, &b_).unwrap();
        let c = unblind_message(&c_, &r, &a.public_key()).unwrap();

        let expected = hash_to_curve(&secret).unwrap().mul_tweak(&a.as_scalar()).unwrap();
        assert_eq!(c, expected);
    }
}
