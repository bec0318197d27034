//! Cashu protocol primitives: BDHKE blind signatures, deterministic secret
//! derivation, spending-condition secrets and the wire types shared between
//! a wallet and a mint.
//!
//! This crate has no knowledge of HTTP, WebSockets, or storage. Everything
//! here is pure, reproducible math over secp256k1 and SHA-256/HMAC.

#![warn(missing_docs)]

use std::sync::LazyLock;

use bitcoin::secp256k1::Secp256k1;

pub mod amount;
pub mod derivation;
pub mod dhke;
pub mod error;
pub mod keys;
pub mod keyset;
pub mod nuts;
pub mod proof;
pub mod secret;
pub mod util;

pub use amount::Amount;
pub use error::Error;
pub use keys::{PublicKey, SecretKey};
pub use keyset::{Id, KeySetInfo, Keys};
pub use proof::{BlindSignature, BlindedMessage, Proof, Proofs};
pub use secret::Secret;

/// Shared secp256k1 context, used everywhere a signature or tweak is
/// produced or checked so the crate never pays for context creation twice.
pub static SECP256K1: LazyLock<Secp256k1<bitcoin::secp256k1::All>> =
    LazyLock::new(Secp256k1::new);
