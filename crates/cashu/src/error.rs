//! Crate-wide error type

use thiserror::Error;

/// Errors raised by the protocol primitives in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A secp256k1 point or scalar was malformed or invalid.
    #[error(transparent)]
    Secp256k1(#[from] bitcoin::secp256k1::Error),
    /// BIP-32 derivation failed.
    #[error(transparent)]
    Bip32(#[from] bitcoin::bip32::Error),
    /// HMAC output could not be interpreted.
    #[error(transparent)]
    Hmac(#[from] bitcoin::hashes::FromSliceError),
    /// Hex string was malformed.
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
    /// Base64 string was malformed.
    #[error(transparent)]
    Base64(#[from] bitcoin::base64::DecodeError),
    /// JSON (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    /// CBOR (de)serialization failed.
    #[error("cbor error: {0}")]
    Cbor(String),
    /// A keyset id had an unrecognized length or version byte.
    #[error("invalid keyset id: {0}")]
    InvalidKeysetId(String),
    /// No public key exists for the given amount in this keyset.
    #[error("no key for amount {0:?} in keyset")]
    AmountKey(crate::Amount),
    /// `hashToCurve` did not find a valid point within the iteration bound.
    #[error("hash_to_curve exhausted its search space")]
    NoValidPoint,
    /// DLEQ proof did not verify against the supplied points.
    #[error("DLEQ proof is invalid")]
    DleqInvalid,
    /// A scalar that must be nonzero was derived as zero.
    #[error("derived scalar is zero")]
    ZeroScalar,
    /// The amount does not fit the crate's denomination scheme.
    #[error("amount overflow or invalid split")]
    InvalidAmount,
    /// A secret did not parse as the expected format.
    #[error("malformed secret: {0}")]
    MalformedSecret(String),
    /// A P2PK/P2BK witness was missing, short, or otherwise unusable.
    #[error("invalid spending condition witness: {0}")]
    InvalidWitness(String),
    /// A P2PK/P2BK spending condition's signature threshold was not met.
    #[error("spending conditions are not met")]
    SpendConditionsNotMet,
    /// The same pubkey produced more than one valid signature in a witness.
    #[error("duplicate signature from the same pubkey")]
    DuplicateSignature,
    /// A requested locktime already lies in the past.
    #[error("locktime is in the past")]
    LocktimeInPast,
    /// An unrecognized `sigflag` tag value.
    #[error("unknown sigflag")]
    UnknownSigFlag,
    /// A secret's kind did not match the operation being attempted on it.
    #[error("secret kind {0:?} does not match the expected spending condition")]
    IncorrectSecretKind(crate::nuts::Kind),
}
