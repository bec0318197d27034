//! Wallet-level error taxonomy. Every operation that crosses into the
//! orchestration layer reports one of these, wrapping `cashu::Error` for
//! anything that failed inside the protocol core.

use thiserror::Error;

/// Errors raised by wallet operations: coin selection, token codec, and the
/// mint/swap/send/receive/melt/restore orchestration.
#[derive(Debug, Error)]
pub enum Error {
    /// Input did not parse or did not satisfy a protocol invariant.
    #[error("validation failed: {0}")]
    Validation(String),
    /// A cryptographic check failed: bad point, DLEQ mismatch, zero scalar.
    #[error(transparent)]
    Crypto(#[from] cashu::Error),
    /// The mint's HTTP endpoint returned a non-2xx status or was unreachable.
    #[error("transport error (status {status:?}): {detail}")]
    Transport {
        /// HTTP status code, if the request reached the server at all.
        status: Option<u16>,
        /// Mint-supplied or transport-supplied detail message.
        detail: String,
    },
    /// The mint's response was well-formed JSON but violated a schema
    /// invariant the wallet requires (wrong array length, missing field).
    #[error("protocol error: {0}")]
    Protocol(String),
    /// No combination of held proofs can cover the requested amount and fees.
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds {
        /// Smallest amount that would have satisfied the request.
        needed: u64,
        /// Total amount actually available to spend.
        available: u64,
    },
    /// The wallet was used in a way that requires prior setup it lacks:
    /// operating on a mint that hasn't been loaded, or a deterministic
    /// derivation call with no seed.
    #[error("invalid wallet state: {0}")]
    State(String),
    /// A protected endpoint required an auth token the caller's supplier
    /// could not produce.
    #[error("auth error: {0}")]
    Auth(String),
}

impl Error {
    /// Build a [`Error::Transport`] from an HTTP status and detail message.
    pub fn transport(status: Option<u16>, detail: impl Into<String>) -> Self {
        Self::Transport {
            status,
            detail: detail.into(),
        }
    }
}
