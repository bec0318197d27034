//! Client-side orchestration for a Cashu wallet: coin selection, the
//! deterministic output factory, the token codec, and the
//! mint/swap/send/receive/melt/restore operations built on top of them.
//!
//! This crate owns no transport and no storage. [`transport::MintConnector`]
//! and [`transport::SubscriptionTransport`] are the seams a caller plugs an
//! HTTP client and a WebSocket client into; [`wallet::Wallet`] holds no
//! proofs of its own; it's up to the caller to persist what
//! mint/swap/send/receive/melt/restore hand back.

#![warn(missing_docs)]

pub mod error;
pub mod keyset_cache;
pub mod output_data;
pub mod rpc;
pub mod selection;
pub mod subscription;
pub mod token;
pub mod transport;
pub mod wallet;

pub use error::Error;
pub use keyset_cache::KeysetCache;
pub use output_data::OutputData;
pub use selection::Selection;
pub use token::Token;
pub use wallet::{MeltOutcome, ReceiveOptions, RestoreOutcome, SendOutcome, SwapOutcome, Wallet};
