//! The boundary between the wallet core and the network: an async trait per
//! direction, implemented by a caller-supplied HTTP client and WebSocket
//! client. The core never constructs a `reqwest::Client` or opens a socket
//! itself.

use std::fmt::Debug;

use async_trait::async_trait;
use cashu::Id;
use tokio::sync::mpsc;

use crate::error::Error;
use crate::rpc::{
    CheckStateRequest, CheckStateResponse, KeysResponse, KeysetsResponse, MeltQuoteRequest,
    MeltQuoteResponse, MeltRequest, MintInfo, MintQuoteRequest, MintQuoteResponse, MintRequest,
    MintResponse, RestoreRequest, RestoreResponse, SwapRequest, SwapResponse,
};

/// Interface that connects a wallet to a single mint. Typically an
/// `HttpClient` wrapping `reqwest`, but may be a mock for tests or an FFI
/// shim into a host-platform HTTP stack.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait MintConnector: Debug + Send + Sync {
    /// `GET /v1/info`.
    async fn get_mint_info(&self) -> Result<MintInfo, Error>;
    /// `GET /v1/keys`.
    async fn get_mint_keys(&self) -> Result<KeysResponse, Error>;
    /// `GET /v1/keys/{id}`.
    async fn get_mint_keyset(&self, keyset_id: Id) -> Result<KeysResponse, Error>;
    /// `GET /v1/keysets`.
    async fn get_mint_keysets(&self) -> Result<KeysetsResponse, Error>;
    /// `POST /v1/swap`.
    async fn post_swap(&self, request: SwapRequest) -> Result<SwapResponse, Error>;
    /// `POST /v1/mint/quote/bolt11`.
    async fn post_mint_quote(&self, request: MintQuoteRequest) -> Result<MintQuoteResponse, Error>;
    /// `GET /v1/mint/quote/bolt11/{quote}`.
    async fn get_mint_quote(&self, quote: &str) -> Result<MintQuoteResponse, Error>;
    /// `POST /v1/mint/bolt11`.
    async fn post_mint(&self, request: MintRequest) -> Result<MintResponse, Error>;
    /// `POST /v1/melt/quote/bolt11`.
    async fn post_melt_quote(&self, request: MeltQuoteRequest) -> Result<MeltQuoteResponse, Error>;
    /// `GET /v1/melt/quote/bolt11/{quote}`.
    async fn get_melt_quote(&self, quote: &str) -> Result<MeltQuoteResponse, Error>;
    /// `POST /v1/melt/bolt11`.
    async fn post_melt(&self, request: MeltRequest) -> Result<MeltQuoteResponse, Error>;
    /// `POST /v1/checkstate`.
    async fn post_check_state(&self, request: CheckStateRequest) -> Result<CheckStateResponse, Error>;
    /// `POST /v1/restore`.
    async fn post_restore(&self, request: RestoreRequest) -> Result<RestoreResponse, Error>;
}

/// One notification delivered over a quote/proof-state subscription.
#[derive(Debug, Clone)]
pub struct SubscriptionEvent {
    /// The subscription id the caller passed to `subscribe`.
    pub sub_id: String,
    /// Raw JSON payload, shaped per `kind` (a quote or a proof state).
    pub payload: serde_json::Value,
}

/// What a subscription tracks: mint-quote, melt-quote, or per-proof state
/// updates, each keyed by a different kind of filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionKind {
    /// `bolt11_mint_quote`, filtered by quote id.
    Bolt11MintQuote,
    /// `bolt11_melt_quote`, filtered by quote id.
    Bolt11MeltQuote,
    /// `proof_state`, filtered by `Y = hashToCurve(secret)`.
    ProofState,
}

impl SubscriptionKind {
    /// The JSON-RPC `kind` string this variant subscribes as.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bolt11MintQuote => "bolt11_mint_quote",
            Self::Bolt11MeltQuote => "bolt11_melt_quote",
            Self::ProofState => "proof_state",
        }
    }
}

/// A live subscription: notifications arrive on `events` until the handle
/// (or its transport) is dropped or `unsubscribe` is called.
pub struct Subscription {
    /// Caller-chosen id correlating `subscribe`/`unsubscribe` calls and
    /// incoming notifications.
    pub sub_id: String,
    /// Channel delivering each notification as it arrives.
    pub events: mpsc::Receiver<SubscriptionEvent>,
}

/// The JSON-RPC-over-WebSocket half of the mint connection. Reconnects are
/// caller-driven: on an abnormal close, pending subscriptions should be
/// failed and it is up to the caller to call `subscribe` again after
/// reconnecting.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait SubscriptionTransport: Debug + Send + Sync {
    /// Open a subscription for `kind`, filtered to `filters` (quote ids or
    /// `Y` hex strings, depending on `kind`).
    async fn subscribe(
        &self,
        kind: SubscriptionKind,
        filters: Vec<String>,
        sub_id: String,
    ) -> Result<Subscription, Error>;

    /// Close a previously opened subscription.
    async fn unsubscribe(&self, sub_id: String) -> Result<(), Error>;
}
