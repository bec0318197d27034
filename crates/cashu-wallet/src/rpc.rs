//! Request/response shapes for the mint's HTTP RPC, exchanged through
//! whatever [`crate::transport::MintConnector`] the caller supplies. The
//! core never touches `reqwest` directly.

use std::collections::BTreeMap;

use cashu::{Amount, BlindSignature, BlindedMessage, Id, KeySetInfo, Keys, Proof, PublicKey};
use serde::{Deserialize, Serialize};

/// `GET /v1/info` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintInfo {
    /// Operator-chosen display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Mint's own public key, used for NUT-20 quote locking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<PublicKey>,
    /// `"<implementation>/<version>"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Short description shown in wallet UIs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Which NUTs are enabled and any protected-endpoint requirements.
    #[serde(default)]
    pub nuts: BTreeMap<String, serde_json::Value>,
    /// Message of the day the wallet should surface to the holder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motd: Option<String>,
}

impl MintInfo {
    /// Endpoint paths that NUT-22 marks as requiring an auth token, if the
    /// mint advertises any.
    pub fn protected_endpoints(&self) -> Vec<String> {
        self.nuts
            .get("22")
            .and_then(|v| v.get("protected_endpoints"))
            .and_then(|v| v.as_array())
            .map(|paths| {
                paths
                    .iter()
                    .filter_map(|p| p.get(1).and_then(|s| s.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// `GET /v1/keys` and `GET /v1/keys/{id}` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysResponse {
    /// One entry per keyset, with its full per-denomination key map.
    pub keysets: Vec<KeySet>,
}

/// A single keyset's public key map, as published by `/v1/keys`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySet {
    /// Keyset id.
    pub id: Id,
    /// Unit this keyset issues.
    pub unit: String,
    /// Per-denomination public keys.
    pub keys: Keys,
}

/// `GET /v1/keysets` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysetsResponse {
    /// Metadata (no keys) for every keyset the mint has ever used.
    pub keysets: Vec<KeySetInfo>,
}

/// `POST /v1/swap` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    /// Proofs being spent.
    pub inputs: Vec<Proof>,
    /// Blinded messages to be signed in exchange.
    pub outputs: Vec<BlindedMessage>,
}

/// `POST /v1/swap` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapResponse {
    /// One signature per requested output, in the same order.
    pub signatures: Vec<BlindSignature>,
}

/// The lifecycle state of a mint or melt quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuoteState {
    /// Payment has not yet been observed.
    Unpaid,
    /// Payment was observed; ecash has not yet been issued.
    Paid,
    /// Ecash has been issued against this quote; it cannot be reused.
    Issued,
    /// (Melt only) the mint is mid-payment.
    Pending,
}

/// `POST /v1/mint/quote/bolt11` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintQuoteRequest {
    /// Unit the caller will pay the invoice in.
    pub unit: String,
    /// Amount to mint.
    pub amount: Amount,
    /// Optional memo shown on the invoice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// NUT-20: lock minted outputs to this pubkey's signature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<PublicKey>,
}

/// `POST /v1/mint/quote/bolt11` and `GET .../{quote}` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintQuoteResponse {
    /// Quote id, referenced by the later `mint` call.
    pub quote: String,
    /// Payment request (invoice) the wallet must pay.
    pub request: String,
    /// Current lifecycle state. Authoritative over any legacy `paid` field.
    pub state: QuoteState,
    /// Unix time after which the quote can no longer be minted against.
    pub expiry: u64,
    /// Present only when the quote is NUT-20 pubkey-locked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<PublicKey>,
}

/// `POST /v1/mint/bolt11` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRequest {
    /// The quote being fulfilled.
    pub quote: String,
    /// Outputs to sign.
    pub outputs: Vec<BlindedMessage>,
    /// NUT-20 signature over the outputs, required for pubkey-locked quotes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// `POST /v1/mint/bolt11` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintResponse {
    /// One signature per requested output, in the same order.
    pub signatures: Vec<BlindSignature>,
}

/// `POST /v1/melt/quote/bolt11` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeltQuoteRequest {
    /// Unit the wallet will pay the quote's fee reserve in.
    pub unit: String,
    /// The invoice (or other payment request) to settle.
    pub request: String,
    /// NUT-15 multi-part-payment amount, when splitting a payment across
    /// several mints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

/// `POST /v1/melt/quote/bolt11` and `GET .../{quote}` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeltQuoteResponse {
    /// Quote id.
    pub quote: String,
    /// Amount the mint will actually need from inputs, excluding fee reserve.
    pub amount: Amount,
    /// Additional reserve the mint may consume as an on-chain/LN fee.
    pub fee_reserve: Amount,
    /// Current lifecycle state.
    pub state: QuoteState,
    /// Unix expiry time.
    pub expiry: u64,
    /// Payment preimage, once `state == PAID`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_preimage: Option<String>,
    /// Unblinded change from any blank outputs the wallet supplied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub change: Vec<BlindSignature>,
}

/// `POST /v1/melt/bolt11` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeltRequest {
    /// The quote being settled.
    pub quote: String,
    /// Proofs covering `amount + fee_reserve`.
    pub inputs: Vec<Proof>,
    /// Blank outputs the mint may sign as change if the payment cost less
    /// than the reserve.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<BlindedMessage>,
}

/// Per-proof spend state, as tracked by the mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProofState {
    /// Never spent.
    Unspent,
    /// Mid-transaction (e.g. reserved for an in-flight melt).
    Pending,
    /// Already spent; unusable.
    Spent,
}

/// `POST /v1/checkstate` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStateRequest {
    /// `hashToCurve(secret)` for each proof being checked.
    #[serde(rename = "Ys")]
    pub ys: Vec<PublicKey>,
}

/// One entry of a `checkstate` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStateEntry {
    /// Echoes the queried `Y`.
    #[serde(rename = "Y")]
    pub y: PublicKey,
    /// The proof's current state.
    pub state: ProofState,
    /// Witness attached server-side, if the proof was spent with one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub witness: Option<String>,
}

/// `POST /v1/checkstate` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStateResponse {
    /// One entry per queried `Y`, in the same order.
    pub states: Vec<ProofStateEntry>,
}

/// `POST /v1/restore` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreRequest {
    /// Candidate outputs to probe for a previously issued signature.
    pub outputs: Vec<BlindedMessage>,
}

/// `POST /v1/restore` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreResponse {
    /// Subset of the requested outputs the mint had actually signed.
    pub outputs: Vec<BlindedMessage>,
    /// Signatures, aligned with `outputs`.
    pub signatures: Vec<BlindSignature>,
}

/// `{ "detail": ..., "code": ... }` error body the mint returns on a
/// non-2xx HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable detail message.
    pub detail: String,
    /// Mint-specific numeric error code, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
}
