//! Orchestration layer: stitches the keyset cache, coin selection, output
//! factory, and token codec into the mint/swap/send/receive/melt/restore
//! operations a caller actually wants. Holds no proof storage of its own —
//! proofs in, proofs out; the caller decides what to keep and where.

mod melt;
mod mint;
mod receive;
mod restore;
mod send;
mod swap;

pub use melt::MeltOutcome;
pub use receive::ReceiveOptions;
pub use restore::RestoreOutcome;
pub use send::SendOutcome;
pub use swap::SwapOutcome;

use std::sync::Arc;

use cashu::Id;

use crate::error::Error;
use crate::keyset_cache::KeysetCache;
use crate::rpc::{CheckStateRequest, ProofStateEntry};
use crate::transport::MintConnector;

/// A client-side handle to one mint: its connector, its cached keysets,
/// and (optionally) the seed backing deterministic output derivation.
pub struct Wallet {
    connector: Arc<dyn MintConnector>,
    keysets: KeysetCache,
    unit: String,
    seed: Option<[u8; 64]>,
}

impl Wallet {
    /// Build a wallet against `connector`, issuing ecash denominated in
    /// `unit`. Call [`Self::load_mint`] before any other operation.
    pub fn new(connector: Arc<dyn MintConnector>, unit: impl Into<String>) -> Self {
        Self {
            connector,
            keysets: KeysetCache::new(),
            unit: unit.into(),
            seed: None,
        }
    }

    /// Attach a seed, enabling deterministic (NUT-13 restorable) outputs
    /// and [`Self::restore`].
    pub fn with_seed(mut self, seed: [u8; 64]) -> Self {
        self.seed = Some(seed);
        self
    }

    fn seed_or_err(&self) -> Result<&[u8; 64], Error> {
        self.seed.as_ref().ok_or_else(|| {
            Error::State("wallet has no seed; deterministic outputs unavailable".into())
        })
    }

    /// The unit this wallet issues ecash in.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Fetch `/v1/keysets` and `/v1/keys` and install the active keyset.
    pub async fn load_mint(&self) -> Result<Id, Error> {
        self.keysets.load_mint(self.connector.as_ref()).await
    }

    /// The currently active keyset id. Errors if no mint has been loaded.
    pub async fn active_keyset_id(&self) -> Result<Id, Error> {
        self.keysets
            .active_id()
            .await
            .ok_or_else(|| Error::State("no mint loaded; call load_mint first".into()))
    }

    /// `GET /v1/info`.
    pub async fn mint_info(&self) -> Result<crate::rpc::MintInfo, Error> {
        self.connector.get_mint_info().await
    }

    /// Per-proof spend state as currently tracked by the mint.
    pub async fn check_proofs_state(
        &self,
        proofs: &cashu::Proofs,
    ) -> Result<Vec<ProofStateEntry>, Error> {
        use cashu::proof::ProofsMethods;
        let ys = proofs.ys()?;
        let response = self.connector.post_check_state(CheckStateRequest { ys }).await?;
        Ok(response.states)
    }
}
