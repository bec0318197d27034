//! Translates "tell me when this quote settles" / "tell me when this proof
//! gets spent" into the [`SubscriptionTransport`] primitives, and decodes
//! each notification's payload into the matching `rpc` response type.

use cashu::dhke::hash_to_curve;
use cashu::Secret;
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::rpc::{MeltQuoteResponse, MintQuoteResponse, ProofStateEntry};
use crate::transport::{Subscription, SubscriptionKind, SubscriptionTransport};

/// Subscribe to state changes for a mint quote.
pub async fn watch_mint_quote(
    transport: &dyn SubscriptionTransport,
    quote: &str,
    sub_id: impl Into<String>,
) -> Result<QuoteWatch<MintQuoteResponse>, Error> {
    let sub_id = sub_id.into();
    let subscription = transport
        .subscribe(
            SubscriptionKind::Bolt11MintQuote,
            vec![quote.to_string()],
            sub_id,
        )
        .await?;
    Ok(QuoteWatch {
        subscription,
        _marker: std::marker::PhantomData,
    })
}

/// Subscribe to state changes for a melt quote.
pub async fn watch_melt_quote(
    transport: &dyn SubscriptionTransport,
    quote: &str,
    sub_id: impl Into<String>,
) -> Result<QuoteWatch<MeltQuoteResponse>, Error> {
    let sub_id = sub_id.into();
    let subscription = transport
        .subscribe(
            SubscriptionKind::Bolt11MeltQuote,
            vec![quote.to_string()],
            sub_id,
        )
        .await?;
    Ok(QuoteWatch {
        subscription,
        _marker: std::marker::PhantomData,
    })
}

/// Subscribe to spend-state changes for a set of proof secrets, filtered by
/// `Y = hashToCurve(secret)` the way the mint indexes proof state.
pub async fn watch_proof_states(
    transport: &dyn SubscriptionTransport,
    secrets: &[Secret],
    sub_id: impl Into<String>,
) -> Result<QuoteWatch<ProofStateEntry>, Error> {
    let filters = secrets
        .iter()
        .map(|s| Ok(hash_to_curve(&s.to_bytes())?.to_hex()))
        .collect::<Result<Vec<String>, Error>>()?;
    let sub_id = sub_id.into();
    let subscription = transport
        .subscribe(SubscriptionKind::ProofState, filters, sub_id)
        .await?;
    Ok(QuoteWatch {
        subscription,
        _marker: std::marker::PhantomData,
    })
}

/// A live subscription narrowed to a single notification payload type.
pub struct QuoteWatch<T> {
    subscription: Subscription,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> QuoteWatch<T>
where
    T: DeserializeOwned,
{
    /// Wait for and decode the next notification. Returns `None` once the
    /// transport closes the subscription.
    pub async fn next(&mut self) -> Option<Result<T, Error>> {
        let event = self.subscription.events.recv().await?;
        Some(
            serde_json::from_value(event.payload)
                .map_err(|e| Error::Protocol(format!("malformed subscription payload: {e}"))),
        )
    }

    /// The subscription id this watch was opened under.
    pub fn sub_id(&self) -> &str {
        &self.subscription.sub_id
    }
}
