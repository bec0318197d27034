//! Pay a Lightning invoice (or other payment request) through the mint:
//! `createMeltQuote` → `meltProofs(quote, inputs + blank outputs)`. The
//! blank outputs let the mint hand back change, unblinded the same way as
//! a mint's signatures, if the payment cost less than the reserved fee.

use cashu::dhke::construct_proofs;
use cashu::{Amount, Proofs};

use super::Wallet;
use crate::error::Error;
use crate::output_data::OutputData;
use crate::rpc::{MeltQuoteRequest, MeltQuoteResponse, MeltRequest, QuoteState};

/// Result of a completed melt.
#[derive(Debug, Clone, Default)]
pub struct MeltOutcome {
    /// Final quote state (`PAID` on success; `PENDING` if the underlying
    /// payment is still in flight).
    pub state: Option<QuoteState>,
    /// Payment preimage, once available.
    pub payment_preimage: Option<String>,
    /// Unblinded change proofs from the blank outputs, if any were
    /// supplied and the mint returned signatures for them.
    pub change: Proofs,
}

impl Wallet {
    /// `POST /v1/melt/quote/bolt11`.
    pub async fn create_melt_quote(&self, request: String) -> Result<MeltQuoteResponse, Error> {
        self.connector
            .post_melt_quote(MeltQuoteRequest {
                unit: self.unit.clone(),
                request,
                options: None,
            })
            .await
    }

    /// `GET /v1/melt/quote/bolt11/{quote}`.
    pub async fn melt_quote_status(&self, quote: &str) -> Result<MeltQuoteResponse, Error> {
        self.connector.get_melt_quote(quote).await
    }

    /// Settle `quote` by spending `inputs`, which must cover
    /// `quote.amount + quote.fee_reserve`. Supplies `ceil(log2(fee_reserve))`
    /// blank outputs so the mint can issue change for any reserve left
    /// unspent.
    pub async fn melt(&self, quote: &MeltQuoteResponse, inputs: Proofs) -> Result<MeltOutcome, Error> {
        let required = quote.amount + quote.fee_reserve;
        let total: Amount = inputs.iter().map(|p| p.amount).sum();
        if total < required {
            return Err(Error::InsufficientFunds {
                needed: required.to_u64(),
                available: total.to_u64(),
            });
        }

        let keyset_id = self.active_keyset_id().await?;
        let blanks = OutputData::blank(keyset_id, quote.fee_reserve)?;
        let blank_outputs = blanks.blinded_messages();

        let response = self
            .connector
            .post_melt(MeltRequest {
                quote: quote.quote.clone(),
                inputs,
                outputs: blank_outputs.clone(),
            })
            .await?;

        let change = if response.change.is_empty() {
            Proofs::new()
        } else {
            if response.change.len() != blanks.len() {
                return Err(Error::Protocol(format!(
                    "mint returned {} change signatures for {} blank outputs",
                    response.change.len(),
                    blanks.len()
                )));
            }
            let keys = self
                .keysets
                .keys(keyset_id)
                .await
                .ok_or_else(|| Error::State(format!("keys for keyset {keyset_id} not cached")))?;
            let rs = blanks.outputs.iter().map(|o| o.r.clone()).collect();
            let secrets = blanks.outputs.iter().map(|o| o.secret.clone()).collect();
            construct_proofs(response.change, rs, secrets, &keys)?
        };

        Ok(MeltOutcome {
            state: Some(response.state),
            payment_preimage: response.payment_preimage,
            change,
        })
    }
}
