//! Exchange a paid Lightning invoice for ecash: `createMintQuote` → wait
//! for payment (caller-driven, via polling or a subscription) → build
//! outputs → `mint` → unblind.

use cashu::amount::SplitTarget;
use cashu::dhke::construct_proofs;
use cashu::keys::SecretKey;
use cashu::{Amount, Proofs, PublicKey};

use super::Wallet;
use crate::error::Error;
use crate::output_data::OutputData;
use crate::rpc::{MintQuoteRequest, MintQuoteResponse, MintRequest, QuoteState};

/// `quote_id || B_0 || B_1 || ... || B_n` (each `B_` hex-encoded), the
/// NUT-20 message a lock pubkey's holder must sign to claim a locked quote.
fn mint_request_message(quote: &str, outputs: &[cashu::BlindedMessage]) -> Vec<u8> {
    let mut msg = quote.as_bytes().to_vec();
    for output in outputs {
        msg.extend_from_slice(output.blinded_secret.to_hex().as_bytes());
    }
    msg
}

impl Wallet {
    /// `POST /v1/mint/quote/bolt11`.
    pub async fn create_mint_quote(
        &self,
        amount: Amount,
        description: Option<String>,
        lock_pubkey: Option<PublicKey>,
    ) -> Result<MintQuoteResponse, Error> {
        self.connector
            .post_mint_quote(MintQuoteRequest {
                unit: self.unit.clone(),
                amount,
                description,
                pubkey: lock_pubkey,
            })
            .await
    }

    /// `GET /v1/mint/quote/bolt11/{quote}`, for the caller to poll, or to
    /// confirm state ahead of a subscription.
    pub async fn mint_quote_status(&self, quote: &str) -> Result<MintQuoteResponse, Error> {
        self.connector.get_mint_quote(quote).await
    }

    /// Claim `amount` of ecash against a quote the caller has confirmed is
    /// `PAID`. `locking_key` is required iff the quote was created with a
    /// lock pubkey (NUT-20): the mint request is then signed over its
    /// quote id and every output's blinded point.
    pub async fn mint(
        &self,
        quote: &MintQuoteResponse,
        amount: Amount,
        split_target: &SplitTarget,
        locking_key: Option<&SecretKey>,
    ) -> Result<Proofs, Error> {
        if quote.state != QuoteState::Paid {
            return Err(Error::State(format!(
                "quote {} is not paid (state: {:?})",
                quote.quote, quote.state
            )));
        }
        if quote.pubkey.is_some() && locking_key.is_none() {
            return Err(Error::State(format!(
                "quote {} is pubkey-locked but no locking key was supplied",
                quote.quote
            )));
        }

        cashu_log::log_info!("minting {} against quote {}", amount.to_u64(), quote.quote);
        let keyset_id = self.active_keyset_id().await?;
        let output_data = OutputData::random(keyset_id, amount, split_target)?;
        let outputs = output_data.blinded_messages();

        let signature = locking_key
            .map(|key| -> Result<String, Error> {
                let msg = mint_request_message(&quote.quote, &outputs);
                Ok(key.sign(&msg)?.to_string())
            })
            .transpose()?;

        let response = self
            .connector
            .post_mint(MintRequest {
                quote: quote.quote.clone(),
                outputs,
                signature,
            })
            .await?;

        if response.signatures.len() != output_data.len() {
            return Err(Error::Protocol(format!(
                "mint returned {} signatures for {} outputs",
                response.signatures.len(),
                output_data.len()
            )));
        }

        let keys = self
            .keysets
            .keys(keyset_id)
            .await
            .ok_or_else(|| Error::State(format!("keys for keyset {keyset_id} not cached")))?;
        let rs = output_data.outputs.iter().map(|o| o.r.clone()).collect();
        let secrets = output_data.outputs.iter().map(|o| o.secret.clone()).collect();
        Ok(construct_proofs(response.signatures, rs, secrets, &keys)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashu::Id;

    #[test]
    fn mint_request_message_matches_quote_then_hex_points_format() {
        let id = Id::from_hex("00456a94ab4e1c46").unwrap();
        let b_ = SecretKey::generate().public_key();
        let outputs = vec![cashu::BlindedMessage::new(Amount::from(1), id, b_)];
        let msg = mint_request_message("abc", &outputs);
        let mut expected = b"abc".to_vec();
        expected.extend_from_slice(b_.to_hex().as_bytes());
        assert_eq!(msg, expected);
    }
}
