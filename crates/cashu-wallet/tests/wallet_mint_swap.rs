//! End-to-end exercise of the wallet against an in-process mock mint: load
//! keysets, mint against a paid quote, then send in both the exact-match
//! and swap-required cases.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cashu::amount::SplitTarget;
use cashu::keys::SecretKey;
use cashu::keyset::KeySetVersion;
use cashu::{Amount, Id, KeySetInfo, Keys};
use cashu_wallet::error::Error;
use cashu_wallet::rpc::{
    CheckStateRequest, CheckStateResponse, KeySet, KeysResponse, KeysetsResponse, MeltQuoteRequest,
    MeltQuoteResponse, MeltRequest, MintInfo, MintQuoteRequest, MintQuoteResponse, MintRequest,
    MintResponse, QuoteState, RestoreRequest, RestoreResponse, SwapRequest, SwapResponse,
};
use cashu_wallet::transport::MintConnector;
use cashu_wallet::Wallet;

const DENOMINATIONS: [u64; 6] = [1, 2, 4, 8, 16, 32];

#[derive(Debug)]
struct MockMint {
    keyset_id: Id,
    mint_keys: BTreeMap<Amount, SecretKey>,
    public_keys: Keys,
    quotes: Mutex<Vec<(String, Amount)>>,
}

impl MockMint {
    fn new() -> Arc<Self> {
        let mut mint_keys = BTreeMap::new();
        let mut pub_map = BTreeMap::new();
        for &d in &DENOMINATIONS {
            let sk = SecretKey::generate();
            pub_map.insert(Amount::from(d), sk.public_key());
            mint_keys.insert(Amount::from(d), sk);
        }
        let public_keys = Keys::new(pub_map);
        let keyset_id = Id::from_keys(&public_keys, "sat", None, KeySetVersion::Version00);
        Arc::new(Self {
            keyset_id,
            mint_keys,
            public_keys,
            quotes: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl MintConnector for MockMint {
    async fn get_mint_info(&self) -> Result<MintInfo, Error> {
        Ok(MintInfo {
            name: Some("mock".into()),
            pubkey: None,
            version: None,
            description: None,
            nuts: BTreeMap::new(),
            motd: None,
        })
    }

    async fn get_mint_keys(&self) -> Result<KeysResponse, Error> {
        Ok(KeysResponse {
            keysets: vec![KeySet {
                id: self.keyset_id,
                unit: "sat".into(),
                keys: self.public_keys.clone(),
            }],
        })
    }

    async fn get_mint_keyset(&self, keyset_id: Id) -> Result<KeysResponse, Error> {
        assert_eq!(keyset_id, self.keyset_id);
        self.get_mint_keys().await
    }

    async fn get_mint_keysets(&self) -> Result<KeysetsResponse, Error> {
        Ok(KeysetsResponse {
            keysets: vec![KeySetInfo {
                id: self.keyset_id,
                unit: "sat".into(),
                active: true,
                input_fee_ppk: 0,
                expiry: None,
            }],
        })
    }

    async fn post_swap(&self, request: SwapRequest) -> Result<SwapResponse, Error> {
        Ok(SwapResponse {
            signatures: self.sign(&request.outputs)?,
        })
    }

    async fn post_mint_quote(&self, request: MintQuoteRequest) -> Result<MintQuoteResponse, Error> {
        let quote_id = format!("quote-{}", self.quotes.lock().unwrap().len());
        self.quotes.lock().unwrap().push((quote_id.clone(), request.amount));
        Ok(MintQuoteResponse {
            quote: quote_id,
            request: "lnbc-mock".into(),
            state: QuoteState::Paid,
            expiry: u64::MAX,
            pubkey: request.pubkey,
        })
    }

    async fn get_mint_quote(&self, quote: &str) -> Result<MintQuoteResponse, Error> {
        Ok(MintQuoteResponse {
            quote: quote.to_string(),
            request: "lnbc-mock".into(),
            state: QuoteState::Paid,
            expiry: u64::MAX,
            pubkey: None,
        })
    }

    async fn post_mint(&self, request: MintRequest) -> Result<MintResponse, Error> {
        Ok(MintResponse {
            signatures: self.sign(&request.outputs)?,
        })
    }

    async fn post_melt_quote(&self, _request: MeltQuoteRequest) -> Result<MeltQuoteResponse, Error> {
        unimplemented!("not exercised by this test")
    }

    async fn get_melt_quote(&self, _quote: &str) -> Result<MeltQuoteResponse, Error> {
        unimplemented!("not exercised by this test")
    }

    async fn post_melt(&self, _request: MeltRequest) -> Result<MeltQuoteResponse, Error> {
        unimplemented!("not exercised by this test")
    }

    async fn post_check_state(&self, request: CheckStateRequest) -> Result<CheckStateResponse, Error> {
        Ok(CheckStateResponse {
            states: request
                .ys
                .into_iter()
                .map(|y| cashu_wallet::rpc::ProofStateEntry {
                    y,
                    state: cashu_wallet::rpc::ProofState::Unspent,
                    witness: None,
                })
                .collect(),
        })
    }

    async fn post_restore(&self, _request: RestoreRequest) -> Result<RestoreResponse, Error> {
        Ok(RestoreResponse {
            outputs: Vec::new(),
            signatures: Vec::new(),
        })
    }
}

impl MockMint {
    fn sign(&self, outputs: &[cashu::BlindedMessage]) -> Result<Vec<cashu::BlindSignature>, Error> {
        outputs
            .iter()
            .map(|output| {
                let key = self
                    .mint_keys
                    .get(&output.amount)
                    .ok_or_else(|| Error::Validation(format!("no mint key for amount {:?}", output.amount)))?;
                let c = output.blinded_secret.mul_tweak(&key.as_scalar())?;
                Ok(cashu::BlindSignature {
                    amount: output.amount,
                    keyset_id: output.keyset_id,
                    c,
                    dleq: None,
                })
            })
            .collect()
    }
}

#[tokio::test]
async fn mint_then_send_exact_match_needs_no_swap() {
    let mint = MockMint::new();
    let wallet = Wallet::new(mint.clone(), "sat");
    wallet.load_mint().await.unwrap();

    let quote = wallet.create_mint_quote(Amount::from(16), None, None).await.unwrap();
    let proofs = wallet
        .mint(&quote, Amount::from(16), &SplitTarget::None, None)
        .await
        .unwrap();
    assert_eq!(proofs.len(), 1);
    assert_eq!(proofs[0].amount, Amount::from(16));

    let outcome = wallet
        .send(proofs, Amount::from(16), false, &SplitTarget::None, &SplitTarget::None)
        .await
        .unwrap();
    assert_eq!(outcome.send.len(), 1);
    assert!(outcome.keep.is_empty());
}

#[tokio::test]
async fn mint_then_send_partial_amount_triggers_a_swap() {
    let mint = MockMint::new();
    let wallet = Wallet::new(mint.clone(), "sat");
    wallet.load_mint().await.unwrap();

    let quote = wallet.create_mint_quote(Amount::from(32), None, None).await.unwrap();
    let proofs = wallet
        .mint(&quote, Amount::from(32), &SplitTarget::None, None)
        .await
        .unwrap();
    assert_eq!(proofs.len(), 1);

    let outcome = wallet
        .send(proofs, Amount::from(10), false, &SplitTarget::None, &SplitTarget::None)
        .await
        .unwrap();
    let send_total: u64 = outcome.send.iter().map(|p| p.amount.to_u64()).sum();
    let keep_total: u64 = outcome.keep.iter().map(|p| p.amount.to_u64()).sum();
    assert_eq!(send_total, 10);
    assert_eq!(keep_total, 22);
}
