//! A wallet's local copy of a mint's keysets: per-amount public keys, fees,
//! and active flags. Refreshed by `load_mint`/`refresh`, read constantly by
//! every other operation for fee lookups and signature unblinding.
//!
//! Guarded by a [`tokio::sync::RwLock`] rather than a `Mutex`: concurrent
//! operations reading fees or keys for unrelated proofs shouldn't block each
//! other, while a refresh (rare, and usually triggered by a keyset-id
//! mismatch) takes the writer side and excludes everyone else.

use std::collections::HashMap;

use cashu::keyset::KeySetVersion;
use cashu::{Id, KeySetInfo, Keys};
use tokio::sync::RwLock;

use crate::error::Error;
use crate::rpc::{KeySet, KeysResponse, KeysetsResponse};
use crate::transport::MintConnector;

#[derive(Debug, Clone)]
struct Entry {
    info: KeySetInfo,
    keys: Option<Keys>,
}

#[derive(Debug, Default)]
struct Inner {
    keysets: HashMap<Id, Entry>,
    active: Option<Id>,
}

/// Per-mint keyset registry.
#[derive(Debug, Default)]
pub struct KeysetCache {
    inner: RwLock<Inner>,
}

impl KeysetCache {
    /// An empty cache, before any mint has been loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch `/v1/keysets` and `/v1/keys` and install the active keyset:
    /// the lowest-fee keyset that is marked active, whose id version this
    /// crate recognizes, and whose id verifies against its own published
    /// keys.
    pub async fn load_mint(&self, connector: &dyn MintConnector) -> Result<Id, Error> {
        let keysets_resp: KeysetsResponse = connector.get_mint_keysets().await?;
        let keys_resp: KeysResponse = connector.get_mint_keys().await?;
        self.install(keysets_resp.keysets, keys_resp.keysets).await
    }

    /// Refresh a single keyset's key map, e.g. after the mint reports a
    /// keyset id this cache doesn't yet know about.
    pub async fn refresh_keyset(
        &self,
        connector: &dyn MintConnector,
        keyset_id: Id,
    ) -> Result<(), Error> {
        let resp = connector.get_mint_keyset(keyset_id).await?;
        let keyset = resp
            .keysets
            .into_iter()
            .find(|k| k.id == keyset_id)
            .ok_or_else(|| Error::Protocol(format!("mint did not return keyset {keyset_id}")))?;
        let expiry = self
            .inner
            .read()
            .await
            .keysets
            .get(&keyset_id)
            .and_then(|e| e.info.expiry);
        if !keyset_id.verify(&keyset.keys, &keyset.unit, expiry) {
            return Err(Error::Validation(format!(
                "keyset {keyset_id} id does not match its published keys"
            )));
        }
        let mut guard = self.inner.write().await;
        guard
            .keysets
            .entry(keyset_id)
            .and_modify(|e| e.keys = Some(keyset.keys.clone()))
            .or_insert(Entry {
                info: KeySetInfo {
                    id: keyset_id,
                    unit: keyset.unit.clone(),
                    active: false,
                    input_fee_ppk: 0,
                    expiry,
                },
                keys: Some(keyset.keys),
            });
        Ok(())
    }

    async fn install(&self, infos: Vec<KeySetInfo>, key_sets: Vec<KeySet>) -> Result<Id, Error> {
        let mut keys_by_id: HashMap<Id, Keys> =
            key_sets.into_iter().map(|k| (k.id, k.keys)).collect();

        let mut keysets = HashMap::new();
        for info in infos {
            let keys = keys_by_id.remove(&info.id);
            if let Some(keys) = &keys {
                if !info.id.verify(keys, &info.unit, info.expiry) {
                    return Err(Error::Validation(format!(
                        "keyset {} id does not match its published keys",
                        info.id
                    )));
                }
            }
            keysets.insert(info.id, Entry { info, keys });
        }

        let active = keysets
            .values()
            .filter(|e| e.info.active && recognized_version(&e.info.id))
            .min_by_key(|e| e.info.input_fee_ppk)
            .map(|e| e.info.id)
            .ok_or_else(|| Error::State("mint has no recognized active keyset".into()))?;

        let mut guard = self.inner.write().await;
        *guard = Inner {
            keysets,
            active: Some(active),
        };
        cashu_log::log_debug!("keyset cache refreshed: active keyset is {}", active);
        Ok(active)
    }

    /// The currently active keyset id, if a mint has been loaded.
    pub async fn active_id(&self) -> Option<Id> {
        self.inner.read().await.active
    }

    /// Per-denomination public keys for `id`, if cached.
    pub async fn keys(&self, id: Id) -> Option<Keys> {
        self.inner.read().await.keysets.get(&id).and_then(|e| e.keys.clone())
    }

    /// `input_fee_ppk` for `id`, treating an unknown keyset as fee-free
    /// (callers that care should `refresh_keyset` first).
    pub async fn fee_rate(&self, id: Id) -> u64 {
        self.inner
            .read()
            .await
            .keysets
            .get(&id)
            .map(|e| e.info.input_fee_ppk)
            .unwrap_or(0)
    }

    /// A `keyset_id -> input_fee_ppk` map for every cached keyset, as
    /// [`crate::selection::select`] expects.
    pub async fn fee_rates(&self) -> HashMap<Id, u64> {
        self.inner
            .read()
            .await
            .keysets
            .values()
            .map(|e| (e.info.id, e.info.input_fee_ppk))
            .collect()
    }

    /// Metadata for a cached keyset.
    pub async fn info(&self, id: Id) -> Option<KeySetInfo> {
        self.inner.read().await.keysets.get(&id).map(|e| e.info.clone())
    }
}

fn recognized_version(id: &Id) -> bool {
    matches!(id.get_version(), KeySetVersion::Version00 | KeySetVersion::Version01)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashu::keys::SecretKey;
    use std::collections::BTreeMap;

    fn keyset(id_seed: u8, fee: u64, active: bool) -> (KeySetInfo, KeySet) {
        let mut map = BTreeMap::new();
        let mut amount = 1u64;
        for _ in 0..3 {
            map.insert(cashu::Amount::from(amount), SecretKey::generate().public_key());
            amount *= 2;
        }
        let keys = Keys::new(map);
        let id = Id::from_keys(&keys, "sat", None, KeySetVersion::Version00);
        let _ = id_seed;
        (
            KeySetInfo {
                id,
                unit: "sat".into(),
                active,
                input_fee_ppk: fee,
                expiry: None,
            },
            KeySet {
                id,
                unit: "sat".into(),
                keys,
            },
        )
    }

    #[tokio::test]
    async fn installs_lowest_fee_active_keyset() {
        let cache = KeysetCache::new();
        let (info_a, keys_a) = keyset(1, 500, true);
        let (info_b, keys_b) = keyset(2, 100, true);
        let (info_c, keys_c) = keyset(3, 0, false);

        let active = cache
            .install(vec![info_a, info_b.clone(), info_c], vec![keys_a, keys_b, keys_c])
            .await
            .unwrap();
        assert_eq!(active, info_b.id);
        assert_eq!(cache.active_id().await, Some(info_b.id));
        assert_eq!(cache.fee_rate(info_b.id).await, 100);
    }

    #[tokio::test]
    async fn installs_a_version01_keyset_whose_id_covers_unit_and_expiry() {
        let mut map = BTreeMap::new();
        map.insert(cashu::Amount::from(1u64), SecretKey::generate().public_key());
        let keys = Keys::new(map);
        let id = Id::from_keys(&keys, "sat", Some(1_800_000_000), KeySetVersion::Version01);
        let info = KeySetInfo {
            id,
            unit: "sat".into(),
            active: true,
            input_fee_ppk: 0,
            expiry: Some(1_800_000_000),
        };
        let key_set = KeySet { id, unit: "sat".into(), keys };

        let cache = KeysetCache::new();
        let active = cache.install(vec![info], vec![key_set]).await.unwrap();
        assert_eq!(active, id);
    }

    #[tokio::test]
    async fn rejects_keyset_whose_id_does_not_verify() {
        let cache = KeysetCache::new();
        let (mut info, keys) = keyset(1, 0, true);
        // Corrupt the advertised id so it no longer matches `keys`.
        info.id = Id::from_hex("009a1f293253e41e").unwrap();
        let err = cache.install(vec![info], vec![keys]).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn errors_when_no_keyset_is_active() {
        let cache = KeysetCache::new();
        let (mut info, keys) = keyset(1, 0, false);
        info.active = false;
        let err = cache.install(vec![info], vec![keys]).await.unwrap_err();
        assert!(matches!(err, Error::State(_)));
    }
}
