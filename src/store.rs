//! Thread-safe revocation store: the CRV-per-revType map, the CA-SRD
//! and Log-SRD map-of-maps, and the current interval's delta-set.
//! Every mutable field lives behind one `tokio::sync::RwLock<Inner>` so
//! that the MMD sequencer's pipeline can be made atomic with respect to
//! concurrent HTTP handlers simply by holding one write guard across
//! all of it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::crv::Crv;
use crate::errors::CaError;
use crate::signer::Signer;
use crate::srd::SrdWithRevData;

/// A Logger's directory entry: where to reach it and how to verify
/// what it sends back.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub url: String,
    pub public_key: Vec<u8>,
}

struct Inner {
    crv_by_type: HashMap<String, Crv>,
    ca_srds: HashMap<String, HashMap<u64, SrdWithRevData>>,
    log_srds: HashMap<String, HashMap<u64, HashMap<String, SrdWithRevData>>>,
    delta_set: Vec<u64>,
    prev_timestamp: u64,
}

/// The CA's single logical store. `signer` and `log_directory` are
/// read-only after construction, so they live outside the lock.
pub struct RevocationStore {
    inner: RwLock<Inner>,
    pub mmd: u64,
    pub ca_id: String,
    pub signer: Arc<dyn Signer>,
    pub log_directory: HashMap<String, LogEntry>,
    pub listen_address: String,
}

impl RevocationStore {
    pub fn new(
        mmd: u64,
        ca_id: String,
        signer: Arc<dyn Signer>,
        log_directory: HashMap<String, LogEntry>,
        listen_address: String,
    ) -> Self {
        Self {
            inner: RwLock::new(Inner {
                crv_by_type: HashMap::new(),
                ca_srds: HashMap::new(),
                log_srds: HashMap::new(),
                delta_set: Vec::new(),
                prev_timestamp: 0,
            }),
            mmd,
            ca_id,
            signer,
            log_directory,
            listen_address,
        }
    }

    /// `AddRevocationNums(list)`: insert into the delta-set. Idempotent
    /// — duplicates collapse since the set is deduplicated on drain,
    /// and are harmless meanwhile since a bit-vector set is idempotent
    /// too.
    pub async fn add_revocation_nums(&self, nums: &[u64]) {
        let mut inner = self.inner.write().await;
        for &n in nums {
            if !inner.delta_set.contains(&n) {
                inner.delta_set.push(n);
            }
        }
    }

    /// `DeltaRevocationsToList()`.
    pub async fn delta_revocations_to_list(&self) -> Vec<u64> {
        self.inner.read().await.delta_set.clone()
    }

    /// `ClearDeltaRevocations()`.
    pub async fn clear_delta_revocations(&self) {
        self.inner.write().await.delta_set.clear();
    }

    pub async fn add_ca_srd(&self, srd: SrdWithRevData) {
        let mut inner = self.inner.write().await;
        inner
            .ca_srds
            .entry(srd.rev_data.rev_type.clone())
            .or_default()
            .insert(srd.rev_data.timestamp, srd);
    }

    pub async fn get_ca_srd(&self, rev_type: &str, timestamp: u64) -> Option<SrdWithRevData> {
        let inner = self.inner.read().await;
        inner
            .ca_srds
            .get(rev_type)
            .and_then(|m| m.get(&timestamp))
            .cloned()
    }

    pub async fn add_log_srd(&self, srd: SrdWithRevData) {
        let mut inner = self.inner.write().await;
        let log_id = srd.srd.entity_id.clone();
        inner
            .log_srds
            .entry(srd.rev_data.rev_type.clone())
            .or_default()
            .entry(srd.rev_data.timestamp)
            .or_default()
            .insert(log_id, srd);
    }

    pub async fn get_log_srd(
        &self,
        rev_type: &str,
        timestamp: u64,
        log_id: &str,
    ) -> Option<SrdWithRevData> {
        let inner = self.inner.read().await;
        inner
            .log_srds
            .get(rev_type)
            .and_then(|m| m.get(&timestamp))
            .and_then(|m| m.get(log_id))
            .cloned()
    }

    pub async fn get_recent_log_srds(&self, rev_type: &str, timestamp: u64) -> Vec<SrdWithRevData> {
        let inner = self.inner.read().await;
        inner
            .log_srds
            .get(rev_type)
            .and_then(|m| m.get(&timestamp))
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn prev_timestamp(&self) -> u64 {
        self.inner.read().await.prev_timestamp
    }

    /// `UpdateMMD()` timing rule: if uninitialized, anchor
    /// one MMD in the past from now; otherwise advance the anchor by
    /// exactly one MMD. Returns the new `prev_timestamp`.
    pub async fn update_mmd(&self, now_unix: u64) -> u64 {
        let mut inner = self.inner.write().await;
        let new_anchor = if inner.prev_timestamp == 0 {
            now_unix
        } else {
            inner.prev_timestamp + 2 * self.mmd
        };
        inner.prev_timestamp = new_anchor - self.mmd;
        inner.prev_timestamp
    }

    /// Runs the per-tick pipeline under one write
    /// guard, so a reader can never observe `crv_by_type[rev_type]` at
    /// timestamp `t` without also observing `ca_srds[rev_type][t]`.
    pub async fn do_revocation_transparency_tasks(
        &self,
        rev_type: &str,
    ) -> Result<SrdWithRevData, CaError> {
        let mut inner = self.inner.write().await;

        let delta_nums = inner.delta_set.clone();
        let delta = Crv::delta(&delta_nums);
        let base = inner
            .crv_by_type
            .get(rev_type)
            .cloned()
            .unwrap_or_else(Crv::empty);
        let new_crv = Crv::apply_delta(&base, &delta);
        inner.crv_by_type.insert(rev_type.to_string(), new_crv.clone());

        let timestamp = inner.prev_timestamp;
        let srd = crate::srd::build_srd(&new_crv, &delta, timestamp, &self.ca_id, self.signer.as_ref())?;

        inner
            .ca_srds
            .entry(rev_type.to_string())
            .or_default()
            .insert(timestamp, srd.clone());

        Ok(srd)
    }

    pub async fn crv_for(&self, rev_type: &str) -> Option<Crv> {
        self.inner.read().await.crv_by_type.get(rev_type).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::Ed25519Signer;

    fn test_store() -> RevocationStore {
        let pkcs8 = Ed25519Signer::generate_pkcs8().unwrap();
        let signer: Arc<dyn Signer> = Arc::new(Ed25519Signer::from_pkcs8(&pkcs8).unwrap());
        RevocationStore::new(2, "ca-1".into(), signer, HashMap::new(), "127.0.0.1:0".into())
    }

    #[tokio::test]
    async fn add_then_fetch_srd() {
        let store = test_store();
        store.add_revocation_nums(&[1, 2, 3]).await;
        store.update_mmd(1_000_000).await;
        let srd = store
            .do_revocation_transparency_tasks(crate::srd::LETS_REVOKE)
            .await
            .unwrap();

        let fetched = store
            .get_ca_srd(crate::srd::LETS_REVOKE, srd.rev_data.timestamp)
            .await
            .unwrap();
        assert_eq!(fetched.rev_data.timestamp, srd.rev_data.timestamp);

        let missing = store
            .get_ca_srd(crate::srd::LETS_REVOKE, srd.rev_data.timestamp + 1)
            .await;
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn mmd_advances_by_exactly_mmd() {
        let store = test_store();
        let first = store.update_mmd(1_000_000).await;
        let second = store.update_mmd(1_000_010).await;
        assert_eq!(second, first + store.mmd);
    }

    #[tokio::test]
    async fn crv_accumulates_across_ticks() {
        let store = test_store();

        store.add_revocation_nums(&[1, 2]).await;
        store.update_mmd(1_000_000).await;
        store
            .do_revocation_transparency_tasks(crate::srd::LETS_REVOKE)
            .await
            .unwrap();
        store.clear_delta_revocations().await;

        store.add_revocation_nums(&[3]).await;
        store.update_mmd(1_000_010).await;
        store
            .do_revocation_transparency_tasks(crate::srd::LETS_REVOKE)
            .await
            .unwrap();
        store.clear_delta_revocations().await;

        let crv = store.crv_for(crate::srd::LETS_REVOKE).await.unwrap();
        assert_eq!(crv.to_nums(), vec![1, 2, 3]);
        assert!(store.delta_revocations_to_list().await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_revocation_nums_are_idempotent() {
        let store = test_store();
        store.add_revocation_nums(&[5, 5, 5]).await;
        assert_eq!(store.delta_revocations_to_list().await, vec![5]);
    }
}
