//! Status assembler: builds the externally-visible revocation status
//! for the most recently completed MMD interval, combining the CA's
//! own SRD with whatever Logger SRDs have arrived for that slot.

use std::sync::Arc;

use crate::errors::CaError;
use crate::srd::{RevocationStatus, LETS_REVOKE};
use crate::store::RevocationStore;

pub struct StatusAssembler {
    store: Arc<RevocationStore>,
}

impl StatusAssembler {
    pub fn new(store: Arc<RevocationStore>) -> Self {
        Self { store }
    }

    /// `GetLatestRevocationStatus()`: the most recently completed
    /// interval is `prevTimestamp - MMD`, not `prevTimestamp` itself,
    /// since `prevTimestamp` is the anchor for the *current*, still
    /// in-flight interval.
    pub async fn get_latest_revocation_status(&self) -> Result<RevocationStatus, CaError> {
        let prev = self.store.prev_timestamp().await;
        if prev < self.store.mmd {
            return Err(CaError::NoStatusAvailable);
        }
        let completed = prev - self.store.mmd;

        let ca_srd = self
            .store
            .get_ca_srd(LETS_REVOKE, completed)
            .await
            .ok_or(CaError::NoStatusAvailable)?;

        let log_srds = self.store.get_recent_log_srds(LETS_REVOKE, completed).await;

        Ok(RevocationStatus { ca_srd, log_srds })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::{Ed25519Signer, Signer};
    use std::collections::HashMap;

    fn test_store() -> RevocationStore {
        let pkcs8 = Ed25519Signer::generate_pkcs8().unwrap();
        let signer: Arc<dyn Signer> = Arc::new(Ed25519Signer::from_pkcs8(&pkcs8).unwrap());
        RevocationStore::new(2, "ca-1".into(), signer, HashMap::new(), "127.0.0.1:0".into())
    }

    #[tokio::test]
    async fn no_status_before_first_completed_interval() {
        let store = Arc::new(test_store());
        let assembler = StatusAssembler::new(store.clone());
        let err = assembler.get_latest_revocation_status().await.unwrap_err();
        assert!(matches!(err, CaError::NoStatusAvailable));
    }

    #[tokio::test]
    async fn status_available_after_two_ticks() {
        let store = Arc::new(test_store());

        store.update_mmd(1_000_000).await;
        store
            .do_revocation_transparency_tasks(LETS_REVOKE)
            .await
            .unwrap();
        store.clear_delta_revocations().await;

        store.update_mmd(1_000_010).await;
        store
            .do_revocation_transparency_tasks(LETS_REVOKE)
            .await
            .unwrap();
        store.clear_delta_revocations().await;

        // prev_timestamp anchors the *current* interval; the most
        // recently completed one is one MMD behind that, i.e. the SRD
        // produced on the first tick.
        let assembler = StatusAssembler::new(store.clone());
        let status = assembler.get_latest_revocation_status().await.unwrap();
        assert_eq!(status.ca_srd.rev_data.timestamp, store.prev_timestamp().await - store.mmd);
        assert!(status.log_srds.is_empty());
    }

    #[tokio::test]
    async fn status_bundle_includes_ingested_logger_srd() {
        let pkcs8 = Ed25519Signer::generate_pkcs8().unwrap();
        let ca_signer: Arc<dyn Signer> = Arc::new(Ed25519Signer::from_pkcs8(&pkcs8).unwrap());

        let logger_signer =
            Ed25519Signer::from_pkcs8(&Ed25519Signer::generate_pkcs8().unwrap()).unwrap();
        let mut log_directory = HashMap::new();
        log_directory.insert(
            "log-1".to_string(),
            crate::store::LogEntry {
                url: "http://example.invalid".to_string(),
                public_key: logger_signer.public_key_bytes(),
            },
        );

        let store = Arc::new(RevocationStore::new(
            2,
            "ca-1".into(),
            ca_signer,
            log_directory,
            "127.0.0.1:0".into(),
        ));
        let publisher = crate::publisher::Publisher::new(store.clone());

        // First tick produces the CA-SRD at T that the logger countersigns.
        let t1 = store.update_mmd(1_000_000).await;
        store
            .do_revocation_transparency_tasks(LETS_REVOKE)
            .await
            .unwrap();
        store.clear_delta_revocations().await;

        let crv = store.crv_for(LETS_REVOKE).await.unwrap();
        let delta = crate::crv::Crv::delta(&[]);
        let log_srd = crate::srd::build_srd(&crv, &delta, t1, "log-1", &logger_signer).unwrap();
        publisher.ingest_log_srd(log_srd).await.unwrap();

        // Second tick advances prevTimestamp so T's slot becomes "completed".
        store.update_mmd(1_000_010).await;
        store
            .do_revocation_transparency_tasks(LETS_REVOKE)
            .await
            .unwrap();
        store.clear_delta_revocations().await;

        let assembler = StatusAssembler::new(store.clone());
        let status = assembler.get_latest_revocation_status().await.unwrap();
        assert_eq!(status.ca_srd.rev_data.timestamp, t1);
        assert_eq!(status.log_srds.len(), 1);
        assert_eq!(status.log_srds[0].srd.entity_id, "log-1");
    }
}
