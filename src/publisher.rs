//! Publisher/ingestor: fans out the CA's SRD to every configured
//! Logger, and verifies + stores the SRDs Loggers POST back.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::errors::CaError;
use crate::srd::{verify_srd_signature, SrdWithRevData};
use crate::store::RevocationStore;

const LOG_POST_PATH: &str = "/ct/v1/post-ca-srd";
const LOG_POST_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Publisher {
    store: Arc<RevocationStore>,
    client: Client,
}

impl Publisher {
    pub fn new(store: Arc<RevocationStore>) -> Self {
        let client = Client::builder()
            .timeout(LOG_POST_TIMEOUT)
            .build()
            .expect("reqwest client builds with a fixed, valid configuration");
        Self { store, client }
    }

    /// `PostCASRD(srd)`: best-effort fan-out, one POST per configured
    /// Logger. A failure against one Logger is logged and does not
    /// abort delivery to the others — no panics, no retry queue.
    pub async fn post_ca_srd(&self, srd: &SrdWithRevData) {
        for (log_id, entry) in &self.store.log_directory {
            let url = format!("{}{}", entry.url.trim_end_matches('/'), LOG_POST_PATH);
            let result = self
                .client
                .post(&url)
                .header("Content-Type", "application/json")
                .json(srd)
                .send()
                .await;

            match result {
                Ok(resp) => {
                    let status = resp.status();
                    // Drain and release the body on every path, success
                    // or failure, so the connection returns to the pool.
                    let _ = resp.bytes().await;
                    if !status.is_success() {
                        tracing::warn!(%log_id, %url, %status, "logger rejected CA-SRD");
                    } else {
                        tracing::debug!(%log_id, %url, "posted CA-SRD to logger");
                    }
                }
                Err(e) => {
                    tracing::warn!(%log_id, %url, error = %e, "failed to post CA-SRD to logger");
                }
            }
        }
    }

    /// `IngestLogSRD(srd)`: verifies and stores a Logger's countersigned
    /// SRD. The CA does not cross-check the Logger's hashes against its
    /// own — a validly-signed SRD is stored as-is so auditors can
    /// detect divergence from the evidence trail.
    pub async fn ingest_log_srd(&self, srd: SrdWithRevData) -> Result<(), CaError> {
        let log_id = &srd.srd.entity_id;
        let entry = self
            .store
            .log_directory
            .get(log_id)
            .ok_or_else(|| CaError::UnknownLogger(log_id.clone()))?;

        verify_srd_signature(&srd.srd, &entry.public_key)?;

        self.store.add_log_srd(srd).await;
        Ok(())
    }
}
