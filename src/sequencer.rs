//! MMD sequencer: the periodic tick that drives the per-interval
//! revocation pipeline. Runs as an independent tokio task,
//! cancelled cooperatively via a `watch` channel — the idiomatic
//! equivalent of the Go `done chan bool` in the original sequencer.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::watch;
use tokio::time::{interval, Duration};

use crate::publisher::Publisher;
use crate::srd::LETS_REVOKE;
use crate::store::RevocationStore;

pub struct Sequencer {
    store: Arc<RevocationStore>,
    publisher: Arc<Publisher>,
    /// When true, every published CA-SRD is also fanned out to all
    /// configured Loggers ("optional in collection mode").
    collection_mode: bool,
}

impl Sequencer {
    pub fn new(store: Arc<RevocationStore>, publisher: Arc<Publisher>, collection_mode: bool) -> Self {
        Self {
            store,
            publisher,
            collection_mode,
        }
    }

    /// Runs the tick loop until `shutdown` is signalled. Exits at the
    /// next tick boundary, or immediately if idle between ticks.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(Duration::from_secs(self.store.mmd));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("sequencer received shutdown signal, exiting");
                        return;
                    }
                }
            }
        }
    }

    async fn tick(&self) {
        let now = now_unix();
        self.store.update_mmd(now).await;

        match self.store.do_revocation_transparency_tasks(LETS_REVOKE).await {
            Ok(srd) => {
                tracing::info!(
                    timestamp = srd.rev_data.timestamp,
                    rev_type = %srd.rev_data.rev_type,
                    "published CA-SRD for MMD tick"
                );
                if self.collection_mode {
                    self.publisher.post_ca_srd(&srd).await;
                }
            }
            Err(e) => {
                // A failed tick leaves the delta-set intact so the
                // next tick carries the work forward.
                tracing::error!(error = %e, "MMD tick failed, delta-set preserved for retry");
                return;
            }
        }

        self.store.clear_delta_revocations().await;
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}
