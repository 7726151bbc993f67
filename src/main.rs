use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ct_revocation_ca::config::{self, Opt};
use ct_revocation_ca::http::{self, AppState};
use ct_revocation_ca::publisher::Publisher;
use ct_revocation_ca::sequencer::Sequencer;
use ct_revocation_ca::signer::{Ed25519Signer, Signer};
use ct_revocation_ca::status::StatusAssembler;
use ct_revocation_ca::store::RevocationStore;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    init_logging();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "fatal error during startup");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let opt = Opt::parse();
    let resolved = config::load(&opt).context("loading configuration")?;

    let signer: Arc<dyn Signer> = Arc::new(
        Ed25519Signer::from_pkcs8(&resolved.private_key_pkcs8)
            .context("parsing CA private key")?,
    );

    let store = Arc::new(RevocationStore::new(
        resolved.mmd,
        resolved.ca_id.clone(),
        signer.clone(),
        resolved.log_directory,
        resolved.listen_address.clone(),
    ));

    let publisher = Arc::new(Publisher::new(store.clone()));
    let status = StatusAssembler::new(store.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sequencer = Sequencer::new(store.clone(), publisher.clone(), true);
    let sequencer_handle = tokio::spawn(sequencer.run(shutdown_rx));

    // Caps the graceful drain at 5s: if in-flight requests haven't
    // finished by then, exit anyway rather than hang indefinitely.
    let mut grace_rx = shutdown_tx.subscribe();
    tokio::spawn(async move {
        if grace_rx.changed().await.is_ok() && *grace_rx.borrow() {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            tracing::warn!("graceful shutdown exceeded its grace period, forcing exit");
            std::process::exit(0);
        }
    });

    let state = Arc::new(AppState {
        store: store.clone(),
        publisher,
        status,
    });
    let app = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(&resolved.listen_address)
        .await
        .with_context(|| format!("binding listen address {}", resolved.listen_address))?;

    tracing::info!(
        ca_id = %resolved.ca_id,
        listen = %resolved.listen_address,
        mmd = resolved.mmd,
        "CA node ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .context("HTTP server error")?;

    sequencer_handle.await.context("sequencer task panicked")?;

    tracing::info!("CA node shutdown complete");
    Ok(())
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install SIGINT handler");
    tracing::info!("shutdown signal received, starting graceful drain");
    let _ = shutdown_tx.send(true);
}

fn init_logging() {
    let log_level = std::env::var("CA_LOG_LEVEL")
        .ok()
        .and_then(|s| s.parse::<tracing::Level>().ok())
        .unwrap_or(tracing::Level::INFO);

    let subscriber = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .json(),
        )
        .with(
            tracing_subscriber::filter::EnvFilter::from_default_env().add_directive(
                format!("ct_revocation_ca={log_level}")
                    .parse()
                    .expect("static directive always parses"),
            ),
        );

    subscriber.init();
}
