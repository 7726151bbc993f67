use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use super::AppState;
use crate::errors::CaError;
use crate::srd::{RevocationStatus, SrdWithRevData, LETS_REVOKE};

pub async fn liveness() -> &'static str {
    "ok"
}

pub async fn get_revocation_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RevocationStatus>, CaError> {
    let status = state.status.get_latest_revocation_status().await?;
    Ok(Json(status))
}

pub async fn post_log_srd_with_rev_data(
    State(state): State<Arc<AppState>>,
    Json(srd): Json<SrdWithRevData>,
) -> Result<(), CaError> {
    state.publisher.ingest_log_srd(srd).await
}

#[derive(Debug, Deserialize)]
struct RevocationNumsRequest {
    #[serde(rename = "RevocationNums")]
    revocation_nums: Vec<u64>,
}

pub async fn post_new_revocation_nums(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RevocationNumsRequest>,
) -> Result<(), CaError> {
    state.store.add_revocation_nums(&body.revocation_nums).await;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct RevokeAndProduceSrdRequest {
    #[serde(rename = "PercentRevoked")]
    percent_revoked: u8,
    #[serde(rename = "TotalCerts")]
    total_certs: u64,
}

/// Test/collection-mode endpoint: revokes a synthetic batch of serials
/// and signs an SRD over the result, without advancing the CA's
/// timeline — it deliberately does not call `UpdateMMD`, so it can be
/// polled repeatedly without perturbing the real MMD schedule.
pub async fn revoke_and_produce_srd(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RevokeAndProduceSrdRequest>,
) -> Result<Json<SrdWithRevData>, CaError> {
    let count = (body.total_certs * body.percent_revoked.min(100) as u64) / 100;
    let nums: Vec<u64> = (0..count).collect();

    state.store.add_revocation_nums(&nums).await;
    let result = state
        .store
        .do_revocation_transparency_tasks(LETS_REVOKE)
        .await;
    state.store.clear_delta_revocations().await;

    let srd = result?;
    Ok(Json(srd))
}
