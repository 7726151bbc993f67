//! HTTP surface: binds the five externally-visible endpoints to the
//! revocation store, publisher and status assembler. The wire formats
//! are a thin boundary over the core pipeline — this module does no
//! pipeline logic of its own beyond request/response shaping.

mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::publisher::Publisher;
use crate::status::StatusAssembler;
use crate::store::RevocationStore;

/// Shared state handed to every handler via axum's `State` extractor.
pub struct AppState {
    pub store: Arc<RevocationStore>,
    pub publisher: Arc<Publisher>,
    pub status: StatusAssembler,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::liveness))
        .route(
            "/ct/v1/get-revocation-status",
            get(handlers::get_revocation_status),
        )
        .route(
            "/ct/v1/post-log-srd-with-rev-data",
            post(handlers::post_log_srd_with_rev_data),
        )
        .route(
            "/ct/v1/post-new-revocation-nums",
            post(handlers::post_new_revocation_nums),
        )
        .route(
            "/ct/v1/revoke-and-produce-srd",
            get(handlers::revoke_and_produce_srd),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::collections::HashMap;
    use tower::ServiceExt;

    use crate::signer::{Ed25519Signer, Signer};

    fn test_state() -> Arc<AppState> {
        let pkcs8 = Ed25519Signer::generate_pkcs8().unwrap();
        let signer: Arc<dyn Signer> = Arc::new(Ed25519Signer::from_pkcs8(&pkcs8).unwrap());
        let store = Arc::new(RevocationStore::new(
            2,
            "ca-1".into(),
            signer,
            HashMap::new(),
            "127.0.0.1:0".into(),
        ));
        let publisher = Arc::new(Publisher::new(store.clone()));
        let status = StatusAssembler::new(store.clone());
        Arc::new(AppState {
            store,
            publisher,
            status,
        })
    }

    #[tokio::test]
    async fn liveness_returns_200() {
        let app = build_router(test_state());
        let resp = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn status_is_500_before_first_tick() {
        let app = build_router(test_state());
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/ct/v1/get-revocation-status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn post_new_revocation_nums_accepts_body() {
        let app = build_router(test_state());
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/ct/v1/post-new-revocation-nums")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"RevocationNums": [1, 2, 3]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn revoke_and_produce_srd_does_not_advance_timeline() {
        let state = test_state();
        let app = build_router(state.clone());

        let before = state.store.prev_timestamp().await;
        let resp = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/ct/v1/revoke-and-produce-srd")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"PercentRevoked": 10, "TotalCerts": 100}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.store.prev_timestamp().await, before);
    }
}
