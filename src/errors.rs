//! Error taxonomy for the revocation CA.
//!
//! Variant names are semantic, matching the taxonomy in the design
//! document rather than any particular crate's error type, since
//! several stages (compression, hashing, signing, HTTP) each need to
//! surface the stage that failed without leaking their internal error
//! types across module boundaries.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum CaError {
    #[error("config error: {0}")]
    Config(String),

    #[error("crypto error during {stage}: {source}")]
    Crypto {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("corrupt compression: {0}")]
    CorruptCompression(String),

    #[error("corrupt serialization: {0}")]
    CorruptSerialization(String),

    #[error("unknown logger: {0}")]
    UnknownLogger(String),

    #[error("no revocation status available yet")]
    NoStatusAvailable,

    #[error("network error talking to {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("bad signature")]
    BadSignature,

    #[error("not found")]
    NotFound,
}

impl CaError {
    pub fn crypto(stage: &'static str, source: impl Into<anyhow::Error>) -> Self {
        CaError::Crypto {
            stage,
            source: source.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            CaError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CaError::Crypto { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            CaError::CorruptCompression(_) => StatusCode::BAD_REQUEST,
            CaError::CorruptSerialization(_) => StatusCode::BAD_REQUEST,
            CaError::UnknownLogger(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CaError::NoStatusAvailable => StatusCode::INTERNAL_SERVER_ERROR,
            CaError::Network { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            CaError::BadSignature => StatusCode::INTERNAL_SERVER_ERROR,
            CaError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for CaError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "request failed");
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, axum::Json(body)).into_response()
    }
}
