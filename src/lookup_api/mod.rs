//! HTTP lookup endpoint
//!
//! `GET /token/:address` answers from the store when the token is known;
//! otherwise it runs the reduced overview extraction, upserts the result and
//! returns it. An extraction failure becomes a single 500 with an error body.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::capability::SessionFactory;
use crate::extraction::{ExtractionPlan, StageFailure, harvest_overview};
use crate::store::{TokenRecord, TokenStore};

const HEALTH_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared state for the lookup routes
#[derive(Clone)]
pub struct LookupState {
    pub store: TokenStore,
    pub factory: Arc<dyn SessionFactory>,
    pub plan: Arc<ExtractionPlan>,
}

/// Body returned for a token lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenSummary {
    pub contract: String,
    pub name: Option<String>,
    pub logo_url: Option<String>,
}

impl From<TokenRecord> for TokenSummary {
    fn from(record: TokenRecord) -> Self {
        Self {
            contract: record.address,
            name: record.name,
            logo_url: record.thumbnail,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Failed to scrape token data: {0}")]
    Extraction(StageFailure),

    #[error("Token store unavailable: {0}")]
    Store(#[from] crate::store::PersistenceError),
}

impl IntoResponse for LookupError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Extraction(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(e) if e.is_connection_lost() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn router(state: LookupState) -> Router {
    Router::new()
        .route("/token/:address", get(lookup_token))
        .route("/health", get(health))
        .with_state(state)
}

/// Return a stored token, or extract its overview and store it first.
pub async fn lookup_token(
    State(state): State<LookupState>,
    Path(address): Path<String>,
) -> Result<Json<TokenSummary>, LookupError> {
    if let Some(record) = state.store.get_token(&address).await? {
        return Ok(Json(record.into()));
    }

    info!(token = %address, "Token not stored; running overview extraction");
    let record = extract_overview(&state, &address)
        .await
        .map_err(LookupError::Extraction)?;

    state.store.upsert_token(&record).await?;
    Ok(Json(record.into()))
}

async fn extract_overview(state: &LookupState, address: &str) -> Result<TokenRecord, StageFailure> {
    let mut session = state
        .factory
        .acquire()
        .await
        .map_err(|e| StageFailure::Session(format!("{e:#}")))?;

    let extracted = harvest_overview(session.as_mut(), &state.plan, address).await;
    session.release().await;

    if let Err(failure) = &extracted {
        warn!(token = %address, reason = %failure, "Overview extraction failed");
    }
    extracted
}

async fn health(State(state): State<LookupState>) -> (StatusCode, Json<HealthResponse>) {
    match tokio::time::timeout(HEALTH_QUERY_TIMEOUT, state.store.ping()).await {
        Ok(Ok(())) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                error: None,
            }),
        ),
        Ok(Err(e)) => {
            error!("Health check query failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "error",
                    error: Some(e.to_string()),
                }),
            )
        }
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "error",
                error: Some("Query timeout (>5s)".to_string()),
            }),
        ),
    }
}
