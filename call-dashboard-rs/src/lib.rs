use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{json, Value};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;

pub mod aggregation;
pub mod auth_middleware;
pub mod config;
pub mod event;
pub mod event_store;
pub mod presentation;
pub mod validation;

use aggregation::DashboardSummary;
use event_store::{EventStore, StoreError};
use validation::{parse_event_body, payload_limit_config};

static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub service_name: String,
    pub uptime_seconds: u64,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        tracing::error!("Event store failure: {}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: self.to_string(),
                code: 500,
            }),
        )
            .into_response()
    }
}

/// Call dashboard state: the event store and the shared API key
pub struct CallDashboard {
    store: Arc<dyn EventStore>,
    api_key: Option<String>,
}

impl CallDashboard {
    pub fn new(store: Arc<dyn EventStore>, api_key: Option<String>) -> Self {
        Lazy::force(&START_TIME);
        Self { store, api_key }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Run a store operation on the blocking thread pool
    pub async fn run_blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&dyn EventStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(store.as_ref())).await?
    }

    /// Compute the current summary over every stored event
    pub async fn summary(&self) -> Result<DashboardSummary, StoreError> {
        let events = self.run_blocking(|store| store.load_all()).await?;
        Ok(aggregation::summarize(&events))
    }

    /// Create the Axum router with all routes and middleware
    pub fn create_router(self: Arc<Self>) -> Router {
        let protected = Router::new()
            .route("/data", post(Self::data_handler))
            .route("/clear", post(Self::clear_handler))
            .route_layer(middleware::from_fn_with_state(
                self.clone(),
                auth_middleware::require_api_key,
            ));

        Router::new()
            .route("/", get(Self::root_handler))
            .route("/health", get(Self::health_handler))
            .route("/seed", get(Self::seed_handler))
            .route("/dashboard", get(Self::dashboard_handler))
            .route("/summary", get(Self::summary_handler))
            .merge(protected)
            .layer(DefaultBodyLimit::disable())
            .layer(payload_limit_config())
            .layer(TraceLayer::new_for_http())
            .with_state(self)
    }

    /// Router wrapped so that trailing slashes are ignored
    pub fn into_app(self: Arc<Self>) -> NormalizePath<Router> {
        NormalizePathLayer::trim_trailing_slash().layer(self.create_router())
    }

    async fn root_handler() -> impl IntoResponse {
        Html(presentation::render_homepage())
    }

    async fn health_handler(State(state): State<Arc<Self>>) -> impl IntoResponse {
        // Read-only check; never heals or creates the store file
        let store_healthy = state
            .run_blocking(|store| Ok(store.is_readable()))
            .await
            .unwrap_or(false);

        Json(HealthResponse {
            healthy: store_healthy,
            service_name: "call-dashboard".to_string(),
            uptime_seconds: START_TIME.elapsed().as_secs(),
            status: (if store_healthy { "SERVING" } else { "DEGRADED" }).to_string(),
        })
    }

    /// POST /data - record one call outcome
    async fn data_handler(
        State(state): State<Arc<Self>>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<impl IntoResponse, StoreError> {
        let data = Value::Object(parse_event_body(&headers, &body));
        let stored = data.clone();
        let count = state.run_blocking(move |store| store.append(stored)).await?;

        tracing::info!("Stored call event, {} total", count);

        Ok((
            StatusCode::CREATED,
            Json(json!({
                "message": "POST Success",
                "count": count,
                "data": data,
            })),
        ))
    }

    /// POST /clear - drop every recorded call
    async fn clear_handler(State(state): State<Arc<Self>>) -> Result<impl IntoResponse, StoreError> {
        state.run_blocking(|store| store.clear()).await?;
        tracing::info!("Cleared all stored call events");

        Ok((
            StatusCode::OK,
            Json(json!({ "message": "Existing data cleared" })),
        ))
    }

    /// GET /seed - append the demo events
    async fn seed_handler(State(state): State<Arc<Self>>) -> Result<impl IntoResponse, StoreError> {
        let count = state
            .run_blocking(|store| store.extend(event::seed_samples()))
            .await?;
        tracing::info!("Seeded demo events, {} total", count);

        Ok((
            StatusCode::CREATED,
            Json(json!({ "message": "seeded", "count": count })),
        ))
    }

    async fn dashboard_handler(State(state): State<Arc<Self>>) -> Result<impl IntoResponse, StoreError> {
        let summary = state.summary().await?;
        Ok(Html(presentation::render_dashboard(&summary)))
    }

    async fn summary_handler(State(state): State<Arc<Self>>) -> Result<impl IntoResponse, StoreError> {
        Ok(Json(state.summary().await?))
    }
}
