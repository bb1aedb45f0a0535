//! HTTP ingress - accepts domain events and workflow callbacks as JSON.
//!
//! Requires the `http` feature. Uses axum for routing.
//!
//! ## Routes
//!
//! - `POST /events` - body is the saga's domain event, e.g.
//!   `{"type": "PaymentCreated", "accountId": "kermit", ...}`.
//! - `POST /callbacks` - body is a [`Callback`], e.g.
//!   `{"kind": "CommandIssued", "workflowInstanceId": ..., ...}`.
//! - `GET /health` - returns `{ "ok": true, "saga": ..., "instances": n }`.
//!
//! Both POST routes answer `202 Accepted` with `{"saga_id": ...}` once the
//! message is queued for its saga (`null` for a callback parked until its
//! workflow instance is attached). With `?wait=true` they answer `200 OK`
//! after the saga has processed it, or the error status of
//! [`SagaError::status_code`].
//!
//! ## Example
//!
//! ```ignore
//! let manager = Arc::new(PaymentSagaManager::new(settings, channels, engine, &config)?);
//!
//! let app = saga_bridge::http::router(manager.clone());
//! // or
//! saga_bridge::http::serve(manager, "0.0.0.0:3000").await?;
//! ```

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::error::SagaError;
use crate::manager::{Inbound, Receipt, SagaManager};
use crate::saga::{Callback, Saga};
use crate::workflow::WorkflowEngine;

#[derive(Debug, Default, Deserialize)]
struct DispatchParams {
    #[serde(default)]
    wait: bool,
}

/// Build an axum `Router` dispatching to `manager`.
pub fn router<S, E>(manager: Arc<SagaManager<S, E>>) -> Router
where
    S: Saga,
    S::Event: DeserializeOwned,
    E: WorkflowEngine + 'static,
{
    Router::new()
        .route("/health", get(health_handler::<S, E>))
        .route("/events", post(event_handler::<S, E>))
        .route("/callbacks", post(callback_handler::<S, E>))
        .with_state(manager)
}

/// Serve `manager` over HTTP at `addr` (e.g. `"0.0.0.0:3000"`).
pub async fn serve<S, E>(manager: Arc<SagaManager<S, E>>, addr: &str) -> Result<(), std::io::Error>
where
    S: Saga,
    S::Event: DeserializeOwned,
    E: WorkflowEngine + 'static,
{
    let app = router(manager);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn health_handler<S, E>(State(manager): State<Arc<SagaManager<S, E>>>) -> impl IntoResponse
where
    S: Saga,
    E: WorkflowEngine + 'static,
{
    Json(json!({
        "ok": true,
        "saga": manager.orchestrator().definition().name(),
        "instances": manager.saga_ids().len(),
    }))
}

async fn event_handler<S, E>(
    State(manager): State<Arc<SagaManager<S, E>>>,
    Query(params): Query<DispatchParams>,
    Json(event): Json<S::Event>,
) -> Response
where
    S: Saga,
    S::Event: DeserializeOwned,
    E: WorkflowEngine + 'static,
{
    respond(manager.dispatch(Inbound::Event(event)), params.wait).await
}

async fn callback_handler<S, E>(
    State(manager): State<Arc<SagaManager<S, E>>>,
    Query(params): Query<DispatchParams>,
    Json(callback): Json<Callback>,
) -> Response
where
    S: Saga,
    E: WorkflowEngine + 'static,
{
    respond(manager.dispatch(Inbound::Callback(callback)), params.wait).await
}

async fn respond(dispatched: Result<Receipt, SagaError>, wait: bool) -> Response {
    let receipt = match dispatched {
        Ok(receipt) => receipt,
        Err(e) => return error_response(e),
    };
    let routed_to = receipt.saga_id().map(str::to_string);
    if !wait {
        return (StatusCode::ACCEPTED, Json(json!({ "saga_id": routed_to }))).into_response();
    }

    // Processing may block on downstream commands and signal retries.
    match tokio::task::spawn_blocking(move || receipt.wait()).await {
        Ok(Ok(saga_id)) => (StatusCode::OK, Json(json!({ "saga_id": saga_id }))).into_response(),
        Ok(Err(e)) => error_response(e),
        Err(join) => {
            warn!(error = %join, "saga wait task failed");
            error_response(SagaError::InstanceStopped(routed_to.unwrap_or_default()))
        }
    }
}

fn error_response(e: SagaError) -> Response {
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}
