//! API server module
//!
//! HTTP server exposing `/logs`: `POST` stores an entry, `GET` returns the
//! entries of one service within an inclusive time range.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use super::{format_timestamp, LogRecord, LogsResponse, NewLogEntry, RangeParams, RangeQuery};
use crate::store::{LogStore, StoreError};

/// Errors returned to API clients
#[derive(Debug, Error)]
pub enum ApiError {
    /// Body is not a JSON object
    #[error("Invalid JSON body")]
    InvalidJson,

    /// Required body field absent
    #[error("Missing '{0}' in JSON body")]
    MissingField(&'static str),

    /// `service` or `message` is not a string
    #[error("Service and message must be strings")]
    NotStrings,

    /// Timestamp missing, not a string, or not ISO 8601
    #[error("Invalid timestamp format. Must be ISO 8601.")]
    InvalidTimestamp,

    /// Empty service name
    #[error("Service must not be empty")]
    EmptyService,

    /// Range lookup without all three parameters
    #[error("Missing 'service', 'start', or 'end' query parameter")]
    MissingQueryParams,

    /// `end` before `start`
    #[error("End date cannot be earlier than start date")]
    InvertedRange,

    /// Store failed while inserting
    #[error("Error storing log")]
    Store(#[source] StoreError),

    /// Store failed while querying
    #[error("Error retrieving logs")]
    Query(#[source] StoreError),

    /// HTTP method other than GET or POST
    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Store(_) | ApiError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Handle to control the running server
pub struct ServerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    addr: SocketAddr,
}

impl ServerHandle {
    /// Get the address the server is listening on
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shutdown the server gracefully
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            // Ignore error if receiver is already dropped
            let _ = tx.send(());
        }
    }
}

/// Build the API router over `store`
pub fn router(store: Arc<LogStore>) -> Router {
    Router::new()
        .route(
            "/logs",
            get(query_logs)
                .post(store_log)
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
        .with_state(store)
}

/// Start the API server
///
/// # Arguments
/// * `addr` - Address to listen on (port 0 picks a free port)
/// * `store` - Store that requests read from and write to
///
/// # Returns
/// A `ServerHandle` that can be used to shut down the server
pub async fn start(addr: SocketAddr, store: Arc<LogStore>) -> Result<ServerHandle> {
    let app = router(store);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("API server listening on {}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
                info!("API server shutting down");
            })
            .await
        {
            error!(error = %e, "API server stopped with error");
        }
    });

    Ok(ServerHandle {
        shutdown_tx: Some(shutdown_tx),
        addr: bound_addr,
    })
}

/// POST /logs handler
async fn store_log(
    State(store): State<Arc<LogStore>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let body: Value = serde_json::from_slice(&body).map_err(|_| ApiError::InvalidJson)?;
    let entry = NewLogEntry::try_from(body)?;

    store
        .insert(&entry.service, entry.timestamp, entry.message)
        .map_err(|e| {
            error!(service = %entry.service, error = %e, "Error storing log");
            ApiError::Store(e)
        })?;

    info!(
        "Stored log for service '{}' at {}",
        entry.service,
        format_timestamp(&entry.timestamp)
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "Log entry stored" })),
    ))
}

/// GET /logs handler
async fn query_logs(
    State(store): State<Arc<LogStore>>,
    pairs: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<LogsResponse>, ApiError> {
    let Query(pairs) = pairs.map_err(|e| {
        debug!(error = %e, "Rejected undecodable query string");
        ApiError::MissingQueryParams
    })?;
    let query = RangeQuery::try_from(pairs.into_iter().collect::<RangeParams>())?;

    let entries = store
        .range_query(&query.service, query.start, query.end)
        .map_err(|e| {
            error!(service = %query.service, error = %e, "Error retrieving logs");
            ApiError::Query(e)
        })?;

    info!(
        "Retrieved {} logs for service '{}' between {} and {}",
        entries.len(),
        query.service,
        format_timestamp(&query.start),
        format_timestamp(&query.end)
    );

    Ok(Json(LogsResponse {
        logs: entries.into_iter().map(LogRecord::from).collect(),
    }))
}

async fn method_not_allowed() -> ApiError {
    debug!("Rejected request with unsupported method");
    ApiError::MethodNotAllowed
}
