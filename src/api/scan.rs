//! Scan-authorization endpoints

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, Sse},
    Json,
};
use tokio_stream::{wrappers::WatchStream, Stream};

use crate::{
    error::AppResult,
    models::{ReservationRequest, ScanStatus},
    AppState,
};

use super::{sse_json, AuthenticatedUser};

/// Current scan session
#[utoipa::path(
    get,
    path = "/scan",
    tag = "scan",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Scan session state", body = ScanStatus),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn status(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<ScanStatus>> {
    Ok(Json(state.services.scan.status()))
}

/// Open the reservation form
#[utoipa::path(
    post,
    path = "/scan/form",
    tag = "scan",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Form opened", body = ScanStatus),
        (status = 409, description = "A scan is already in progress", body = crate::error::ErrorResponse)
    )
)]
pub async fn open_form(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<ScanStatus>> {
    Ok(Json(state.services.scan.open_form().await?))
}

/// Dismiss the reservation form
#[utoipa::path(
    delete,
    path = "/scan/form",
    tag = "scan",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Form closed", body = ScanStatus),
        (status = 409, description = "A scan is in progress", body = crate::error::ErrorResponse)
    )
)]
pub async fn close_form(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<ScanStatus>> {
    Ok(Json(state.services.scan.close_form().await?))
}

/// Confirm the form and start waiting for a tag
#[utoipa::path(
    post,
    path = "/scan",
    tag = "scan",
    security(("bearer_auth" = [])),
    request_body = ReservationRequest,
    responses(
        (status = 200, description = "Waiting for a scan", body = ScanStatus),
        (status = 400, description = "Missing name or plate", body = crate::error::ErrorResponse),
        (status = 409, description = "Name or plate taken, or a scan is already running", body = crate::error::ErrorResponse),
        (status = 502, description = "Failed to start scan mode", body = crate::error::ErrorResponse)
    )
)]
pub async fn start(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<ReservationRequest>,
) -> AppResult<Json<ScanStatus>> {
    tracing::debug!("Operator {} starts a scan", claims.sub);
    Ok(Json(state.services.scan.start(request).await?))
}

/// Cancel the pending scan
#[utoipa::path(
    delete,
    path = "/scan",
    tag = "scan",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Scan cancelled", body = ScanStatus),
        (status = 404, description = "No scan in progress", body = crate::error::ErrorResponse),
        (status = 409, description = "Scan already being processed", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<ScanStatus>> {
    Ok(Json(state.services.scan.cancel().await?))
}

/// Server-sent stream of scan session changes
#[utoipa::path(
    get,
    path = "/scan/events",
    tag = "scan",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Event stream of ScanStatus values", body = String, content_type = "text/event-stream")
    )
)]
pub async fn events(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    sse_json(WatchStream::new(state.services.scan.watch()))
}
