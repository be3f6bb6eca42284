//! Authorized UID roster endpoints

use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, Sse},
    Json,
};
use serde::Deserialize;
use tokio_stream::Stream;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{Notice, RosterEntry, RosterQuery},
    services::roster::BulkDeleteResult,
    AppState,
};

use super::{sse_json, AuthenticatedUser};

#[derive(Deserialize, ToSchema)]
pub struct BulkDeleteRequest {
    pub uids: Vec<String>,
    /// Operator confirmed the deletion
    #[serde(default)]
    pub confirm: bool,
}

/// List authorized UIDs
#[utoipa::path(
    get,
    path = "/authorized-uids",
    tag = "roster",
    security(("bearer_auth" = [])),
    params(
        ("search" = Option<String>, Query, description = "Case-insensitive match on uid, name or plate"),
        ("sort" = Option<String>, Query, description = "name, uid, plate, newest or oldest")
    ),
    responses(
        (status = 200, description = "Roster", body = Vec<RosterEntry>),
        (status = 401, description = "Not authenticated"),
        (status = 502, description = "Failed to load authorized UIDs", body = crate::error::ErrorResponse)
    )
)]
pub async fn list(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<RosterQuery>,
) -> AppResult<Json<Vec<RosterEntry>>> {
    Ok(Json(state.services.roster.list(&query).await?))
}

/// Server-sent stream of the roster, re-sent on every change
#[utoipa::path(
    get,
    path = "/authorized-uids/stream",
    tag = "roster",
    security(("bearer_auth" = [])),
    params(
        ("search" = Option<String>, Query, description = "Case-insensitive match on uid, name or plate"),
        ("sort" = Option<String>, Query, description = "name, uid, plate, newest or oldest")
    ),
    responses(
        (status = 200, description = "Event stream of roster lists", body = String, content_type = "text/event-stream")
    )
)]
pub async fn stream(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<RosterQuery>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let roster = state.services.roster.watch(query).await?;
    Ok(sse_json(roster))
}

/// Remove one authorized UID
#[utoipa::path(
    delete,
    path = "/authorized-uids/{uid}",
    tag = "roster",
    security(("bearer_auth" = [])),
    params(
        ("uid" = String, Path, description = "Tag UID")
    ),
    responses(
        (status = 200, description = "UID removed", body = Notice),
        (status = 400, description = "Invalid UID", body = crate::error::ErrorResponse),
        (status = 502, description = "Failed to remove UID", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(uid): Path<String>,
) -> AppResult<Json<Notice>> {
    tracing::debug!("Operator {} removes UID {}", claims.sub, uid);
    Ok(Json(state.services.roster.delete(&uid).await?))
}

/// Remove every selected UID
#[utoipa::path(
    post,
    path = "/authorized-uids/bulk-delete",
    tag = "roster",
    security(("bearer_auth" = [])),
    request_body = BulkDeleteRequest,
    responses(
        (status = 200, description = "UIDs removed", body = BulkDeleteResult),
        (status = 400, description = "Not confirmed or invalid UID", body = crate::error::ErrorResponse),
        (status = 502, description = "Bulk delete failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn bulk_delete(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BulkDeleteRequest>,
) -> AppResult<Json<BulkDeleteResult>> {
    tracing::debug!("Operator {} removes {} UID(s)", claims.sub, request.uids.len());
    let result = state
        .services
        .roster
        .bulk_delete(&request.uids, request.confirm)
        .await?;
    Ok(Json(result))
}
