//! Parking slot occupancy endpoints

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, Sse},
    Json,
};
use tokio_stream::Stream;

use crate::{error::AppResult, models::SlotState, AppState};

use super::{sse_json, AuthenticatedUser};

/// Occupancy of all six slots
#[utoipa::path(
    get,
    path = "/parking-slots",
    tag = "occupancy",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Slots in index order", body = Vec<SlotState>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<SlotState>>> {
    Ok(Json(state.services.occupancy.current().await?))
}

/// Server-sent stream of slot occupancy
#[utoipa::path(
    get,
    path = "/parking-slots/stream",
    tag = "occupancy",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Event stream of slot lists", body = String, content_type = "text/event-stream")
    )
)]
pub async fn stream(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let slots = state.services.occupancy.watch().await?;
    Ok(sse_json(slots))
}
