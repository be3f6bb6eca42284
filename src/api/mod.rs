//! API handlers for Autostelle REST endpoints

pub mod auth;
pub mod health;
pub mod occupancy;
pub mod openapi;
pub mod roster;
pub mod scan;

use std::{convert::Infallible, time::Duration};

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    response::sse::{Event, KeepAlive, Sse},
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;
use tokio_stream::{Stream, StreamExt};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{config::AuthConfig, error::AppError, models::SessionClaims, AppState};

/// Extractor for the signed-in operator
pub struct AuthenticatedUser(pub SessionClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = state.services.auth.verify(token).await?;
        Ok(AuthenticatedUser(claims))
    }
}

/// Bearer token of the request, if any
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Turn a stream of values into server-sent JSON events
pub(crate) fn sse_json<T, S>(stream: S) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    T: Serialize,
    S: Stream<Item = T> + Send + 'static,
{
    let events = stream.map(|item| {
        let event = Event::default().json_data(&item).unwrap_or_else(|e| {
            tracing::error!("Failed to encode event: {}", e);
            Event::default().event("error").data("encoding failure")
        });
        Ok(event)
    });
    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Session gate
        .merge(login_routes(&state.config.auth))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/session", get(auth::session))
        // Scan workflow
        .route("/scan", get(scan::status).post(scan::start).delete(scan::cancel))
        .route("/scan/form", post(scan::open_form).delete(scan::close_form))
        .route("/scan/events", get(scan::events))
        // Roster
        .route("/authorized-uids", get(roster::list))
        .route("/authorized-uids/stream", get(roster::stream))
        .route("/authorized-uids/bulk-delete", post(roster::bulk_delete))
        .route("/authorized-uids/:uid", delete(roster::delete))
        // Occupancy
        .route("/parking-slots", get(occupancy::list))
        .route("/parking-slots/stream", get(occupancy::stream))
        .with_state(state);

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Login route, rate limited per peer address when enabled
///
/// The limiter keys on the peer address, so the server must be run with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
fn login_routes(config: &AuthConfig) -> Router<AppState> {
    let routes = Router::new().route("/auth/login", post(auth::login));
    if config.login_per_second == 0 {
        return routes;
    }

    let governor = GovernorConfigBuilder::default()
        .per_second(config.login_per_second)
        .burst_size(config.login_burst.max(1))
        .finish();

    match governor {
        Some(governor) => routes.layer(GovernorLayer {
            config: Box::leak(Box::new(governor)),
        }),
        None => {
            tracing::warn!("Invalid login rate limit settings, limiter disabled");
            routes
        }
    }
}
