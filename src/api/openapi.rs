//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, health, occupancy, roster, scan};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Autostelle API",
        version = "1.0.0",
        description = "Admin API for RFID parking access: reservations, authorized tags and slot occupancy",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::logout,
        auth::me,
        auth::session,
        // Scan
        scan::status,
        scan::open_form,
        scan::close_form,
        scan::start,
        scan::cancel,
        scan::events,
        // Roster
        roster::list,
        roster::stream,
        roster::delete,
        roster::bulk_delete,
        // Occupancy
        occupancy::list,
        occupancy::stream,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::LogoutResponse,
            auth::OperatorInfo,
            auth::SessionQuery,
            auth::SessionResponse,
            crate::models::PageKind,
            // Scan
            crate::models::ReservationRequest,
            crate::models::ScanPhase,
            crate::models::ScanStatus,
            crate::models::Notice,
            crate::models::NoticeLevel,
            // Roster
            crate::models::AuthorizedUid,
            crate::models::RosterEntry,
            crate::models::RosterQuery,
            crate::models::SortKey,
            roster::BulkDeleteRequest,
            crate::services::roster::BulkDeleteResult,
            // Occupancy
            crate::models::SlotState,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Session gate"),
        (name = "scan", description = "Reservation scan workflow"),
        (name = "roster", description = "Authorized UID management"),
        (name = "occupancy", description = "Parking slot occupancy")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
