//! Session gate endpoints

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{PageKind, SessionClaims},
    AppState,
};

use super::{bearer_token, AuthenticatedUser};

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: OperatorInfo,
    /// Page to open after signing in
    pub redirect: String,
}

/// Signed-in operator
#[derive(Serialize, ToSchema)]
pub struct OperatorInfo {
    pub email: String,
    pub user_id: String,
}

impl From<&SessionClaims> for OperatorInfo {
    fn from(claims: &SessionClaims) -> Self {
        Self {
            email: claims.sub.clone(),
            user_id: claims.user_id.clone(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct LogoutResponse {
    pub redirect: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SessionQuery {
    #[serde(default)]
    pub page: PageKind,
}

#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<OperatorInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 400, description = "Malformed email", body = crate::error::ErrorResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse),
        (status = 403, description = "Email not verified, verification email sent", body = crate::error::ErrorResponse),
        (status = 429, description = "Too many attempts", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (token, claims) = state
        .services
        .auth
        .login(&request.email, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_at: Utc.timestamp_opt(claims.exp, 0).single().unwrap_or_else(Utc::now),
        user: OperatorInfo::from(&claims),
        redirect: state.config.gate.home_page.clone(),
    }))
}

/// Sign out the current session
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Signed out", body = LogoutResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<LogoutResponse>> {
    state.services.auth.logout(&claims).await?;
    Ok(Json(LogoutResponse {
        redirect: state.config.gate.login_page.clone(),
    }))
}

/// Get the signed-in operator
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current operator", body = OperatorInfo),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(AuthenticatedUser(claims): AuthenticatedUser) -> AppResult<Json<OperatorInfo>> {
    Ok(Json(OperatorInfo::from(&claims)))
}

/// Session state for a page, with the redirect the page should follow
#[utoipa::path(
    get,
    path = "/auth/session",
    tag = "auth",
    params(
        ("page" = Option<PageKind>, Query, description = "Page being opened: login or protected")
    ),
    responses(
        (status = 200, description = "Session state", body = SessionResponse)
    )
)]
pub async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> AppResult<Json<SessionResponse>> {
    let (claims, redirect) = state
        .services
        .auth
        .gate(bearer_token(&headers), query.page)
        .await?;

    Ok(Json(SessionResponse {
        authenticated: claims.is_some(),
        user: claims.as_ref().map(OperatorInfo::from),
        redirect,
    }))
}
