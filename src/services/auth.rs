//! Operator sign-in, sign-out and page gating

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    config::{AuthConfig, GateConfig},
    error::{AppError, AppResult},
    models::{
        session::redirect_for,
        PageKind, SessionClaims,
    },
    services::{identity::IdentityProvider, redis::RevocationList},
};

pub const VERIFICATION_SENT: &str =
    "Verification email sent. Please check your inbox before logging in again.";

#[derive(Clone)]
pub struct AuthService {
    identity: Arc<dyn IdentityProvider>,
    revocations: Arc<dyn RevocationList>,
    config: AuthConfig,
    gate: GateConfig,
}

impl AuthService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        revocations: Arc<dyn RevocationList>,
        config: AuthConfig,
        gate: GateConfig,
    ) -> Self {
        Self {
            identity,
            revocations,
            config,
            gate,
        }
    }

    /// Sign in with email and password and open a session
    ///
    /// Unverified accounts get a fresh verification email and no session.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(String, SessionClaims)> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AppError::Validation("Please fill all fields.".to_string()));
        }

        let user = self.identity.sign_in(email, password).await?;

        if !user.email_verified {
            tracing::info!("Sign-in refused for unverified account {}", user.email);
            self.identity.send_email_verification(&user.id_token).await?;
            return Err(AppError::EmailNotVerified(VERIFICATION_SENT.to_string()));
        }

        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user.email,
            user_id: user.user_id,
            jti: Uuid::new_v4().to_string(),
            exp: now + (self.config.jwt_expiration_hours as i64 * 3600),
            iat: now,
        };

        let token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        tracing::info!("Operator {} signed in", claims.sub);
        Ok((token, claims))
    }

    /// Validate a bearer token and make sure it was not signed out
    pub async fn verify(&self, token: &str) -> AppResult<SessionClaims> {
        let claims = SessionClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        if self.revocations.is_revoked(&claims.jti).await? {
            return Err(AppError::Authentication("Session has been signed out".to_string()));
        }
        Ok(claims)
    }

    /// Sign out: the token stays revoked until it would have expired anyway
    pub async fn logout(&self, claims: &SessionClaims) -> AppResult<()> {
        let remaining = (claims.exp - Utc::now().timestamp()).max(1) as u64;
        self.revocations.revoke(&claims.jti, remaining).await?;
        tracing::info!("Operator {} signed out", claims.sub);
        Ok(())
    }

    /// Current session (if any) and where the visitor of `page` should go
    pub async fn gate(
        &self,
        token: Option<&str>,
        page: PageKind,
    ) -> AppResult<(Option<SessionClaims>, Option<String>)> {
        let session = match token {
            Some(token) => match self.verify(token).await {
                Ok(claims) => Some(claims),
                Err(AppError::Authentication(reason)) => {
                    tracing::debug!("Treating visitor as anonymous: {}", reason);
                    None
                }
                Err(e) => return Err(e),
            },
            None => None,
        };
        let redirect = redirect_for(page, session.as_ref(), &self.gate);
        Ok((session, redirect))
    }
}
