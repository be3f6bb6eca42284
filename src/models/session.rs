//! Operator session and page gating

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::GateConfig;

/// JWT Claims for authenticated operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Operator email
    pub sub: String,
    /// Identity provider account id
    pub user_id: String,
    /// Session id, used for sign-out
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

impl SessionClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}

/// Kind of page a visitor asks for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Login,
    #[default]
    Protected,
}

/// Where a visitor should be sent instead of `page`, if anywhere
///
/// Signed-in operators skip the login page; anonymous visitors of a
/// protected page go to the login page.
pub fn redirect_for(page: PageKind, session: Option<&SessionClaims>, gate: &GateConfig) -> Option<String> {
    match (page, session) {
        (PageKind::Login, Some(_)) => Some(gate.home_page.clone()),
        (PageKind::Protected, None) => Some(gate.login_page.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn claims() -> SessionClaims {
        let now = Utc::now().timestamp();
        SessionClaims {
            sub: "operator@example.com".into(),
            user_id: "abc".into(),
            jti: "session-1".into(),
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn test_token_roundtrip_and_wrong_secret() {
        let token = claims().create_token("secret").unwrap();
        assert_eq!(SessionClaims::from_token(&token, "secret").unwrap().jti, "session-1");
        assert!(SessionClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let mut expired = claims();
        expired.exp = Utc::now().timestamp() - 3600;
        let token = expired.create_token("secret").unwrap();
        assert!(SessionClaims::from_token(&token, "secret").is_err());
    }

    #[test]
    fn test_redirects() {
        let gate = GateConfig::default();
        let session = claims();
        assert_eq!(redirect_for(PageKind::Login, Some(&session), &gate), Some("index.html".into()));
        assert_eq!(redirect_for(PageKind::Login, None, &gate), None);
        assert_eq!(redirect_for(PageKind::Protected, None, &gate), Some("login.html".into()));
        assert_eq!(redirect_for(PageKind::Protected, Some(&session), &gate), None);
    }
}
