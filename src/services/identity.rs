//! Identity provider client (email/password accounts)
//!
//! Speaks the Identity Toolkit REST API used by the hosted auth service:
//! `accounts:signInWithPassword`, `accounts:lookup` and
//! `accounts:sendOobCode`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::IdentityConfig;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("invalid credential")]
    InvalidCredential,

    #[error("invalid email address")]
    InvalidEmail,

    #[error("too many attempts")]
    TooManyRequests,

    #[error("network failure: {0}")]
    Network(String),

    #[error("provider error: {0}")]
    Provider(String),
}

/// Account returned by a successful sign-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInUser {
    pub user_id: String,
    pub email: String,
    pub id_token: String,
    pub email_verified: bool,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Check email and password; the account may still be unverified.
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedInUser, IdentityError>;

    /// Mail a verification link to the account behind `id_token`
    async fn send_email_verification(&self, id_token: &str) -> Result<(), IdentityError>;
}

#[derive(Clone)]
pub struct FirebaseIdentity {
    client: Client,
    config: IdentityConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInBody<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInReply {
    local_id: String,
    #[serde(default)]
    email: String,
    id_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupBody<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
struct LookupReply {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    #[serde(default)]
    email_verified: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OobBody<'a> {
    request_type: &'static str,
    id_token: &'a str,
}

#[derive(Deserialize)]
struct ErrorReply {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl FirebaseIdentity {
    pub fn new(config: IdentityConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn call<B: Serialize + Sync, R: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<R, IdentityError> {
        let url = format!("{}/accounts:{}", self.config.endpoint.trim_end_matches('/'), method);
        let response = self
            .client
            .post(url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        if response.status().is_success() {
            return response
                .json::<R>()
                .await
                .map_err(|e| IdentityError::Provider(format!("Unexpected {} reply: {}", method, e)));
        }

        let status = response.status();
        let message = match response.json::<ErrorReply>().await {
            Ok(reply) => reply.error.message,
            Err(_) => format!("HTTP {}", status),
        };
        Err(classify(&message))
    }
}

/// Map a provider error message such as `TOO_MANY_ATTEMPTS_TRY_LATER : ...`
fn classify(message: &str) -> IdentityError {
    let code = message.split(" : ").next().unwrap_or(message).trim();
    match code {
        "INVALID_LOGIN_CREDENTIALS" | "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "USER_DISABLED" => {
            IdentityError::InvalidCredential
        }
        "INVALID_EMAIL" | "MISSING_EMAIL" => IdentityError::InvalidEmail,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => IdentityError::TooManyRequests,
        _ => IdentityError::Provider(message.to_string()),
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedInUser, IdentityError> {
        let reply: SignInReply = self
            .call(
                "signInWithPassword",
                &SignInBody {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;

        let lookup: LookupReply = self
            .call("lookup", &LookupBody { id_token: &reply.id_token })
            .await?;
        let email_verified = lookup.users.first().is_some_and(|u| u.email_verified);

        Ok(SignedInUser {
            user_id: reply.local_id,
            email: if reply.email.is_empty() { email.to_string() } else { reply.email },
            id_token: reply.id_token,
            email_verified,
        })
    }

    async fn send_email_verification(&self, id_token: &str) -> Result<(), IdentityError> {
        let _: serde_json::Value = self
            .call(
                "sendOobCode",
                &OobBody {
                    request_type: "VERIFY_EMAIL",
                    id_token,
                },
            )
            .await?;
        Ok(())
    }
}
