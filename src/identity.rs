//! Client for the hosted identity provider. We speak the GoTrue REST
//! dialect (what Supabase Auth runs), which issues JWT access tokens that we
//! hand back to it whenever we need to know who someone is.

use super::{
    config::IdentityConfig,
    errors::{Error, Result},
    models::AuthUser,
};
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// What a successful sign-in hands us.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    /// Seconds until `access_token` expires
    pub expires_in: u64,
    pub user: AuthUser,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SignUpOutcome {
    /// The provider auto-confirmed the account and signed the user in.
    SignedIn(AuthSession),
    /// A confirmation email is on its way.
    ConfirmationRequired,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `redirect_to` is where the confirmation email sends people, with a
    /// `?code=` that `exchange_code` later trades in. `code_challenge` is the
    /// S256 challenge for the verifier we keep until then.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<SignUpOutcome>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession>;
    /// Trade the code from a confirmation link for a session.
    async fn exchange_code(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession>;
    /// `None` if the provider doesn't accept the token (expired, revoked,
    /// garbage).
    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>>;
    async fn sign_out(&self, access_token: &str) -> Result<()>;
}

pub struct GoTrueClient {
    http: Client,
    url: String,
    anon_key: String,
}

impl GoTrueClient {
    pub fn new(config: &IdentityConfig) -> Result<Self> {
        Ok(Self {
            http: Client::builder().build()?,
            url: format!("{}/auth/v1", config.url),
            anon_key: config.anon_key.clone(),
        })
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http
            .post(format!("{}{}", self.url, path))
            .header("apikey", &self.anon_key)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http
            .get(format!("{}{}", self.url, path))
            .header("apikey", &self.anon_key)
    }
}

#[derive(Deserialize)]
struct GoTrueUser {
    id: Uuid,
    email: Option<String>,
}

impl From<GoTrueUser> for AuthUser {
    fn from(u: GoTrueUser) -> Self {
        AuthUser {
            id: u.id,
            email: u.email,
        }
    }
}

#[derive(Deserialize)]
struct GoTrueSession {
    access_token: String,
    expires_in: u64,
    user: GoTrueUser,
}

impl From<GoTrueSession> for AuthSession {
    fn from(s: GoTrueSession) -> Self {
        AuthSession {
            access_token: s.access_token,
            expires_in: s.expires_in,
            user: s.user.into(),
        }
    }
}

/// GoTrue has changed its error body a few times; take whichever message
/// field is present.
fn error_message(body: &Value) -> Option<String> {
    ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|k| body.get(*k).and_then(|v| v.as_str()))
        .map(|s| s.to_string())
}

/// Client errors (bad password, email taken, weak password) are the user's
/// to fix, so they surface as validation errors with the provider's message.
async fn check(res: Response) -> Result<Value> {
    let status = res.status();
    let body: Value = res.json().await.unwrap_or(Value::Null);
    if status.is_success() {
        return Ok(body);
    }
    let msg = error_message(&body)
        .unwrap_or_else(|| format!("Identity service returned {status}"));
    if status.is_client_error() {
        Err(Error::validation(msg))
    } else {
        Err(Error::Upstream(format!("Identity service error: {msg}")))
    }
}

fn parse<T: serde::de::DeserializeOwned>(body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| {
        Error::Upstream(format!("Unexpected identity service response: {e}"))
    })
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<SignUpOutcome> {
        let res = self
            .post("/signup")
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({
                "email": email,
                "password": password,
                "code_challenge": code_challenge,
                "code_challenge_method": "s256",
            }))
            .send()
            .await?;
        let body = check(res).await?;

        // Without auto-confirm, the provider answers with a bare user.
        if body.get("access_token").is_some() {
            Ok(SignUpOutcome::SignedIn(parse::<GoTrueSession>(body)?.into()))
        } else {
            Ok(SignUpOutcome::ConfirmationRequired)
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let res = self
            .post("/token")
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let body = check(res).await?;

        Ok(parse::<GoTrueSession>(body)?.into())
    }

    async fn exchange_code(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession> {
        let res = self
            .post("/token")
            .query(&[("grant_type", "pkce")])
            .json(&json!({
                "auth_code": auth_code,
                "code_verifier": code_verifier,
            }))
            .send()
            .await?;
        let body = check(res).await?;

        Ok(parse::<GoTrueSession>(body)?.into())
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>> {
        let res = self
            .get("/user")
            .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await?;
        if matches!(
            res.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Ok(None);
        }
        let body = check(res).await?;

        Ok(Some(parse::<GoTrueUser>(body)?.into()))
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let res = self
            .post("/logout")
            .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await?;
        // An already-dead token is as signed out as it gets.
        if res.status() == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        check(res).await?;

        Ok(())
    }
}
