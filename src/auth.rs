//! Resolving "who is making this request". The transport is either our
//! signed `session` cookie (browsers) or an `Authorization: Bearer` header
//! carrying a provider access token (everything else); either way the
//! identity provider gets the final word on whether the token is still good.

use super::{
    config::{SessionConfig, PKCE_COOKIE, PKCE_MAX_AGE_SECS, SESSION_COOKIE},
    errors::{Error, Result},
    identity::AuthSession,
    models::{AppState, AuthUser},
    session,
};
use axum::http::{header, HeaderMap, HeaderValue};
use regex::Regex;
use std::sync::OnceLock;

fn cookie_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|;\s*)([^=;\s]+)=([^;]+)")
            .expect("cookie regex is valid")
    })
}

/// Value of the cookie called `name`, if the request carries one.
pub fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| cookie_re().captures_iter(v))
        .find(|c| &c[1] == name)
        .map(|c| c[2].to_string())
}

/// Pull the provider access token out of the request, if there is one.
pub fn access_token(headers: &HeaderMap, secret: &[u8]) -> Option<String> {
    if let Some(bearer) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Some(bearer.trim().to_string());
    }

    cookie(headers, SESSION_COOKIE)
        .and_then(|token| session::deserialize_session(secret, &token).ok())
        .map(|s| s.access_token)
}

/// The one way to find out who is calling. Returns the user or
/// `Error::Unauthenticated`, never anything in between.
pub async fn resolve_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<AuthUser> {
    let token = access_token(headers, &state.session.secret)
        .ok_or(Error::Unauthenticated)?;
    state
        .identity
        .get_user(&token)
        .await?
        .ok_or(Error::Unauthenticated)
}

fn secure_attr(site_url: &str) -> &'static str {
    if site_url.starts_with("https://") {
        "; Secure"
    } else {
        ""
    }
}

/// `Set-Cookie` value establishing a browser session. The cookie never
/// outlives the access token inside it.
pub fn session_cookie(
    config: &SessionConfig,
    site_url: &str,
    auth: &AuthSession,
) -> Result<HeaderValue> {
    let value = session::serialize_session(
        &config.secret,
        &session::Session {
            access_token: auth.access_token.clone(),
            user: auth.user.clone(),
        },
    );
    let max_age = auth.expires_in.min(config.max_age_secs);
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={value}; Path=/; Max-Age={max_age}; HttpOnly; SameSite=Lax{}",
        secure_attr(site_url)
    ))
    .map_err(|_| Error::Upstream("Access token is not cookie-safe".into()))
}

pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static(
        "session=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax",
    )
}

/// `Set-Cookie` value keeping the PKCE verifier until the confirmation link
/// comes back to `/auth/callback`.
pub fn pkce_cookie(verifier: &str, site_url: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{PKCE_COOKIE}={verifier}; Path=/auth/callback; Max-Age={PKCE_MAX_AGE_SECS}; HttpOnly; SameSite=Lax{}",
        secure_attr(site_url)
    ))
    .map_err(|_| Error::Upstream("Code verifier is not cookie-safe".into()))
}

pub fn clear_pkce_cookie() -> HeaderValue {
    HeaderValue::from_static(
        "pkce_verifier=; Path=/auth/callback; Max-Age=0; HttpOnly; SameSite=Lax",
    )
}
