use super::{
    auth,
    errors::Error,
    models::{AppState, AuthUser},
};
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// The caller, for JSON endpoints and htmx fragments. Rejects with a 401
/// `{ "error": ... }` body.
pub struct AuthenticatedUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        auth::resolve_user(state, &parts.headers)
            .await
            .map(AuthenticatedUser)
    }
}

fn redirect_to_login() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::LOCATION, HeaderValue::from_static("/login"));

    (StatusCode::FOUND, headers).into_response()
}

/// The caller, for full pages. Anonymous visitors get bounced to the login
/// page instead of an error.
pub struct PageUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for PageUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match auth::resolve_user(state, &parts.headers).await {
            Ok(user) => Ok(PageUser(user)),
            Err(Error::Unauthenticated) => Err(redirect_to_login()),
            Err(e) => Err(e.into_response()),
        }
    }
}
