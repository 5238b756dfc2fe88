use super::{
    auth,
    components::{self, AuthKind, Component},
    config::PKCE_COOKIE,
    crypto,
    errors::{Error, Result},
    extractors::{AuthenticatedUser, PageUser},
    htmx,
    identity::{AuthSession, SignUpOutcome},
    models::{AppState, AuthUser, SummaryResponse},
    notes, summaries, summarize,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Form, Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

fn page(title: &str, children: Box<dyn Component + '_>) -> String {
    components::Page {
        title,
        children: Box::new(components::Container { children }),
    }
    .render()
}

pub async fn root() -> impl IntoResponse {
    components::Page {
        title: "Notes",
        children: Box::new(components::Landing),
    }
    .render()
}

pub async fn pong() -> impl IntoResponse {
    "pong"
}

#[derive(Deserialize)]
pub struct AuthPageQuery {
    error: Option<String>,
}

pub async fn login_page(
    Query(AuthPageQuery { error }): Query<AuthPageQuery>,
) -> impl IntoResponse {
    page(
        "Sign In",
        Box::new(components::AuthForm {
            kind: AuthKind::Login,
            email: "",
            error: error.as_deref(),
            notice: None,
        }),
    )
}

pub async fn signup_page() -> impl IntoResponse {
    page(
        "Sign Up",
        Box::new(components::AuthForm {
            kind: AuthKind::Signup,
            email: "",
            error: None,
            notice: None,
        }),
    )
}

#[derive(Deserialize)]
pub struct Credentials {
    email: String,
    password: String,
}

fn auth_form_error(kind: AuthKind, email: &str, err: &Error) -> Response {
    components::AuthForm {
        kind,
        email,
        error: Some(&err.to_string()),
        notice: None,
    }
    .render()
    .into_response()
}

/// Hand the browser its session cookie and send it to the dashboard.
fn signed_in(
    state: &AppState,
    session: &AuthSession,
) -> Result<Response> {
    let cookie =
        auth::session_cookie(&state.session, &state.site_url, session)?;
    let mut headers = htmx::redirect("/dashboard");
    headers.insert(header::SET_COOKIE, cookie);

    Ok(headers.into_response())
}

pub async fn login(
    State(state): State<AppState>,
    Form(Credentials { email, password }): Form<Credentials>,
) -> Result<Response> {
    let email = email.trim();
    match state.identity.sign_in(email, &password).await {
        Ok(session) => {
            tracing::info!(user_id = %session.user.id, "signed in");
            signed_in(&state, &session)
        }
        Err(e) => Ok(auth_form_error(AuthKind::Login, email, &e)),
    }
}

pub async fn signup(
    State(state): State<AppState>,
    Form(Credentials { email, password }): Form<Credentials>,
) -> Result<Response> {
    let email = email.trim();
    let redirect_to = format!("{}/auth/callback", state.site_url);
    let verifier = crypto::code_verifier();
    let outcome = state
        .identity
        .sign_up(
            email,
            &password,
            &redirect_to,
            &crypto::code_challenge(&verifier),
        )
        .await;
    match outcome {
        Ok(SignUpOutcome::SignedIn(session)) => {
            tracing::info!(user_id = %session.user.id, "signed up");
            signed_in(&state, &session)
        }
        Ok(SignUpOutcome::ConfirmationRequired) => {
            let cookie = auth::pkce_cookie(&verifier, &state.site_url)?;
            let form = components::AuthForm {
                kind: AuthKind::Login,
                email,
                error: None,
                notice: Some(
                    "Check your email to confirm your account, then sign in.",
                ),
            }
            .render();

            Ok(([(header::SET_COOKIE, cookie)], form).into_response())
        }
        Err(e) => Ok(auth_form_error(AuthKind::Signup, email, &e)),
    }
}

fn login_with_error(msg: &str) -> String {
    reqwest::Url::parse_with_params("http://localhost/login", &[("error", msg)])
        .ok()
        .and_then(|url| url.query().map(|q| format!("/login?{q}")))
        .unwrap_or_else(|| "/login".to_string())
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    error_description: Option<String>,
}

/// Where confirmation emails land. The link carries a one-time code which,
/// together with the verifier cookie set at sign-up, buys a session.
pub async fn auth_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(CallbackQuery {
        code,
        error_description,
    }): Query<CallbackQuery>,
) -> Response {
    if let Some(msg) = error_description {
        return Redirect::to(&login_with_error(&msg)).into_response();
    }
    let Some(code) = code else {
        return Redirect::to("/login?error=no_code").into_response();
    };
    let Some(verifier) = auth::cookie(&headers, PKCE_COOKIE) else {
        return Redirect::to(&login_with_error(
            "Open the confirmation link in the browser you signed up with",
        ))
        .into_response();
    };

    let session = match state.identity.exchange_code(&code, &verifier).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "confirmation code exchange failed");
            return Redirect::to(&login_with_error(&e.to_string()))
                .into_response();
        }
    };
    let cookie =
        match auth::session_cookie(&state.session, &state.site_url, &session) {
            Ok(cookie) => cookie,
            Err(e) => return e.into_response(),
        };
    tracing::info!(user_id = %session.user.id, "confirmed sign-up");

    (
        AppendHeaders([
            (header::SET_COOKIE, cookie),
            (header::SET_COOKIE, auth::clear_pkce_cookie()),
        ]),
        Redirect::to("/dashboard"),
    )
        .into_response()
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(token) = auth::access_token(&headers, &state.session.secret) {
        if let Err(e) = state.identity.sign_out(&token).await {
            tracing::warn!(error = %e, "upstream sign-out failed");
        }
    }
    let mut headers = htmx::redirect("/login");
    headers.insert(header::SET_COOKIE, auth::clear_session_cookie());

    headers
}

pub async fn dashboard(
    PageUser(user): PageUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    let notes = notes::list(state.store.as_ref(), &user).await?;
    let html = components::Page {
        title: "Dashboard",
        children: Box::new(components::Dashboard {
            user: &user,
            notes: &notes,
        }),
    }
    .render();

    Ok(html)
}

async fn notes_grid(state: &AppState, user: &AuthUser) -> Result<String> {
    let notes = notes::list(state.store.as_ref(), user).await?;

    Ok(components::NotesGrid { notes: &notes }.render())
}

const SOMETHING_WENT_WRONG: &str = "Something went wrong. Please try again.";

/// The message to show next to the control that caused `err`, if it's the
/// kind worth showing there. Auth and ownership failures are not; those go
/// back as plain error responses. Upstream failure details stay in the logs.
fn inline_message(err: &Error) -> Option<String> {
    match err {
        Error::Validation(..) => Some(err.to_string()),
        Error::Upstream(detail) => {
            tracing::error!(error = %detail, "upstream failure");
            Some(SOMETHING_WENT_WRONG.to_string())
        }
        _ => None,
    }
}

#[derive(Deserialize)]
pub struct NoteForm {
    title: String,
    content: String,
}

pub async fn create_note(
    AuthenticatedUser(user): AuthenticatedUser,
    State(state): State<AppState>,
    Form(form): Form<NoteForm>,
) -> Result<Response> {
    let err = match notes::create(
        state.store.as_ref(),
        &user,
        &form.title,
        &form.content,
    )
    .await
    {
        Ok(_) => return Ok(notes_grid(&state, &user).await?.into_response()),
        Err(e) => e,
    };
    let Some(msg) = inline_message(&err) else {
        return Err(err);
    };
    let form_html = components::CreateNoteForm {
        title: &form.title,
        content: &form.content,
        error: Some(&msg),
    }
    .render();

    Ok((htmx::retarget("#create-note-form"), form_html).into_response())
}

pub async fn delete_note(
    AuthenticatedUser(user): AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    notes::delete(state.store.as_ref(), &user, id).await?;
    let grid = notes_grid(&state, &user).await?;

    // The deleted note may be open in the viewer.
    Ok(format!(r#"{grid}<div id="viewer" hx-swap-oob="true"></div>"#))
}

pub async fn pin_note(
    AuthenticatedUser(user): AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    notes::pin(state.store.as_ref(), &user, id).await?;

    notes_grid(&state, &user).await
}

pub async fn unpin_note(
    AuthenticatedUser(user): AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    notes::unpin(state.store.as_ref(), &user, id).await?;

    notes_grid(&state, &user).await
}

pub async fn view_note(
    AuthenticatedUser(user): AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let note = notes::get(state.store.as_ref(), &user, id).await?;
    let summary =
        summaries::get_by_note_id(state.store.as_ref(), &user, id).await?;

    Ok(components::NoteViewer {
        note: &note,
        summary: summary.as_ref(),
        now: Utc::now(),
    }
    .render())
}

pub async fn summarize_note(
    AuthenticatedUser(user): AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let store = state.store.as_ref();
    let note = notes::get(store, &user, id).await?;
    let result = summarize::summarize(
        store,
        state.completion.as_ref(),
        &user,
        id,
        &note.content,
    )
    .await;

    let (summary, error) = match result {
        Ok(summary) => (Some(summary), None),
        Err(e) => match inline_message(&e) {
            // Keep showing the old summary alongside the error.
            Some(msg) => {
                (summaries::get_by_note_id(store, &user, id).await?, Some(msg))
            }
            None => return Err(e),
        },
    };

    Ok(components::SummaryPanel {
        note_id: id,
        summary: summary.as_ref(),
        error: error.as_deref(),
        now: Utc::now(),
    }
    .render())
}

fn parse_note_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| Error::validation("Invalid or missing noteId"))
}

pub async fn get_summary(
    AuthenticatedUser(user): AuthenticatedUser,
    State(state): State<AppState>,
    Path(note_id): Path<String>,
) -> Result<Json<Option<SummaryResponse>>> {
    let note_id = parse_note_id(&note_id)?;
    let summary =
        summaries::get_by_note_id(state.store.as_ref(), &user, note_id).await?;

    Ok(Json(summary.map(SummaryResponse::from)))
}

#[derive(Deserialize)]
pub struct SummarizeRequest {
    #[serde(rename = "noteId")]
    note_id: Option<String>,
    content: Option<String>,
}

pub async fn summarize_api(
    AuthenticatedUser(user): AuthenticatedUser,
    State(state): State<AppState>,
    body: std::result::Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<SummaryResponse>> {
    let Json(req) =
        body.map_err(|_| Error::validation("Invalid request body"))?;
    let note_id = parse_note_id(req.note_id.as_deref().unwrap_or_default())?;
    let content = req
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| Error::validation("Invalid or missing content"))?;

    let summary = summarize::summarize(
        state.store.as_ref(),
        state.completion.as_ref(),
        &user,
        note_id,
        &content,
    )
    .await?;

    Ok(Json(summary.into()))
}
