use super::{controllers, middleware, models::AppState};
use axum::{
    middleware::from_fn,
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

#[rustfmt::skip]
pub fn get_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(controllers::root))
        .route("/ping", get(controllers::pong))
        .route("/login", get(controllers::login_page))
        .route("/login", post(controllers::login))
        .route("/signup", get(controllers::signup_page))
        .route("/signup", post(controllers::signup))
        .route("/auth/callback", get(controllers::auth_callback))
        .route("/logout", post(controllers::logout))
        .route("/dashboard", get(controllers::dashboard))
        .route("/notes", post(controllers::create_note))
        .route("/notes/:id", get(controllers::view_note))
        .route("/notes/:id", delete(controllers::delete_note))
        .route("/notes/:id/pin", post(controllers::pin_note))
        .route("/notes/:id/unpin", post(controllers::unpin_note))
        .route("/notes/:id/summarize", post(controllers::summarize_note))
        .route("/summaries/:note_id", get(controllers::get_summary))
        .route("/summarize", post(controllers::summarize_api))
}

pub fn app(state: AppState) -> Router {
    get_routes()
        .layer(from_fn(middleware::html_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db_ops::Store,
        notes,
        testing::{self, alice, bob, ScriptedCompletion},
    };
    use axum::{
        body::Body,
        http::{header, Request, Response, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn bullets(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("point {i}")).collect()
    }

    fn completion(n: usize) -> Option<String> {
        Some(json!({ "summary": "The gist.", "bullets": bullets(n) }).to_string())
    }

    fn request(method: &str, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(uri);
        match token {
            Some(t) => builder.header(header::AUTHORIZATION, format!("Bearer {t}")),
            None => builder,
        }
    }

    fn summarize_req(token: Option<&str>, body: Value) -> Request<Body> {
        request("POST", "/summarize", token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(res: Response<axum::body::BoxBody>) -> Value {
        let bytes = hyper::body::to_bytes(res.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn text_body(res: Response<axum::body::BoxBody>) -> String {
        let bytes = hyper::body::to_bytes(res.into_body()).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_summarize_then_fetch() {
        let (state, store, _) =
            testing::state_with(ScriptedCompletion::new(vec![completion(4)]));
        let note = notes::create(&*store, &alice(), "t", "c").await.unwrap();

        let res = app(state.clone())
            .oneshot(summarize_req(
                Some("token-for-alice"),
                json!({ "noteId": note.id, "content": "c" }),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["summary"], "The gist.");
        assert_eq!(body["bullets"].as_array().unwrap().len(), 4);
        assert!(body["updated_at"].is_string());
        assert!(body["created_at"].is_string());

        let res = app(state)
            .oneshot(
                request("GET", &format!("/summaries/{}", note.id), Some("token-for-alice"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["summary"], "The gist.");
    }

    #[tokio::test]
    async fn test_missing_summary_is_null() {
        let (state, store, _) = testing::state_with(ScriptedCompletion::default());
        let note = notes::create(&*store, &alice(), "t", "c").await.unwrap();
        let get = |id: uuid::Uuid| {
            request("GET", &format!("/summaries/{id}"), Some("token-for-alice"))
                .body(Body::empty())
                .unwrap()
        };

        let res = app(state.clone()).oneshot(get(note.id)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await, Value::Null);

        notes::delete(&*store, &alice(), note.id).await.unwrap();
        let res = app(state).oneshot(get(note.id)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await, Value::Null);
    }

    #[tokio::test]
    async fn test_summary_endpoint_statuses() {
        let (state, store, _) = testing::state_with(ScriptedCompletion::default());
        let note = notes::create(&*store, &alice(), "t", "c").await.unwrap();
        let uri = format!("/summaries/{}", note.id);

        let cases = [
            (uri.as_str(), None, StatusCode::UNAUTHORIZED),
            (uri.as_str(), Some("token-for-bob"), StatusCode::FORBIDDEN),
            ("/summaries/not-a-uuid", Some("token-for-alice"), StatusCode::BAD_REQUEST),
        ];
        for (uri, token, status) in cases {
            let res = app(state.clone())
                .oneshot(request("GET", uri, token).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(res.status(), status, "{uri} as {token:?}");
            assert!(json_body(res).await["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_summarize_statuses() {
        let (state, store, _) = testing::state_with(ScriptedCompletion::new(vec![
            completion(2),
            None,
        ]));
        let note = notes::create(&*store, &alice(), "t", "c").await.unwrap();

        let cases = [
            (None, json!({ "noteId": note.id, "content": "c" }), StatusCode::UNAUTHORIZED),
            (Some("token-for-alice"), json!({ "content": "c" }), StatusCode::BAD_REQUEST),
            (Some("token-for-alice"), json!({ "noteId": note.id }), StatusCode::BAD_REQUEST),
            (Some("token-for-alice"), json!({ "noteId": 12, "content": "c" }), StatusCode::BAD_REQUEST),
            (Some("token-for-bob"), json!({ "noteId": note.id, "content": "c" }), StatusCode::FORBIDDEN),
            // two bullets
            (Some("token-for-alice"), json!({ "noteId": note.id, "content": "c" }), StatusCode::INTERNAL_SERVER_ERROR),
            // no content from the model
            (Some("token-for-alice"), json!({ "noteId": note.id, "content": "c" }), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (token, body, status) in cases {
            let res = app(state.clone())
                .oneshot(summarize_req(token, body.clone()))
                .await
                .unwrap();
            assert_eq!(res.status(), status, "{body} as {token:?}");
        }
        assert_eq!(store.summary_count(), 0);
    }

    #[tokio::test]
    async fn test_dashboard_requires_login() {
        let res = app(testing::state())
            .oneshot(request("GET", "/dashboard", None).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(res.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_login_sets_cookie_that_opens_dashboard() {
        let (state, store, _) = testing::state_with(ScriptedCompletion::default());
        notes::create(&*store, &alice(), "Alice's list", "eggs")
            .await
            .unwrap();
        notes::create(&*store, &bob(), "Bob's list", "ham")
            .await
            .unwrap();

        let res = app(state.clone())
            .oneshot(
                request("POST", "/login", None)
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("email=alice%40example.com&password=hunter22"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["Hx-Redirect"], "/dashboard");
        let set_cookie = res.headers()[header::SET_COOKIE].to_str().unwrap();
        let cookie = set_cookie.split(';').next().unwrap().to_string();

        let res = app(state)
            .oneshot(
                request("GET", "/dashboard", None)
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html"));
        let html = text_body(res).await;
        assert!(html.contains("Alice&apos;s&#32;list"));
        assert!(!html.contains("Bob&apos;s&#32;list"));
    }

    #[tokio::test]
    async fn test_bad_login_shows_error_inline() {
        let res = app(testing::state())
            .oneshot(
                request("POST", "/login", None)
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("email=alice%40example.com&password=nope"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().get(header::SET_COOKIE).is_none());
        assert!(text_body(res).await.contains("Invalid&#32;login&#32;credentials"));
    }

    #[tokio::test]
    async fn test_create_note_form() {
        let (state, store, _) = testing::state_with(ScriptedCompletion::default());
        let form = |body: &'static str| {
            request("POST", "/notes", Some("token-for-alice"))
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap()
        };

        let res = app(state.clone())
            .oneshot(form("title=Groceries&content=eggs"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(text_body(res).await.contains(r#"id="notes-grid""#));
        assert_eq!(store.list_notes(alice().id).await.unwrap().len(), 1);

        let res = app(state)
            .oneshot(form("title=+&content=eggs"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["Hx-Retarget"], "#create-note-form");
        assert!(text_body(res).await.contains("Title&#32;and&#32;content&#32;are&#32;required"));
        assert_eq!(store.list_notes(alice().id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_pin_and_delete_via_http() {
        let (state, store, _) = testing::state_with(ScriptedCompletion::default());
        let note = notes::create(&*store, &alice(), "t", "c").await.unwrap();

        let res = app(state.clone())
            .oneshot(
                request("POST", &format!("/notes/{}/pin", note.id), Some("token-for-bob"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = app(state.clone())
            .oneshot(
                request("POST", &format!("/notes/{}/pin", note.id), Some("token-for-alice"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(store.get_note(note.id).await.unwrap().unwrap().pinned);

        let res = app(state)
            .oneshot(
                request("DELETE", &format!("/notes/{}", note.id), Some("token-for-alice"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(store.get_note(note.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_summarize_button_shows_error_inline() {
        let (state, store, _) =
            testing::state_with(ScriptedCompletion::new(vec![completion(6)]));
        let note = notes::create(&*store, &alice(), "t", "c").await.unwrap();

        let res = app(state)
            .oneshot(
                request("POST", &format!("/notes/{}/summarize", note.id), Some("token-for-alice"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let html = text_body(res).await;
        assert!(html.contains("Invalid&#32;bullets&#32;array"));
        assert!(html.contains("Summarize with AI"));
        assert_eq!(store.summary_count(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_details_stay_out_of_the_page() {
        let (state, store, _) = testing::state_with(ScriptedCompletion::default());
        let note = notes::create(&*store, &alice(), "t", "c").await.unwrap();

        let res = app(state)
            .oneshot(
                request("POST", &format!("/notes/{}/summarize", note.id), Some("token-for-alice"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let html = text_body(res).await;
        assert!(html.contains("Something&#32;went&#32;wrong"));
        assert!(!html.contains("ran&#32;out"));
    }

    fn location(res: &Response<axum::body::BoxBody>) -> &str {
        res.headers()[header::LOCATION].to_str().unwrap()
    }

    #[tokio::test]
    async fn test_confirmation_link_signs_in() {
        let state = testing::state();
        let res = app(state.clone())
            .oneshot(
                request("POST", "/signup", None)
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("email=carol%40example.com&password=hunter22"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let set_cookie = res.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.starts_with("pkce_verifier="));
        assert!(set_cookie.contains("Path=/auth/callback"));
        let verifier = set_cookie.split(';').next().unwrap().to_string();

        let callback = |code: &str| {
            request("GET", &format!("/auth/callback?code={code}"), None)
                .header(header::COOKIE, verifier.as_str())
                .body(Body::empty())
                .unwrap()
        };

        let res = app(state.clone()).oneshot(callback("stale")).await.unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert!(location(&res).starts_with("/login?error="));

        let res = app(state)
            .oneshot(callback(testing::CONFIRMATION_CODE))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/dashboard");
        let cookies: Vec<&str> = res
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert!(cookies.iter().any(|c| c.starts_with("session=") && !c.starts_with("session=;")));
        assert!(cookies.iter().any(|c| c.starts_with("pkce_verifier=;")));
    }

    #[tokio::test]
    async fn test_auth_callback_failures_go_to_login() {
        let cases = [
            ("/auth/callback?error_description=Link+expired", "/login?error=Link+expired"),
            ("/auth/callback", "/login?error=no_code"),
            ("/auth/callback?code=confirm-me", "/login?error=Open+the+confirmation+link"),
        ];
        for (uri, expected) in cases {
            let res = app(testing::state())
                .oneshot(request("GET", uri, None).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::SEE_OTHER, "{uri}");
            assert!(location(&res).starts_with(expected), "{uri}");
        }
    }
}
