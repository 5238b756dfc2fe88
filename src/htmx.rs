/// HTMX utils
use axum::http::{HeaderMap, HeaderValue};

/// Full-page client-side redirect after an htmx request.
pub fn redirect(to: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "Hx-Redirect",
        HeaderValue::from_str(to).unwrap_or(HeaderValue::from_static("/")),
    );
    headers
}

/// Swap the response into `selector` instead of the element the request
/// asked for. Used to send a form back, with its error, in place of the
/// fragment a successful submission would have refreshed.
pub fn retarget(selector: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Hx-Retarget", HeaderValue::from_static(selector));
    headers
}
