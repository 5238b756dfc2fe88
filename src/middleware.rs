use axum::{
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

/// Components render to plain `String`s, which axum labels `text/plain`;
/// those are really HTML. JSON and everything else passes through as-is.
pub async fn html_headers<B>(request: Request<B>, next: Next<B>) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    let is_plain = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.starts_with("text/plain"));
    if is_plain {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
    }

    response
}
