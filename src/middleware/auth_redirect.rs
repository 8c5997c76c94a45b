use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

/// Send browsers without a valid session to the login page, remembering
/// where they were headed.
pub async fn redirect_unauthorized(req: Request, next: Next) -> Response {
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let response = next.run(req).await;
    if response.status() == StatusCode::UNAUTHORIZED {
        Redirect::to(&login_url(&target)).into_response()
    } else {
        response
    }
}

pub fn login_url(next: &str) -> String {
    if next == "/" || next.starts_with("/auth/") {
        return "/auth/login".to_string();
    }
    let encoded: String = form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("/auth/login?next={encoded}")
}
