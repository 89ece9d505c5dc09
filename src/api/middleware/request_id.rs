use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

fn fresh_request_id() -> HeaderValue {
    HeaderValue::from_str(&Uuid::new_v4().to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
}

/// Reuses the caller's `x-request-id` or assigns a new one, and echoes it back
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(&X_REQUEST_ID)
        .cloned()
        .unwrap_or_else(fresh_request_id);

    req.headers_mut()
        .insert(X_REQUEST_ID.clone(), request_id.clone());

    let mut response = next.run(req).await;

    response
        .headers_mut()
        .insert(X_REQUEST_ID.clone(), request_id);

    response
}
