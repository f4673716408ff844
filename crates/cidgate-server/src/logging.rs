use std::time::Instant;

use axum::extract::Request;
use axum::http::{header, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tracing::info;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Per-request identifier, attached to the request as an extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

/// Log every request on arrival and on completion, tagged with a fresh id
/// that is echoed back in `x-request-id`.
pub async fn log_requests(mut request: Request, next: Next) -> Response {
    let id = Uuid::now_v7();
    let line = format!(
        "{} {} {:?}",
        request.method(),
        request.uri(),
        request.version()
    );
    info!(request_id = %id, "--> \"{line}\"");

    request.extensions_mut().insert(RequestId(id));
    let started = Instant::now();
    let mut response = next.run(request).await;
    let elapsed = started.elapsed();

    let length = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    info!(
        request_id = %id,
        status = response.status().as_u16(),
        "<-- \"{line}\" {} {length} - {:.3} ms",
        response.status().as_u16(),
        elapsed.as_secs_f64() * 1000.0,
    );

    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
