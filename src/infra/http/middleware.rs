use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Tag the request with a fresh id and echo it back on the response.
pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(ctx);
    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();

    if !(status.is_client_error() || status.is_server_error()) {
        debug!(
            target: "databyte::http::response",
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            elapsed_ms = elapsed_ms,
            request_id = request_id,
            "request served",
        );
        return response;
    }

    let (source, messages) = match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let detail = messages
        .first()
        .cloned()
        .unwrap_or_else(|| "no diagnostic available".to_string());

    if status.is_server_error() {
        error!(
            target: "databyte::http::response",
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            query = uri.query().unwrap_or(""),
            elapsed_ms = elapsed_ms,
            source = source,
            detail = %detail,
            chain = ?messages,
            request_id = request_id,
            "request failed",
        );
    } else {
        warn!(
            target: "databyte::http::response",
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            query = uri.query().unwrap_or(""),
            elapsed_ms = elapsed_ms,
            source = source,
            detail = %detail,
            request_id = request_id,
            "client request error",
        );
    }

    response
}
