//! Cache directives derived from a response's [`CacheTier`].
//!
//! Handlers record the tier they want as a response extension;
//! [`apply_cache_tier`] turns it into headers once the method and final
//! status are known. Responses without a tier are marked uncacheable.

use axum::{
    body::Body,
    http::{
        HeaderMap, HeaderName, HeaderValue, Method, Request,
        header::{CACHE_CONTROL, EXPIRES, PRAGMA},
    },
    middleware::Next,
    response::Response,
};

use crate::domain::types::CacheTier;

const SURROGATE_CONTROL: HeaderName = HeaderName::from_static("surrogate-control");
const NO_STORE_DIRECTIVE: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";

/// Set the cache headers for `tier` on `response`.
///
/// Only successful GET/HEAD responses may carry a cacheable tier; anything else
/// is downgraded to [`CacheTier::None`].
pub fn annotate(method: &Method, response: &mut Response, tier: CacheTier) {
    let cacheable = matches!(*method, Method::GET | Method::HEAD) && response.status().is_success();
    let tier = if cacheable { tier } else { CacheTier::None };
    write_headers(response.headers_mut(), tier);
}

fn write_headers(headers: &mut HeaderMap, tier: CacheTier) {
    match tier.durations() {
        Some(durations) => {
            let directive = format!(
                "public, max-age={}, s-maxage={}, stale-while-revalidate={}",
                durations.browser_max_age,
                durations.shared_max_age,
                durations.stale_while_revalidate,
            );
            match HeaderValue::from_str(&directive) {
                Ok(value) => {
                    headers.insert(CACHE_CONTROL, value);
                    headers.remove(PRAGMA);
                    headers.remove(EXPIRES);
                    headers.remove(SURROGATE_CONTROL);
                }
                Err(_) => write_headers(headers, CacheTier::None),
            }
        }
        None => {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static(NO_STORE_DIRECTIVE));
            headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
            headers.insert(EXPIRES, HeaderValue::from_static("0"));
            headers.insert(SURROGATE_CONTROL, HeaderValue::from_static("no-store"));
        }
    }
}

pub async fn apply_cache_tier(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let mut response = next.run(request).await;
    let tier = response
        .extensions_mut()
        .remove::<CacheTier>()
        .unwrap_or_default();
    annotate(&method, &mut response, tier);
    response
}
