//! ResponseBuilder: status line and header set for media responses.
//!
//! | plan          | status | notable headers                                  |
//! |---------------|--------|--------------------------------------------------|
//! | Full          | 200    | Content-Length only when the plan allows it      |
//! | Partial       | 206    | Content-Range `bytes s-e/total`, Content-Length  |
//! | Unsatisfiable | 416    | Content-Range `bytes */total`, empty body        |

use crate::{
    models::media::ObjectMetadata,
    services::{
        gateway::PreparedStream,
        planner::{Plan, StreamPolicy},
    },
};
use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::Response,
};

pub const ALLOW_METHODS: &str = "GET, HEAD, OPTIONS";
pub const ALLOW_HEADERS: &str = "Range, Content-Type";
const EXPOSE_HEADERS: &str = "Content-Length, Content-Range, Accept-Ranges";
const CACHE_CONTROL: &str = "public, max-age=3600";
const PREFLIGHT_MAX_AGE: &str = "86400";

/// Build the 200/206 (or 416) response for `prepared`, attaching `body`.
///
/// HEAD passes an empty body and gets the exact header set GET would send.
pub fn media_response(prepared: &PreparedStream, policy: &StreamPolicy, body: Body) -> Response {
    let meta = &prepared.metadata;
    let (status, accept_ranges, content_length, content_range) = match prepared.plan {
        Plan::Unsatisfiable => return unsatisfiable_response(meta.total_size),
        Plan::Full { send_length, .. } => {
            let accept = if policy.honors_ranges() && meta.size_known() {
                "bytes"
            } else {
                "none"
            };
            let length = send_length.then_some(meta.total_size);
            (StatusCode::OK, accept, length, None)
        }
        Plan::Partial(window) => (
            StatusCode::PARTIAL_CONTENT,
            "bytes",
            Some(window.len()),
            Some(format!(
                "bytes {}-{}/{}",
                window.start, window.end, meta.total_size
            )),
        ),
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();
    set_media_headers(headers, meta, policy);
    headers.insert(
        header::ACCEPT_RANGES,
        HeaderValue::from_static(accept_ranges),
    );
    if let Some(length) = content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    if let Some(range) = content_range {
        if let Ok(value) = HeaderValue::from_str(&range) {
            headers.insert(header::CONTENT_RANGE, value);
        }
    }
    response
}

/// 416 with `Content-Range: bytes */<total>` and no body.
pub fn unsatisfiable_response(total_size: u64) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::RANGE_NOT_SATISFIABLE;
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", total_size)) {
        headers.insert(header::CONTENT_RANGE, value);
    }
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}

/// CORS preflight answer for the stream endpoint.
pub fn preflight_response() -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(PREFLIGHT_MAX_AGE),
    );
    response
}

fn set_media_headers(headers: &mut HeaderMap, meta: &ObjectMetadata, policy: &StreamPolicy) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&meta.mime_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        content_disposition(policy.disposition.as_str(), &meta.display_name),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CACHE_CONTROL),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static(EXPOSE_HEADERS),
    );
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
}

fn content_disposition(disposition: &'static str, name: &str) -> HeaderValue {
    let value = format!("{}; filename=\"{}\"", disposition, sanitize_filename(name));
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static(disposition))
}

/// Make `name` safe inside a quoted `filename="..."` parameter.
///
/// Invisible format characters are dropped; any other non-ASCII character,
/// quote, backslash or ASCII control (CR, LF, TAB, DEL, ...) becomes `_`.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !is_invisible_format(*c))
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_control() || !c.is_ascii() => '_',
            c => c,
        })
        .collect();

    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Zero-width and bidi-control code points.
fn is_invisible_format(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{061C}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{2069}'
            | '\u{FEFF}'
    )
}
