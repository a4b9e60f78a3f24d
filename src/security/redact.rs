//! Credential redaction for observed HTTP traffic.
//!
//! # Responsibilities
//! - Scrub sensitive headers, query parameters and body fields
//! - Replace whole payloads for known auth endpoints
//! - Best-effort redaction of form-encoded and SSE text
//!
//! # Design Decisions
//! - Pure functions, no shared state
//! - Fail-open on parse errors: unrecognised content passes through
//! - Fail-closed on auth endpoints: the whole payload is replaced
//! - Field names decide sensitivity, values are never inspected

use serde_json::Value;
use url::Url;

use crate::http::client::Headers;

/// Replacement for a single sensitive value.
pub const REDACTED: &str = "[REDACTED]";

/// Replacement for an entire body sent to or received from an auth endpoint.
pub const AUTH_ENDPOINT_REDACTED: &str = "[REDACTED - Auth Endpoint]";

/// Header names that are always sensitive (exact, case-insensitive).
const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "x-auth-token",
    "x-csrf-token",
    "x-xsrf-token",
    "x-forwarded-for",
    "x-real-ip",
];

/// Any header or field name containing one of these is sensitive.
const SENSITIVE_NAME_PARTS: &[&str] = &[
    "token",
    "key",
    "secret",
    "password",
    "auth",
    "session",
    "credential",
    "bearer",
];

/// Query parameters that are sensitive (exact, case-insensitive).
const SENSITIVE_QUERY_PARAMS: &[&str] = &[
    "token",
    "access_token",
    "refresh_token",
    "id_token",
    "code",
    "client_secret",
    "state",
    "code_verifier",
    "session_state",
    "api_key",
    "password",
    "secret",
    "key",
    "credential",
    "auth",
];

/// Path fragments that mark an auth endpoint (substring, case-insensitive).
const AUTH_ENDPOINT_MARKERS: &[&str] = &[
    "oauth",
    "token",
    "auth",
    "login",
    "signin",
    "authenticate",
    "password",
    "reset-password",
    "forgot-password",
    "register",
    "signup",
    "session",
    "sessions",
    "2fa",
    "mfa",
    "otp",
    "verify",
    "activate",
    "api-keys",
    "tokens",
    "credentials",
    "authorization",
    "revoke",
    "introspect",
    "userinfo",
];

/// Whether a header or body field name should have its value hidden.
pub fn is_sensitive_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SENSITIVE_HEADERS.contains(&lower.as_str())
        || SENSITIVE_NAME_PARTS.iter().any(|part| lower.contains(part))
}

/// Whether `uri` points at an endpoint whose payloads are redacted wholesale.
pub fn is_auth_endpoint(uri: &Url) -> bool {
    let path = uri.path().to_ascii_lowercase();
    AUTH_ENDPOINT_MARKERS
        .iter()
        .any(|marker| path.contains(marker))
}

fn is_sensitive_query_param(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SENSITIVE_QUERY_PARAMS.contains(&lower.as_str())
}

/// Copy of `headers` with sensitive values replaced.
pub fn redact_headers(headers: &Headers) -> Headers {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if is_sensitive_name(name) {
                REDACTED.to_string()
            } else {
                value.clone()
            };
            (name.clone(), value)
        })
        .collect()
}

/// `uri` with sensitive query parameters replaced.
///
/// Returns an identical clone when nothing matched, so the original
/// encoding of the query string is preserved.
pub fn redact_uri(uri: &Url) -> Url {
    if uri.query().is_none() {
        return uri.clone();
    }

    let pairs: Vec<(String, String)> = uri
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if !pairs.iter().any(|(k, _)| is_sensitive_query_param(k)) {
        return uri.clone();
    }

    let mut redacted = uri.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs.iter().map(|(k, v)| {
        if is_sensitive_query_param(k) {
            (k.as_str(), REDACTED)
        } else {
            (k.as_str(), v.as_str())
        }
    }));
    redacted
}

/// Redact a JSON body sent to or received from `uri`.
pub fn redact_json_body(body: &Value, uri: &Url) -> Value {
    if is_auth_endpoint(uri) {
        return Value::String(AUTH_ENDPOINT_REDACTED.to_string());
    }
    redact_value(body)
}

fn redact_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, inner)| {
                    let inner = if is_sensitive_name(key) {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact_value(inner)
                    };
                    (key.clone(), inner)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        scalar => scalar.clone(),
    }
}

/// Redact a text body, treating it as form-encoded when it looks like one.
pub fn redact_string(raw: &str, uri: &Url) -> String {
    if is_auth_endpoint(uri) {
        return AUTH_ENDPOINT_REDACTED.to_string();
    }
    if !raw.contains('=') {
        return raw.to_string();
    }

    raw.split('&')
        .map(|field| match field.split_once('=') {
            Some((key, _)) if is_sensitive_name(key) => format!("{}={}", key, REDACTED),
            _ => field.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Redact server-sent events text block by block.
///
/// Each block's `data:` payload is parsed as JSON and redacted; blocks that
/// do not parse are left exactly as they were.
pub fn redact_sse_content(raw: &str, uri: &Url) -> String {
    if is_auth_endpoint(uri) {
        return AUTH_ENDPOINT_REDACTED.to_string();
    }

    raw.split("\n\n")
        .map(redact_sse_block)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn redact_sse_block(block: &str) -> String {
    let data: Vec<&str> = block
        .split('\n')
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|payload| payload.strip_prefix(' ').unwrap_or(payload))
        .collect();
    if data.is_empty() {
        return block.to_string();
    }

    let payload: Value = match serde_json::from_str(&data.join("\n")) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::debug!(error = %e, "SSE data is not JSON, left unredacted");
            return block.to_string();
        }
    };
    let redacted = redact_value(&payload);

    // Multi-line data collapses into one line carrying the redacted JSON.
    let mut lines = Vec::new();
    let mut wrote_data = false;
    for line in block.split('\n') {
        if line.starts_with("data:") {
            if !wrote_data {
                lines.push(format!("data: {}", redacted));
                wrote_data = true;
            }
        } else {
            lines.push(line.to_string());
        }
    }
    lines.join("\n")
}

/// Redact an arbitrary body for observation.
///
/// JSON goes through [`redact_json_body`], anything else through
/// [`redact_string`] as text. Empty bodies yield `None`.
pub fn redact_body_bytes(body: &[u8], uri: &Url) -> Option<Value> {
    if body.is_empty() {
        return None;
    }
    if let Ok(json) = serde_json::from_slice::<Value>(body) {
        return Some(redact_json_body(&json, uri));
    }
    let text = String::from_utf8_lossy(body);
    Some(Value::String(redact_string(&text, uri)))
}
