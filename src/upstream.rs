//! Upstream URL construction and credential injection.
//!
//! # Responsibilities
//! - Build the outbound URL for both plain calls and streaming sessions
//! - Carry the client's original query string through unchanged
//! - Append the access key as an `api-key` query parameter
//!
//! # Design Decisions
//! - The key is appended textually rather than via a query-pair builder so
//!   the client's original query string is forwarded byte-for-byte
//! - The key never appears in logs or client-facing responses

/// Build the streaming (WebSocket) upstream URL for a session.
///
/// The client's query string, if any, is preserved as-is and the credential
/// is appended: `<base>?<query>&api-key=<key>`, or `<base>?api-key=<key>`
/// when the client sent no query.
pub fn streaming_url(ws_base: &str, original_query: Option<&str>, api_key: &str) -> String {
    with_api_key(ws_base, original_query, api_key)
}

/// Build the plain (HTTP) upstream URL for a single forwarded call.
pub fn rpc_url(http_base: &str, original_query: Option<&str>, api_key: &str) -> String {
    with_api_key(http_base, original_query, api_key)
}

fn with_api_key(base: &str, original_query: Option<&str>, api_key: &str) -> String {
    match original_query {
        Some(query) if !query.is_empty() => {
            format!("{}?{}&api-key={}", base, query, api_key)
        }
        _ => format!("{}?api-key={}", base, api_key),
    }
}
