//! Sub-protocol negotiation.
//!
//! The client may offer a comma-separated list of sub-protocol tokens in the
//! `Sec-WebSocket-Protocol` header. The relay always picks the first token
//! and applies it to both the upstream connect request and the client upgrade
//! response, so both ends of the bridge agree on the same protocol. A missing
//! or malformed offer degrades to "no protocol negotiated", never an error.

/// Select the negotiated sub-protocol from a raw offer header value.
///
/// Returns the first comma-separated token with surrounding whitespace
/// trimmed, or `None` when the offer is absent or contains no token.
pub fn negotiate(offer: Option<&str>) -> Option<String> {
    let first = offer?.split(',').next()?.trim();
    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}
