//! Opaque start-param tokens: JSON + unpadded URL-safe base64.
//!
//! The alphabet never needs percent-escaping inside a URL query component,
//! so tokens survive the `t.me/...?startapp=<token>` channel byte-for-byte.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Encode a record as a URL-safe opaque token.
pub fn encode_start_param<T: Serialize>(record: &T) -> Result<String> {
    let json = serde_json::to_vec(record).context("serialize start param")?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decode a token produced by [`encode_start_param`].
///
/// Any failure — foreign alphabet, truncation, malformed or mistyped JSON —
/// yields `None`. Rejecting an untrusted token is routine input handling,
/// not an error path.
pub fn decode_start_param<T: DeserializeOwned>(token: &str) -> Option<T> {
    let bytes = URL_SAFE_NO_PAD.decode(token).ok()?;
    serde_json::from_slice(&bytes).ok()
}
