//! Mini-app init-data verification.
//!
//! Telegram signs the `initData` blob it hands to a Mini App with a key
//! derived from the bot token. Verification recomputes the digest over a
//! canonical rendering of the parameters and compares it against the
//! supplied `hash` field.
//! See: <https://core.telegram.org/bots/webapps#validating-data-received-via-the-mini-app>

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use super::constant_time_eq;

type HmacSha256 = Hmac<Sha256>;

/// Fixed label bound into the signing-key derivation.
const KEY_LABEL: &[u8] = b"WebAppData";

/// Parsed view of a signed `initData` query string.
///
/// The `hash` field is split off at parse time; every other pair is kept
/// verbatim, both for digest recomputation and for field access after
/// verification.
#[derive(Debug, Clone, Default)]
pub struct SignedParams {
    pairs: Vec<(String, String)>,
    hash: Option<String>,
}

impl SignedParams {
    /// Parse a query-string-shaped blob. Never fails; an unparseable blob
    /// simply yields a parameter set that will not verify.
    pub fn parse(raw: &str) -> Self {
        let mut pairs = Vec::new();
        let mut hash = None;
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            if key == "hash" {
                hash = Some(value.into_owned());
            } else {
                pairs.push((key.into_owned(), value.into_owned()));
            }
        }
        Self { pairs, hash }
    }

    /// First value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Digest input: `key=value` pairs sorted lexicographically by key,
    /// joined with newlines. Input order must not matter, so sorting happens
    /// here regardless of how the pairs arrived.
    fn check_string(&self) -> String {
        let mut pairs: Vec<&(String, String)> = self.pairs.iter().collect();
        pairs.sort();
        pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Check the supplied `hash` against the digest recomputed from the bot
    /// token. Returns false for a missing hash or any mismatch — data-shaped
    /// problems never become errors here. An empty or wrong token is the
    /// caller's configuration defect and is validated at startup.
    pub fn verify(&self, bot_token: &str) -> bool {
        let Some(supplied) = self.hash.as_deref() else {
            return false;
        };

        let token_digest = Sha256::digest(bot_token.as_bytes());
        let Ok(mut label_mac) = HmacSha256::new_from_slice(&token_digest) else {
            return false;
        };
        label_mac.update(KEY_LABEL);
        let signing_key = label_mac.finalize().into_bytes();

        let Ok(mut mac) = HmacSha256::new_from_slice(&signing_key) else {
            return false;
        };
        mac.update(self.check_string().as_bytes());
        let computed = hex::encode(mac.finalize().into_bytes());

        // Constant-time comparison
        constant_time_eq(&computed, supplied)
    }
}

/// Verify a raw `initData` blob in one call.
pub fn verify_init_data(raw: &str, bot_token: &str) -> bool {
    SignedParams::parse(raw).verify(bot_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Independent digest computation over already-decoded pairs, mirroring
    /// the derivation the verifier is expected to perform.
    fn sign_pairs(bot_token: &str, pairs: &[(&str, &str)]) -> String {
        let mut rendered: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
        rendered.sort();
        let check_string = rendered.join("\n");

        let token_digest = Sha256::digest(bot_token.as_bytes());
        let mut label_mac = HmacSha256::new_from_slice(&token_digest).unwrap();
        label_mac.update(KEY_LABEL);
        let signing_key = label_mac.finalize().into_bytes();

        let mut mac = HmacSha256::new_from_slice(&signing_key).unwrap();
        mac.update(check_string.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Render pairs (plus a `hash`) as a percent-encoded query string.
    fn build_init_data(pairs: &[(&str, &str)], hash: &str) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in pairs {
            serializer.append_pair(k, v);
        }
        serializer.append_pair("hash", hash);
        serializer.finish()
    }

    const SAMPLE_PAIRS: &[(&str, &str)] = &[
        ("auth_date", "1700000000"),
        ("query_id", "AAA"),
        ("user", r#"{"id":1}"#),
    ];

    #[test]
    fn valid_init_data_verifies() {
        let hash = sign_pairs("TESTTOKEN", SAMPLE_PAIRS);
        let raw = build_init_data(SAMPLE_PAIRS, &hash);
        assert!(verify_init_data(&raw, "TESTTOKEN"));
    }

    #[test]
    fn tampered_value_fails() {
        let hash = sign_pairs("TESTTOKEN", SAMPLE_PAIRS);
        let tampered = &[
            ("auth_date", "1700000000"),
            ("query_id", "AAB"),
            ("user", r#"{"id":1}"#),
        ];
        let raw = build_init_data(tampered, &hash);
        assert!(!verify_init_data(&raw, "TESTTOKEN"));
    }

    #[test]
    fn wrong_token_fails() {
        let hash = sign_pairs("TESTTOKEN", SAMPLE_PAIRS);
        let raw = build_init_data(SAMPLE_PAIRS, &hash);
        assert!(!verify_init_data(&raw, "OTHERTOKEN"));
    }

    #[test]
    fn missing_hash_fails_without_panicking() {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in SAMPLE_PAIRS {
            serializer.append_pair(k, v);
        }
        let raw = serializer.finish();
        assert!(!verify_init_data(&raw, "TESTTOKEN"));
    }

    #[test]
    fn empty_input_fails_without_panicking() {
        assert!(!verify_init_data("", "TESTTOKEN"));
        assert!(!verify_init_data("&&&=", "TESTTOKEN"));
    }

    #[test]
    fn parameter_order_does_not_matter() {
        let hash = sign_pairs("TESTTOKEN", SAMPLE_PAIRS);
        let reordered = &[
            ("user", r#"{"id":1}"#),
            ("auth_date", "1700000000"),
            ("query_id", "AAA"),
        ];
        let raw = build_init_data(reordered, &hash);
        assert!(verify_init_data(&raw, "TESTTOKEN"));
    }

    #[test]
    fn verification_is_deterministic() {
        let hash = sign_pairs("TESTTOKEN", SAMPLE_PAIRS);
        let raw = build_init_data(SAMPLE_PAIRS, &hash);
        let params = SignedParams::parse(&raw);
        assert_eq!(params.verify("TESTTOKEN"), params.verify("TESTTOKEN"));
        assert!(params.verify("TESTTOKEN"));
    }

    #[test]
    fn hash_field_is_excluded_from_check_string() {
        // Signing over the non-hash pairs only must match what the verifier
        // recomputes; if `hash` leaked into the check string this would fail.
        let hash = sign_pairs("TESTTOKEN", SAMPLE_PAIRS);
        let raw = build_init_data(SAMPLE_PAIRS, &hash);
        let params = SignedParams::parse(&raw);
        assert!(params.get("hash").is_none());
        assert!(params.verify("TESTTOKEN"));
    }

    #[test]
    fn percent_encoded_values_are_decoded_before_signing() {
        let pairs = &[
            ("auth_date", "1700000000"),
            ("start_param", "eyJjIjoxfQ"),
            ("user", r#"{"id":7,"first_name":"Ana Maria"}"#),
        ];
        let hash = sign_pairs("TESTTOKEN", pairs);
        let raw = build_init_data(pairs, &hash);
        assert!(verify_init_data(&raw, "TESTTOKEN"));
    }

    #[test]
    fn get_returns_decoded_field_values() {
        let pairs = &[("start_param", "abc_123"), ("auth_date", "1700000000")];
        let hash = sign_pairs("TESTTOKEN", pairs);
        let raw = build_init_data(pairs, &hash);
        let params = SignedParams::parse(&raw);
        assert_eq!(params.get("start_param"), Some("abc_123"));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn truncated_hash_fails() {
        let hash = sign_pairs("TESTTOKEN", SAMPLE_PAIRS);
        let raw = build_init_data(SAMPLE_PAIRS, &hash[..hash.len() - 2]);
        assert!(!verify_init_data(&raw, "TESTTOKEN"));
    }
}
