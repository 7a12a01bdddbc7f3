use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `Threadline`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
///
/// Data-shaped failures never appear here: a wrong digest or an undecodable
/// start token is signalled through the verifier's `bool` and the codec's
/// `Option` return values.
#[derive(Debug, Error)]
pub enum RelayError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Telegram API ────────────────────────────────────────────────────
    #[error("telegram: {0}")]
    Telegram(#[from] TelegramError),

    // ── Backend API ─────────────────────────────────────────────────────
    #[error("backend: {0}")]
    Backend(#[from] BackendError),

    // ── Gateway ─────────────────────────────────────────────────────────
    #[error("gateway: {0}")]
    Gateway(#[from] GatewayError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Telegram API errors ────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("{method} failed: {message}")]
    Request { method: String, message: String },
}

// ─── Backend API errors ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("validate failed: {0}")]
    Request(String),
}

// ─── Gateway errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("refusing public bind: {0}")]
    PublicBind(String),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_displays_correctly() {
        let err = RelayError::Config(ConfigError::Validation("empty bot token".into()));
        assert!(err.to_string().contains("validation failed"));
        assert!(err.to_string().contains("empty bot token"));
    }

    #[test]
    fn telegram_request_error_displays_method() {
        let err = RelayError::Telegram(TelegramError::Request {
            method: "sendMessage".into(),
            message: "400 Bad Request".into(),
        });
        assert!(err.to_string().contains("sendMessage"));
    }

    #[test]
    fn anyhow_interop() {
        let anyhow_err = anyhow::anyhow!("something went wrong");
        let relay_err: RelayError = anyhow_err.into();
        assert!(relay_err.to_string().contains("something went wrong"));
    }

    #[test]
    fn gateway_public_bind_displays_host() {
        let err = RelayError::Gateway(GatewayError::PublicBind("0.0.0.0".into()));
        assert!(err.to_string().contains("0.0.0.0"));
    }
}
