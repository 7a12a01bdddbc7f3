use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::security::SecretStore;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub webhook: WebhookConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub secrets: SecretsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token. All init-data verification keys derive from it; it is
    /// never transmitted or logged.
    #[serde(default)]
    pub bot_token: String,
    /// Public bot username, used to build `t.me` deep links.
    #[serde(default)]
    pub bot_username: String,
    /// Mini-app short name as registered with `BotFather`.
    #[serde(default = "default_app_short_name")]
    pub app_short_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WebhookConfig {
    /// Secret token Telegram echoes back in `X-Telegram-Bot-Api-Secret-Token`.
    /// Generated on first init when absent.
    #[serde(default)]
    pub secret: String,
    /// Key guarding the webhook admin endpoint. Generated on first init.
    #[serde(default)]
    pub admin_key: String,
    /// Public origin this gateway is reachable at (e.g. `https://relay.example.com`).
    #[serde(default)]
    pub public_origin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the validation backend.
    #[serde(default = "default_backend_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Origins allowed to call the publish API (the mini-app origin).
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Explicit opt-in for binding to a non-loopback address.
    #[serde(default)]
    pub allow_public_bind: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsConfig {
    #[serde(default = "default_true")]
    pub encrypt: bool,
}

fn default_app_short_name() -> String {
    "relay".into()
}

fn default_backend_url() -> String {
    "http://127.0.0.1:4000".into()
}

fn default_gateway_host() -> String {
    "127.0.0.1".into()
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            bot_username: String::new(),
            app_short_name: default_app_short_name(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            cors_origins: Vec::new(),
            allow_public_bind: false,
        }
    }
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self { encrypt: true }
    }
}

/// Hex-encoded random credential for generated webhook secrets and admin keys.
fn generate_secret() -> String {
    use rand::RngCore;
    let mut buf = [0u8; 24];
    rand::rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

fn decrypt_secret_string(
    value: &mut String,
    store: &SecretStore,
    encrypt_enabled: bool,
) -> Result<bool> {
    let current = value.trim();
    if current.is_empty() {
        return Ok(false);
    }

    // Plaintext found while encryption is on: decrypted copy stays in
    // memory, and the caller persists the encrypted form.
    let needs_encrypt_persist = encrypt_enabled && !SecretStore::is_encrypted(current);
    *value = store.decrypt(current)?;

    Ok(needs_encrypt_persist)
}

fn encrypt_secret_string(value: &mut String, store: &SecretStore) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() || SecretStore::is_encrypted(trimmed) {
        if trimmed != value {
            *value = trimmed.to_string();
        }
        return Ok(());
    }

    *value = store.encrypt(trimmed)?;
    Ok(())
}

impl Config {
    /// Credential checks that must hold before serving or registering
    /// webhooks. A missing bot token is a deployment defect, not a runtime
    /// condition to recover from.
    pub fn ensure_credentials(&self) -> std::result::Result<(), ConfigError> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(ConfigError::Validation(
                "telegram.bot_token is empty — set it in config.toml or THREADLINE_BOT_TOKEN"
                    .into(),
            ));
        }
        if self.webhook.secret.trim().is_empty() {
            return Err(ConfigError::Validation(
                "webhook.secret is empty — delete it from config.toml to regenerate".into(),
            ));
        }
        Ok(())
    }

    /// Additional check for webhook registration: Telegram needs a public
    /// HTTPS origin to deliver updates to.
    pub fn ensure_public_origin(&self) -> std::result::Result<(), ConfigError> {
        let origin = self.webhook.public_origin.trim();
        if origin.is_empty() {
            return Err(ConfigError::Validation(
                "webhook.public_origin is empty — set the public URL of this gateway".into(),
            ));
        }
        if url::Url::parse(origin).is_err() {
            return Err(ConfigError::Validation(format!(
                "webhook.public_origin is not a valid URL: {origin}"
            )));
        }
        Ok(())
    }

    /// URL Telegram will POST updates to.
    pub fn webhook_url(&self) -> String {
        format!(
            "{}/telegram/webhook",
            self.webhook.public_origin.trim_end_matches('/')
        )
    }

    fn secret_store_root(&self) -> &Path {
        self.config_path.parent().unwrap_or_else(|| Path::new("."))
    }

    fn secret_store(&self) -> SecretStore {
        SecretStore::new(self.secret_store_root(), self.secrets.encrypt)
    }

    fn decrypt_config_secrets_in_place(&mut self) -> Result<bool> {
        let store = self.secret_store();
        let mut needs_persist = false;

        needs_persist |=
            decrypt_secret_string(&mut self.telegram.bot_token, &store, self.secrets.encrypt)?;
        needs_persist |=
            decrypt_secret_string(&mut self.webhook.secret, &store, self.secrets.encrypt)?;
        needs_persist |=
            decrypt_secret_string(&mut self.webhook.admin_key, &store, self.secrets.encrypt)?;

        Ok(needs_persist)
    }

    fn encrypt_config_secrets_in_place(&mut self) -> Result<()> {
        if !self.secrets.encrypt {
            return Ok(());
        }

        let store = self.secret_store();

        encrypt_secret_string(&mut self.telegram.bot_token, &store)?;
        encrypt_secret_string(&mut self.webhook.secret, &store)?;
        encrypt_secret_string(&mut self.webhook.admin_key, &store)?;

        Ok(())
    }

    fn config_for_persistence(&self) -> Result<Self> {
        let mut persisted = self.clone();
        persisted.encrypt_config_secrets_in_place()?;
        Ok(persisted)
    }

    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let threadline_dir = home.join(".threadline");

        Self::load_or_init_at(&threadline_dir)
    }

    /// Load (or bootstrap) the config rooted at an explicit directory.
    pub fn load_or_init_at(dir: &Path) -> Result<Self> {
        let config_path = dir.join("config.toml");

        if !dir.exists() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }

        let mut config = if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            let mut config: Config = toml::from_str(&contents)
                .map_err(|e| ConfigError::Load(e.to_string()))
                .context("Failed to parse config file")?;
            config.config_path.clone_from(&config_path);

            let secrets_need_persist = config.decrypt_config_secrets_in_place()?;
            if secrets_need_persist {
                config.save()?;
            }
            config
        } else {
            let mut config = Self {
                config_path: config_path.clone(),
                ..Self::default()
            };
            config.webhook.secret = generate_secret();
            config.webhook.admin_key = generate_secret();
            config.save()?;
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("THREADLINE_BOT_TOKEN") {
            if !token.is_empty() {
                self.telegram.bot_token = token;
            }
        }

        if let Ok(origin) = std::env::var("THREADLINE_PUBLIC_ORIGIN") {
            if !origin.is_empty() {
                self.webhook.public_origin = origin;
            }
        }

        if let Ok(base_url) = std::env::var("THREADLINE_BACKEND_URL") {
            if !base_url.is_empty() {
                self.backend.base_url = base_url;
            }
        }

        if let Ok(port_str) =
            std::env::var("THREADLINE_GATEWAY_PORT").or_else(|_| std::env::var("PORT"))
        {
            if let Ok(port) = port_str.parse::<u16>() {
                self.gateway.port = port;
            }
        }

        if let Ok(host) =
            std::env::var("THREADLINE_GATEWAY_HOST").or_else(|_| std::env::var("HOST"))
        {
            if !host.is_empty() {
                self.gateway.host = host;
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let persisted = self.config_for_persistence()?;
        let toml_str = toml::to_string_pretty(&persisted).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}
