//! Shared configuration for netdesk tools.
//!
//! TOML profiles, token resolution (env + keyring + plaintext), and
//! translation to `netdesk_core::ConnectionConfig` / `ViewConfig`. The
//! CLI layers its flag overrides on top of these helpers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use netdesk_core::config::{DEFAULT_EXPORT_LIMIT, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use netdesk_core::{ClickMode, ConnectionConfig, TlsVerification, ViewConfig};

/// Keyring service name under which tokens are stored.
pub const KEYRING_SERVICE: &str = "netdesk";

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "NETDESK_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Row cap for `export --all`.
    #[serde(default = "default_export_limit")]
    pub export_limit: u32,

    /// Effect of a plain row click: "toggle" or "replace".
    #[serde(default = "default_click_mode")]
    pub click_mode: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: false,
            timeout: default_timeout(),
            page_size: default_page_size(),
            export_limit: default_export_limit(),
            click_mode: default_click_mode(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}
fn default_export_limit() -> u32 {
    DEFAULT_EXPORT_LIMIT
}
fn default_click_mode() -> String {
    "toggle".into()
}

/// A named server profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// API base URL (e.g., "https://portal.school.local/api").
    pub server: String,

    /// Bearer token (plaintext; prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the token.
    pub token_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,

    /// Override page size.
    pub page_size: Option<u32>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `$NETDESK_CONFIG`, else XDG / platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "netdesk", "netdesk").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("netdesk");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment.
///
/// Nested keys use a double underscore, e.g. `NETDESK_DEFAULTS__PAGE_SIZE`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NETDESK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Keyring account name of a profile's token.
pub fn keyring_account(profile_name: &str) -> String {
    format!("{profile_name}/token")
}

/// Resolve a bearer token from the credential chain (no CLI flag step).
///
/// Order: env var named by `token_env`, system keyring, plaintext.
/// `None` is valid: not every server requires a token.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    // 1. Profile's token_env → env var lookup
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_account(profile_name)) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    profile.token.clone().map(SecretString::from)
}

// ── Translation to core types ───────────────────────────────────────

/// Build a `ConnectionConfig` from a profile, no CLI flag overrides.
pub fn profile_to_connection_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ConnectionConfig, ConfigError> {
    let url: url::Url = profile.server.parse().map_err(|_| ConfigError::Validation {
        field: "server".into(),
        reason: format!("invalid URL: {}", profile.server),
    })?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    Ok(ConnectionConfig {
        url,
        token: resolve_token(profile, profile_name),
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
    })
}

/// Build a `ViewConfig` from the global defaults and an optional profile.
pub fn view_config(defaults: &Defaults, profile: Option<&Profile>) -> Result<ViewConfig, ConfigError> {
    let page_size = profile
        .and_then(|p| p.page_size)
        .unwrap_or(defaults.page_size);
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(ConfigError::Validation {
            field: "page_size".into(),
            reason: format!("must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"),
        });
    }

    let click_mode = match defaults.click_mode.as_str() {
        "toggle" => ClickMode::Toggle,
        "replace" => ClickMode::Replace,
        other => {
            return Err(ConfigError::Validation {
                field: "click_mode".into(),
                reason: format!("expected 'toggle' or 'replace', got '{other}'"),
            });
        }
    };

    Ok(ViewConfig {
        page_size,
        max_page_size: MAX_PAGE_SIZE,
        click_mode,
        export_limit: defaults.export_limit.max(1),
    })
}
