//! CLI configuration: thin wrapper around `netdesk_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--server, --token, --insecure, --timeout).

use std::time::Duration;

use secrecy::SecretString;

use netdesk_core::{ConnectionConfig, TlsVerification, ViewConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use netdesk_config::{Config, Profile, config_path, load_config_or_default, save_config};

/// Everything needed to build a controller for one invocation.
#[derive(Debug)]
pub struct Resolved {
    pub connection: ConnectionConfig,
    pub view: ViewConfig,
}

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Comma-separated profile names for error help text.
pub fn available_profiles(config: &Config) -> String {
    let mut names: Vec<_> = config.profiles.keys().cloned().collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort();
    names.join(", ")
}

/// Load config and merge the active profile with flag overrides.
///
/// Flags win over the profile, the profile wins over `[defaults]`.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = netdesk_config::load_config()?;
    let profile_name = active_profile_name(global, &cfg);
    let profile = cfg.profiles.get(&profile_name);

    if profile.is_none() && global.profile.is_some() {
        return Err(CliError::ProfileNotFound {
            available: available_profiles(&cfg),
            name: profile_name,
        });
    }

    let mut connection = match profile {
        Some(p) if !p.server.is_empty() => {
            netdesk_config::profile_to_connection_config(p, &profile_name, &cfg.defaults)?
        }
        _ => {
            let server = global.server.as_deref().ok_or_else(|| CliError::NoConfig {
                path: config_path().display().to_string(),
            })?;
            let mut conn = ConnectionConfig::new(parse_url(server)?);
            conn.token = profile.and_then(|p| netdesk_config::resolve_token(p, &profile_name));
            conn.timeout = Duration::from_secs(cfg.defaults.timeout);
            if cfg.defaults.insecure {
                conn.tls = TlsVerification::DangerAcceptInvalid;
            }
            conn
        }
    };

    // 1. Server URL (flag > env > profile)
    if let Some(ref server) = global.server {
        connection.url = parse_url(server)?;
    }
    // 2. Token (flag > env > profile chain)
    if let Some(ref token) = global.token {
        connection.token = Some(SecretString::from(token.clone()));
    }
    // 3. TLS
    if global.insecure {
        connection.tls = TlsVerification::DangerAcceptInvalid;
    }
    // 4. Timeout
    if let Some(secs) = global.timeout {
        connection.timeout = Duration::from_secs(secs);
    }

    let view = netdesk_config::view_config(&cfg.defaults, profile)?;
    Ok(Resolved { connection, view })
}

fn parse_url(raw: &str) -> Result<url::Url, CliError> {
    raw.parse().map_err(|_| CliError::Validation {
        field: "server".into(),
        reason: format!("invalid URL: {raw}"),
    })
}
