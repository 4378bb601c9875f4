//! Config subcommand handlers.

use std::collections::HashMap;

use netdesk_config::{Defaults, KEYRING_SERVICE, keyring_account};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "page_size = {}", cfg.defaults.page_size);
    let _ = writeln!(out, "export_limit = {}", cfg.defaults.export_limit);
    let _ = writeln!(out, "click_mode = \"{}\"", cfg.defaults.click_mode);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "server = \"{}\"", p.server);
        if p.token.is_some() {
            let _ = writeln!(out, "token = \"****\"");
        }
        if let Some(ref env) = p.token_env {
            let _ = writeln!(out, "token_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(page_size) = p.page_size {
            let _ = writeln!(out, "page_size = {page_size}");
        }
    }

    out
}

/// Copy of `cfg` with plaintext tokens masked, for structured output.
fn redacted(cfg: &Config) -> Config {
    let profiles: HashMap<String, Profile> = cfg
        .profiles
        .iter()
        .map(|(name, p)| {
            (
                name.clone(),
                Profile {
                    server: p.server.clone(),
                    token: p.token.as_ref().map(|_| "****".into()),
                    token_env: p.token_env.clone(),
                    ca_cert: p.ca_cert.clone(),
                    insecure: p.insecure,
                    timeout: p.timeout,
                    page_size: p.page_size,
                },
            )
        })
        .collect();

    Config {
        default_profile: cfg.default_profile.clone(),
        defaults: Defaults {
            output: cfg.defaults.output.clone(),
            insecure: cfg.defaults.insecure,
            timeout: cfg.defaults.timeout,
            page_size: cfg.defaults.page_size,
            export_limit: cfg.defaults.export_limit,
            click_mode: cfg.defaults.click_mode.clone(),
        },
        profiles,
    }
}

fn parse_value<T: std::str::FromStr>(field: &str, value: &str, expected: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("must be {expected}"),
    })
}

fn profile_not_found(cfg: &Config, name: String) -> CliError {
    CliError::ProfileNotFound {
        available: config::available_profiles(cfg),
        name,
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let out = output::render_single(
                global.output,
                &redacted(&cfg),
                format_config_redacted,
                |_| "config".into(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();

            match key.as_str() {
                "server" => {
                    let _: url::Url = parse_value("server", &value, "an absolute URL")?;
                    profile.server = value;
                }
                "token" => profile.token = Some(value),
                "token_env" | "token-env" => profile.token_env = Some(value),
                "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
                "insecure" => {
                    profile.insecure = Some(parse_value("insecure", &value, "'true' or 'false'")?);
                }
                "timeout" => {
                    profile.timeout = Some(parse_value("timeout", &value, "a number (seconds)")?);
                }
                "page_size" | "page-size" => {
                    profile.page_size = Some(parse_value("page_size", &value, "a positive number")?);
                }
                other => {
                    return Err(CliError::Validation {
                        field: other.into(),
                        reason: format!(
                            "unknown config key '{other}'. Valid keys: server, token, \
                             token_env, ca_cert, insecure, timeout, page_size"
                        ),
                    });
                }
            }

            config::save_config(&cfg)?;
            output::success(
                &format!("Set {key} on profile '{profile_name}'"),
                output::should_color(global.color),
                global.quiet,
            );
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: netdesk config set server <url>");
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(profile_not_found(&cfg, name));
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            output::success(
                &format!("Default profile set to '{name}'"),
                output::should_color(global.color),
                global.quiet,
            );
            Ok(())
        }

        // ── SetToken ────────────────────────────────────────────────
        ConfigCommand::SetToken => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(profile_not_found(&cfg, profile_name));
            }

            let token = dialoguer::Password::new()
                .with_prompt("Bearer token")
                .interact()
                .map_err(prompt_err)?;
            if token.is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "value cannot be empty".into(),
                });
            }

            let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_account(&profile_name))
                .map_err(|e| CliError::Validation {
                    field: "keyring".into(),
                    reason: format!("failed to access keyring: {e}"),
                })?;
            entry
                .set_password(&token)
                .map_err(|e| CliError::Validation {
                    field: "keyring".into(),
                    reason: format!("failed to store token in keyring: {e}"),
                })?;

            output::success(
                &format!("Token stored in system keyring for profile '{profile_name}'"),
                output::should_color(global.color),
                global.quiet,
            );
            Ok(())
        }
    }
}
