//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use netdesk_config::ConfigError;
use netdesk_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const PARTIAL_FAILURE: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to server at {url}")]
    #[diagnostic(
        code(netdesk::connection_failed),
        help(
            "Check that the portal is running and reachable.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(netdesk::auth_failed),
        help(
            "Verify the bearer token for this profile.\n\
             Run: netdesk config set-token --profile <name>"
        )
    )]
    AuthFailed { message: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(netdesk::not_found),
        help("Run: netdesk {list_command} to see available ids")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Bulk actions ─────────────────────────────────────────────────

    #[error("{action}: {failed} of {total} item(s) failed")]
    #[diagnostic(
        code(netdesk::partial_failure),
        help("{details}\nThe remaining items were applied. Retry with the failed ids.")
    )]
    PartialFailure {
        action: String,
        failed: usize,
        total: usize,
        details: String,
    },

    #[error("{action} is already running")]
    #[diagnostic(code(netdesk::busy))]
    Busy { action: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("API error ({code}): {message}")]
    #[diagnostic(code(netdesk::api_error))]
    ApiError { code: String, message: String },

    #[error("Export failed: {message}")]
    #[diagnostic(code(netdesk::export))]
    Export { message: String },

    // ── Unsupported ──────────────────────────────────────────────────

    #[error("Operation '{operation}' is not supported")]
    #[diagnostic(code(netdesk::unsupported), help("{reason}"))]
    Unsupported { operation: String, reason: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(netdesk::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(netdesk::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: netdesk config set server <url> --profile {name}"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No server configured")]
    #[diagnostic(
        code(netdesk::no_config),
        help(
            "Pass --server <url>, set NETDESK_SERVER, or add a profile.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(netdesk::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(netdesk::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Request timed out")]
    #[diagnostic(
        code(netdesk::timeout),
        help("Increase timeout with --timeout or check server responsiveness.")
    )]
    Timeout,

    // ── IO / Rendering ───────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(netdesk::render))]
    Render(String),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::PartialFailure { .. } => exit_code::PARTIAL_FAILURE,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            // Classify by what the backend actually reported.
            CoreError::Fetch {
                cause: Some(cause), ..
            } => CliError::from(*cause),

            CoreError::Fetch { page, reason, .. } => CliError::ApiError {
                code: "fetch".into(),
                message: format!("page {page}: {reason}"),
            },

            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::PartialBulkFailure {
                action,
                failed,
                total,
                failures,
                resync_error,
            } => CliError::PartialFailure {
                action: action.to_string(),
                failed,
                total,
                details: failures
                    .iter()
                    .map(ToString::to_string)
                    .chain(resync_error.map(|e| format!("rows shown may be stale: {e}")))
                    .collect::<Vec<_>>()
                    .join("\n"),
            },

            CoreError::BulkInFlight { action } => CliError::Busy {
                action: action.to_string(),
            },

            CoreError::Serialization { message } => CliError::Export { message },

            CoreError::Unsupported { operation, reason } => {
                CliError::Unsupported { operation, reason }
            }

            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::Timeout { .. } => CliError::Timeout,

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                list_command: format!("{entity_type}s list"),
                resource_type: entity_type,
                identifier,
            },

            CoreError::Api {
                message, code, ..
            } => CliError::ApiError {
                code: code.unwrap_or_else(|| "unknown".into()),
                message,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::ApiError {
                code: "internal".into(),
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use netdesk_core::{Action, FailedItem};

    use super::*;

    #[test]
    fn partial_failure_exit_code_and_details() {
        let err = CliError::from(CoreError::PartialBulkFailure {
            action: Action::Delete,
            failed: 1,
            total: 3,
            failures: vec![FailedItem {
                id: "2".into(),
                reason: "locked".into(),
            }],
            resync_error: None,
        });
        assert_eq!(err.exit_code(), exit_code::PARTIAL_FAILURE);
        assert_eq!(err.to_string(), "delete: 1 of 3 item(s) failed");
        assert!(matches!(err, CliError::PartialFailure { ref details, .. } if details == "#2: locked"));
    }

    #[test]
    fn partial_failure_details_mention_stale_view() {
        let err = CliError::from(CoreError::PartialBulkFailure {
            action: Action::Activate,
            failed: 1,
            total: 2,
            failures: vec![FailedItem {
                id: "5".into(),
                reason: "locked".into(),
            }],
            resync_error: Some(Box::new(CoreError::Timeout { timeout_secs: 5 })),
        });
        match err {
            CliError::PartialFailure { details, .. } => {
                let lines: Vec<&str> = details.lines().collect();
                assert_eq!(lines[0], "#5: locked");
                assert!(lines[1].starts_with("rows shown may be stale"));
            }
            other => panic!("expected PartialFailure, got {other:?}"),
        }
    }

    #[test]
    fn fetch_errors_classify_by_cause() {
        let err = CliError::from(CoreError::Fetch {
            page: 1,
            reason: "Cannot connect".into(),
            status: None,
            cause: Some(Box::new(CoreError::ConnectionFailed {
                url: "http://127.0.0.1:9/".into(),
                reason: "refused".into(),
            })),
        });
        assert_eq!(err.exit_code(), exit_code::CONNECTION);

        let err = CliError::from(CoreError::Fetch {
            page: 1,
            reason: "Authentication failed".into(),
            status: Some(401),
            cause: Some(Box::new(CoreError::AuthenticationFailed {
                message: "bad token".into(),
            })),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }

    #[test]
    fn unsupported_and_validation_codes() {
        let unsupported = CliError::from(CoreError::Unsupported {
            operation: "bulk reset-password".into(),
            reason: "single item only".into(),
        });
        assert_eq!(unsupported.exit_code(), exit_code::UNSUPPORTED);
        assert_eq!(
            CliError::from(CoreError::validation("no items selected")).exit_code(),
            exit_code::USAGE
        );
    }
}
