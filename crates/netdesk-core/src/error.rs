// ── Core error types ──
//
// User-facing errors from netdesk-core. Consumers never see reqwest
// errors or JSON parse failures directly: the `From<netdesk_api::Error>`
// impl translates transport-layer errors into controller-level variants.
// Every variant is recoverable; nothing here tears down the controller.

use std::fmt;

use thiserror::Error;

use crate::model::Action;

/// One failed item of a bulk operation, with its id rendered for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub id: String,
    pub reason: String,
}

impl fmt::Display for FailedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}: {}", self.id, self.reason)
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Controller errors ────────────────────────────────────────────
    /// A page fetch failed. The previously displayed page stays visible.
    #[error("Failed to load page {page}: {reason}")]
    Fetch {
        page: u32,
        reason: String,
        status: Option<u16>,
        /// The backend error behind the failure.
        cause: Option<Box<CoreError>>,
    },

    /// Local validation failure; nothing was sent to the server.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// Some, but not all, per-item mutations of a bulk action failed.
    #[error(
        "{action}: {failed} of {total} item(s) failed{}",
        stale_note(.resync_error.as_deref())
    )]
    PartialBulkFailure {
        action: Action,
        failed: usize,
        total: usize,
        failures: Vec<FailedItem>,
        /// Set when the refetch after the action failed too; the rows on
        /// screen predate the action.
        resync_error: Option<Box<CoreError>>,
    },

    /// The same bulk action is already running.
    #[error("{action} is already in progress")]
    BulkInFlight { action: Action },

    /// Export artifact construction failed.
    #[error("Export failed: {message}")]
    Serialization { message: String },

    #[error("Operation not supported: {operation} ({reason})")]
    Unsupported { operation: String, reason: String },

    // ── Server / transport errors ────────────────────────────────────
    #[error("Cannot connect to server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Entity not found: {entity_type} with id {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("API error: {message}")]
    Api {
        message: String,
        code: Option<String>,
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// HTTP status behind this error, when one is known.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Fetch { status, .. } | Self::Api { status, .. } => *status,
            Self::NotFound { .. } => Some(404),
            Self::AuthenticationFailed { .. } => Some(401),
            _ => None,
        }
    }

    /// Wrap a backend failure as a page fetch error for `page`.
    pub(crate) fn into_fetch(self, page: u32) -> Self {
        match self {
            fetch @ Self::Fetch { .. } => fetch,
            other => Self::Fetch {
                page,
                status: other.status(),
                reason: other.to_string(),
                cause: Some(Box::new(other)),
            },
        }
    }

    /// Attach the error of a failed post-action refetch to a partial bulk
    /// failure. Other variants are returned unchanged.
    pub(crate) fn with_resync_error(mut self, err: Option<CoreError>) -> Self {
        if let Self::PartialBulkFailure { resync_error, .. } = &mut self {
            *resync_error = err.map(Box::new);
        }
        self
    }

    /// The innermost error, looking through fetch wrapping.
    pub fn root_cause(&self) -> &CoreError {
        match self {
            Self::Fetch {
                cause: Some(cause), ..
            } => cause.root_cause(),
            other => other,
        }
    }
}

fn stale_note(resync_error: Option<&CoreError>) -> String {
    resync_error.map_or_else(String::new, |err| {
        format!("; the view was not refreshed and may be stale ({err})")
    })
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<netdesk_api::Error> for CoreError {
    fn from(err: netdesk_api::Error) -> Self {
        match err {
            netdesk_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            netdesk_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        code: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            netdesk_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            netdesk_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            netdesk_api::Error::Api {
                status: 404,
                message,
                ..
            } => CoreError::NotFound {
                entity_type: "resource".into(),
                identifier: message,
            },
            netdesk_api::Error::Api {
                message,
                code,
                status,
            } => CoreError::Api {
                message,
                code,
                status: Some(status),
            },
            netdesk_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_wrapping_keeps_status() {
        let err = CoreError::Api {
            message: "boom".into(),
            code: None,
            status: Some(503),
        }
        .into_fetch(3);

        match err {
            CoreError::Fetch {
                page,
                status,
                ref reason,
                ..
            } => {
                assert_eq!(page, 3);
                assert_eq!(status, Some(503));
                assert!(reason.contains("boom"));
                assert!(matches!(err.root_cause(), CoreError::Api { .. }));
            }
            other => panic!("expected Fetch, got {other:?}"),
        }
    }

    #[test]
    fn partial_failure_message_names_counts() {
        let err = CoreError::PartialBulkFailure {
            action: Action::Delete,
            failed: 1,
            total: 3,
            failures: vec![FailedItem {
                id: "2".into(),
                reason: "conflict".into(),
            }],
            resync_error: None,
        };
        assert_eq!(err.to_string(), "delete: 1 of 3 item(s) failed");
    }

    #[test]
    fn partial_failure_mentions_failed_refetch() {
        let err = CoreError::PartialBulkFailure {
            action: Action::Deactivate,
            failed: 2,
            total: 2,
            failures: Vec::new(),
            resync_error: None,
        }
        .with_resync_error(Some(CoreError::Timeout { timeout_secs: 30 }));

        assert_eq!(
            err.to_string(),
            "deactivate: 2 of 2 item(s) failed; the view was not refreshed and may be stale \
             (Request timed out after 30s)"
        );
    }

    #[test]
    fn resync_error_is_ignored_on_other_variants() {
        let err = CoreError::validation("x")
            .with_resync_error(Some(CoreError::Internal("y".into())));
        assert!(matches!(err, CoreError::Validation { .. }));
    }

    #[test]
    fn api_not_found_maps_to_not_found() {
        let err: CoreError = netdesk_api::Error::Api {
            message: "no such user".into(),
            code: None,
            status: 404,
        }
        .into();
        assert!(matches!(err, CoreError::NotFound { .. }));
        assert_eq!(err.status(), Some(404));
    }
}
