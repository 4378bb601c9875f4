// ── Runtime configuration ──
//
// These types describe how to reach the portal server and how a
// resource view behaves. They never touch disk: the CLI (or any other
// consumer) builds them, usually via `netdesk-config`, and hands them in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::selection::ClickMode;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 500;
pub const DEFAULT_EXPORT_LIMIT: u32 = 10_000;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs on internal servers).
    DangerAcceptInvalid,
}

/// How to reach the portal REST API.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// API base URL (e.g., `https://portal.school.local/api`).
    pub url: Url,
    /// Bearer token, if the server requires one.
    pub token: Option<SecretString>,
    pub tls: TlsVerification,
    pub timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            token: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Behaviour of one paginated resource view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewConfig {
    pub page_size: u32,
    pub max_page_size: u32,
    /// Effect of an unmodified row click.
    pub click_mode: ClickMode,
    /// Upper bound on rows fetched by an explicit "export all".
    pub export_limit: u32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            click_mode: ClickMode::Toggle,
            export_limit: DEFAULT_EXPORT_LIMIT,
        }
    }
}
