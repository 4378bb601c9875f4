//! Clap derive structures for the `netdesk` CLI.
//!
//! Defines the command tree, global flags, and shared argument types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// netdesk -- bulk administration for portal devices and users
#[derive(Debug, Parser)]
#[command(
    name = "netdesk",
    version,
    about = "List, bulk-edit and export portal resources from the command line",
    long_about = "Administer registered devices and user accounts of a netdesk portal.\n\n\
        Rows are paged server-side; bulk actions fan out one request per\n\
        selected id and report each outcome.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "NETDESK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API base URL (overrides profile)
    #[arg(long, short = 's', env = "NETDESK_SERVER", global = true)]
    pub server: Option<String>,

    /// Bearer token
    #[arg(long, env = "NETDESK_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NETDESK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "NETDESK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "NETDESK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage registered devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Manage user accounts
    #[command(alias = "u")]
    Users(UsersArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Resource Arguments ────────────────────────────────────────

/// Which page of the collection to work on.
#[derive(Debug, Args)]
pub struct ViewArgs {
    /// Page number (1-based)
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Rows per page (defaults to the profile's page_size)
    #[arg(long, short = 'l')]
    pub page_size: Option<u32>,

    /// Free-text search applied server-side
    #[arg(long, short = 'S')]
    pub search: Option<String>,
}

#[derive(Debug, Args)]
pub struct BulkArgs {
    /// Ids to select and act on
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<i64>,

    #[command(flatten)]
    pub view: ViewArgs,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Destination file
    #[arg(long, short = 'f')]
    pub file: PathBuf,

    /// Artifact format
    #[arg(long, default_value = "csv")]
    pub format: ExportFormatArg,

    /// Export every matching row instead of the visible page
    #[arg(long, short = 'a')]
    pub all: bool,

    #[command(flatten)]
    pub view: ViewArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExportFormatArg {
    Csv,
    Json,
}

/// Commands shared by every resource collection.
#[derive(Debug, Subcommand)]
pub enum ResourceCommand {
    /// List one page of rows
    #[command(alias = "ls")]
    List(ViewArgs),

    /// Activate the given rows
    Activate(BulkArgs),

    /// Deactivate the given rows
    Deactivate(BulkArgs),

    /// Delete the given rows
    #[command(alias = "rm")]
    Delete(BulkArgs),

    /// Write the visible page (or --all rows) to a file
    Export(ExportArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: ResourceCommand,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  USERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    #[command(flatten)]
    Common(ResourceCommand),

    /// Send a password reset to one user
    ResetPassword {
        /// User id
        id: i64,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display current resolved configuration
    Show,

    /// Set a value on the active profile
    Set {
        /// Profile key (server, token_env, ca_cert, insecure, timeout, page_size)
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the active profile's bearer token in the system keyring
    SetToken,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
