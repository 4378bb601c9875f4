//! Selectable paginated resource controller for netdesk admin screens.
//!
//! Every bulk-action screen of the portal (devices, users, equipment,
//! rentals, DNS approvals) is the same engine over a different record
//! type. This crate owns that engine:
//!
//! - **[`ResourceController`]**: Facade the UI talks to. Routes row
//!   clicks, search, paging and bulk actions through the state machines
//!   below, performs backend I/O, and publishes a [`ViewSnapshot`] after
//!   every change.
//!
//! - **[`SelectionModel`]**: Selected ids plus the shift-click anchor.
//!   Selection survives page turns; the anchor does not.
//!
//! - **[`PaginationController`]**: `(page, page_size, search)` and the
//!   last applied page. Fetch results carry a sequence number and stale
//!   ones are dropped.
//!
//! - **[`BulkOperationExecutor`]**: Concurrent per-id fan-out with
//!   per-id outcomes and one resolution rule: patch, resync, or recover.
//!
//! - **[`export`]**: In-memory CSV / JSON artifacts of the visible page.
//!
//! - **[`ResourceBackend`]**: The server boundary, implemented over
//!   `netdesk-api` by [`RestBackend`].

pub mod backend;
pub mod bulk;
pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod model;
pub mod pagination;
pub mod selection;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backend::{ResourceBackend, RestBackend};
pub use bulk::{BulkOperationExecutor, BulkOutcome, BulkReport, Resolution};
pub use config::{ConnectionConfig, TlsVerification, ViewConfig};
pub use controller::ResourceController;
pub use error::{CoreError, FailedItem};
pub use export::{Artifact, CsvExporter, ExportFormat, ExportScope, Exporter, JsonExporter};
pub use pagination::{FetchOutcome, FetchTicket, PaginationController};
pub use selection::{ClickMode, Modifiers, SelectionModel};
pub use stream::{ViewSnapshot, ViewStream};

pub use model::{Action, Device, Entity, EntityKey, Page, PageQuery, User, UserRole};
