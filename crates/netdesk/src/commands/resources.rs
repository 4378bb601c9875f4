//! Resource command handlers: list, bulk actions, export.
//!
//! Every collection goes through the same `ResourceController`: the ids
//! named on the command line are clicked into its selection, and the
//! bulk action runs against that selection.

use std::collections::BTreeSet;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tabled::Tabled;

use netdesk_core::{
    Action, BulkReport, CsvExporter, Device, Entity, Exporter, JsonExporter, Modifiers,
    ResourceController, RestBackend, User,
};

use crate::cli::{
    BulkArgs, ExportArgs, ExportFormatArg, GlobalOpts, OutputFormat, ResourceCommand, ViewArgs,
};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Resource kinds ──────────────────────────────────────────────────

/// A collection the CLI knows how to list and render.
pub trait Resource: Entity<Id = i64> + Serialize + DeserializeOwned {
    /// Collection path below the API base URL; also the plural noun.
    const PATH: &'static str;

    type Row: Tabled;

    fn row(&self) -> Self::Row;
}

#[derive(Tabled)]
pub struct DeviceRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Hostname")]
    hostname: String,
    #[tabled(rename = "Owner")]
    owner: String,
    #[tabled(rename = "Active")]
    active: &'static str,
}

impl Resource for Device {
    const PATH: &'static str = "devices";

    type Row = DeviceRow;

    fn row(&self) -> DeviceRow {
        DeviceRow {
            id: self.id,
            ip: self.ip.map(|ip| ip.to_string()).unwrap_or_default(),
            mac: self.mac.clone(),
            hostname: self.hostname.clone().unwrap_or_default(),
            owner: self.owner.clone().unwrap_or_default(),
            active: yes_no(self.active),
        }
    }
}

#[derive(Tabled)]
pub struct UserRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Active")]
    active: &'static str,
}

impl Resource for User {
    const PATH: &'static str = "users";

    type Row = UserRow;

    fn row(&self) -> UserRow {
        UserRow {
            id: self.id,
            username: self.username.clone(),
            name: self.name.clone().unwrap_or_default(),
            email: self.email.clone().unwrap_or_default(),
            role: self.role.to_string(),
            active: yes_no(self.active),
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// Per-id result of a bulk action, as printed.
#[derive(Debug, Clone, Serialize, Tabled)]
struct OutcomeRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Result")]
    result: &'static str,
}

fn outcome_rows(report: &BulkReport<i64>) -> Vec<OutcomeRow> {
    report
        .outcomes
        .iter()
        .map(|o| OutcomeRow {
            id: o.id,
            result: if o.skipped { "unchanged" } else { "ok" },
        })
        .collect()
}

// ── Controller setup ────────────────────────────────────────────────

type Controller<T> = ResourceController<T, RestBackend<T>>;

fn connect<T: Resource>(
    resolved: &Resolved,
    page_size: Option<u32>,
) -> Result<Controller<T>, CliError> {
    let mut view = resolved.view.clone();
    if let Some(size) = page_size {
        if size == 0 || size > view.max_page_size {
            return Err(CliError::Validation {
                field: "page-size".into(),
                reason: format!("must be between 1 and {}", view.max_page_size),
            });
        }
        view.page_size = size;
    }
    let backend = RestBackend::connect(&resolved.connection, T::PATH)?;
    Ok(ResourceController::new(T::PATH, backend, view))
}

/// Bring the controller to the page described by `args`.
async fn open<T: Resource>(controller: &Controller<T>, args: &ViewArgs) -> Result<(), CliError> {
    match args.search.as_deref() {
        Some(term) => controller.on_search(term).await?,
        None => controller.load().await?,
    };
    if args.page > 1 {
        controller.on_page_change(args.page).await?;
    }
    Ok(())
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn handle<T: Resource>(
    cmd: ResourceCommand,
    resolved: &Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        ResourceCommand::List(args) => list::<T>(&args, resolved, global).await,
        ResourceCommand::Activate(args) => bulk::<T>(Action::Activate, args, resolved, global).await,
        ResourceCommand::Deactivate(args) => {
            bulk::<T>(Action::Deactivate, args, resolved, global).await
        }
        ResourceCommand::Delete(args) => bulk::<T>(Action::Delete, args, resolved, global).await,
        ResourceCommand::Export(args) => export::<T>(&args, resolved, global).await,
    }
}

async fn list<T: Resource>(
    args: &ViewArgs,
    resolved: &Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let controller = connect::<T>(resolved, args.page_size)?;
    open(&controller, args).await?;

    let snap = controller.snapshot();
    let out = output::render_list(global.output, snap.items(), T::row, |item| {
        item.id().to_string()
    })?;
    output::print_output(&out, global.quiet);

    if matches!(global.output, OutputFormat::Table) {
        if let Some(page) = snap.page.as_deref() {
            output::note(
                &format!(
                    "page {}/{}, {} {} total",
                    page.page(),
                    page.total_pages(),
                    page.total_count(),
                    T::PATH
                ),
                output::should_color(global.color),
                global.quiet,
            );
        }
    }
    Ok(())
}

async fn bulk<T: Resource>(
    action: Action,
    args: BulkArgs,
    resolved: &Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let ids: BTreeSet<i64> = args.ids.into_iter().collect();
    let color = output::should_color(global.color);

    if action == Action::Delete {
        let prompt = format!("Delete {} {}?", ids.len(), T::PATH);
        if !util::confirm(&prompt, "delete", global.yes)? {
            output::note("aborted", color, global.quiet);
            return Ok(());
        }
    }

    let controller = connect::<T>(resolved, args.view.page_size)?;
    open(&controller, &args.view).await?;
    for &id in &ids {
        controller.on_item_click(id, Modifiers::CTRL).await;
    }

    let report = controller.on_bulk_action(action).await?;

    let rows = outcome_rows(&report);
    let out = output::render_list(global.output, &rows, Clone::clone, |r| r.id.to_string())?;
    output::print_output(&out, global.quiet);
    output::success(
        &format!("{action}: {} {} done", report.total(), T::PATH),
        color,
        global.quiet,
    );
    Ok(())
}

async fn export<T: Resource>(
    args: &ExportArgs,
    resolved: &Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let controller = connect::<T>(resolved, args.view.page_size)?;
    open(&controller, &args.view).await?;

    let exporter: &dyn Exporter<T> = match args.format {
        ExportFormatArg::Csv => &CsvExporter,
        ExportFormatArg::Json => &JsonExporter,
    };
    let artifact = if args.all {
        controller.export_all(exporter).await?
    } else {
        controller.export_current_view(exporter).await?
    };
    artifact.write_atomic(&args.file)?;

    let color = output::should_color(global.color);
    output::success(
        &format!(
            "wrote {} row(s), {}, to {}",
            artifact.rows,
            artifact.scope,
            args.file.display()
        ),
        color,
        global.quiet,
    );
    if artifact.scope.is_partial() {
        output::note(
            "only the visible page was exported; pass --all for every matching row",
            color,
            global.quiet,
        );
    }
    Ok(())
}

pub async fn reset_password(
    id: i64,
    resolved: &Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let controller = connect::<User>(resolved, None)?;
    controller.run_action(id, Action::ResetPassword).await?;
    output::success(
        &format!("password reset sent for user {id}"),
        output::should_color(global.color),
        global.quiet,
    );
    Ok(())
}
