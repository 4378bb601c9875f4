//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled on stderr.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Status line on stderr (`✓ ...`), green when color is on.
pub fn success(message: &str, color: bool, quiet: bool) {
    if quiet {
        return;
    }
    if color {
        eprintln!("{} {message}", "✓".green());
    } else {
        eprintln!("✓ {message}");
    }
}

/// Secondary information on stderr, dimmed when color is on.
pub fn note(message: &str, color: bool, quiet: bool) {
    if quiet {
        return;
    }
    if color {
        eprintln!("{}", message.dimmed());
    } else {
        eprintln!("{message}");
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json_pretty(data),
        OutputFormat::JsonCompact => render_json_compact(data),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses a custom `detail_fn` that returns a pre-formatted
/// string, since single-item views don't use `Tabled`.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json_pretty(data),
        OutputFormat::JsonCompact => render_json_compact(data),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json_pretty<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(data).map_err(|e| CliError::Render(e.to_string()))
}

fn render_json_compact<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_json::to_string(data).map_err(|e| CliError::Render(e.to_string()))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Render(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Item {
        id: i64,
        name: &'static str,
    }

    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "ID")]
        id: String,
    }

    fn items() -> Vec<Item> {
        vec![Item { id: 1, name: "a" }, Item { id: 2, name: "b" }]
    }

    fn render(format: OutputFormat) -> String {
        render_list(
            format,
            &items(),
            |i| ItemRow {
                id: i.id.to_string(),
            },
            |i| i.id.to_string(),
        )
        .unwrap()
    }

    #[test]
    fn plain_is_one_id_per_line() {
        assert_eq!(render(OutputFormat::Plain), "1\n2");
    }

    #[test]
    fn compact_json_is_single_line() {
        assert_eq!(
            render(OutputFormat::JsonCompact),
            r#"[{"id":1,"name":"a"},{"id":2,"name":"b"}]"#
        );
    }

    #[test]
    fn table_has_header() {
        let table = render(OutputFormat::Table);
        assert!(table.contains("ID"));
        assert!(table.contains('2'));
    }
}
