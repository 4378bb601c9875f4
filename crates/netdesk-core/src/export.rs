// ── Export snapshots ──
//
// Serializes loaded rows into a downloadable artifact. Artifacts are
// built entirely in memory and only then handed off, so a failure never
// leaves a half-written file behind.

use std::fmt;
use std::io::Write;
use std::path::Path;

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use strum::{Display, EnumString};

use crate::error::CoreError;
use crate::model::Page;

/// What part of the collection an artifact covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExportScope {
    /// Only the page that was on screen. Other pages are not included.
    CurrentPage { page: u32, total_pages: u32 },
    /// Every item matching the search, fetched explicitly for export.
    All { total_count: u64 },
}

impl ExportScope {
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::CurrentPage { total_pages, .. } if *total_pages > 1)
    }
}

impl fmt::Display for ExportScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CurrentPage { page, total_pages } => {
                write!(f, "page {page} of {total_pages} only")
            }
            Self::All { total_count } => write!(f, "all {total_count} item(s)"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
        }
    }
}

/// A fully built export, ready to be handed to the user.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub format: ExportFormat,
    pub scope: ExportScope,
    /// Number of data rows (header excluded).
    pub rows: usize,
    pub bytes: Bytes,
}

impl Artifact {
    /// Persist through a temp file in the destination directory, then
    /// rename over `path`.
    pub fn write_atomic(&self, path: &Path) -> Result<(), CoreError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let io_err = |e: std::io::Error| CoreError::Serialization {
            message: format!("failed to write {}: {e}", path.display()),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&self.bytes).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

// ── Serializers ──────────────────────────────────────────────────────

/// Turns a slice of rows into artifact bytes.
pub trait Exporter<T>: Send + Sync {
    fn format(&self) -> ExportFormat;

    fn serialize(&self, items: &[T]) -> Result<Bytes, CoreError>;
}

/// CSV with a header row derived from the record's field names.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter;

impl<T: Serialize> Exporter<T> for CsvExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn serialize(&self, items: &[T]) -> Result<Bytes, CoreError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for item in items {
            writer.serialize(item).map_err(|e| CoreError::Serialization {
                message: e.to_string(),
            })?;
        }
        let buf = writer.into_inner().map_err(|e| CoreError::Serialization {
            message: e.to_string(),
        })?;
        Ok(Bytes::from(buf))
    }
}

/// Pretty-printed JSON array.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExporter;

impl<T: Serialize> Exporter<T> for JsonExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn serialize(&self, items: &[T]) -> Result<Bytes, CoreError> {
        serde_json::to_vec_pretty(items)
            .map(Bytes::from)
            .map_err(|e| CoreError::Serialization {
                message: e.to_string(),
            })
    }
}

/// Build an artifact from exactly the rows of `page`.
///
/// Never fetches anything: in a paginated view the artifact covers only
/// the visible page, and its `scope` says so.
pub fn export_page<T>(
    resource: &str,
    page: &Page<T>,
    exporter: &dyn Exporter<T>,
) -> Result<Artifact, CoreError> {
    let scope = ExportScope::CurrentPage {
        page: page.page(),
        total_pages: page.total_pages(),
    };
    build_artifact(resource, page.items(), scope, exporter)
}

pub(crate) fn build_artifact<T>(
    resource: &str,
    items: &[T],
    scope: ExportScope,
    exporter: &dyn Exporter<T>,
) -> Result<Artifact, CoreError> {
    let format = exporter.format();
    let bytes = exporter.serialize(items)?;
    let suffix = match scope {
        ExportScope::CurrentPage { page, .. } => format!("-p{page}"),
        ExportScope::All { .. } => String::new(),
    };
    let file_name = format!(
        "{resource}{suffix}-{}.{}",
        Utc::now().format("%Y%m%d-%H%M%S"),
        format.extension()
    );
    Ok(Artifact {
        file_name,
        format,
        scope,
        rows: items.len(),
        bytes,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Debug, Clone, Serialize)]
    struct Row {
        id: u32,
        name: String,
        active: bool,
    }

    fn page_of(n: u32) -> Page<Row> {
        let items = (1..=n)
            .map(|id| Row {
                id,
                name: format!("pc-{id}"),
                active: id % 2 == 0,
            })
            .collect();
        Page::new(items, 2, 10, 47)
    }

    #[test]
    fn csv_has_header_plus_one_line_per_row() {
        let artifact = export_page("devices", &page_of(4), &CsvExporter).unwrap();
        let text = std::str::from_utf8(&artifact.bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(artifact.rows, 4);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "id,name,active");
        assert_eq!(lines[1], "1,pc-1,false");
    }

    #[test]
    fn export_never_exceeds_loaded_rows() {
        let artifact = export_page("devices", &page_of(7), &JsonExporter).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_slice(&artifact.bytes).unwrap();
        assert_eq!(parsed.len(), 7);
        assert_eq!(artifact.rows, 7);
    }

    #[test]
    fn scope_marks_partial_export() {
        let artifact = export_page("users", &page_of(3), &CsvExporter).unwrap();
        assert_eq!(
            artifact.scope,
            ExportScope::CurrentPage {
                page: 2,
                total_pages: 5
            }
        );
        assert!(artifact.scope.is_partial());
        assert!(artifact.file_name.starts_with("users-p2-"));
        assert!(artifact.file_name.ends_with(".csv"));
    }

    #[test]
    fn unserializable_rows_surface_serialization_error() {
        // Nested maps have no CSV representation.
        let mut nested = BTreeMap::new();
        nested.insert("inner", BTreeMap::from([("a", 1)]));
        let page = Page::new(vec![nested], 1, 10, 1);

        let err = export_page("devices", &page, &CsvExporter).unwrap_err();
        assert!(matches!(err, CoreError::Serialization { .. }));
    }

    #[test]
    fn write_atomic_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.csv");
        std::fs::write(&target, "old").unwrap();

        let artifact = export_page("devices", &page_of(2), &CsvExporter).unwrap();
        artifact.write_atomic(&target).unwrap();

        let written = std::fs::read(&target).unwrap();
        assert_eq!(written, artifact.bytes.to_vec());
    }
}
