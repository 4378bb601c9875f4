// ── Wire types for paginated resource endpoints ──

use serde::{Deserialize, Serialize};

/// One page of a resource listing as returned by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

/// Query parameters of a listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams<'a> {
    pub page: u32,
    pub page_size: u32,
    pub search: &'a str,
}

impl ListParams<'_> {
    pub(crate) fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("page", self.page.to_string()),
            ("pageSize", self.page_size.to_string()),
        ];
        if !self.search.is_empty() {
            query.push(("search", self.search.to_owned()));
        }
        query
    }
}

/// Per-item mutation understood by the resource endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// `PATCH {resource}/{id}` with `{"active": bool}`.
    SetActive(bool),
    /// `DELETE {resource}/{id}`.
    Delete,
    /// `POST {resource}/{id}/reset-password`.
    ResetPassword,
}

#[derive(Serialize)]
pub(crate) struct ActivePatch {
    pub active: bool,
}

/// Error body shape: `{"message": "...", "code": "..."}`.
#[derive(Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}
