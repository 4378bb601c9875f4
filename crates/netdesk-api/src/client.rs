// Async HTTP client for the portal's paginated resource endpoints.
//
// Every resource (devices, users, equipment, ...) exposes the same shape:
// a paginated, searchable listing plus per-item mutations.

use std::fmt::Display;

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{ActivePatch, ErrorResponse, ListParams, Mutation, PageResponse};

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the portal REST API.
///
/// Cheap to clone; the underlying `reqwest::Client` pools connections.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client for `base_url` using the shared transport settings.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(http, base_url)
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Ensure the base path ends with `/` so relative joins append.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Fetch one page of `resource`.
    pub async fn list_page<T: DeserializeOwned>(
        &self,
        resource: &str,
        params: &ListParams<'_>,
    ) -> Result<PageResponse<T>, Error> {
        let url = self.url(resource)?;
        let query = params.to_query();
        debug!("GET {url} params={query:?}");

        let resp = self.http.get(url).query(&query).send().await?;
        self.handle_response(resp).await
    }

    /// Apply a single mutation to the item `id` of `resource`.
    pub async fn mutate(
        &self,
        resource: &str,
        id: impl Display,
        mutation: Mutation,
    ) -> Result<(), Error> {
        let item = format!("{}/{id}", resource.trim_end_matches('/'));
        let resp = match mutation {
            Mutation::SetActive(active) => {
                let url = self.url(&item)?;
                debug!("PATCH {url} active={active}");
                self.http
                    .patch(url)
                    .json(&ActivePatch { active })
                    .send()
                    .await?
            }
            Mutation::Delete => {
                let url = self.url(&item)?;
                debug!("DELETE {url}");
                self.http.delete(url).send().await?
            }
            Mutation::ResetPassword => {
                let url = self.url(&format!("{item}/reset-password"))?;
                debug!("POST {url}");
                self.http.post(url).send().await?
            }
        };
        self.handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<ErrorResponse>(&raw).ok();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Error::Authentication {
                message: parsed
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "token rejected by server".into()),
            };
        }

        match parsed {
            Some(err) => Error::Api {
                status: status.as_u16(),
                message: err.message.unwrap_or_else(|| status.to_string()),
                code: err.code,
            },
            None => Error::Api {
                status: status.as_u16(),
                message: if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                },
                code: None,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = RestClient::with_client(reqwest::Client::new(), "https://portal.local/api")
            .unwrap();
        assert_eq!(client.base_url().as_str(), "https://portal.local/api/");
        assert_eq!(
            client.url("devices").unwrap().as_str(),
            "https://portal.local/api/devices"
        );
    }

    #[test]
    fn list_params_omit_empty_search() {
        let params = ListParams {
            page: 2,
            page_size: 20,
            search: "",
        };
        assert_eq!(
            params.to_query(),
            vec![("page", "2".to_owned()), ("pageSize", "20".to_owned())]
        );
    }
}
