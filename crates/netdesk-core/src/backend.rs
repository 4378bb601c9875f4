// ── Backend boundary ──
//
// The controller's only view of the server: fetch one page, mutate one
// item. `RestBackend` implements it over `netdesk_api::RestClient`;
// tests and other transports provide their own.

use std::future::Future;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use netdesk_api::{RestClient, TlsMode, TransportConfig};

use crate::config::{ConnectionConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::{Action, Entity, Page, PageQuery};

/// Server collaborator for one resource collection.
pub trait ResourceBackend<T: Entity>: Send + Sync + 'static {
    fn fetch_page(
        &self,
        query: &PageQuery,
    ) -> impl Future<Output = Result<Page<T>, CoreError>> + Send;

    fn mutate(
        &self,
        id: T::Id,
        action: Action,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// REST-backed collection at `{base_url}/{resource}`.
#[derive(Debug)]
pub struct RestBackend<T> {
    client: RestClient,
    resource: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for RestBackend<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            resource: self.resource.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> RestBackend<T> {
    pub fn new(client: RestClient, resource: impl Into<String>) -> Self {
        Self {
            client,
            resource: resource.into(),
            _marker: PhantomData,
        }
    }

    /// Build the HTTP client from a connection config.
    pub fn connect(config: &ConnectionConfig, resource: impl Into<String>) -> Result<Self, CoreError> {
        let client = RestClient::new(config.url.as_str(), &build_transport(config))?;
        Ok(Self::new(client, resource))
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl<T> ResourceBackend<T> for RestBackend<T>
where
    T: Entity + DeserializeOwned,
{
    async fn fetch_page(&self, query: &PageQuery) -> Result<Page<T>, CoreError> {
        let resp = self
            .client
            .list_page::<T>(&self.resource, &query.as_params())
            .await?;
        Ok(Page::from(resp))
    }

    async fn mutate(&self, id: T::Id, action: Action) -> Result<(), CoreError> {
        self.client
            .mutate(&self.resource, id, action.into())
            .await
            .map_err(CoreError::from)
    }
}

fn build_transport(config: &ConnectionConfig) -> TransportConfig {
    TransportConfig {
        tls: match &config.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        },
        timeout: config.timeout,
        token: config.token.clone(),
    }
}
