//! Where capability sets come from.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Serialize;

use ledgerly_auth::{BearerToken, Capabilities};

use crate::error::FetchError;

/// Tenant-specific permission overrides.
pub const PERMISSIONS_PATH: &str = "/api/clients/my/permissions";

/// The owning client record; its capability fields are the tenant defaults.
pub const TENANT_PATH: &str = "/api/clients/my";

/// Which record a capability set was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityOrigin {
    /// The permissions endpoint answered.
    Override,
    /// The permissions endpoint had nothing (404); defaults of the tenant record.
    TenantDefaults,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedCapabilities {
    pub capabilities: Capabilities,
    pub origin: CapabilityOrigin,
    pub fetched_at: DateTime<Utc>,
}

impl FetchedCapabilities {
    pub fn new(capabilities: Capabilities, origin: CapabilityOrigin) -> Self {
        Self {
            capabilities,
            origin,
            fetched_at: Utc::now(),
        }
    }
}

/// Backing service for capability sets.
#[async_trait]
pub trait CapabilitySource: Send + Sync {
    async fn fetch(&self, token: &BearerToken) -> Result<FetchedCapabilities, FetchError>;
}

/// Capability source backed by the Ledgerly REST API.
#[derive(Debug, Clone)]
pub struct HttpCapabilitySource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCapabilitySource {
    /// `timeout: None` leaves requests unbounded.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str, token: &BearerToken) -> Result<reqwest::Response, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .get(&url)
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }

    async fn read_capabilities(resp: reqwest::Response) -> Result<Capabilities, FetchError> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(FetchError::Api(status.as_u16(), body));
        }

        serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

#[async_trait]
impl CapabilitySource for HttpCapabilitySource {
    async fn fetch(&self, token: &BearerToken) -> Result<FetchedCapabilities, FetchError> {
        let resp = self.get(PERMISSIONS_PATH, token).await?;

        if resp.status() == StatusCode::NOT_FOUND {
            tracing::warn!("no permission overrides for tenant; falling back to tenant defaults");
            let fallback = self.get(TENANT_PATH, token).await?;
            let capabilities = Self::read_capabilities(fallback).await?;
            return Ok(FetchedCapabilities::new(
                capabilities,
                CapabilityOrigin::TenantDefaults,
            ));
        }

        let capabilities = Self::read_capabilities(resp).await?;
        Ok(FetchedCapabilities::new(capabilities, CapabilityOrigin::Override))
    }
}
