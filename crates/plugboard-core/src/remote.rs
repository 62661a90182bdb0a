use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::CatalogError;
use crate::models::AppRecord;

/// Remote catalog operations the state manager depends on.
///
/// `enable` and `delete` report business-level success as a boolean (the
/// server may refuse, e.g. a paid app without a subscription); transport and
/// server faults surface as `CatalogError::Remote`.
#[async_trait::async_trait]
pub trait RemoteAppService: Send + Sync {
    async fn list_apps(&self) -> Result<Vec<AppRecord>, CatalogError>;
    async fn enable(&self, app_id: &str) -> Result<bool, CatalogError>;
    async fn disable(&self, app_id: &str) -> Result<(), CatalogError>;
    async fn delete(&self, app_id: &str) -> Result<bool, CatalogError>;
    async fn check_owner(&self, app_id: &str) -> Result<bool, CatalogError>;
    async fn set_visibility(&self, app_id: &str, is_public: bool) -> Result<(), CatalogError>;
}

/// Response envelope from the apps listing endpoint
#[derive(Debug, Deserialize)]
struct AppsResponse {
    data: Vec<AppRecord>,
}

#[derive(Debug, Deserialize)]
struct OwnerResponse {
    is_owner: bool,
}

/// HTTP client for the catalog API
pub struct HttpAppService {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpAppService {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.client.request(method, &url);
        if let Some(ref key) = self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }
        builder
    }

    /// Sends a request whose outcome is a business-level yes/no: 2xx means
    /// accepted, 4xx means refused, anything else is a fault.
    async fn send_boolean(&self, method: reqwest::Method, path: &str) -> Result<bool> {
        let response = self
            .request(method, path)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", path))?;

        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(%status, %body, path, "catalog API refused request");
            return Ok(false);
        }
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Catalog API error ({}): {}", status, body);
    }

    async fn send_expect_success(&self, method: reqwest::Method, path: &str) -> Result<()> {
        let response = self
            .request(method, path)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", path))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Catalog API error ({}): {}", status, body);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RemoteAppService for HttpAppService {
    async fn list_apps(&self) -> Result<Vec<AppRecord>, CatalogError> {
        let response = self
            .request(reqwest::Method::GET, "/apps")
            .send()
            .await
            .map_err(CatalogError::remote)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Remote {
                message: format!("Catalog API error ({}): {}", status, body),
            });
        }

        let apps: AppsResponse = response.json().await.map_err(CatalogError::remote)?;
        Ok(apps.data)
    }

    async fn enable(&self, app_id: &str) -> Result<bool, CatalogError> {
        self.send_boolean(reqwest::Method::POST, &format!("/apps/{}/enable", app_id))
            .await
            .map_err(CatalogError::remote)
    }

    async fn disable(&self, app_id: &str) -> Result<(), CatalogError> {
        self.send_expect_success(reqwest::Method::POST, &format!("/apps/{}/disable", app_id))
            .await
            .map_err(CatalogError::remote)
    }

    async fn delete(&self, app_id: &str) -> Result<bool, CatalogError> {
        self.send_boolean(reqwest::Method::DELETE, &format!("/apps/{}", app_id))
            .await
            .map_err(CatalogError::remote)
    }

    async fn check_owner(&self, app_id: &str) -> Result<bool, CatalogError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/apps/{}/owner", app_id))
            .send()
            .await
            .map_err(CatalogError::remote)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Remote {
                message: format!("Catalog API error ({}): {}", status, body),
            });
        }

        let owner: OwnerResponse = response.json().await.map_err(CatalogError::remote)?;
        Ok(owner.is_owner)
    }

    async fn set_visibility(&self, app_id: &str, is_public: bool) -> Result<(), CatalogError> {
        let path = format!(
            "/apps/{}/visibility?private={}",
            app_id,
            if is_public { "false" } else { "true" }
        );
        self.send_expect_success(reqwest::Method::PATCH, &path)
            .await
            .map_err(CatalogError::remote)
    }
}
