use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::config::Config;
use crate::error::ClientError;
use crate::flag::{
    parse_overrides, DashboardStats, Override, Overrides, SegmentOperation, SegmentOverridePayload,
    SegmentOverrides,
};

const USER_AGENT: &str = "flag-dashboard";

/// The synchronizer admin endpoints the dashboard talks to.
#[async_trait]
pub trait AdminApi: Send + Sync {
    async fn dashboard_stats(&self) -> Result<DashboardStats, ClientError>;

    async fn flag_overrides(&self) -> Result<Overrides, ClientError>;

    /// Creates or updates the override for `name` with the fields present in `patch`.
    async fn save_flag_override(&self, name: &str, patch: &Override) -> Result<(), ClientError>;

    async fn remove_flag_override(&self, name: &str) -> Result<(), ClientError>;

    async fn segment_overrides(&self) -> Result<SegmentOverrides, ClientError>;

    async fn save_segment_override(
        &self,
        segment: &str,
        key: &str,
        operation: SegmentOperation,
    ) -> Result<(), ClientError>;

    async fn remove_segment_override(&self, segment: &str, key: &str) -> Result<(), ClientError>;
}

#[derive(Clone)]
pub struct AdminClient {
    base_url: Url,
    client: reqwest::Client,
}

impl AdminClient {
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.admin_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{e} {}", config.admin_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(config.admin_url.clone()));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout.0)
            .danger_accept_invalid_certs(config.skip_ssl_verification)
            .build()?;

        Ok(Self { base_url, client })
    }

    /// Joins `segments` under `/admin`, percent-encoding each one.
    pub fn admin_url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("admin")
            .extend(segments);
        Ok(url)
    }

    async fn send<F: FnOnce(RequestBuilder) -> RequestBuilder>(
        &self,
        method: Method,
        url: Url,
        builder: F,
    ) -> Result<Response, ClientError> {
        debug!("sending request {method} {url}");
        let response = builder(self.client.request(method, url)).send().await?;

        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status().as_u16();
            let url = Box::new(response.url().clone());
            let body = response.text().await?;
            Err(ClientError::ApiError(status, url, body))
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        let response = self.send(Method::GET, url.clone(), |r| r).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ClientError::ParseError(Box::new(url), e))
    }
}

#[async_trait]
impl AdminApi for AdminClient {
    #[instrument(skip_all)]
    async fn dashboard_stats(&self) -> Result<DashboardStats, ClientError> {
        let url = self.admin_url(&["dashboard", "stats"])?;
        self.get_json(url).await
    }

    #[instrument(skip_all)]
    async fn flag_overrides(&self) -> Result<Overrides, ClientError> {
        let url = self.admin_url(&["overrides", "ff"])?;
        let response = self.send(Method::GET, url.clone(), |r| r).await?;
        let body = response.text().await?;
        parse_overrides(&body).map_err(|e| ClientError::ParseError(Box::new(url), e))
    }

    #[instrument(skip(self, patch))]
    async fn save_flag_override(&self, name: &str, patch: &Override) -> Result<(), ClientError> {
        let url = self.admin_url(&["overrides", "ff", name])?;
        self.send(Method::POST, url, |r| r.json(patch)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_flag_override(&self, name: &str) -> Result<(), ClientError> {
        let url = self.admin_url(&["overrides", "ff", name])?;
        self.send(Method::DELETE, url, |r| r).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn segment_overrides(&self) -> Result<SegmentOverrides, ClientError> {
        let url = self.admin_url(&["overrides", "segment"])?;
        let overrides: Option<SegmentOverrides> = self.get_json(url).await?;
        Ok(overrides.unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn save_segment_override(
        &self,
        segment: &str,
        key: &str,
        operation: SegmentOperation,
    ) -> Result<(), ClientError> {
        let url = self.admin_url(&["overrides", "segment", segment, key])?;
        let payload = SegmentOverridePayload { operation };
        self.send(Method::POST, url, |r| r.json(&payload)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_segment_override(&self, segment: &str, key: &str) -> Result<(), ClientError> {
        let url = self.admin_url(&["overrides", "segment", segment, key])?;
        self.send(Method::DELETE, url, |r| r).await?;
        Ok(())
    }
}
