//! HTTP client for the membership backend.
//!
//! This module provides the `ApiClient` struct for fetching a client's
//! membership bundle, probing the cheap version endpoint, and downloading
//! plan media.

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use crate::config::Config;
use crate::models::MembershipBundle;

use super::{ApiError, MembershipApi};

// ============================================================================
// Constants
// ============================================================================

/// Default base URL for the membership backend.
const API_BASE_URL: &str = "https://api.repcache.app";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Every JSON endpoint wraps its payload in a `data` envelope.
/// A response without `data` is unusable for that request.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct VersionPayload {
    version: String,
}

/// API client for the membership backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client against the default backend
    pub fn new() -> Result<Self, ApiError> {
        Self::with_base_url(API_BASE_URL)
    }

    /// Create a new API client against a specific backend host
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a client honoring the configured base URL override
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        match config.api_base_url {
            Some(ref url) => Self::with_base_url(url.clone()),
            None => Self::new(),
        }
    }

    /// Resolve a possibly-relative media URL against the API host.
    /// The backend serves plan media as `/files/...` paths.
    pub fn resolve_media_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn get_data<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self.client.get(url).send().await?;
        let response = Self::check_response(response).await?;

        let text = response.text().await?;
        let envelope: Envelope<T> = serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("{} from {}", e, url)))?;

        envelope.data.ok_or(ApiError::MissingData)
    }
}

#[async_trait]
impl MembershipApi for ApiClient {
    /// Fetch the full membership bundle for a client
    async fn fetch_membership(&self, membership_id: &str) -> Result<MembershipBundle, ApiError> {
        let url = format!("{}/memberships/{}", self.base_url, membership_id);
        debug!(membership_id, "fetching membership bundle");
        self.get_data(&url).await
    }

    /// Fetch only the opaque version token for a membership
    async fn fetch_membership_version(&self, membership_id: &str) -> Result<String, ApiError> {
        let url = format!("{}/memberships/{}/version", self.base_url, membership_id);
        let payload: VersionPayload = self.get_data(&url).await?;
        Ok(payload.version)
    }

    /// Download a media asset (exercise image or video)
    async fn fetch_media(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let resolved = self.resolve_media_url(url);
        let response = self.client.get(&resolved).send().await?;
        let response = Self::check_response(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_media_url() {
        let client = ApiClient::with_base_url("https://portal.example.com/").expect("client");
        assert_eq!(
            client.resolve_media_url("/files/squat.jpg"),
            "https://portal.example.com/files/squat.jpg"
        );
        assert_eq!(
            client.resolve_media_url("files/squat.jpg"),
            "https://portal.example.com/files/squat.jpg"
        );
        assert_eq!(
            client.resolve_media_url("https://cdn.example.com/squat.jpg"),
            "https://cdn.example.com/squat.jpg"
        );
    }

    #[test]
    fn test_envelope_missing_data() {
        let envelope: Envelope<VersionPayload> =
            serde_json::from_str(r#"{"message":"ok"}"#).expect("parse envelope");
        assert!(envelope.data.is_none());

        let envelope: Envelope<VersionPayload> =
            serde_json::from_str(r#"{"data":{"version":"v2"}}"#).expect("parse envelope");
        assert_eq!(envelope.data.expect("payload").version, "v2");
    }
}
