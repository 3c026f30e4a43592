//! Sketchfab-compatible asset service over HTTP

use crate::error::ImportError;
use crate::service::{AssetCandidate, AssetService, DownloadDescriptor, PackageHint};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default API base
pub const DEFAULT_BASE_URL: &str = "https://api.sketchfab.com/v3";

/// Asset service section of the configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// API base URL
    pub base_url: String,
    /// API token, sent as `Authorization: Token <token>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Largest accepted download
    pub max_download_bytes: u64,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout_secs: 120,
            max_download_bytes: 256 * 1024 * 1024,
        }
    }
}

impl AssetConfig {
    /// Set base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set token
    #[inline]
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set timeout
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[derive(Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchHit {
    uid: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    view_count: u64,
    #[serde(default)]
    thumbnails: Option<Thumbnails>,
}

#[derive(Deserialize)]
struct Thumbnails {
    #[serde(default)]
    images: Vec<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
    #[serde(default)]
    width: u32,
}

#[derive(Deserialize)]
struct DownloadOptions {
    glb: Option<DownloadLink>,
    gltf: Option<DownloadLink>,
}

#[derive(Deserialize)]
struct DownloadLink {
    url: String,
    #[serde(default)]
    size: Option<u64>,
}

impl From<SearchHit> for AssetCandidate {
    fn from(hit: SearchHit) -> Self {
        // Largest preview
        let thumbnail = hit
            .thumbnails
            .and_then(|t| t.images.into_iter().max_by_key(|i| i.width))
            .map(|i| i.url);
        Self {
            uid: hit.uid,
            name: hit.name,
            like_count: hit.like_count,
            view_count: hit.view_count,
            thumbnail,
        }
    }
}

/// HTTP client for a Sketchfab-style model library
#[derive(Clone)]
pub struct SketchfabClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    max_download_bytes: u64,
}

impl std::fmt::Debug for SketchfabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SketchfabClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl SketchfabClient {
    /// Create client from configuration
    ///
    /// # Errors
    /// - `ImportError::Service` if the HTTP client cannot be built
    pub fn new(config: &AssetConfig) -> Result<Self, ImportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ImportError::service("client", None, format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            max_download_bytes: config.max_download_bytes,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn add_auth(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.header(reqwest::header::AUTHORIZATION, format!("Token {token}")),
            None => req,
        }
    }

    async fn send(&self, operation: &'static str, req: RequestBuilder) -> Result<Response, ImportError> {
        let resp = req
            .send()
            .await
            .map_err(|e| ImportError::service(operation, None, e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(ImportError::service(operation, Some(status.as_u16()), body))
        }
    }
}

#[async_trait]
impl AssetService for SketchfabClient {
    async fn search(&self, term: &str) -> Result<Vec<AssetCandidate>, ImportError> {
        let req = self
            .client
            .get(self.url("/search"))
            .query(&[("type", "models"), ("q", term), ("downloadable", "true")]);
        let page: SearchPage = self
            .send("search", self.add_auth(req))
            .await?
            .json()
            .await
            .map_err(|e| ImportError::service("search", None, e.to_string()))?;

        tracing::debug!(term, hits = page.results.len(), "asset search");
        Ok(page.results.into_iter().map(AssetCandidate::from).collect())
    }

    async fn download_descriptor(&self, uid: &str) -> Result<DownloadDescriptor, ImportError> {
        let req = self.client.get(self.url(&format!("/models/{uid}/download")));
        let options: DownloadOptions = self
            .send("download", self.add_auth(req))
            .await?
            .json()
            .await
            .map_err(|e| ImportError::service("download", None, e.to_string()))?;

        let (link, format) = match (options.glb, options.gltf) {
            (Some(glb), _) => (glb, PackageHint::Glb),
            (None, Some(gltf)) => (gltf, PackageHint::Gltf),
            (None, None) => {
                return Err(ImportError::UnsupportedFormat {
                    detail: format!("model {uid} offers neither glb nor gltf"),
                })
            }
        };

        Ok(DownloadDescriptor {
            url: link.url,
            format,
            size: link.size,
        })
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ImportError> {
        // Download URLs are pre-signed; no auth header
        let resp = self.send("fetch", self.client.get(url)).await?;
        let limit = self.max_download_bytes;
        if let Some(len) = resp.content_length().filter(|len| *len > limit) {
            return Err(ImportError::TooLarge { bytes: len, limit });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ImportError::service("fetch", None, e.to_string()))?;
        let len = bytes.len() as u64;
        if len > limit {
            return Err(ImportError::TooLarge { bytes: len, limit });
        }
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_hit_conversion_picks_largest_thumbnail() {
        let hit: SearchHit = serde_json::from_str(
            r#"{"uid":"abc","name":"Oak","likeCount":12,"viewCount":400,
                "thumbnails":{"images":[{"url":"small","width":64},{"url":"big","width":1024}]}}"#,
        )
        .unwrap();
        let candidate = AssetCandidate::from(hit);
        assert_eq!(candidate.uid, "abc");
        assert_eq!(candidate.like_count, 12);
        assert_eq!(candidate.thumbnail.as_deref(), Some("big"));
    }

    #[test]
    fn download_options_parse() {
        let options: DownloadOptions = serde_json::from_str(
            r#"{"gltf":{"url":"https://x/a.zip","size":10,"expires":300},"usdz":{"url":"u"}}"#,
        )
        .unwrap();
        assert!(options.glb.is_none());
        assert_eq!(options.gltf.map(|l| l.url), Some("https://x/a.zip".to_string()));
    }

    #[test]
    fn client_urls_and_debug() {
        let client = SketchfabClient::new(&AssetConfig::default().with_base_url("http://local/v3/").with_token("t"))
            .unwrap();
        assert_eq!(client.url("/search"), "http://local/v3/search");
        let debug = format!("{client:?}");
        assert!(debug.contains("authenticated: true"));
        assert!(!debug.contains("\"t\""));
    }
}
