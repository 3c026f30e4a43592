//! Asset service seam
//!
//! `AssetService` is the three calls the import pipeline needs from a remote
//! model library: search, resolve a download, fetch bytes.

use crate::error::ImportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetCandidate {
    /// Service-side model id
    pub uid: String,
    /// Display name
    pub name: String,
    /// Likes
    #[serde(default)]
    pub like_count: u64,
    /// Views
    #[serde(default)]
    pub view_count: u64,
    /// Preview image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl AssetCandidate {
    /// Create candidate without popularity data
    #[must_use]
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            like_count: 0,
            view_count: 0,
            thumbnail: None,
        }
    }

    /// With popularity counters
    #[inline]
    #[must_use]
    pub fn with_popularity(mut self, likes: u64, views: u64) -> Self {
        self.like_count = likes;
        self.view_count = views;
        self
    }
}

/// Packaging the service announced for a download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageHint {
    /// Single binary glTF
    Glb,
    /// Archive with a text glTF and side files
    Gltf,
    /// Not stated
    Unknown,
}

/// Where to fetch a model from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadDescriptor {
    /// Direct download URL
    pub url: String,
    /// Announced packaging; the bytes are sniffed regardless
    pub format: PackageHint,
    /// Announced size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Remote model library
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetService: Send + Sync {
    /// Downloadable models matching a term
    async fn search(&self, term: &str) -> Result<Vec<AssetCandidate>, ImportError>;

    /// Resolve a model id into a download
    async fn download_descriptor(&self, uid: &str) -> Result<DownloadDescriptor, ImportError>;

    /// Fetch raw bytes
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ImportError>;
}

/// Sort by popularity: likes, then views, both descending
///
/// Stable, so equally popular candidates keep the service's order.
pub fn rank(candidates: &mut [AssetCandidate]) {
    candidates.sort_by(|a, b| {
        b.like_count
            .cmp(&a.like_count)
            .then_with(|| b.view_count.cmp(&a.view_count))
    });
}
