//! Package sniffing and archive extraction
//!
//! Downloads are identified by their leading bytes, never by the service's
//! announcement. Archive entries are normalized to forward-slash relative
//! paths so they can be matched against glTF URIs.

use crate::error::ImportError;
use sculpt_scene::{ResourceHandle, StagedResources};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const GLB_MAGIC: &[u8] = b"glTF";

/// Packaging identified from magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    /// Zip archive
    Archive,
    /// Binary glTF
    Binary,
    /// JSON glTF
    Text,
}

/// Model document format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    /// `.gltf`
    Gltf,
    /// `.glb`
    Glb,
}

impl ModelFormat {
    /// Format implied by a file name
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let (_, ext) = path.rsplit_once('.')?;
        if ext.eq_ignore_ascii_case("gltf") {
            Some(Self::Gltf)
        } else if ext.eq_ignore_ascii_case("glb") {
            Some(Self::Glb)
        } else {
            None
        }
    }
}

/// Identify a download by its leading bytes
///
/// # Errors
/// - `ImportError::UnsupportedFormat` for anything else
pub fn sniff(bytes: &[u8]) -> Result<PackageKind, ImportError> {
    if bytes.starts_with(ZIP_MAGIC) {
        return Ok(PackageKind::Archive);
    }
    if bytes.starts_with(GLB_MAGIC) {
        return Ok(PackageKind::Binary);
    }

    let text = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if text.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{') {
        return Ok(PackageKind::Text);
    }

    let head: String = bytes
        .iter()
        .take(8)
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ");
    Err(ImportError::UnsupportedFormat {
        detail: if bytes.is_empty() {
            "empty download".to_string()
        } else {
            format!("unrecognized leading bytes [{head}]")
        },
    })
}

/// Normalize a relative path: forward slashes, no `.` segments, `..` applied,
/// no leading `./` or `/`
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Directory part of a normalized path (empty at the root)
#[must_use]
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// The model entry of a package
#[derive(Debug, Clone)]
pub struct ModelEntry {
    /// Normalized archive path (or a synthetic name for bare downloads)
    pub path: String,
    /// Document format
    pub format: ModelFormat,
    /// Raw document bytes
    pub bytes: Vec<u8>,
}

/// Result of unpacking an archive
#[derive(Debug)]
pub struct ExtractedArchive {
    /// First `.gltf`/`.glb` entry
    pub model: ModelEntry,
    /// Every other file, by normalized path
    pub assets: BTreeMap<String, ResourceHandle>,
}

/// Unpack a zip archive, staging every non-model file
///
/// The first `.gltf`/`.glb` entry in archive order is the model; later model
/// files are staged like any other asset.
///
/// # Errors
/// - `ImportError::Archive` / `ImportError::Io` for unreadable archives
/// - `ImportError::MissingModelEntry` when no model entry exists
pub fn extract_archive(bytes: &[u8], staged: &mut StagedResources) -> Result<ExtractedArchive, ImportError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut model: Option<ModelEntry> = None;
    let mut assets = BTreeMap::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }

        let path = normalize_path(entry.name());
        if path.is_empty() {
            continue;
        }

        let capacity = usize::try_from(entry.size()).unwrap_or(0);
        let mut data = Vec::with_capacity(capacity);
        entry.read_to_end(&mut data)?;

        match ModelFormat::from_path(&path) {
            Some(format) if model.is_none() => {
                tracing::debug!(%path, ?format, "model entry found");
                model = Some(ModelEntry {
                    path,
                    format,
                    bytes: data,
                });
            }
            _ => {
                let handle = staged.stage(path.clone(), data);
                assets.insert(path, handle);
            }
        }
    }

    let model = model.ok_or(ImportError::MissingModelEntry)?;
    tracing::debug!(model = %model.path, assets = assets.len(), "archive extracted");
    Ok(ExtractedArchive { model, assets })
}
