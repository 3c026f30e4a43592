//! Sculpt Import - remote asset import pipeline
//!
//! Brings models from a remote library into the resource arena:
//! - `AssetService` / `SketchfabClient`: search, download descriptor, fetch
//! - `package`: magic-byte sniffing and zip extraction
//! - `rewrite`: pointing glTF buffer and image URIs at arena entries
//! - `AssetImporter`: the whole flow behind a staging guard
//!
//! # Example
//!
//! ```rust
//! use sculpt_import::{sniff, PackageKind};
//!
//! assert_eq!(sniff(b"glTF\x02\0\0\0").unwrap(), PackageKind::Binary);
//! assert!(sniff(b"GIF89a").is_err());
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod importer;
pub mod package;
pub mod rewrite;
pub mod service;
pub mod sketchfab;

pub use error::ImportError;
pub use importer::{AssetImporter, ImportedModel};
pub use package::{extract_archive, normalize_path, sniff, ExtractedArchive, ModelEntry, ModelFormat, PackageKind};
pub use rewrite::{parse_document, rewrite_document, validate_glb, RewriteReport};
pub use service::{rank, AssetCandidate, AssetService, DownloadDescriptor, PackageHint};
pub use sketchfab::{AssetConfig, SketchfabClient, DEFAULT_BASE_URL};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
