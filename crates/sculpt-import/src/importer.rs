//! Import orchestration
//!
//! search -> rank -> download -> sniff -> unpack -> rewrite -> scene object.
//! Everything materialized along the way is staged in a [`StagedResources`]
//! guard, so an error or a dropped future leaves the arena untouched.

use crate::error::ImportError;
use crate::package::{extract_archive, sniff, ModelEntry, ModelFormat, PackageKind};
use crate::rewrite::{parse_document, rewrite_document, validate_glb};
use crate::service::{rank, AssetCandidate, AssetService};
use glam::Vec3;
use sculpt_scene::{ModelResources, ResourceArena, SceneObject, StagedResources};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A model ready to be placed
#[derive(Debug)]
pub struct ImportedModel {
    /// Scene object owning the model's resources
    pub object: SceneObject,
    /// Candidate that was imported
    pub candidate: AssetCandidate,
    /// Document format
    pub format: ModelFormat,
    /// Unresolved references and similar non-fatal findings
    pub warnings: Vec<String>,
}

/// Runs the asset import pipeline against a service and an arena
#[derive(Clone)]
pub struct AssetImporter {
    service: Arc<dyn AssetService>,
    arena: Arc<ResourceArena>,
}

impl std::fmt::Debug for AssetImporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetImporter")
            .field("arena", &self.arena.stats())
            .finish_non_exhaustive()
    }
}

impl AssetImporter {
    /// Create importer
    #[must_use]
    pub fn new(service: Arc<dyn AssetService>, arena: Arc<ResourceArena>) -> Self {
        Self { service, arena }
    }

    /// Arena imports materialize into
    #[inline]
    #[must_use]
    pub fn arena(&self) -> &Arc<ResourceArena> {
        &self.arena
    }

    /// Ranked downloadable candidates for a term
    ///
    /// # Errors
    /// - `ImportError::NoResults` when nothing matches
    /// - `ImportError::Service` on transport failures
    pub async fn search(&self, term: &str) -> Result<Vec<AssetCandidate>, ImportError> {
        let mut candidates = self.service.search(term).await?;
        if candidates.is_empty() {
            return Err(ImportError::NoResults { term: term.to_string() });
        }
        rank(&mut candidates);
        tracing::debug!(term, candidates = candidates.len(), best = %candidates[0].uid, "candidates ranked");
        Ok(candidates)
    }

    /// Import the most popular candidate, named after the term
    ///
    /// # Errors
    /// Any `ImportError`; nothing stays in the arena on failure.
    pub async fn import_best(&self, term: &str, position: Vec3) -> Result<ImportedModel, ImportError> {
        let mut candidates = self.search(term).await?;
        let best = candidates.swap_remove(0);
        self.import_candidate(best, term, position).await
    }

    /// Import a specific candidate
    ///
    /// # Errors
    /// Any `ImportError`; nothing stays in the arena on failure.
    pub async fn import_candidate(
        &self,
        candidate: AssetCandidate,
        name: &str,
        position: Vec3,
    ) -> Result<ImportedModel, ImportError> {
        let descriptor = self.service.download_descriptor(&candidate.uid).await?;
        tracing::debug!(uid = %candidate.uid, hint = ?descriptor.format, "downloading model");
        let bytes = self.service.fetch(&descriptor.url).await?;

        let (resources, format, warnings) = self.materialize(&bytes)?;
        tracing::info!(
            uid = %candidate.uid,
            name,
            handles = resources.handle_count(),
            warnings = warnings.len(),
            "model imported"
        );

        Ok(ImportedModel {
            object: SceneObject::imported(name, resources, position),
            candidate,
            format,
            warnings,
        })
    }

    /// Turn downloaded bytes into committed model resources
    ///
    /// # Errors
    /// Format, archive and document errors; staged handles are released.
    pub fn materialize(&self, bytes: &[u8]) -> Result<(ModelResources, ModelFormat, Vec<String>), ImportError> {
        let mut staged = StagedResources::new(Arc::clone(&self.arena));

        let (model, assets) = match sniff(bytes)? {
            PackageKind::Archive => {
                let extracted = extract_archive(bytes, &mut staged)?;
                (extracted.model, extracted.assets)
            }
            PackageKind::Binary => (
                ModelEntry {
                    path: "model.glb".to_string(),
                    format: ModelFormat::Glb,
                    bytes: bytes.to_vec(),
                },
                BTreeMap::new(),
            ),
            PackageKind::Text => (
                ModelEntry {
                    path: "model.gltf".to_string(),
                    format: ModelFormat::Gltf,
                    bytes: bytes.to_vec(),
                },
                BTreeMap::new(),
            ),
        };

        match model.format {
            ModelFormat::Glb => {
                validate_glb(&model.bytes)?;
                let document = staged.stage(model.path, model.bytes);
                let freed = staged.discard_all_except(document);
                if freed > 0 {
                    tracing::debug!(freed, "sibling resources of binary model released");
                }
                Ok((staged.commit(document), ModelFormat::Glb, Vec::new()))
            }
            ModelFormat::Gltf => {
                let mut document = parse_document(&model.bytes)?;
                let report = rewrite_document(&mut document, &model.path, &assets);

                // Unreferenced side files (licenses, previews) are not kept
                let used = report.used_handles();
                for handle in assets.values().filter(|h| !used.contains(h)) {
                    staged.discard(*handle);
                }

                let patched = serde_json::to_vec(&document).map_err(|e| ImportError::InvalidDocument(e.to_string()))?;
                let handle = staged.stage(model.path, patched);
                Ok((staged.commit(handle), ModelFormat::Gltf, report.warnings))
            }
        }
    }
}
