//! glTF resource reference rewriting
//!
//! Points `buffers[*].uri` and `images[*].uri` of a text glTF document at the
//! arena entries extracted alongside it. Embedded `data:` URIs are left alone;
//! references with no matching entry are kept verbatim and reported.
//! Required extensions are only reported: nothing here decodes geometry.

use crate::error::ImportError;
use crate::package::{normalize_path, parent_dir};
use gltf::json::extensions::ENABLED_EXTENSIONS;
use percent_encoding::percent_decode_str;
use sculpt_scene::ResourceHandle;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Top-level arrays whose elements may carry a `uri`
const URI_ARRAYS: [&str; 2] = ["buffers", "images"];

/// What a rewrite did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// `(original uri, handle)` for every replaced reference
    pub replaced: Vec<(String, ResourceHandle)>,
    /// Embedded `data:` references skipped
    pub embedded: usize,
    /// One line per reference left untouched
    pub warnings: Vec<String>,
}

impl RewriteReport {
    /// Handles referenced by the rewritten document
    #[must_use]
    pub fn used_handles(&self) -> BTreeSet<ResourceHandle> {
        self.replaced.iter().map(|(_, h)| *h).collect()
    }
}

/// Parse a text glTF document, checking its structure only
///
/// # Errors
/// - `ImportError::InvalidDocument` for invalid JSON or a document that does
///   not have the glTF root shape
pub fn parse_document(bytes: &[u8]) -> Result<Value, ImportError> {
    serde_json::from_slice::<gltf::json::Root>(bytes).map_err(|e| ImportError::InvalidDocument(e.to_string()))?;
    serde_json::from_slice(bytes).map_err(|e| ImportError::InvalidDocument(e.to_string()))
}

/// Entries of `extensionsRequired` the glTF reader was not built with
#[must_use]
pub fn unsupported_extensions(document: &Value) -> Vec<String> {
    document
        .get("extensionsRequired")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .filter(|name| !ENABLED_EXTENSIONS.contains(name))
        .map(str::to_string)
        .collect()
}

/// Validate a binary glTF container
///
/// # Errors
/// - `ImportError::InvalidDocument` for a malformed container
pub fn validate_glb(bytes: &[u8]) -> Result<(), ImportError> {
    gltf::Glb::from_slice(bytes)
        .map(|_| ())
        .map_err(|e| ImportError::InvalidDocument(e.to_string()))
}

/// Replace resolvable URIs in `document` with local resource URIs
///
/// `model_path` is the normalized archive path of the document; references
/// resolve relative to its directory.
pub fn rewrite_document(
    document: &mut Value,
    model_path: &str,
    assets: &BTreeMap<String, ResourceHandle>,
) -> RewriteReport {
    let base = parent_dir(model_path);
    let mut report = RewriteReport::default();

    for extension in unsupported_extensions(document) {
        tracing::warn!(%extension, model = %model_path, "document requires an unsupported extension");
        report
            .warnings
            .push(format!("requires extension '{extension}', which is kept but not interpreted"));
    }

    for array in URI_ARRAYS {
        let Some(entries) = document.get_mut(array).and_then(Value::as_array_mut) else {
            continue;
        };

        for (index, entry) in entries.iter_mut().enumerate() {
            let Some(uri_value) = entry.get_mut("uri") else {
                continue;
            };
            let Some(uri) = uri_value.as_str() else {
                continue;
            };

            if uri.starts_with("data:") {
                report.embedded += 1;
                continue;
            }

            match lookup(uri, base, assets) {
                Some(handle) => {
                    report.replaced.push((uri.to_string(), handle));
                    *uri_value = Value::String(handle.uri());
                }
                None => {
                    tracing::warn!(%uri, array, index, model = %model_path, "unresolved resource reference");
                    report
                        .warnings
                        .push(format!("{array}[{index}]: no archive entry for '{uri}'"));
                }
            }
        }
    }

    tracing::debug!(
        replaced = report.replaced.len(),
        embedded = report.embedded,
        unresolved = report.warnings.len(),
        "document references rewritten"
    );
    report
}

fn lookup(uri: &str, base: &str, assets: &BTreeMap<String, ResourceHandle>) -> Option<ResourceHandle> {
    let relative = |reference: &str| {
        if base.is_empty() {
            normalize_path(reference)
        } else {
            normalize_path(&format!("{base}/{reference}"))
        }
    };

    let decoded = percent_decode_str(uri).decode_utf8_lossy();
    [
        relative(uri),
        relative(&decoded),
        normalize_path(uri),
        normalize_path(&decoded),
    ]
    .iter()
    .find_map(|path| assets.get(path).copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sculpt_scene::ResourceArena;
    use serde_json::json;

    fn assets(arena: &ResourceArena, paths: &[&str]) -> BTreeMap<String, ResourceHandle> {
        paths
            .iter()
            .map(|p| ((*p).to_string(), arena.insert(*p, p.as_bytes().to_vec())))
            .collect()
    }

    #[test]
    fn two_matched_one_unmatched() {
        let arena = ResourceArena::new();
        let assets = assets(&arena, &["car/scene.bin", "car/textures/paint.png"]);
        let mut doc = json!({
            "asset": {"version": "2.0"},
            "buffers": [{"uri": "scene.bin", "byteLength": 2}],
            "images": [{"uri": "./textures/paint.png"}, {"uri": "textures/missing.png"}]
        });

        let report = rewrite_document(&mut doc, "car/scene.gltf", &assets);

        assert_eq!(report.replaced.len(), 2);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(doc["buffers"][0]["uri"], assets["car/scene.bin"].uri());
        assert_eq!(doc["images"][0]["uri"], assets["car/textures/paint.png"].uri());
        assert_eq!(doc["images"][1]["uri"], "textures/missing.png");
        assert!(report.warnings[0].contains("images[1]"));
    }

    #[test]
    fn embedded_data_uris_are_skipped() {
        let arena = ResourceArena::new();
        let assets = assets(&arena, &[]);
        let data = "data:application/octet-stream;base64,AAAA";
        let mut doc = json!({"buffers": [{"uri": data, "byteLength": 3}]});

        let report = rewrite_document(&mut doc, "scene.gltf", &assets);
        assert_eq!(report.embedded, 1);
        assert!(report.warnings.is_empty());
        assert_eq!(doc["buffers"][0]["uri"], data);
    }

    #[test]
    fn leading_slash_and_parent_segments_resolve() {
        let arena = ResourceArena::new();
        let assets = assets(&arena, &["shared/tex.png", "scene.bin"]);
        let mut doc = json!({
            "buffers": [{"uri": "/scene.bin"}],
            "images": [{"uri": "../shared/tex.png"}]
        });

        let report = rewrite_document(&mut doc, "model/scene.gltf", &assets);
        assert_eq!(report.replaced.len(), 2);
        assert_eq!(report.used_handles().len(), 2);
    }

    #[test]
    fn percent_encoded_names_match() {
        let arena = ResourceArena::new();
        let assets = assets(&arena, &["tex/bark color.png"]);
        let mut doc = json!({"images": [{"uri": "tex/bark%20color.png"}]});
        let report = rewrite_document(&mut doc, "scene.gltf", &assets);
        assert_eq!(report.replaced.len(), 1);
    }

    #[test]
    fn malformed_escapes_stay_unresolved() {
        let arena = ResourceArena::new();
        let assets = assets(&arena, &["tex/a%2"]);
        let mut doc = json!({"images": [{"uri": "tex/a%2"}, {"uri": "tex/%41b.png"}]});
        let report = rewrite_document(&mut doc, "scene.gltf", &assets);
        assert_eq!(report.replaced.len(), 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("tex/%41b.png"));
    }

    #[test]
    fn entries_without_uri_are_ignored() {
        let arena = ResourceArena::new();
        let assets = assets(&arena, &[]);
        let mut doc = json!({"images": [{"bufferView": 0, "mimeType": "image/png"}]});
        let report = rewrite_document(&mut doc, "scene.gltf", &assets);
        assert_eq!(report, RewriteReport::default());
    }

    #[test]
    fn document_validation() {
        assert!(parse_document(br#"{"asset":{"version":"2.0"}}"#).is_ok());
        assert!(matches!(parse_document(b"{not json"), Err(ImportError::InvalidDocument(_))));
        assert!(matches!(validate_glb(b"glTF\x01"), Err(ImportError::InvalidDocument(_))));
        assert!(matches!(parse_document(br#"{"asset":{"version":"2.0"},"buffers":{}}"#), Err(ImportError::InvalidDocument(_))));
    }

    #[test]
    fn required_extensions_are_reported_not_rejected() {
        for extension in [
            "KHR_texture_transform",
            "KHR_draco_mesh_compression",
            "KHR_materials_pbrSpecularGlossiness",
        ] {
            let text = format!(r#"{{"asset":{{"version":"2.0"}},"extensionsUsed":["{extension}"],"extensionsRequired":["{extension}"]}}"#);
            let mut doc = parse_document(text.as_bytes()).unwrap();
            assert_eq!(unsupported_extensions(&doc), vec![extension.to_string()]);

            let arena = ResourceArena::new();
            let report = rewrite_document(&mut doc, "scene.gltf", &assets(&arena, &[]));
            assert_eq!(report.warnings.len(), 1);
            assert!(report.warnings[0].contains(extension));
        }
    }
}
