//! Functional tests for model imports driven by commands.
//!
//! Core guarantees exercised here:
//! - Archive references are rewritten to local resources; unresolved ones
//!   stay verbatim and are reported.
//! - Resources owned by an object are released exactly once, whether it is
//!   deleted on its own or swept by a later clear.
//! - Required glTF extensions are reported, never a reason to refuse a model.
//! - Offer mode waits for an explicit choice and imports only that one.

use pretty_assertions::assert_eq;
use sculpt_core::prelude::*;
use sculpt_scene::ResourceHandle;
use sculpt_test_utils::{
    create_candidate, create_glb, create_tree_archive, create_zip, gltf_with_uris, minimal_gltf, FakeAssetService, ScriptedModel,
};
use serde_json::Value;
use std::sync::Arc;

fn tree_service() -> FakeAssetService {
    FakeAssetService::new()
        .with_model("tree", create_candidate("pine", "Pine", 3), create_tree_archive())
        .with_model("tree", create_candidate("oak", "Oak", 40), create_tree_archive())
}

/// Tenet: two resolvable references are rewritten, the third is reported.
#[tokio::test]
async fn archive_import_rewrites_references() {
    let model = Arc::new(ScriptedModel::new([r#"{"action": "search", "value": "tree"}"#]));
    let p = CommandPipeline::new(model, Arc::new(tree_service()));

    let report = p.execute("add a tree").await.unwrap();
    assert_eq!(report.applied(), 1);
    assert!(report.text().starts_with("Imported 'Oak' as tree"), "{}", report.text());
    assert!(report.text().contains("1 import warning(s)"));
    assert!(report.text().contains("textures/leaves.png"));

    let (document, assets) = p
        .with_scene(|s| {
            let resources = s.iter().next().and_then(|o| o.resources()).unwrap();
            (resources.document, resources.assets.clone())
        })
        .await;
    // scene.bin and bark.png; license.txt was dropped
    assert_eq!(assets.len(), 2);
    assert_eq!(p.arena().len(), 3);

    let bytes = p.arena().bytes(document).unwrap();
    let doc: Value = serde_json::from_slice(&bytes).unwrap();
    let buffer = ResourceHandle::from_uri(doc["buffers"][0]["uri"].as_str().unwrap()).unwrap();
    let bark = ResourceHandle::from_uri(doc["images"][0]["uri"].as_str().unwrap()).unwrap();
    assert_eq!(p.arena().label(buffer).as_deref(), Some("tree/scene.bin"));
    assert_eq!(p.arena().label(bark).as_deref(), Some("tree/textures/bark.png"));
    assert_eq!(doc["images"][1]["uri"], "textures/leaves.png");
}

/// Tenet: a binary model inside an archive keeps none of its siblings.
#[tokio::test]
async fn binary_model_in_archive_releases_siblings() {
    let glb = create_glb(&minimal_gltf());
    let archive = create_zip(&[
        ("lamp/lamp.glb", &glb),
        ("lamp/preview.jpg", b"\xFF\xD8\xFF"),
        ("lamp/readme.txt", b"enjoy"),
    ]);
    let service = FakeAssetService::new().with_model("lamp", create_candidate("lamp-1", "Lamp", 1), archive);
    let model = Arc::new(ScriptedModel::new([r#"{"action": "search", "value": "lamp"}"#]));
    let p = CommandPipeline::new(model, Arc::new(service));

    let report = p.execute("add a lamp").await.unwrap();
    assert_eq!(report.applied(), 1, "{}", report.text());

    let stats = p.arena().stats();
    assert_eq!(stats.live, 1);
    assert_eq!(stats.total_freed, 2);
}

/// Tenet: a document requiring an extension the reader does not know is
/// still placed; the extension shows up as a warning.
#[tokio::test]
async fn required_extension_does_not_block_import() {
    let mut document = gltf_with_uris(&["scene.bin"], &[]);
    document["extensionsUsed"] = serde_json::json!(["KHR_texture_transform"]);
    document["extensionsRequired"] = serde_json::json!(["KHR_texture_transform"]);
    let text = serde_json::to_vec(&document).unwrap();
    let archive = create_zip(&[("bench/scene.gltf", &text), ("bench/scene.bin", b"\0\0\0\0")]);

    let service = FakeAssetService::new().with_model("bench", create_candidate("bench-1", "Bench", 2), archive);
    let model = Arc::new(ScriptedModel::new([r#"{"action": "search", "value": "bench"}"#]));
    let p = CommandPipeline::new(model, Arc::new(service));

    let report = p.execute("add a bench").await.unwrap();
    assert_eq!(report.applied(), 1, "{}", report.text());
    assert!(report.text().contains("KHR_texture_transform"));
    assert_eq!(p.arena().stats().live, 2);
}

/// Tenet: deleting an importer-owned object frees its handles once; a later
/// clear neither double-releases nor fails.
#[tokio::test]
async fn delete_then_clear_releases_once() {
    let model = Arc::new(ScriptedModel::new([
        r#"[{"action": "search", "value": "tree"}, {"action": "add", "type": "BoxGeometry"}]"#,
        r#"{"action": "manipulate", "actionType": "delete", "name": "tree"}"#,
        r#"{"action": "clear"}"#,
    ]));
    let p = CommandPipeline::new(model, Arc::new(tree_service()));

    p.execute("add a tree and a box").await.unwrap();
    assert_eq!(p.arena().len(), 3);

    let deleted = p.execute("delete the tree").await.unwrap();
    assert_eq!(deleted.applied(), 1, "{}", deleted.text());
    assert!(p.arena().is_empty());
    let freed_after_delete = p.arena().stats().total_freed;

    let cleared = p.execute("clear the scene").await.unwrap();
    assert_eq!(cleared.applied(), 1);
    assert!(p.snapshot().objects.is_empty());

    let stats = p.arena().stats();
    assert_eq!(stats.total_freed, freed_after_delete);
    assert_eq!(stats.total_freed, stats.total_inserted);
}

/// Tenet: an empty search is a failed entry, not a failed command.
#[tokio::test]
async fn search_without_results_is_reported() {
    let model = Arc::new(ScriptedModel::new([
        r#"[{"action": "search", "value": "unicorn"}, {"action": "add", "type": "SphereGeometry"}]"#,
    ]));
    let p = CommandPipeline::new(model, Arc::new(FakeAssetService::new()));

    let report = p.execute("add a unicorn and a sphere").await.unwrap();
    assert_eq!(report.entries[0].status, EntryStatus::Failed);
    assert_eq!(report.entries[0].message, "No downloadable models found for 'unicorn'.");
    assert_eq!(report.entries[1].status, EntryStatus::Applied);
    assert!(p.arena().is_empty());
}

/// Tenet: service outages surface as feedback.
#[tokio::test]
async fn search_service_failure_is_reported() {
    let model = Arc::new(ScriptedModel::new([r#"{"action": "search", "value": "car"}"#]));
    let p = CommandPipeline::new(model, Arc::new(FakeAssetService::new().with_failing_search(503)));

    let report = p.execute("add a car").await.unwrap();
    assert_eq!(report.failed(), 1);
    assert!(report.text().starts_with("Could not import 'car'"));
}

/// Tenet: offer mode lists ranked candidates and imports only the chosen one.
#[tokio::test]
async fn offer_then_choose() {
    let service = Arc::new(tree_service());
    let model = Arc::new(ScriptedModel::new([r#"{"action": "search", "value": "tree"}"#]));
    let p = CommandPipeline::new(model, Arc::clone(&service) as Arc<dyn sculpt_import::AssetService>)
        .with_search_mode(SearchMode::Offer { count: 1 });

    let offered = p.execute("find a tree").await.unwrap();
    assert_eq!(offered.text(), "Found 1 model(s) for 'tree':\n  [0] Oak (40 likes, 400 views)");
    assert!(p.snapshot().objects.is_empty());
    assert_eq!(service.fetch_count("oak"), 0);

    assert!(matches!(
        p.choose(3).await,
        Err(PipelineError::ChoiceOutOfRange { index: 3, available: 1 })
    ));

    let chosen = p.choose(0).await.unwrap();
    assert_eq!(chosen.applied(), 1, "{}", chosen.text());
    assert_eq!(service.fetch_count("oak"), 1);
    assert_eq!(service.fetch_count("pine"), 0);
    assert_eq!(p.snapshot().objects[0].name, "tree");

    assert!(p.pending_choices().await.is_none());
    assert!(matches!(p.choose(0).await, Err(PipelineError::NoPendingChoice)));
}
