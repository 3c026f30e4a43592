//! Testing utilities for Sculpt workspace
//!
//! Shared fakes and fixtures: a scripted language model, an in-memory asset
//! library, zip/GLB builders and sample glTF documents.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sculpt_import::{AssetCandidate, AssetService, DownloadDescriptor, ImportError, PackageHint};
use sculpt_interpreter::{ChatRequest, InterpreterError, LanguageModel};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::io::{Cursor, Write};
use std::time::Duration;

/// Language model answering from a queue of canned responses
///
/// Every request is recorded. An exhausted queue answers with an empty
/// message, which the interpreter reports as `EmptyResponse`.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<String, InterpreterError>>>,
    requests: Mutex<Vec<ChatRequest>>,
    latency: Option<Duration>,
}

impl ScriptedModel {
    pub fn new<S: Into<String>>(responses: impl IntoIterator<Item = S>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            ..Self::default()
        }
    }

    pub fn failing(error: InterpreterError) -> Self {
        let model = Self::default();
        model.push_error(error);
        model
    }

    /// Delay every answer, for cancellation and concurrency tests
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn push(&self, response: impl Into<String>) {
        self.responses.lock().push_back(Ok(response.into()));
    }

    pub fn push_error(&self, error: InterpreterError) {
        self.responses.lock().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: &ChatRequest) -> Result<String, InterpreterError> {
        self.requests.lock().push(request.clone());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.responses.lock().pop_front().unwrap_or_else(|| Ok(String::new()))
    }

    fn model_name(&self) -> String {
        "scripted".to_string()
    }
}

#[derive(Debug, Clone)]
struct FakeModel {
    candidate: AssetCandidate,
    terms: Vec<String>,
    bytes: Vec<u8>,
}

/// In-memory asset library
///
/// Search matches a term case-insensitively against the terms a model was
/// registered under. Download URLs are `fake://<uid>`.
#[derive(Debug, Default)]
pub struct FakeAssetService {
    models: Vec<FakeModel>,
    fetch_latency: Option<Duration>,
    failing_search: Option<u16>,
    fetches: Mutex<HashMap<String, usize>>,
}

impl FakeAssetService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model found by `term`
    #[must_use]
    pub fn with_model(mut self, term: &str, candidate: AssetCandidate, bytes: Vec<u8>) -> Self {
        self.models.push(FakeModel {
            candidate,
            terms: vec![term.to_lowercase()],
            bytes,
        });
        self
    }

    /// Delay every fetch
    #[must_use]
    pub fn with_fetch_latency(mut self, latency: Duration) -> Self {
        self.fetch_latency = Some(latency);
        self
    }

    /// Make every search fail with an HTTP status
    #[must_use]
    pub fn with_failing_search(mut self, status: u16) -> Self {
        self.failing_search = Some(status);
        self
    }

    /// Number of completed fetches for `uid`
    pub fn fetch_count(&self, uid: &str) -> usize {
        self.fetches.lock().get(uid).copied().unwrap_or(0)
    }

    fn find(&self, uid: &str) -> Option<&FakeModel> {
        self.models.iter().find(|m| m.candidate.uid == uid)
    }
}

#[async_trait]
impl AssetService for FakeAssetService {
    async fn search(&self, term: &str) -> Result<Vec<AssetCandidate>, ImportError> {
        if let Some(status) = self.failing_search {
            return Err(ImportError::service("search", Some(status), "search unavailable"));
        }
        let term = term.trim().to_lowercase();
        Ok(self
            .models
            .iter()
            .filter(|m| m.terms.contains(&term))
            .map(|m| m.candidate.clone())
            .collect())
    }

    async fn download_descriptor(&self, uid: &str) -> Result<DownloadDescriptor, ImportError> {
        let model = self
            .find(uid)
            .ok_or_else(|| ImportError::service("download", Some(404), format!("no model {uid}")))?;
        Ok(DownloadDescriptor {
            url: format!("fake://{uid}"),
            format: PackageHint::Unknown,
            size: u64::try_from(model.bytes.len()).ok(),
        })
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ImportError> {
        let uid = url.strip_prefix("fake://").unwrap_or(url);
        let bytes = self
            .find(uid)
            .map(|m| m.bytes.clone())
            .ok_or_else(|| ImportError::service("fetch", Some(404), format!("no file at {url}")))?;
        if let Some(latency) = self.fetch_latency {
            tokio::time::sleep(latency).await;
        }
        *self.fetches.lock().entry(uid.to_string()).or_default() += 1;
        Ok(bytes)
    }
}

/// Zip archive with the given `(path, bytes)` entries; paths ending in `/` are directories
pub fn create_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// Binary glTF container holding `json` as its only chunk
pub fn create_glb(json: &Value) -> Vec<u8> {
    let mut chunk = serde_json::to_vec(json).unwrap();
    while chunk.len() % 4 != 0 {
        chunk.push(b' ');
    }
    let total = 12 + 8 + chunk.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&u32::try_from(total).unwrap().to_le_bytes());
    out.extend_from_slice(&u32::try_from(chunk.len()).unwrap().to_le_bytes());
    out.extend_from_slice(b"JSON");
    out.extend_from_slice(&chunk);
    out
}

/// Smallest valid glTF document
pub fn minimal_gltf() -> Value {
    json!({"asset": {"version": "2.0"}})
}

/// glTF document with one buffer per `buffer_uris` entry and one image per `image_uris` entry
pub fn gltf_with_uris(buffer_uris: &[&str], image_uris: &[&str]) -> Value {
    let buffers: Vec<Value> = buffer_uris
        .iter()
        .map(|uri| json!({"uri": uri, "byteLength": 4}))
        .collect();
    let images: Vec<Value> = image_uris.iter().map(|uri| json!({"uri": uri})).collect();
    json!({
        "asset": {"version": "2.0"},
        "buffers": buffers,
        "images": images,
    })
}

/// Zip archive around a text glTF with `scene.bin` and `textures/bark.png`
/// present and `textures/leaves.png` referenced but missing
pub fn create_tree_archive() -> Vec<u8> {
    let doc = gltf_with_uris(&["scene.bin"], &["textures/bark.png", "textures/leaves.png"]);
    let doc = serde_json::to_vec(&doc).unwrap();
    create_zip(&[
        ("tree/", b""),
        ("tree/scene.gltf", &doc),
        ("tree/scene.bin", b"\0\0\0\0"),
        ("tree/textures/bark.png", b"\x89PNG"),
        ("tree/license.txt", b"CC-BY-4.0"),
    ])
}

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn create_candidate(uid: &str, name: &str, likes: u64) -> AssetCandidate {
    AssetCandidate::new(uid, name).with_popularity(likes, likes * 10)
}
