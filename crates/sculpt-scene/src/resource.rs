//! Resource arena
//!
//! Byte-backed resources (extracted model documents, textures, buffers) live in
//! a shared arena keyed by opaque handles. Scene objects hold handles, never
//! bytes. Handles are reference counted; releasing an unknown or already freed
//! handle is reported, not an error.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// URI scheme for locally materialized resources
pub const RESOURCE_SCHEME: &str = "sculpt-resource://";

/// Opaque handle to a resource in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceHandle(u64);

impl ResourceHandle {
    /// Local URI that other documents can reference
    #[must_use]
    pub fn uri(&self) -> String {
        format!("{RESOURCE_SCHEME}{}", self.0)
    }

    /// Parse a handle back out of a local URI
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        uri.strip_prefix(RESOURCE_SCHEME)?.parse().ok().map(Self)
    }

    /// Raw numeric value
    #[inline]
    #[must_use]
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "res-{}", self.0)
    }
}

/// What a release did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Last reference dropped, bytes freed
    Freed,
    /// Other references remain
    Decremented {
        /// References still held
        remaining: usize,
    },
    /// Handle was not in the arena
    Unknown,
}

#[derive(Debug)]
struct ResourceEntry {
    label: String,
    bytes: Arc<[u8]>,
    refs: usize,
}

/// Arena statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Entries currently live
    pub live: usize,
    /// Entries ever inserted
    pub total_inserted: usize,
    /// Entries freed
    pub total_freed: usize,
}

/// Shared arena of byte-backed resources
#[derive(Debug, Default)]
pub struct ResourceArena {
    entries: DashMap<ResourceHandle, ResourceEntry>,
    next: AtomicU64,
    inserted: AtomicUsize,
    freed: AtomicUsize,
}

impl ResourceArena {
    /// Create empty arena
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create empty arena behind an `Arc`
    #[inline]
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Materialize bytes, returning a handle with one reference
    pub fn insert(&self, label: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> ResourceHandle {
        let handle = ResourceHandle(self.next.fetch_add(1, Ordering::Relaxed) + 1);
        let entry = ResourceEntry {
            label: label.into(),
            bytes: bytes.into(),
            refs: 1,
        };
        tracing::trace!(%handle, label = %entry.label, size = entry.bytes.len(), "resource materialized");
        self.entries.insert(handle, entry);
        self.inserted.fetch_add(1, Ordering::Relaxed);
        handle
    }

    /// Add a reference to a live handle
    pub fn retain(&self, handle: ResourceHandle) -> bool {
        match self.entries.get_mut(&handle) {
            Some(mut entry) => {
                entry.refs += 1;
                true
            }
            None => false,
        }
    }

    /// Drop one reference; frees the bytes when none remain
    pub fn release(&self, handle: ResourceHandle) -> ReleaseOutcome {
        let remaining = match self.entries.get_mut(&handle) {
            Some(mut entry) => {
                entry.refs = entry.refs.saturating_sub(1);
                entry.refs
            }
            None => return ReleaseOutcome::Unknown,
        };

        if remaining > 0 {
            return ReleaseOutcome::Decremented { remaining };
        }

        // Entry may have been freed concurrently between the two lookups
        if self.entries.remove_if(&handle, |_, e| e.refs == 0).is_some() {
            self.freed.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(%handle, "resource freed");
            ReleaseOutcome::Freed
        } else {
            ReleaseOutcome::Unknown
        }
    }

    /// Release every handle held by a model, consuming it
    ///
    /// Returns the number of handles actually freed.
    pub fn release_model(&self, resources: ModelResources) -> usize {
        resources
            .into_handles()
            .filter(|h| self.release(*h) == ReleaseOutcome::Freed)
            .count()
    }

    /// Bytes behind a handle
    #[must_use]
    pub fn bytes(&self, handle: ResourceHandle) -> Option<Arc<[u8]>> {
        self.entries.get(&handle).map(|e| Arc::clone(&e.bytes))
    }

    /// Label (usually the archive path) of a handle
    #[must_use]
    pub fn label(&self, handle: ResourceHandle) -> Option<String> {
        self.entries.get(&handle).map(|e| e.label.clone())
    }

    /// Reference count of a handle, zero if unknown
    #[must_use]
    pub fn ref_count(&self, handle: ResourceHandle) -> usize {
        self.entries.get(&handle).map_or(0, |e| e.refs)
    }

    /// Whether the handle is live
    #[inline]
    #[must_use]
    pub fn contains(&self, handle: ResourceHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Live entry count
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are live
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of counters
    #[must_use]
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            live: self.entries.len(),
            total_inserted: self.inserted.load(Ordering::Relaxed),
            total_freed: self.freed.load(Ordering::Relaxed),
        }
    }
}

/// Handles owned by an imported model
///
/// Deliberately not `Clone`; release goes through [`ResourceArena::release_model`],
/// which consumes the value.
#[derive(Debug, PartialEq, Eq)]
pub struct ModelResources {
    /// The (possibly patched) model document
    pub document: ResourceHandle,
    /// Buffers and images the document references
    pub assets: Vec<ResourceHandle>,
}

impl ModelResources {
    /// Model backed by a single document
    #[inline]
    #[must_use]
    pub fn single(document: ResourceHandle) -> Self {
        Self {
            document,
            assets: Vec::new(),
        }
    }

    /// Number of handles held
    #[inline]
    #[must_use]
    pub fn handle_count(&self) -> usize {
        1 + self.assets.len()
    }

    /// Iterate the handles without giving them up
    pub fn handles(&self) -> impl Iterator<Item = ResourceHandle> + '_ {
        std::iter::once(self.document).chain(self.assets.iter().copied())
    }

    fn into_handles(self) -> impl Iterator<Item = ResourceHandle> {
        std::iter::once(self.document).chain(self.assets)
    }
}

/// Drop guard for resources materialized during an import
///
/// Anything still staged when the guard drops (error, cancellation, abandoned
/// future) is released. [`StagedResources::commit`] hands ownership to a model.
#[derive(Debug)]
pub struct StagedResources {
    arena: Arc<ResourceArena>,
    staged: Vec<ResourceHandle>,
}

impl StagedResources {
    /// Start staging into `arena`
    #[inline]
    #[must_use]
    pub fn new(arena: Arc<ResourceArena>) -> Self {
        Self {
            arena,
            staged: Vec::new(),
        }
    }

    /// Materialize bytes and track the handle
    pub fn stage(&mut self, label: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> ResourceHandle {
        let handle = self.arena.insert(label, bytes);
        self.staged.push(handle);
        handle
    }

    /// Release one staged handle now
    pub fn discard(&mut self, handle: ResourceHandle) -> ReleaseOutcome {
        match self.staged.iter().position(|h| *h == handle) {
            Some(idx) => {
                self.staged.remove(idx);
                self.arena.release(handle)
            }
            None => ReleaseOutcome::Unknown,
        }
    }

    /// Release every staged handle except `keep`
    pub fn discard_all_except(&mut self, keep: ResourceHandle) -> usize {
        let mut released = 0;
        self.staged.retain(|h| {
            if *h == keep {
                return true;
            }
            if self.arena.release(*h) == ReleaseOutcome::Freed {
                released += 1;
            }
            false
        });
        released
    }

    /// Handles currently staged
    #[inline]
    #[must_use]
    pub fn handles(&self) -> &[ResourceHandle] {
        &self.staged
    }

    /// Hand the staged handles to a model with `document` as its document
    ///
    /// `document` must have been staged through this guard.
    #[must_use]
    pub fn commit(mut self, document: ResourceHandle) -> ModelResources {
        let staged = std::mem::take(&mut self.staged);
        ModelResources {
            document,
            assets: staged.into_iter().filter(|h| *h != document).collect(),
        }
    }
}

impl Drop for StagedResources {
    fn drop(&mut self) {
        if self.staged.is_empty() {
            return;
        }
        tracing::debug!(count = self.staged.len(), "releasing staged resources");
        for handle in self.staged.drain(..) {
            self.arena.release(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_release_frees_once() {
        let arena = ResourceArena::new();
        let h = arena.insert("a.bin", vec![1u8, 2, 3]);
        assert_eq!(arena.bytes(h).unwrap().as_ref(), &[1, 2, 3]);

        assert_eq!(arena.release(h), ReleaseOutcome::Freed);
        assert_eq!(arena.release(h), ReleaseOutcome::Unknown);
        assert_eq!(arena.stats().total_freed, 1);
        assert!(arena.is_empty());
    }

    #[test]
    fn retain_requires_matching_releases() {
        let arena = ResourceArena::new();
        let h = arena.insert("tex.png", vec![0u8; 4]);
        assert!(arena.retain(h));
        assert_eq!(arena.release(h), ReleaseOutcome::Decremented { remaining: 1 });
        assert!(arena.contains(h));
        assert_eq!(arena.release(h), ReleaseOutcome::Freed);
        assert!(!arena.retain(h));
    }

    #[test]
    fn handle_uri_roundtrip() {
        let arena = ResourceArena::new();
        let h = arena.insert("x", Vec::<u8>::new());
        assert_eq!(ResourceHandle::from_uri(&h.uri()), Some(h));
        assert_eq!(ResourceHandle::from_uri("textures/a.png"), None);
    }

    #[test]
    fn release_model_consumes_all_handles() {
        let arena = ResourceArena::new();
        let doc = arena.insert("scene.gltf", b"{}".to_vec());
        let buf = arena.insert("scene.bin", vec![0u8; 8]);
        let model = ModelResources {
            document: doc,
            assets: vec![buf],
        };
        assert_eq!(model.handle_count(), 2);
        assert_eq!(arena.release_model(model), 2);
        assert!(arena.is_empty());
    }

    #[test]
    fn staged_resources_release_on_drop() {
        let arena = ResourceArena::shared();
        {
            let mut staged = StagedResources::new(Arc::clone(&arena));
            staged.stage("a", vec![1u8]);
            staged.stage("b", vec![2u8]);
            assert_eq!(arena.len(), 2);
        }
        assert!(arena.is_empty());
        assert_eq!(arena.stats().total_freed, 2);
    }

    #[test]
    fn staged_resources_commit_keeps_handles() {
        let arena = ResourceArena::shared();
        let mut staged = StagedResources::new(Arc::clone(&arena));
        let tex = staged.stage("tex.png", vec![1u8]);
        let doc = staged.stage("scene.gltf", b"{}".to_vec());
        let model = staged.commit(doc);

        assert_eq!(model.document, doc);
        assert_eq!(model.assets, vec![tex]);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn discard_all_except_keeps_document() {
        let arena = ResourceArena::shared();
        let mut staged = StagedResources::new(Arc::clone(&arena));
        let doc = staged.stage("model.glb", vec![0u8; 12]);
        staged.stage("tex.png", vec![1u8]);
        staged.stage("other.png", vec![2u8]);

        assert_eq!(staged.discard_all_except(doc), 2);
        assert_eq!(staged.handles(), &[doc]);
        assert_eq!(arena.len(), 1);
    }
}
