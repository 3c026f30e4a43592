//! Sculpt Scene - the scene state model
//!
//! Pure data the rest of the workspace operates on:
//! - `SceneObject`s with ids, kinds, transforms and optional resources
//! - `SceneState`, the insertion-ordered collection plus selection
//! - `SceneSnapshot`, the read-only view handed to the interpreter
//! - `ResourceArena`, the owner of extracted binary blobs
//!
//! # Example
//!
//! ```rust
//! use sculpt_scene::{ResourceArena, SceneObject, SceneState, ShapeKind};
//! use glam::Vec3;
//!
//! let arena = ResourceArena::new();
//! let mut scene = SceneState::new();
//! let id = scene.insert(SceneObject::shape(ShapeKind::Sphere, Vec3::ZERO)).unwrap();
//! assert_eq!(scene.snapshot().objects.len(), 1);
//! scene.remove(id, &arena).unwrap();
//! assert!(scene.is_empty());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod object;
pub mod resource;
pub mod snapshot;
pub mod state;

pub use object::{random_position, ObjectId, ObjectKind, SceneObject, ShapeKind, UnknownShape};
pub use resource::{
    ArenaStats, ModelResources, ReleaseOutcome, ResourceArena, ResourceHandle, StagedResources,
    RESOURCE_SCHEME,
};
pub use snapshot::{SceneSnapshot, SnapshotObject, SpatialHints, SpatialRef};
pub use state::{SceneError, SceneEvent, SceneState};

pub use glam::Vec3;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
