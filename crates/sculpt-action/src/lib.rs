//! Sculpt Action - the closed action vocabulary
//!
//! Everything between raw interpreter output and the executor:
//! - `Action` and its parts (`TargetRef`, `AxisDelta`, `ManipulateOp`)
//! - `schema`: batch normalization and per-candidate validation
//! - `resolver`: mapping target references onto a scene
//!
//! # Example
//!
//! ```rust
//! use sculpt_action::{resolve, ActionValidator, Action, Resolution};
//! use sculpt_scene::{SceneObject, SceneState, ShapeKind, Vec3};
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(1);
//! let mut scene = SceneState::new();
//! let id = scene.insert(SceneObject::shape(ShapeKind::Cone, Vec3::ZERO)).unwrap();
//!
//! let value = serde_json::json!({"action": "select", "name": "ConeGeometry"});
//! let Action::Select { target } = ActionValidator::new().validate(&value, &mut rng).unwrap() else {
//!     unreachable!()
//! };
//! assert_eq!(resolve(&target, &scene), Resolution::Resolved(id));
//! ```

#![warn(unreachable_pub)]

pub mod action;
pub mod error;
pub mod resolver;
pub mod schema;

pub use action::{
    Action, AddItem, AxisDelta, DeleteSelector, ManipulateOp, TargetRef, FALLBACK_MOVE,
    FALLBACK_ROTATE, FALLBACK_SCALE,
};
pub use error::SchemaError;
pub use resolver::{resolve, resolve_many, Resolution};
pub use schema::{
    is_recognized, normalize_batch, validate_candidate, ActionTag, ActionValidator, OpKind,
    WRAPPER_KEYS,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
