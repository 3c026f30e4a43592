//! Read-only scene snapshots
//!
//! A snapshot is what the interpreter sees: plain serializable copies of every
//! object, the selection, the shape palette and precomputed spatial hints.

use crate::object::{ObjectId, ShapeKind};
use crate::state::SceneState;
use serde::{Deserialize, Serialize};

/// Serializable copy of one object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotObject {
    /// Object id
    pub id: ObjectId,
    /// Kind label (`SphereGeometry`, `imported-model`)
    #[serde(rename = "type")]
    pub kind: String,
    /// Display name
    pub name: String,
    /// Position `[x, y, z]`
    pub position: [f32; 3],
    /// Rotation in radians `[x, y, z]`
    pub rotation: [f32; 3],
    /// Scale `[x, y, z]`
    pub scale: [f32; 3],
    /// Tint, if set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Reference to an object picked by a spatial rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialRef {
    /// Object id
    pub id: ObjectId,
    /// Object name
    pub name: String,
}

/// Precomputed answers to relative-position phrases
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialHints {
    /// Object with the smallest x
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leftmost: Option<SpatialRef>,
    /// Object with the largest x
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rightmost: Option<SpatialRef>,
}

/// Read-only copy of the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSnapshot {
    /// Objects in insertion order
    pub objects: Vec<SnapshotObject>,
    /// Selected object id
    pub selected_id: Option<ObjectId>,
    /// Shapes an `add` may create
    pub available_shapes: Vec<String>,
    /// Leftmost / rightmost
    pub spatial: SpatialHints,
    /// Objects left out by [`SceneSnapshot::bounded`]
    #[serde(default, skip_serializing_if = "is_zero")]
    pub omitted: usize,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl SceneSnapshot {
    /// Copy the current state
    #[must_use]
    pub fn capture(scene: &SceneState) -> Self {
        let objects: Vec<SnapshotObject> = scene
            .iter()
            .map(|o| SnapshotObject {
                id: o.id,
                kind: o.kind.label().to_string(),
                name: o.name.clone(),
                position: o.position.to_array(),
                rotation: o.rotation.to_array(),
                scale: o.scale.to_array(),
                color: o.color.clone(),
            })
            .collect();

        let spatial = SpatialHints {
            leftmost: extreme_x(&objects, |candidate, best| candidate < best),
            rightmost: extreme_x(&objects, |candidate, best| candidate > best),
        };

        Self {
            objects,
            selected_id: scene.selected(),
            available_shapes: ShapeKind::geometry_names().into_iter().map(String::from).collect(),
            spatial,
            omitted: 0,
        }
    }

    /// Keep at most `max_objects`, most recent last; spatial hints still
    /// reflect the whole scene
    #[must_use]
    pub fn bounded(mut self, max_objects: usize) -> Self {
        if self.objects.len() > max_objects {
            let drop = self.objects.len() - max_objects;
            self.objects.drain(..drop);
            self.omitted += drop;
        }
        self
    }

    /// Whether the snapshot has no objects
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.omitted == 0
    }
}

/// First object (insertion order) whose x beats every earlier one; NaN never wins
fn extreme_x(objects: &[SnapshotObject], beats: impl Fn(f32, f32) -> bool) -> Option<SpatialRef> {
    let mut best: Option<&SnapshotObject> = None;
    for obj in objects.iter().filter(|o| !o.position[0].is_nan()) {
        match best {
            Some(b) if !beats(obj.position[0], b.position[0]) => {}
            _ => best = Some(obj),
        }
    }
    best.map(|o| SpatialRef {
        id: o.id,
        name: o.name.clone(),
    })
}
