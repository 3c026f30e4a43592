//! Typed actions
//!
//! The closed vocabulary of scene mutations. Every variant is produced by the
//! validator from a wire candidate and consumed exhaustively by the executor.

use crate::error::SchemaError;
use glam::Vec3;
use sculpt_scene::{ObjectId, ShapeKind};
use std::f32::consts::FRAC_PI_4;

/// Fallback move when no delta is given: +5 on x
pub const FALLBACK_MOVE: AxisDelta = AxisDelta::x(5.0);
/// Fallback rotation when no delta is given: +45 degrees on y
pub const FALLBACK_ROTATE: AxisDelta = AxisDelta::y(FRAC_PI_4);
/// Fallback scale when no delta is given: x2 on z
pub const FALLBACK_SCALE: AxisDelta = AxisDelta::z(2.0);

/// Which object(s) an action applies to
///
/// Exactly one form per action; the validator picks by precedence
/// (`targetId` > `name` > selection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRef {
    /// Explicit object id
    ById(ObjectId),
    /// Display name, case-insensitive
    ByName(String),
    /// Whatever is currently selected
    Selection,
}

impl std::fmt::Display for TargetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetRef::ById(id) => write!(f, "id {id}"),
            TargetRef::ByName(name) => write!(f, "'{name}'"),
            TargetRef::Selection => f.write_str("the selection"),
        }
    }
}

/// Target set of a bulk delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteSelector {
    /// Exact id membership
    Ids(Vec<ObjectId>),
    /// Every object sharing the name
    Name(String),
}

/// Per-axis change; `None` leaves the axis untouched
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisDelta {
    /// First axis
    pub x: Option<f32>,
    /// Second axis
    pub y: Option<f32>,
    /// Third axis
    pub z: Option<f32>,
}

impl AxisDelta {
    /// Change only x
    #[inline]
    #[must_use]
    pub const fn x(v: f32) -> Self {
        Self {
            x: Some(v),
            y: None,
            z: None,
        }
    }

    /// Change only y
    #[inline]
    #[must_use]
    pub const fn y(v: f32) -> Self {
        Self {
            x: None,
            y: Some(v),
            z: None,
        }
    }

    /// Change only z
    #[inline]
    #[must_use]
    pub const fn z(v: f32) -> Self {
        Self {
            x: None,
            y: None,
            z: Some(v),
        }
    }

    /// Whether no axis is set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.z.is_none()
    }

    /// Add the given axes
    #[must_use]
    pub fn offset(&self, v: Vec3) -> Vec3 {
        Vec3::new(
            v.x + self.x.unwrap_or(0.0),
            v.y + self.y.unwrap_or(0.0),
            v.z + self.z.unwrap_or(0.0),
        )
    }

    /// Multiply the given axes
    #[must_use]
    pub fn multiply(&self, v: Vec3) -> Vec3 {
        Vec3::new(
            v.x * self.x.unwrap_or(1.0),
            v.y * self.y.unwrap_or(1.0),
            v.z * self.z.unwrap_or(1.0),
        )
    }

    /// Apply `f` to every present axis
    #[must_use]
    pub fn map(self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            x: self.x.map(&f),
            y: self.y.map(&f),
            z: self.z.map(&f),
        }
    }
}

/// Transform applied by a `manipulate` action
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ManipulateOp {
    /// Additive position change
    Move(AxisDelta),
    /// Additive rotation change, radians
    Rotate(AxisDelta),
    /// Multiplicative scale change
    Scale(AxisDelta),
    /// Remove the target
    Delete,
}

impl ManipulateOp {
    /// Verb used in feedback
    #[inline]
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            ManipulateOp::Move(_) => "moved",
            ManipulateOp::Rotate(_) => "rotated",
            ManipulateOp::Scale(_) => "scaled",
            ManipulateOp::Delete => "deleted",
        }
    }
}

/// One shape to add
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AddItem {
    /// Shape to create
    pub shape: ShapeKind,
    /// Spawn position (randomized by the validator when absent)
    pub position: Vec3,
}

/// A validated scene mutation request
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Add one shape
    Add(AddItem),
    /// Add several shapes; invalid items are kept so they can be reported
    AddMultiple {
        /// Items in request order
        items: Vec<Result<AddItem, SchemaError>>,
    },
    /// Move, rotate, scale or delete one object
    Manipulate {
        /// Operation
        op: ManipulateOp,
        /// Object to change
        target: TargetRef,
    },
    /// Change the selection
    Select {
        /// Object to select
        target: TargetRef,
    },
    /// Change an object's tint
    Color {
        /// Object to tint
        target: TargetRef,
        /// CSS color name or hex string
        color: String,
    },
    /// Import a model matching a term
    Search {
        /// Free-text search term
        term: String,
    },
    /// Enumerate objects
    List,
    /// Remove every object
    Clear,
    /// Remove every object matching a selector
    DeleteMultiple {
        /// Ids or name
        selector: DeleteSelector,
    },
    /// The interpreter could not decide; carries its explanation
    Ambiguous {
        /// User-facing message
        message: String,
    },
}

impl Action {
    /// Wire tag of this action
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Action::Add(_) => "add",
            Action::AddMultiple { .. } => "addMultiple",
            Action::Manipulate { .. } => "manipulate",
            Action::Select { .. } => "select",
            Action::Color { .. } => "color",
            Action::Search { .. } => "search",
            Action::List => "list",
            Action::Clear => "clear",
            Action::DeleteMultiple { .. } => "deleteMultiple",
            Action::Ambiguous { .. } => "ambiguous",
        }
    }

    /// Whether applying this action can change the scene
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Action::List | Action::Ambiguous { .. } | Action::Search { .. })
    }
}
