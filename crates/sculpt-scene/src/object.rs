//! Scene objects
//!
//! Defines the data placed in a scene:
//! - Object identifiers (ULID, sortable by creation time)
//! - The closed set of parametric shapes
//! - Object kinds and the object record itself

use crate::resource::ModelResources;
use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ulid::Ulid;

/// Unique object identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub Ulid);

impl ObjectId {
    /// Generate new object ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ObjectId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s.trim()).map(Self)
    }
}

/// Parametric shapes the scene can create without an import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Unit box
    #[serde(rename = "BoxGeometry")]
    Box,
    /// Sphere
    #[serde(rename = "SphereGeometry")]
    Sphere,
    /// Cone
    #[serde(rename = "ConeGeometry")]
    Cone,
    /// Cylinder
    #[serde(rename = "CylinderGeometry")]
    Cylinder,
    /// Torus
    #[serde(rename = "TorusGeometry")]
    Torus,
    /// Tetrahedron
    #[serde(rename = "TetrahedronGeometry")]
    Tetrahedron,
    /// Octahedron
    #[serde(rename = "OctahedronGeometry")]
    Octahedron,
    /// Dodecahedron
    #[serde(rename = "DodecahedronGeometry")]
    Dodecahedron,
}

impl ShapeKind {
    /// Every shape, in palette order
    pub const ALL: [ShapeKind; 8] = [
        ShapeKind::Box,
        ShapeKind::Sphere,
        ShapeKind::Cone,
        ShapeKind::Cylinder,
        ShapeKind::Torus,
        ShapeKind::Tetrahedron,
        ShapeKind::Octahedron,
        ShapeKind::Dodecahedron,
    ];

    /// Canonical geometry name (`SphereGeometry`)
    #[inline]
    #[must_use]
    pub fn geometry_name(&self) -> &'static str {
        match self {
            ShapeKind::Box => "BoxGeometry",
            ShapeKind::Sphere => "SphereGeometry",
            ShapeKind::Cone => "ConeGeometry",
            ShapeKind::Cylinder => "CylinderGeometry",
            ShapeKind::Torus => "TorusGeometry",
            ShapeKind::Tetrahedron => "TetrahedronGeometry",
            ShapeKind::Octahedron => "OctahedronGeometry",
            ShapeKind::Dodecahedron => "DodecahedronGeometry",
        }
    }

    /// Short lowercase name (`sphere`)
    #[inline]
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        match self {
            ShapeKind::Box => "box",
            ShapeKind::Sphere => "sphere",
            ShapeKind::Cone => "cone",
            ShapeKind::Cylinder => "cylinder",
            ShapeKind::Torus => "torus",
            ShapeKind::Tetrahedron => "tetrahedron",
            ShapeKind::Octahedron => "octahedron",
            ShapeKind::Dodecahedron => "dodecahedron",
        }
    }

    /// Canonical names of every shape
    #[must_use]
    pub fn geometry_names() -> Vec<&'static str> {
        Self::ALL.iter().map(ShapeKind::geometry_name).collect()
    }
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.geometry_name())
    }
}

/// Error for names outside the shape enumeration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown shape kind: '{0}'")]
pub struct UnknownShape(pub String);

impl FromStr for ShapeKind {
    type Err = UnknownShape;

    /// Accepts `SphereGeometry`, `sphere`, `Sphere` and the synonym `cube`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let stem = lower.strip_suffix("geometry").unwrap_or(&lower);
        let kind = match stem {
            "box" | "cube" => ShapeKind::Box,
            "sphere" | "ball" => ShapeKind::Sphere,
            "cone" => ShapeKind::Cone,
            "cylinder" => ShapeKind::Cylinder,
            "torus" | "donut" => ShapeKind::Torus,
            "tetrahedron" => ShapeKind::Tetrahedron,
            "octahedron" => ShapeKind::Octahedron,
            "dodecahedron" => ShapeKind::Dodecahedron,
            _ => return Err(UnknownShape(s.to_string())),
        };
        Ok(kind)
    }
}

/// What an object is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// One of the parametric shapes
    Shape(ShapeKind),
    /// A model brought in by the asset import pipeline
    ImportedModel,
}

impl ObjectKind {
    /// Label used in snapshots and listings
    #[inline]
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            ObjectKind::Shape(shape) => shape.geometry_name(),
            ObjectKind::ImportedModel => "imported-model",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// An object placed in the scene
///
/// Not `Clone`: an imported model owns its resource handles and a copy would
/// allow the same handle to be released twice.
#[derive(Debug)]
pub struct SceneObject {
    /// Unique id within the scene
    pub id: ObjectId,
    /// Shape or imported model
    pub kind: ObjectKind,
    /// Display label, not unique
    pub name: String,
    /// World position
    pub position: Vec3,
    /// Euler rotation in radians
    pub rotation: Vec3,
    /// Per-axis scale
    pub scale: Vec3,
    /// Display tint (CSS color name or hex)
    pub color: Option<String>,
    /// Handles owned by imported models
    resources: Option<ModelResources>,
}

impl SceneObject {
    /// Create a parametric shape named after its kind
    #[must_use]
    pub fn shape(kind: ShapeKind, position: Vec3) -> Self {
        Self {
            id: ObjectId::new(),
            kind: ObjectKind::Shape(kind),
            name: kind.geometry_name().to_string(),
            position,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            color: None,
            resources: None,
        }
    }

    /// Create an imported model that takes ownership of its resources
    #[must_use]
    pub fn imported(name: impl Into<String>, resources: ModelResources, position: Vec3) -> Self {
        Self {
            id: ObjectId::new(),
            kind: ObjectKind::ImportedModel,
            name: name.into(),
            position,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            color: None,
            resources: Some(resources),
        }
    }

    /// With a custom display name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Resources owned by this object, if any
    #[inline]
    #[must_use]
    pub fn resources(&self) -> Option<&ModelResources> {
        self.resources.as_ref()
    }

    /// Move the resources out, leaving the object without any
    #[inline]
    pub fn take_resources(&mut self) -> Option<ModelResources> {
        self.resources.take()
    }

    /// Whether `name` refers to this object (case-insensitive)
    #[must_use]
    pub fn answers_to(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }
}

/// Random spawn position: x, y in [-2, 2], z in [-1, 3]
pub fn random_position<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    Vec3::new(
        rng.gen_range(-2.0..=2.0),
        rng.gen_range(-2.0..=2.0),
        rng.gen_range(-1.0..=3.0),
    )
}
