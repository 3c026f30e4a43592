//! Action executor
//!
//! Applies one validated [`Action`] to a [`SceneState`] and produces exactly
//! one [`FeedbackEntry`]. Network work is never done here: a `search` comes
//! back as a [`SideEffect`] for the pipeline to run.

use crate::feedback::FeedbackEntry;
use rand::Rng;
use sculpt_action::{resolve, resolve_many, Action, AddItem, DeleteSelector, ManipulateOp, Resolution, TargetRef};
use sculpt_import::ImportedModel;
use sculpt_scene::{random_position, ObjectId, ResourceArena, SceneError, SceneObject, SceneState, Vec3};
use std::sync::Arc;

/// Work the pipeline must perform after an action was applied
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    /// Import a model for `term` and place it at `position`
    ImportAsset {
        /// Search term, also the object's name
        term: String,
        /// Spawn position
        position: Vec3,
    },
}

/// Result of applying one action
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// Feedback for the action
    pub entry: FeedbackEntry,
    /// Deferred work, if any
    pub effect: Option<SideEffect>,
}

impl Applied {
    fn done(entry: FeedbackEntry) -> Self {
        Self { entry, effect: None }
    }
}

/// Applies actions to a scene
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    arena: Arc<ResourceArena>,
}

impl ActionExecutor {
    /// Create executor releasing removed resources into `arena`
    #[must_use]
    pub fn new(arena: Arc<ResourceArena>) -> Self {
        Self { arena }
    }

    /// Arena removed objects release into
    #[inline]
    #[must_use]
    pub fn arena(&self) -> &Arc<ResourceArena> {
        &self.arena
    }

    /// Apply `action`, the `index`-th of its batch
    pub fn apply<R: Rng + ?Sized>(&self, index: usize, action: Action, scene: &mut SceneState, rng: &mut R) -> Applied {
        match action {
            Action::Add(item) => Applied::done(self.add(index, item, scene)),
            Action::AddMultiple { items } => Applied::done(self.add_multiple(index, items, scene)),
            Action::Manipulate { op, target } => Applied::done(self.manipulate(index, op, &target, scene)),
            Action::Select { target } => Applied::done(select(index, &target, scene)),
            Action::Color { target, color } => Applied::done(recolor(index, &target, color, scene)),
            Action::Search { term } => Applied {
                entry: FeedbackEntry::applied(index, format!("Searching for '{term}'.")),
                effect: Some(SideEffect::ImportAsset {
                    position: random_position(rng),
                    term,
                }),
            },
            Action::List => Applied::done(FeedbackEntry::applied(index, list(scene))),
            Action::Clear => Applied::done(self.clear(index, scene)),
            Action::DeleteMultiple { selector } => Applied::done(self.delete_many(index, &selector, scene)),
            Action::Ambiguous { message } => Applied::done(FeedbackEntry::skipped(index, message)),
        }
    }

    /// Append an imported model exactly as `add` appends a shape
    pub fn place_import(&self, index: usize, imported: ImportedModel, scene: &mut SceneState) -> FeedbackEntry {
        let ImportedModel {
            object,
            candidate,
            warnings,
            ..
        } = imported;
        let name = object.name.clone();
        let position = object.position;

        match scene.try_insert(object) {
            Ok(id) => {
                let mut message = format!(
                    "Imported '{}' as {name} ({id}) at {}.",
                    candidate.name,
                    fmt_vec(position)
                );
                if !warnings.is_empty() {
                    message.push_str(&format!(" {} import warning(s): {}.", warnings.len(), warnings.join("; ")));
                }
                FeedbackEntry::applied(index, message)
            }
            Err(mut rejected) => {
                let freed = rejected
                    .take_resources()
                    .map_or(0, |resources| self.arena.release_model(resources));
                tracing::warn!(id = %rejected.id, freed, "imported model rejected by scene");
                let e = SceneError::DuplicateId(rejected.id);
                FeedbackEntry::failed(index, format!("Could not place {name}: {e}."))
            }
        }
    }

    fn add(&self, index: usize, item: AddItem, scene: &mut SceneState) -> FeedbackEntry {
        match insert_shape(item, scene) {
            Ok(id) => FeedbackEntry::applied(
                index,
                format!("Added {} ({id}) at {}.", item.shape, fmt_vec(item.position)),
            ),
            Err(e) => FeedbackEntry::failed(index, format!("Could not add {}: {e}.", item.shape)),
        }
    }

    fn add_multiple(
        &self,
        index: usize,
        items: Vec<Result<AddItem, sculpt_action::SchemaError>>,
        scene: &mut SceneState,
    ) -> FeedbackEntry {
        let mut added = Vec::new();
        let mut problems = Vec::new();

        for (n, item) in items.into_iter().enumerate() {
            match item.map(|item| (item.shape, insert_shape(item, scene))) {
                Ok((shape, Ok(_))) => added.push(shape.geometry_name()),
                Ok((shape, Err(e))) => problems.push(format!("item {n} ({shape}): {e}")),
                Err(e) => problems.push(format!("item {n}: {e}")),
            }
        }

        let mut message = if added.is_empty() {
            "Added nothing.".to_string()
        } else {
            format!("Added {} objects: {}.", added.len(), added.join(", "))
        };
        if !problems.is_empty() {
            message.push_str(&format!(" Skipped {}.", problems.join("; ")));
        }

        if added.is_empty() {
            FeedbackEntry::failed(index, message)
        } else {
            FeedbackEntry::applied(index, message)
        }
    }

    fn manipulate(&self, index: usize, op: ManipulateOp, target: &TargetRef, scene: &mut SceneState) -> FeedbackEntry {
        let id = match resolve(target, scene) {
            Resolution::Resolved(id) => id,
            unresolved => return FeedbackEntry::skipped(index, unresolved.message()),
        };

        let outcome = match op {
            ManipulateOp::Delete => return self.delete_one(index, id, scene),
            ManipulateOp::Move(delta) => scene.update(id, |object| {
                object.position = delta.offset(object.position);
                format!("Moved {} to {}.", object.name, fmt_vec(object.position))
            }),
            ManipulateOp::Rotate(delta) => scene.update(id, |object| {
                object.rotation = delta.offset(object.rotation);
                let degrees = object.rotation * (180.0 / std::f32::consts::PI);
                format!("Rotated {} to {} degrees.", object.name, fmt_vec(degrees))
            }),
            ManipulateOp::Scale(delta) => scene.update(id, |object| {
                object.scale = delta.multiply(object.scale);
                format!("Scaled {} to {}.", object.name, fmt_vec(object.scale))
            }),
        };

        match outcome {
            Ok(message) => FeedbackEntry::applied(index, message),
            Err(e) => FeedbackEntry::failed(index, e.to_string()),
        }
    }

    fn delete_one(&self, index: usize, id: ObjectId, scene: &mut SceneState) -> FeedbackEntry {
        let name = scene.get(id).map(|o| o.name.clone()).unwrap_or_default();
        match scene.remove(id, &self.arena) {
            Ok(freed) => {
                tracing::debug!(%id, freed, "object deleted");
                FeedbackEntry::applied(index, format!("Deleted {name} ({id})."))
            }
            Err(e) => FeedbackEntry::failed(index, e.to_string()),
        }
    }

    fn delete_many(&self, index: usize, selector: &DeleteSelector, scene: &mut SceneState) -> FeedbackEntry {
        let ids = resolve_many(selector, scene);
        if ids.is_empty() {
            let what = match selector {
                DeleteSelector::Ids(ids) => format!("the {} given id(s)", ids.len()),
                DeleteSelector::Name(name) => format!("'{name}'"),
            };
            return FeedbackEntry::skipped(index, format!("No objects matched {what}."));
        }

        let mut deleted = 0;
        let mut freed = 0;
        for id in ids {
            if let Ok(n) = scene.remove(id, &self.arena) {
                deleted += 1;
                freed += n;
            }
        }
        tracing::debug!(deleted, freed, "objects deleted");
        FeedbackEntry::applied(index, format!("Deleted {deleted} object(s)."))
    }

    fn clear(&self, index: usize, scene: &mut SceneState) -> FeedbackEntry {
        let (removed, freed) = scene.clear(&self.arena);
        tracing::debug!(removed, freed, "scene cleared");
        FeedbackEntry::applied(index, format!("Cleared the scene ({removed} object(s) removed)."))
    }
}

fn insert_shape(item: AddItem, scene: &mut SceneState) -> Result<ObjectId, sculpt_scene::SceneError> {
    scene.insert(SceneObject::shape(item.shape, item.position))
}

fn select(index: usize, target: &TargetRef, scene: &mut SceneState) -> FeedbackEntry {
    let id = match resolve(target, scene) {
        Resolution::Resolved(id) => id,
        unresolved => return FeedbackEntry::skipped(index, unresolved.message()),
    };
    let name = scene.get(id).map(|o| o.name.clone()).unwrap_or_default();
    match scene.select(id) {
        Ok(()) => FeedbackEntry::applied(index, format!("Selected {name} ({id}).")),
        Err(e) => FeedbackEntry::failed(index, e.to_string()),
    }
}

fn recolor(index: usize, target: &TargetRef, color: String, scene: &mut SceneState) -> FeedbackEntry {
    let id = match resolve(target, scene) {
        Resolution::Resolved(id) => id,
        unresolved => return FeedbackEntry::skipped(index, unresolved.message()),
    };
    let outcome = scene.update(id, |object| {
        let message = format!("Colored {} {color}.", object.name);
        object.color = Some(color);
        message
    });
    match outcome {
        Ok(message) => FeedbackEntry::applied(index, message),
        Err(e) => FeedbackEntry::failed(index, e.to_string()),
    }
}

/// `name (id)` per object in insertion order
fn list(scene: &SceneState) -> String {
    if scene.is_empty() {
        return "The scene is empty.".to_string();
    }
    scene
        .iter()
        .map(|o| format!("{} ({})", o.name, o.id))
        .collect::<Vec<_>>()
        .join("\n")
}

fn fmt_vec(v: Vec3) -> String {
    format!("({:.2}, {:.2}, {:.2})", v.x, v.y, v.z)
}
