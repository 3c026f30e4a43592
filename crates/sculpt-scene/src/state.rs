//! Scene state
//!
//! The authoritative, insertion-ordered collection of placed objects plus the
//! current selection. Mutations publish [`SceneEvent`]s so render and UI layers
//! can follow along without holding the state.

use crate::object::{ObjectId, SceneObject};
use crate::resource::{ModelResources, ResourceArena};
use crate::snapshot::SceneSnapshot;
use indexmap::IndexMap;
use tokio::sync::broadcast;

/// Capacity of the change notification channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Change notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneEvent {
    /// Object appended
    Added(ObjectId),
    /// Object transform or appearance changed
    Updated(ObjectId),
    /// Object removed
    Removed(ObjectId),
    /// Selection moved (or cleared)
    SelectionChanged(Option<ObjectId>),
    /// Every object removed
    Cleared,
}

/// Scene mutation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    /// Object id already present
    #[error("object already exists: {0}")]
    DuplicateId(ObjectId),

    /// Object id not present
    #[error("object not found: {0}")]
    NotFound(ObjectId),
}

/// Insertion-ordered scene contents and selection
#[derive(Debug)]
pub struct SceneState {
    objects: IndexMap<ObjectId, SceneObject>,
    selected: Option<ObjectId>,
    events: broadcast::Sender<SceneEvent>,
}

impl SceneState {
    /// Create empty scene
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            objects: IndexMap::new(),
            selected: None,
            events,
        }
    }

    /// Subscribe to change notifications
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SceneEvent> {
        self.events.subscribe()
    }

    /// Sender side of the change notifications
    ///
    /// Lets owners hand out subscriptions without borrowing the scene.
    #[must_use]
    pub fn event_sender(&self) -> broadcast::Sender<SceneEvent> {
        self.events.clone()
    }

    fn publish(&self, event: SceneEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Append an object
    ///
    /// # Errors
    /// - `SceneError::DuplicateId` if the id is already placed
    pub fn insert(&mut self, object: SceneObject) -> Result<ObjectId, SceneError> {
        self.try_insert(object).map_err(|rejected| SceneError::DuplicateId(rejected.id))
    }

    /// Append an object, handing it back when its id is already placed
    ///
    /// Callers holding resource-owning objects use this so a rejected object
    /// can still release its handles.
    ///
    /// # Errors
    /// The rejected object, unchanged
    pub fn try_insert(&mut self, object: SceneObject) -> Result<ObjectId, SceneObject> {
        let id = object.id;
        if self.objects.contains_key(&id) {
            return Err(object);
        }
        self.objects.insert(id, object);
        self.publish(SceneEvent::Added(id));
        Ok(id)
    }

    /// Look up an object
    #[inline]
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    /// Mutate an object in place, publishing an update
    pub fn update<R>(
        &mut self,
        id: ObjectId,
        f: impl FnOnce(&mut SceneObject) -> R,
    ) -> Result<R, SceneError> {
        let object = self.objects.get_mut(&id).ok_or(SceneError::NotFound(id))?;
        let out = f(object);
        self.publish(SceneEvent::Updated(id));
        Ok(out)
    }

    /// Remove an object, releasing any resources it owns
    ///
    /// Returns the number of resource handles freed. Removing an absent id is
    /// an error but never touches the arena.
    pub fn remove(&mut self, id: ObjectId, arena: &ResourceArena) -> Result<usize, SceneError> {
        let mut object = self.objects.shift_remove(&id).ok_or(SceneError::NotFound(id))?;
        let freed = object
            .take_resources()
            .map_or(0, |resources| release(arena, id, resources));

        if self.selected == Some(id) {
            self.selected = None;
            self.publish(SceneEvent::SelectionChanged(None));
        }
        self.publish(SceneEvent::Removed(id));
        Ok(freed)
    }

    /// Remove every object, releasing their resources
    ///
    /// Returns `(objects_removed, handles_freed)`.
    pub fn clear(&mut self, arena: &ResourceArena) -> (usize, usize) {
        let removed = self.objects.len();
        let freed = self
            .objects
            .drain(..)
            .filter_map(|(id, mut obj)| obj.take_resources().map(|r| (id, r)))
            .map(|(id, resources)| release(arena, id, resources))
            .sum();

        if self.selected.take().is_some() {
            self.publish(SceneEvent::SelectionChanged(None));
        }
        self.publish(SceneEvent::Cleared);
        (removed, freed)
    }

    /// Select an object
    pub fn select(&mut self, id: ObjectId) -> Result<(), SceneError> {
        if !self.objects.contains_key(&id) {
            return Err(SceneError::NotFound(id));
        }
        self.selected = Some(id);
        self.publish(SceneEvent::SelectionChanged(Some(id)));
        Ok(())
    }

    /// Drop the selection
    pub fn deselect(&mut self) {
        if self.selected.take().is_some() {
            self.publish(SceneEvent::SelectionChanged(None));
        }
    }

    /// Currently selected object id, if it is still placed
    #[must_use]
    pub fn selected(&self) -> Option<ObjectId> {
        self.selected.filter(|id| self.objects.contains_key(id))
    }

    /// Objects in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.values()
    }

    /// Objects whose name matches (case-insensitive), in insertion order
    pub fn find_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SceneObject> + 'a {
        self.objects.values().filter(move |o| o.answers_to(name))
    }

    /// Position of an id in insertion order
    #[must_use]
    pub fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.get_index_of(&id)
    }

    /// Object count
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the scene holds no objects
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Read-only copy for the interpreter
    #[must_use]
    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot::capture(self)
    }
}

impl Default for SceneState {
    fn default() -> Self {
        Self::new()
    }
}

fn release(arena: &ResourceArena, id: ObjectId, resources: ModelResources) -> usize {
    let count = resources.handle_count();
    let freed = arena.release_model(resources);
    tracing::debug!(object = %id, handles = count, freed, "released object resources");
    freed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ShapeKind;
    use crate::resource::ModelResources;
    use glam::Vec3;

    fn scene_with(names: &[&str]) -> (SceneState, Vec<ObjectId>) {
        let mut scene = SceneState::new();
        let ids = names
            .iter()
            .map(|n| {
                scene
                    .insert(SceneObject::shape(ShapeKind::Box, Vec3::ZERO).with_name(*n))
                    .unwrap()
            })
            .collect();
        (scene, ids)
    }

    #[test]
    fn insertion_order_is_kept() {
        let (scene, ids) = scene_with(&["a", "b", "c"]);
        let order: Vec<_> = scene.iter().map(|o| o.id).collect();
        assert_eq!(order, ids);
    }

    #[test]
    fn duplicate_insert_hands_object_back() {
        let (mut scene, ids) = scene_with(&["a"]);
        let mut twin = SceneObject::shape(ShapeKind::Box, Vec3::ZERO).with_name("twin");
        twin.id = ids[0];

        let rejected = scene.try_insert(twin).unwrap_err();
        assert_eq!(rejected.name, "twin");
        assert_eq!(scene.len(), 1);

        let mut again = SceneObject::shape(ShapeKind::Box, Vec3::ZERO);
        again.id = ids[0];
        assert_eq!(scene.insert(again), Err(SceneError::DuplicateId(ids[0])));
    }

    #[test]
    fn remove_preserves_order_of_rest() {
        let arena = ResourceArena::new();
        let (mut scene, ids) = scene_with(&["a", "b", "c"]);
        scene.remove(ids[1], &arena).unwrap();
        let names: Vec<_> = scene.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn removing_selected_clears_selection() {
        let arena = ResourceArena::new();
        let (mut scene, ids) = scene_with(&["a"]);
        scene.select(ids[0]).unwrap();
        scene.remove(ids[0], &arena).unwrap();
        assert_eq!(scene.selected(), None);
    }

    #[test]
    fn remove_releases_resources_exactly_once() {
        let arena = ResourceArena::new();
        let doc = arena.insert("scene.gltf", b"{}".to_vec());
        let mut scene = SceneState::new();
        let id = scene
            .insert(SceneObject::imported("car", ModelResources::single(doc), Vec3::ZERO))
            .unwrap();

        assert_eq!(scene.remove(id, &arena).unwrap(), 1);
        assert_eq!(scene.remove(id, &arena), Err(SceneError::NotFound(id)));
        assert_eq!(scene.clear(&arena), (0, 0));
        assert_eq!(arena.stats().total_freed, 1);
    }

    #[test]
    fn clear_releases_everything() {
        let arena = ResourceArena::new();
        let mut scene = SceneState::new();
        for name in ["car", "tree"] {
            let doc = arena.insert(format!("{name}.glb"), vec![0u8; 4]);
            let tex = arena.insert(format!("{name}.png"), vec![0u8; 4]);
            let resources = ModelResources {
                document: doc,
                assets: vec![tex],
            };
            scene.insert(SceneObject::imported(name, resources, Vec3::ZERO)).unwrap();
        }
        scene.insert(SceneObject::shape(ShapeKind::Sphere, Vec3::ONE)).unwrap();

        assert_eq!(scene.clear(&arena), (3, 4));
        assert!(arena.is_empty());
        assert!(scene.is_empty());
    }

    #[test]
    fn duplicate_insert_rejected() {
        let mut scene = SceneState::new();
        let obj = SceneObject::shape(ShapeKind::Box, Vec3::ZERO);
        let id = obj.id;
        scene.insert(obj).unwrap();

        let mut dup = SceneObject::shape(ShapeKind::Box, Vec3::ZERO);
        dup.id = id;
        assert_eq!(scene.insert(dup), Err(SceneError::DuplicateId(id)));
    }

    #[test]
    fn find_by_name_matches_case_insensitively() {
        let (scene, _) = scene_with(&["Car", "car", "tree"]);
        assert_eq!(scene.find_by_name("CAR").count(), 2);
        assert_eq!(scene.find_by_name("bush").count(), 0);
    }

    #[tokio::test]
    async fn events_are_published() {
        let arena = ResourceArena::new();
        let mut scene = SceneState::new();
        let mut rx = scene.subscribe();

        let id = scene.insert(SceneObject::shape(ShapeKind::Torus, Vec3::ZERO)).unwrap();
        scene.select(id).unwrap();
        scene.update(id, |o| o.position.x += 1.0).unwrap();
        scene.clear(&arena);

        assert_eq!(rx.recv().await.unwrap(), SceneEvent::Added(id));
        assert_eq!(rx.recv().await.unwrap(), SceneEvent::SelectionChanged(Some(id)));
        assert_eq!(rx.recv().await.unwrap(), SceneEvent::Updated(id));
        assert_eq!(rx.recv().await.unwrap(), SceneEvent::SelectionChanged(None));
        assert_eq!(rx.recv().await.unwrap(), SceneEvent::Cleared);
    }

    proptest::proptest! {
        #[test]
        fn prop_removal_frees_every_handle_once(
            models in 0..12usize,
            assets_per_model in 0..4usize,
            remove_first in proptest::collection::vec(proptest::bool::ANY, 12)
        ) {
            let arena = ResourceArena::new();
            let mut scene = SceneState::new();
            let mut ids = Vec::new();
            for m in 0..models {
                let document = arena.insert(format!("m{m}.gltf"), b"{}".to_vec());
                let assets = (0..assets_per_model)
                    .map(|a| arena.insert(format!("m{m}/{a}.png"), vec![0u8]))
                    .collect();
                let resources = ModelResources { document, assets };
                ids.push(scene.insert(SceneObject::imported("m", resources, Vec3::ZERO)).unwrap());
            }

            for (id, remove) in ids.iter().zip(&remove_first) {
                if *remove {
                    scene.remove(*id, &arena).unwrap();
                }
            }
            scene.clear(&arena);

            proptest::prop_assert!(arena.is_empty());
            proptest::prop_assert_eq!(arena.stats().total_freed, models * (1 + assets_per_model));
        }
    }
}
