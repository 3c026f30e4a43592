//! Target resolution
//!
//! Maps a [`TargetRef`] onto the scene. Resolution never guesses: several
//! objects sharing a name yield [`Resolution::Ambiguous`] and the caller reports
//! it instead of mutating.

use crate::action::{DeleteSelector, TargetRef};
use sculpt_scene::{ObjectId, ObjectKind, SceneObject, SceneState, ShapeKind};

/// Outcome of resolving a single reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Exactly one object
    Resolved(ObjectId),
    /// Several objects answer to the name
    Ambiguous {
        /// Name as given
        name: String,
        /// Number of matches
        count: usize,
    },
    /// Nothing to act on
    NotFound {
        /// Reference as given, for the message
        reference: String,
    },
}

impl Resolution {
    /// Resolved id, if any
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<ObjectId> {
        match self {
            Resolution::Resolved(id) => Some(*id),
            _ => None,
        }
    }

    /// User-facing explanation for unresolved references
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Resolution::Resolved(id) => format!("Resolved to {id}."),
            Resolution::Ambiguous { name, count } => {
                format!("{count} objects are named '{name}', please specify which one by id.")
            }
            Resolution::NotFound { reference } => format!("No object found for {reference}."),
        }
    }
}

/// Kind match for names like `cylinder` or `CylinderGeometry`
fn kind_matches(name: &str) -> Option<impl Fn(&&SceneObject) -> bool> {
    let shape = name.parse::<ShapeKind>().ok()?;
    Some(move |o: &&SceneObject| o.kind == ObjectKind::Shape(shape))
}

/// Resolve one reference against the scene
///
/// By name: exact (case-insensitive) name matches first, then objects whose
/// kind the name denotes, then the current selection.
#[must_use]
pub fn resolve(target: &TargetRef, scene: &SceneState) -> Resolution {
    let not_found = || Resolution::NotFound {
        reference: target.to_string(),
    };

    let resolution = match target {
        TargetRef::ById(id) => scene.get(*id).map_or_else(not_found, |o| Resolution::Resolved(o.id)),
        TargetRef::Selection => scene.selected().map_or_else(not_found, Resolution::Resolved),
        TargetRef::ByName(name) => {
            let mut matches: Vec<ObjectId> = scene.find_by_name(name).map(|o| o.id).collect();
            if matches.is_empty() {
                if let Some(is_kind) = kind_matches(name) {
                    matches = scene.iter().filter(is_kind).map(|o| o.id).collect();
                }
            }

            match matches.as_slice() {
                [id] => Resolution::Resolved(*id),
                [] => scene.selected().map_or_else(not_found, Resolution::Resolved),
                many => Resolution::Ambiguous {
                    name: name.clone(),
                    count: many.len(),
                },
            }
        }
    };

    tracing::trace!(%target, ?resolution, "target resolved");
    resolution
}

/// Resolve a bulk selector; all matches, in scene order
///
/// By name: every object whose name matches, or failing that every object of
/// the kind the name denotes.
#[must_use]
pub fn resolve_many(selector: &DeleteSelector, scene: &SceneState) -> Vec<ObjectId> {
    match selector {
        DeleteSelector::Ids(ids) => scene.iter().filter(|o| ids.contains(&o.id)).map(|o| o.id).collect(),
        DeleteSelector::Name(name) => {
            let named: Vec<ObjectId> = scene.find_by_name(name).map(|o| o.id).collect();
            if !named.is_empty() {
                return named;
            }
            kind_matches(name)
                .map(|is_kind| scene.iter().filter(is_kind).map(|o| o.id).collect())
                .unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use proptest::prelude::*;

    fn add(scene: &mut SceneState, kind: ShapeKind, name: Option<&str>) -> ObjectId {
        let mut obj = SceneObject::shape(kind, Vec3::ZERO);
        if let Some(name) = name {
            obj = obj.with_name(name);
        }
        scene.insert(obj).unwrap()
    }

    #[test]
    fn by_id() {
        let mut scene = SceneState::new();
        let id = add(&mut scene, ShapeKind::Box, None);
        assert_eq!(resolve(&TargetRef::ById(id), &scene), Resolution::Resolved(id));

        let other = ObjectId::new();
        assert!(matches!(
            resolve(&TargetRef::ById(other), &scene),
            Resolution::NotFound { .. }
        ));
    }

    #[test]
    fn by_name_unique_and_ambiguous() {
        let mut scene = SceneState::new();
        let car = add(&mut scene, ShapeKind::Box, Some("Car"));
        add(&mut scene, ShapeKind::Cylinder, Some("pillar"));
        add(&mut scene, ShapeKind::Cylinder, Some("Pillar"));

        assert_eq!(resolve(&TargetRef::ByName("car".into()), &scene), Resolution::Resolved(car));
        assert_eq!(
            resolve(&TargetRef::ByName("PILLAR".into()), &scene),
            Resolution::Ambiguous {
                name: "PILLAR".into(),
                count: 2
            }
        );
    }

    #[test]
    fn by_kind_name() {
        let mut scene = SceneState::new();
        let cone = add(&mut scene, ShapeKind::Cone, Some("hat"));
        assert_eq!(resolve(&TargetRef::ByName("cone".into()), &scene), Resolution::Resolved(cone));
    }

    #[test]
    fn unmatched_name_falls_back_to_selection() {
        let mut scene = SceneState::new();
        let id = add(&mut scene, ShapeKind::Torus, None);

        let target = TargetRef::ByName("spaceship".into());
        assert!(matches!(resolve(&target, &scene), Resolution::NotFound { .. }));

        scene.select(id).unwrap();
        assert_eq!(resolve(&target, &scene), Resolution::Resolved(id));
    }

    #[test]
    fn selection_requires_live_object() {
        let arena = sculpt_scene::ResourceArena::new();
        let mut scene = SceneState::new();
        let id = add(&mut scene, ShapeKind::Sphere, None);
        scene.select(id).unwrap();
        assert_eq!(resolve(&TargetRef::Selection, &scene), Resolution::Resolved(id));

        scene.remove(id, &arena).unwrap();
        assert!(matches!(resolve(&TargetRef::Selection, &scene), Resolution::NotFound { .. }));
    }

    #[test]
    fn resolve_many_by_name_and_ids() {
        let mut scene = SceneState::new();
        let a = add(&mut scene, ShapeKind::Cylinder, None);
        let b = add(&mut scene, ShapeKind::Box, None);
        let c = add(&mut scene, ShapeKind::Cylinder, None);

        assert_eq!(
            resolve_many(&DeleteSelector::Name("CylinderGeometry".into()), &scene),
            vec![a, c]
        );
        assert_eq!(resolve_many(&DeleteSelector::Name("cylinder".into()), &scene), vec![a, c]);
        assert_eq!(resolve_many(&DeleteSelector::Ids(vec![c, b]), &scene), vec![b, c]);
        assert!(resolve_many(&DeleteSelector::Name("tree".into()), &scene).is_empty());
    }

    #[test]
    fn messages_are_user_facing() {
        let amb = Resolution::Ambiguous {
            name: "car".into(),
            count: 3,
        };
        assert!(amb.message().contains("3 objects"));
        let nf = Resolution::NotFound {
            reference: "'tree'".into(),
        };
        assert_eq!(nf.message(), "No object found for 'tree'.");
    }

    proptest! {
        #[test]
        fn prop_name_resolution_never_guesses(names in proptest::collection::vec("[a-c]", 0..8), query in "[a-c]") {
            let mut scene = SceneState::new();
            for n in &names {
                add(&mut scene, ShapeKind::Box, Some(n.as_str()));
            }
            let count = names.iter().filter(|n| **n == query).count();

            match resolve(&TargetRef::ByName(query.clone()), &scene) {
                Resolution::Resolved(id) => {
                    prop_assert_eq!(count, 1);
                    prop_assert_eq!(scene.get(id).map(|o| o.name.clone()), Some(query));
                }
                Resolution::Ambiguous { count: n, .. } => {
                    prop_assert!(count >= 2);
                    prop_assert_eq!(n, count);
                }
                Resolution::NotFound { .. } => prop_assert_eq!(count, 0),
            }
        }

        #[test]
        fn prop_resolve_many_ids_is_subset_in_scene_order(picks in proptest::collection::vec(proptest::bool::ANY, 0..10)) {
            let mut scene = SceneState::new();
            let ids: Vec<_> = picks.iter().map(|_| add(&mut scene, ShapeKind::Sphere, None)).collect();
            let chosen: Vec<_> = ids.iter().zip(&picks).filter(|(_, p)| **p).map(|(id, _)| *id).collect();
            let mut reversed = chosen.clone();
            reversed.reverse();
            reversed.push(ObjectId::new());

            prop_assert_eq!(resolve_many(&DeleteSelector::Ids(reversed), &scene), chosen);
        }
    }
}
