//! Prompt construction
//!
//! The system instruction carries the action vocabulary, the shape palette,
//! one worked example per action kind, the interpretation rules and a bounded
//! JSON snapshot of the scene.

use crate::model::ChatRequest;
use sculpt_scene::{SceneSnapshot, ShapeKind};
use std::fmt::Write;

/// Worked examples: (command, expected output)
pub const EXAMPLES: &[(&str, &str)] = &[
    (
        "add a sphere",
        r#"{"action":"add","type":"SphereGeometry","value":{"position":{"x":1,"y":0,"z":0}}}"#,
    ),
    (
        "add a sphere and a cube",
        r#"{"actions":[{"action":"add","type":"SphereGeometry","value":{"position":{"x":1,"y":0,"z":0}}},{"action":"add","type":"BoxGeometry","value":{"position":{"x":4,"y":0,"z":0}}}]}"#,
    ),
    (
        "add three cones in a row",
        r#"{"action":"addMultiple","value":[{"type":"ConeGeometry","position":{"x":-2,"y":0,"z":0}},{"type":"ConeGeometry","position":{"x":0,"y":0,"z":0}},{"type":"ConeGeometry","position":{"x":2,"y":0,"z":0}}]}"#,
    ),
    (
        "move the cylinder to the left by 5",
        r#"{"action":"manipulate","actionType":"move","name":"cylinder","value":{"x":-5}}"#,
    ),
    (
        "rotate the leftmost object by 45 degrees",
        r#"{"action":"manipulate","actionType":"rotate","name":"<leftmost name>","value":{"y":45}}"#,
    ),
    (
        "make the torus twice as tall",
        r#"{"action":"manipulate","actionType":"scale","name":"torus","value":{"y":2}}"#,
    ),
    (
        "delete object 01J9Z3K4M5N6P7Q8R9S0T1V2W3",
        r#"{"action":"manipulate","actionType":"delete","targetId":"01J9Z3K4M5N6P7Q8R9S0T1V2W3"}"#,
    ),
    ("select the car", r#"{"action":"select","name":"car"}"#),
    (
        "paint the sphere red",
        r#"{"action":"color","name":"sphere","value":{"color":"red"}}"#,
    ),
    ("add a tree", r#"{"action":"search","value":"tree"}"#),
    ("what is in the scene?", r#"{"action":"list"}"#),
    ("remove everything", r#"{"action":"clear"}"#),
    (
        "delete all cylinders",
        r#"{"action":"deleteMultiple","name":"CylinderGeometry"}"#,
    ),
    (
        "delete the cylinder (two cylinders present)",
        r#"{"feedback":"Multiple objects found for cylinder, please specify an id or select one"}"#,
    ),
];

const ROLE: &str = "You control a 3D scene. Translate the user's command into JSON actions. \
Answer with a single JSON object and nothing else: either one action object, or \
{\"actions\": [...]} holding several action objects in the order they should run.";

const VOCABULARY: &str = "\
Each action object has:
- \"action\": one of add, addMultiple, manipulate, select, color, search, list, clear, deleteMultiple
- \"type\": shape name, required for add and for each addMultiple item
- \"actionType\": move, rotate, scale or delete (manipulate only)
- \"value\": a position {\"position\":{\"x\":..,\"y\":..,\"z\":..}}, a delta {\"x\":..,\"y\":..,\"z\":..} \
(rotation in degrees, scale as a factor), {\"color\":..}, a search term, or the item list of addMultiple
- \"name\": optional, the object's name or shape
- \"targetId\": optional, only when the user gives an object id
- \"targetIds\": optional id list for deleteMultiple, only when the user gives ids";

const RULES: &str = "\
Rules:
- Split conjoined requests (\"a sphere, a cube and a car\") into one action each; never drop a request.
- Only the shapes listed above can be added. Anything else (a car, a tree) is a search action with the thing as its value.
- Prefer names over ids. Use targetId/targetIds only when the user states ids.
- Positions not given by the user: x and y in [-2, 2], z in [-1, 3]. Use existing positions for relative placement.
- For \"leftmost\"/\"rightmost\" use the spatial hints below.
- If a reference is ambiguous, answer {\"feedback\": \"<question for the user>\"} instead of guessing.
- Synonyms: insert means add, removeAll means clear.";

/// Builds the instruction payload for one command
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    max_snapshot_objects: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBuilder {
    /// Create builder with default snapshot bound
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_snapshot_objects: 200,
        }
    }

    /// Bound the objects embedded in the prompt
    #[inline]
    #[must_use]
    pub fn with_max_snapshot_objects(mut self, max: usize) -> Self {
        self.max_snapshot_objects = max;
        self
    }

    /// Full request for a command
    #[must_use]
    pub fn build(&self, command: &str, snapshot: &SceneSnapshot) -> ChatRequest {
        let system = self.system_prompt(snapshot);
        tracing::debug!(
            prompt_bytes = system.len(),
            objects = snapshot.objects.len(),
            "prompt built"
        );
        ChatRequest {
            system,
            user: command.trim().to_string(),
        }
    }

    /// System instruction for a snapshot
    #[must_use]
    pub fn system_prompt(&self, snapshot: &SceneSnapshot) -> String {
        let bounded = snapshot.clone().bounded(self.max_snapshot_objects);
        let mut out = String::with_capacity(4096);

        // Writing into a String cannot fail
        let _ = writeln!(out, "{ROLE}\n\n{VOCABULARY}\n");
        let _ = writeln!(out, "Shapes: {}\n", shape_list());
        let _ = writeln!(out, "{RULES}\n");

        out.push_str("Examples:\n");
        for (command, answer) in EXAMPLES {
            let _ = writeln!(out, "- \"{command}\" -> {answer}");
        }

        out.push_str("\nSpatial hints:\n");
        match (&bounded.spatial.leftmost, &bounded.spatial.rightmost) {
            (Some(left), Some(right)) => {
                let _ = writeln!(out, "- leftmost: {} ({})", left.name, left.id);
                let _ = writeln!(out, "- rightmost: {} ({})", right.name, right.id);
            }
            _ => out.push_str("- the scene has no objects\n"),
        }

        if bounded.omitted > 0 {
            let _ = writeln!(
                out,
                "\nNote: {} older objects are not shown below.",
                bounded.omitted
            );
        }

        let scene = serde_json::to_string(&bounded).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to serialize snapshot");
            "{}".to_string()
        });
        let _ = write!(out, "\nCurrent scene: {scene}");
        out
    }
}

fn shape_list() -> String {
    ShapeKind::ALL
        .iter()
        .map(|s| format!("{} ({})", s.geometry_name(), s.short_name()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use sculpt_action::{normalize_batch, ActionValidator};
    use sculpt_scene::{SceneObject, SceneState};

    #[test]
    fn prompt_mentions_every_shape_and_action() {
        let prompt = PromptBuilder::new().system_prompt(&SceneState::new().snapshot());
        for name in ShapeKind::geometry_names() {
            assert!(prompt.contains(name), "missing {name}");
        }
        for tag in [
            "add", "addMultiple", "manipulate", "select", "color", "search", "list", "clear",
            "deleteMultiple", "feedback",
        ] {
            assert!(prompt.contains(&format!("\"{tag}\"")), "missing {tag}");
        }
        assert!(prompt.contains("the scene has no objects"));
    }

    #[test]
    fn examples_are_valid_wire_actions() {
        let mut rng = StdRng::seed_from_u64(3);
        let validator = ActionValidator::new();
        for (command, answer) in EXAMPLES {
            let value: serde_json::Value = serde_json::from_str(answer).unwrap();
            for candidate in normalize_batch(value).unwrap() {
                assert!(
                    validator.validate(&candidate, &mut rng).is_ok(),
                    "example for '{command}' does not validate"
                );
            }
        }
    }

    #[test]
    fn snapshot_is_bounded_but_hints_cover_everything() {
        let mut scene = SceneState::new();
        let first = scene
            .insert(SceneObject::shape(ShapeKind::Box, Vec3::new(-9.0, 0.0, 0.0)).with_name("far-left"))
            .unwrap();
        for i in 0..5u8 {
            scene
                .insert(SceneObject::shape(ShapeKind::Sphere, Vec3::new(f32::from(i), 0.0, 0.0)))
                .unwrap();
        }

        let prompt = PromptBuilder::new()
            .with_max_snapshot_objects(2)
            .system_prompt(&scene.snapshot());
        assert!(prompt.contains("4 older objects are not shown"));
        assert!(prompt.contains(&format!("leftmost: far-left ({first})")));
    }

    #[test]
    fn build_trims_user_text() {
        let request = PromptBuilder::new().build("  add a cube \n", &SceneState::new().snapshot());
        assert_eq!(request.user, "add a cube");
    }
}
