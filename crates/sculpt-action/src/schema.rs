//! Wire-format validation
//!
//! Turns the loosely structured JSON the interpreter returns into typed
//! [`Action`]s:
//! - Batch normalization (bare object, array, or `actions` wrapper)
//! - Tag recognition including the accepted synonyms
//! - Per-field checks with defaults for positions and deltas
//!
//! Validation is element-local: a bad element yields its own `SchemaError`
//! and never affects its siblings.

use crate::action::{
    Action, AddItem, AxisDelta, DeleteSelector, ManipulateOp, TargetRef, FALLBACK_MOVE,
    FALLBACK_ROTATE, FALLBACK_SCALE,
};
use crate::error::{json_type, SchemaError};
use glam::Vec3;
use rand::Rng;
use sculpt_scene::{ObjectId, ShapeKind};
use serde_json::{Map, Value};

/// Keys a model may wrap its action list in
pub const WRAPPER_KEYS: [&str; 2] = ["actions", "results"];

const DEFAULT_AMBIGUOUS_MESSAGE: &str = "The command is ambiguous, please be more specific.";

/// Manipulation kinds on the wire (`actionType`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// `move`
    Move,
    /// `rotate`
    Rotate,
    /// `scale`
    Scale,
    /// `delete`
    Delete,
}

impl OpKind {
    /// Parse an `actionType` value
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "move" | "translate" => Some(OpKind::Move),
            "rotate" | "turn" | "spin" => Some(OpKind::Rotate),
            "scale" | "resize" => Some(OpKind::Scale),
            "delete" | "remove" => Some(OpKind::Delete),
            _ => None,
        }
    }
}

/// Recognized `action` tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionTag {
    /// `add`, `insert`, `create`
    Add,
    /// `addMultiple`
    AddMultiple,
    /// `manipulate`; the op may be implied by a verb tag such as `move`
    Manipulate(Option<OpKind>),
    /// `select`
    Select,
    /// `color`, `colour`, `paint`
    Color,
    /// `search`, `import`
    Search,
    /// `list`
    List,
    /// `clear`, `removeAll`, `deleteAll`
    Clear,
    /// `deleteMultiple`
    DeleteMultiple,
    /// `ambiguous` or a bare `feedback` object
    Ambiguous,
}

impl ActionTag {
    /// Parse a tag string, case-insensitively
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        let lower = tag.trim().to_ascii_lowercase();
        let tag = match lower.as_str() {
            "add" | "insert" | "create" | "spawn" => ActionTag::Add,
            "addmultiple" => ActionTag::AddMultiple,
            "manipulate" | "transform" => ActionTag::Manipulate(None),
            "select" | "pick" => ActionTag::Select,
            "color" | "colour" | "paint" => ActionTag::Color,
            "search" | "import" => ActionTag::Search,
            "list" => ActionTag::List,
            "clear" | "removeall" | "deleteall" => ActionTag::Clear,
            "deletemultiple" => ActionTag::DeleteMultiple,
            "ambiguous" | "feedback" => ActionTag::Ambiguous,
            other => return OpKind::parse(other).map(|op| ActionTag::Manipulate(Some(op))),
        };
        Some(tag)
    }

    /// Tag of a candidate; a tagless object carrying `feedback` is `Ambiguous`
    ///
    /// # Errors
    /// - `SchemaError::NotAnObject` for non-object candidates
    /// - `SchemaError::MissingTag` / `SchemaError::UnknownAction`
    pub fn of(candidate: &Value) -> Result<Self, SchemaError> {
        let obj = candidate.as_object().ok_or(SchemaError::NotAnObject {
            found: json_type(candidate),
        })?;
        match obj.get("action") {
            Some(Value::String(tag)) => {
                Self::parse(tag).ok_or_else(|| SchemaError::UnknownAction(tag.clone()))
            }
            Some(other) => Err(SchemaError::invalid(
                "action",
                "action",
                format!("expected a string, found {}", json_type(other)),
            )),
            None if text(obj, "feedback").is_some() => Ok(ActionTag::Ambiguous),
            None => Err(SchemaError::MissingTag),
        }
    }
}

/// Whether a candidate carries a tag the validator understands
#[must_use]
pub fn is_recognized(candidate: &Value) -> bool {
    ActionTag::of(candidate).is_ok()
}

/// Normalize a decoded model response into a list of candidates
///
/// # Errors
/// - `SchemaError::NotABatch` for scalars
/// - `SchemaError::EmptyBatch` when nothing remains
pub fn normalize_batch(value: Value) -> Result<Vec<Value>, SchemaError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match unwrap_wrapper(&mut map) {
            Some(items) => items,
            None => vec![Value::Object(map)],
        },
        other => {
            return Err(SchemaError::NotABatch {
                found: json_type(&other),
            })
        }
    };

    if items.is_empty() {
        return Err(SchemaError::EmptyBatch);
    }
    Ok(items)
}

fn unwrap_wrapper(map: &mut Map<String, Value>) -> Option<Vec<Value>> {
    if map.contains_key("action") {
        return None;
    }
    let key = WRAPPER_KEYS
        .iter()
        .find(|k| matches!(map.get(**k), Some(Value::Array(_))))?;
    match map.remove(*key) {
        Some(Value::Array(items)) => Some(items),
        _ => None,
    }
}

/// Validate a single candidate with the default validator
///
/// # Errors
/// Returns the first problem found in the candidate.
pub fn validate_candidate<R: Rng + ?Sized>(candidate: &Value, rng: &mut R) -> Result<Action, SchemaError> {
    ActionValidator::new().validate(candidate, rng)
}

/// Validates wire candidates into typed actions
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionValidator;

impl ActionValidator {
    /// Create new validator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Normalize and validate a whole response
    ///
    /// The outer `Result` fails only for batch-level problems; each element
    /// carries its own outcome.
    ///
    /// # Errors
    /// - `SchemaError::EmptyBatch` / `SchemaError::NotABatch`
    pub fn validate_batch<R: Rng + ?Sized>(
        &self,
        value: Value,
        rng: &mut R,
    ) -> Result<Vec<Result<Action, SchemaError>>, SchemaError> {
        let candidates = normalize_batch(value)?;
        Ok(candidates.iter().map(|c| self.validate(c, rng)).collect())
    }

    /// Validate a single candidate
    ///
    /// `rng` supplies default spawn positions.
    ///
    /// # Errors
    /// Returns the first problem found in the candidate.
    pub fn validate<R: Rng + ?Sized>(&self, candidate: &Value, rng: &mut R) -> Result<Action, SchemaError> {
        let tag = ActionTag::of(candidate)?;
        // `of` succeeded, so this is an object
        let Some(obj) = candidate.as_object() else {
            return Err(SchemaError::NotAnObject {
                found: json_type(candidate),
            });
        };

        let action = match tag {
            ActionTag::Add => Action::Add(add_item(obj, "add", rng)?),
            ActionTag::AddMultiple => Action::AddMultiple {
                items: add_items(obj, rng)?,
            },
            ActionTag::Manipulate(implied) => manipulate(obj, implied)?,
            ActionTag::Select => Action::Select {
                target: target(obj, "select")?,
            },
            ActionTag::Color => Action::Color {
                target: target(obj, "color")?,
                color: color(obj)?,
            },
            ActionTag::Search => Action::Search {
                term: search_term(obj)?,
            },
            ActionTag::List => Action::List,
            ActionTag::Clear => Action::Clear,
            ActionTag::DeleteMultiple => Action::DeleteMultiple {
                selector: delete_selector(obj)?,
            },
            ActionTag::Ambiguous => Action::Ambiguous {
                message: text(obj, "feedback")
                    .or_else(|| text(obj, "message"))
                    .or_else(|| obj.get("value").and_then(Value::as_str).map(str::trim))
                    .filter(|m| !m.is_empty())
                    .unwrap_or(DEFAULT_AMBIGUOUS_MESSAGE)
                    .to_string(),
            },
        };

        tracing::trace!(tag = action.tag(), "candidate validated");
        Ok(action)
    }
}

/// Trimmed, non-empty string field
fn text<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// `value` as an object, if it is one
fn value_object(obj: &Map<String, Value>) -> Option<&Map<String, Value>> {
    obj.get("value").and_then(Value::as_object)
}

fn number(value: &Value, action: &'static str, field: &str) -> Result<Option<f32>, SchemaError> {
    let parsed = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        other => {
            return Err(SchemaError::invalid(
                action,
                field,
                format!("expected a number, found {}", json_type(other)),
            ))
        }
    };

    match parsed {
        #[allow(clippy::cast_possible_truncation)]
        Some(v) if v.is_finite() => Ok(Some(v as f32)),
        _ => Err(SchemaError::invalid(action, field, "expected a finite number")),
    }
}

/// Per-axis values from `{x, y, z}` or `[x, y, z]`
fn axes(value: &Value, action: &'static str, field: &str) -> Result<AxisDelta, SchemaError> {
    match value {
        Value::Object(map) => {
            let axis = |key: &str| match map.get(key) {
                Some(v) => number(v, action, &format!("{field}.{key}")),
                None => Ok(None),
            };
            Ok(AxisDelta {
                x: axis("x")?,
                y: axis("y")?,
                z: axis("z")?,
            })
        }
        Value::Array(items) if items.len() == 3 => Ok(AxisDelta {
            x: number(&items[0], action, &format!("{field}[0]"))?,
            y: number(&items[1], action, &format!("{field}[1]"))?,
            z: number(&items[2], action, &format!("{field}[2]"))?,
        }),
        other => Err(SchemaError::invalid(
            action,
            field,
            format!("expected {{x, y, z}}, found {}", json_type(other)),
        )),
    }
}

/// Spawn position; absent axes are drawn independently at random
fn position<R: Rng + ?Sized>(
    value: Option<&Value>,
    action: &'static str,
    field: &str,
    rng: &mut R,
) -> Result<Vec3, SchemaError> {
    let random = sculpt_scene::random_position(rng);
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Ok(random);
    };
    let given = axes(value, action, field)?;
    Ok(Vec3::new(
        given.x.unwrap_or(random.x),
        given.y.unwrap_or(random.y),
        given.z.unwrap_or(random.z),
    ))
}

fn shape(raw: Option<&Value>, action: &'static str, field: &'static str) -> Result<ShapeKind, SchemaError> {
    let name = raw
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(SchemaError::MissingField { action, field })?;
    name.parse().map_err(|_| SchemaError::UnknownShape {
        action,
        field,
        value: name.to_string(),
    })
}

fn add_item<R: Rng + ?Sized>(
    obj: &Map<String, Value>,
    action: &'static str,
    rng: &mut R,
) -> Result<AddItem, SchemaError> {
    let value = value_object(obj);
    let raw_shape = obj
        .get("type")
        .or_else(|| obj.get("shape"))
        .or_else(|| value.and_then(|v| v.get("type")));
    let shape = shape(raw_shape, action, "type")?;

    let (raw_position, field) = match value.and_then(|v| v.get("position")) {
        Some(p) => (Some(p), "value.position"),
        None => (obj.get("position"), "position"),
    };
    let position = position(raw_position, action, field, rng)?;
    Ok(AddItem { shape, position })
}

fn add_items<R: Rng + ?Sized>(
    obj: &Map<String, Value>,
    rng: &mut R,
) -> Result<Vec<Result<AddItem, SchemaError>>, SchemaError> {
    const ACTION: &str = "addMultiple";

    let list = match obj.get("value") {
        Some(Value::Array(items)) => Some(items),
        Some(Value::Object(map)) => map.get("items").and_then(Value::as_array),
        _ => None,
    }
    .or_else(|| obj.get("items").and_then(Value::as_array))
    .ok_or(SchemaError::MissingField {
        action: ACTION,
        field: "value",
    })?;

    if list.is_empty() {
        return Err(SchemaError::invalid(ACTION, "value", "expected at least one item"));
    }

    Ok(list
        .iter()
        .map(|item| match item.as_object() {
            Some(item) => add_item(item, ACTION, rng),
            None => Err(SchemaError::NotAnObject {
                found: json_type(item),
            }),
        })
        .collect())
}

fn target(obj: &Map<String, Value>, action: &'static str) -> Result<TargetRef, SchemaError> {
    match obj.get("targetId") {
        Some(Value::String(raw)) if !raw.trim().is_empty() => {
            return raw
                .parse::<ObjectId>()
                .map(TargetRef::ById)
                .map_err(|_| SchemaError::InvalidTargetId {
                    action,
                    field: "targetId",
                    value: raw.clone(),
                });
        }
        Some(Value::Null | Value::String(_)) | None => {}
        Some(other) => {
            return Err(SchemaError::InvalidTargetId {
                action,
                field: "targetId",
                value: other.to_string(),
            })
        }
    }

    Ok(text(obj, "name").map_or(TargetRef::Selection, |name| TargetRef::ByName(name.to_string())))
}

fn manipulate(obj: &Map<String, Value>, implied: Option<OpKind>) -> Result<Action, SchemaError> {
    const ACTION: &str = "manipulate";

    let op_kind = match (text(obj, "actionType"), implied) {
        (Some(raw), _) => OpKind::parse(raw)
            .ok_or_else(|| SchemaError::invalid(ACTION, "actionType", format!("unknown operation '{raw}'")))?,
        (None, Some(op)) => op,
        (None, None) => {
            return Err(SchemaError::MissingField {
                action: ACTION,
                field: "actionType",
            })
        }
    };

    let op = match op_kind {
        OpKind::Delete => ManipulateOp::Delete,
        OpKind::Move => ManipulateOp::Move(delta(obj, op_kind)?.unwrap_or(FALLBACK_MOVE)),
        OpKind::Rotate => ManipulateOp::Rotate(
            delta(obj, op_kind)?
                .map(|d| d.map(f32::to_radians))
                .unwrap_or(FALLBACK_ROTATE),
        ),
        OpKind::Scale => ManipulateOp::Scale(delta(obj, op_kind)?.unwrap_or(FALLBACK_SCALE)),
    };

    Ok(Action::Manipulate {
        op,
        target: target(obj, ACTION)?,
    })
}

/// Delta from `value`; `None` when no delta was supplied at all
///
/// Rotation deltas are returned in degrees.
fn delta(obj: &Map<String, Value>, op: OpKind) -> Result<Option<AxisDelta>, SchemaError> {
    const ACTION: &str = "manipulate";

    let value = match obj.get("value") {
        None | Some(Value::Null) => return Ok(None),
        Some(v) => v,
    };

    if let Some(n) = number_like(value) {
        let n = number(n, ACTION, "value")?.unwrap_or_default();
        let d = match op {
            OpKind::Move => AxisDelta::x(n),
            OpKind::Rotate => AxisDelta::y(n),
            OpKind::Scale => AxisDelta {
                x: Some(n),
                y: Some(n),
                z: Some(n),
            },
            OpKind::Delete => AxisDelta::default(),
        };
        return Ok(Some(d));
    }

    if let Some(map) = value.as_object() {
        let has_axes = ["x", "y", "z"].iter().any(|k| map.contains_key(*k));
        if !has_axes {
            let nested = ["position", "rotation", "scale", "delta"]
                .iter()
                .find_map(|k| map.get(*k).map(|v| (*k, v)));
            if let Some((key, nested)) = nested {
                return axes(nested, ACTION, &format!("value.{key}")).map(Some);
            }
        }
    }

    axes(value, ACTION, "value").map(Some)
}

fn number_like(value: &Value) -> Option<&Value> {
    match value {
        Value::Number(_) => Some(value),
        Value::String(s) if s.trim().parse::<f64>().is_ok() => Some(value),
        _ => None,
    }
}

fn color(obj: &Map<String, Value>) -> Result<String, SchemaError> {
    value_object(obj)
        .and_then(|v| text(v, "color"))
        .or_else(|| obj.get("value").and_then(Value::as_str).map(str::trim))
        .or_else(|| text(obj, "color"))
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .ok_or(SchemaError::MissingField {
            action: "color",
            field: "value.color",
        })
}

fn search_term(obj: &Map<String, Value>) -> Result<String, SchemaError> {
    obj.get("value")
        .and_then(Value::as_str)
        .map(str::trim)
        .or_else(|| value_object(obj).and_then(|v| text(v, "term").or_else(|| text(v, "query"))))
        .or_else(|| text(obj, "term"))
        .or_else(|| text(obj, "query"))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or(SchemaError::MissingField {
            action: "search",
            field: "value",
        })
}

fn delete_selector(obj: &Map<String, Value>) -> Result<DeleteSelector, SchemaError> {
    const ACTION: &str = "deleteMultiple";

    match obj.get("targetIds") {
        Some(Value::Array(raw)) if !raw.is_empty() => {
            let ids = raw
                .iter()
                .map(|v| {
                    v.as_str()
                        .and_then(|s| s.parse::<ObjectId>().ok())
                        .ok_or_else(|| SchemaError::InvalidTargetId {
                            action: ACTION,
                            field: "targetIds",
                            value: v.as_str().map_or_else(|| v.to_string(), str::to_string),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(DeleteSelector::Ids(ids));
        }
        Some(Value::Array(_) | Value::Null) | None => {}
        Some(other) => {
            return Err(SchemaError::invalid(
                ACTION,
                "targetIds",
                format!("expected an array, found {}", json_type(other)),
            ))
        }
    }

    text(obj, "name")
        .or_else(|| text(obj, "type"))
        .map(|name| DeleteSelector::Name(name.to_string()))
        .ok_or(SchemaError::MissingField {
            action: ACTION,
            field: "targetIds",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn validate(value: Value) -> Result<Action, SchemaError> {
        ActionValidator::new().validate(&value, &mut rng())
    }

    #[test]
    fn normalize_bare_object() {
        let batch = normalize_batch(json!({"action": "list"})).unwrap();
        assert_eq!(batch, vec![json!({"action": "list"})]);
    }

    #[test]
    fn normalize_unwraps_actions_key() {
        let batch = normalize_batch(json!({"actions": [{"action": "list"}, {"action": "clear"}]})).unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn normalize_rejects_empty_and_scalars() {
        assert_eq!(normalize_batch(json!([])), Err(SchemaError::EmptyBatch));
        assert_eq!(normalize_batch(json!({"actions": []})), Err(SchemaError::EmptyBatch));
        assert_eq!(normalize_batch(json!("list")), Err(SchemaError::NotABatch { found: "string" }));
    }

    #[test]
    fn add_with_position() {
        let action = validate(json!({
            "action": "add",
            "type": "SphereGeometry",
            "value": {"position": {"x": 1, "y": 2, "z": 3}}
        }))
        .unwrap();
        assert_eq!(
            action,
            Action::Add(AddItem {
                shape: ShapeKind::Sphere,
                position: Vec3::new(1.0, 2.0, 3.0),
            })
        );
    }

    #[test]
    fn add_without_position_is_random_in_bounds() {
        let Action::Add(item) = validate(json!({"action": "insert", "type": "cube"})).unwrap() else {
            panic!("expected add");
        };
        assert_eq!(item.shape, ShapeKind::Box);
        assert!((-2.0..=2.0).contains(&item.position.x));
        assert!((-2.0..=2.0).contains(&item.position.y));
        assert!((-1.0..=3.0).contains(&item.position.z));
    }

    #[test]
    fn add_partial_position_keeps_given_axes() {
        let Action::Add(item) = validate(json!({
            "action": "add", "type": "ConeGeometry", "value": {"position": {"x": 7}}
        }))
        .unwrap() else {
            panic!("expected add");
        };
        assert_eq!(item.position.x, 7.0);
    }

    #[test]
    fn add_unknown_shape_is_schema_error() {
        let err = validate(json!({"action": "add", "type": "Cubeeometry"})).unwrap_err();
        assert_eq!(err.field(), Some("type"));
        assert!(matches!(err, SchemaError::UnknownShape { .. }));
    }

    #[test]
    fn add_multiple_keeps_item_errors_separate() {
        let Action::AddMultiple { items } = validate(json!({
            "action": "addMultiple",
            "value": [
                {"type": "BoxGeometry", "position": {"x": 0, "y": 0, "z": 0}},
                {"type": "Blob"},
                {"type": "TorusGeometry"}
            ]
        }))
        .unwrap() else {
            panic!("expected addMultiple");
        };
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
        assert!(items[2].is_ok());
    }

    #[test]
    fn manipulate_move_partial_delta() {
        let action = validate(json!({
            "action": "manipulate", "actionType": "move", "name": "cylinder", "value": {"x": -5}
        }))
        .unwrap();
        assert_eq!(
            action,
            Action::Manipulate {
                op: ManipulateOp::Move(AxisDelta::x(-5.0)),
                target: TargetRef::ByName("cylinder".into()),
            }
        );
    }

    #[test]
    fn manipulate_without_value_uses_fallbacks() {
        let moved = validate(json!({"action": "manipulate", "actionType": "move"})).unwrap();
        let rotated = validate(json!({"action": "manipulate", "actionType": "rotate"})).unwrap();
        let scaled = validate(json!({"action": "manipulate", "actionType": "scale"})).unwrap();

        assert_eq!(
            moved,
            Action::Manipulate {
                op: ManipulateOp::Move(FALLBACK_MOVE),
                target: TargetRef::Selection
            }
        );
        assert!(matches!(rotated, Action::Manipulate { op: ManipulateOp::Rotate(d), .. } if d == FALLBACK_ROTATE));
        assert!(matches!(scaled, Action::Manipulate { op: ManipulateOp::Scale(d), .. } if d == FALLBACK_SCALE));
    }

    #[test]
    fn manipulate_empty_value_changes_nothing() {
        let action = validate(json!({"action": "manipulate", "actionType": "move", "value": {}})).unwrap();
        assert!(matches!(action, Action::Manipulate { op: ManipulateOp::Move(d), .. } if d.is_empty()));
    }

    #[test]
    fn rotate_converts_degrees() {
        let Action::Manipulate { op: ManipulateOp::Rotate(d), .. } =
            validate(json!({"action": "rotate", "name": "box", "value": {"y": 90}})).unwrap()
        else {
            panic!("expected rotate");
        };
        assert!((d.y.unwrap() - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn manipulate_nested_position_value() {
        let action = validate(json!({
            "action": "manipulate", "actionType": "move", "value": {"position": {"y": 2}}
        }))
        .unwrap();
        assert!(matches!(action, Action::Manipulate { op: ManipulateOp::Move(d), .. } if d == AxisDelta::y(2.0)));
    }

    #[test]
    fn manipulate_rejects_non_numeric_axis() {
        let err = validate(json!({
            "action": "manipulate", "actionType": "move", "value": {"x": "left"}
        }))
        .unwrap_err();
        assert_eq!(err.field(), Some("value.x"));
    }

    #[test]
    fn manipulate_requires_action_type() {
        let err = validate(json!({"action": "manipulate", "name": "box"})).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingField {
                action: "manipulate",
                field: "actionType"
            }
        );
    }

    #[test]
    fn target_id_beats_name() {
        let id = ObjectId::new();
        let action = validate(json!({
            "action": "select", "targetId": id.to_string(), "name": "car"
        }))
        .unwrap();
        assert_eq!(action, Action::Select { target: TargetRef::ById(id) });
    }

    #[test]
    fn bad_target_id_is_reported() {
        let err = validate(json!({"action": "select", "targetId": "id1"})).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidTargetId { field: "targetId", .. }));
    }

    #[test]
    fn search_term_forms() {
        assert_eq!(
            validate(json!({"action": "search", "value": "tree"})).unwrap(),
            Action::Search { term: "tree".into() }
        );
        assert_eq!(
            validate(json!({"action": "import", "value": {"term": "car"}})).unwrap(),
            Action::Search { term: "car".into() }
        );
        assert!(validate(json!({"action": "search"})).is_err());
    }

    #[test]
    fn delete_multiple_by_ids_and_name() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        assert_eq!(
            validate(json!({"action": "deleteMultiple", "targetIds": [a.to_string(), b.to_string()]})).unwrap(),
            Action::DeleteMultiple {
                selector: DeleteSelector::Ids(vec![a, b])
            }
        );
        assert_eq!(
            validate(json!({"action": "deleteMultiple", "name": "CylinderGeometry"})).unwrap(),
            Action::DeleteMultiple {
                selector: DeleteSelector::Name("CylinderGeometry".into())
            }
        );
        assert!(validate(json!({"action": "deleteMultiple"})).is_err());
    }

    #[test]
    fn color_action() {
        assert_eq!(
            validate(json!({"action": "color", "name": "sphere", "value": {"color": "red"}})).unwrap(),
            Action::Color {
                target: TargetRef::ByName("sphere".into()),
                color: "red".into()
            }
        );
    }

    #[test]
    fn feedback_object_is_ambiguous() {
        assert_eq!(
            validate(json!({"feedback": "Multiple objects found for cylinder"})).unwrap(),
            Action::Ambiguous {
                message: "Multiple objects found for cylinder".into()
            }
        );
    }

    #[test]
    fn synonyms_and_unknown_tags() {
        assert_eq!(validate(json!({"action": "removeAll"})).unwrap(), Action::Clear);
        assert!(matches!(
            validate(json!({"action": "delete", "name": "box"})).unwrap(),
            Action::Manipulate { op: ManipulateOp::Delete, .. }
        ));
        assert_eq!(
            validate(json!({"action": "explode"})).unwrap_err(),
            SchemaError::UnknownAction("explode".into())
        );
        assert_eq!(validate(json!({"type": "box"})).unwrap_err(), SchemaError::MissingTag);
    }

    #[test]
    fn batch_mixes_valid_and_invalid() {
        let results = ActionValidator::new()
            .validate_batch(
                json!([
                    {"action": "list"},
                    {"action": "add", "type": "Nope"},
                    42,
                    {"action": "clear"}
                ]),
                &mut rng(),
            )
            .unwrap();
        let ok = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!((ok, results.len() - ok), (2, 2));
    }

    #[test]
    fn recognition() {
        assert!(is_recognized(&json!({"action": "add"})));
        assert!(is_recognized(&json!({"feedback": "which one?"})));
        assert!(!is_recognized(&json!({"answer": 42})));
    }
}
