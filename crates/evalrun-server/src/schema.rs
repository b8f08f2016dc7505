//! Output schema interpreter.
//!
//! Caller-supplied JSON Schema documents are walked once and compiled into
//! a tree of [`SchemaNode`]s. The tree validates extraction output and can
//! be re-emitted as normalized JSON Schema for the automation library.
//! Nothing in the document is ever executed.
//!
//! Supported: `type` (`object`, `array`, `string`, `number`, `integer`,
//! `boolean`, `null`, or a list of those), `properties`, `required`,
//! `additionalProperties` (boolean), `items`, `minItems`/`maxItems`,
//! `minLength`/`maxLength`, `minimum`/`maximum`, `enum`, `const`,
//! `nullable`, `anyOf` and `description`. Annotation keywords such as
//! `title`, `format`, `default`, `examples` and `$schema` are ignored.
//! Everything else is rejected, including `$ref` and `oneOf` (its
//! exactly-one rule is not enforced).

use std::collections::BTreeSet;

use serde_json::{json, Map, Value};
use thiserror::Error;

/// Deepest nesting accepted.
pub const MAX_DEPTH: usize = 32;

/// Largest number of nodes accepted.
pub const MAX_NODES: usize = 2000;

/// Keywords accepted without effect.
const IGNORED_KEYWORDS: &[&str] = &[
    "$schema",
    "$id",
    "title",
    "format",
    "default",
    "examples",
    "$comment",
    "pattern",
];

/// The schema document could not be compiled.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaCompilationError {
    #[error("output schema must be a JSON object")]
    NonObjectRoot,

    #[error("output schema root at {pointer} must describe an object")]
    RootNotObjectType { pointer: String },

    #[error("schema node at {pointer} must be a JSON object")]
    NotAnObject { pointer: String },

    #[error("schema node at {pointer} has no \"type\"")]
    MissingType { pointer: String },

    #[error("unsupported keyword \"{keyword}\" at {pointer}")]
    UnsupportedKeyword { pointer: String, keyword: String },

    #[error("unsupported type \"{found}\" at {pointer}")]
    UnsupportedType { pointer: String, found: String },

    #[error("malformed schema at {pointer}: {message}")]
    Malformed { pointer: String, message: String },

    #[error("schema nested deeper than {max} levels at {pointer}")]
    TooDeep { pointer: String, max: usize },

    #[error("schema has more than {max} nodes")]
    TooLarge { max: usize },
}

/// Extraction output rejected by a compiled schema.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("output does not match schema at {pointer}: {message}")]
pub struct SchemaViolation {
    /// JSON pointer into the validated value.
    pub pointer: String,
    pub message: String,
}

/// Kind of a compiled schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Object {
        properties: Vec<(String, SchemaNode)>,
        required: BTreeSet<String>,
        additional_properties: bool,
    },
    Array {
        items: Box<SchemaNode>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    String {
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    Number {
        integer: bool,
        minimum: Option<f64>,
        maximum: Option<f64>,
    },
    Boolean,
    Null,
    Enum(Vec<Value>),
    Nullable(Box<SchemaNode>),
    AnyOf(Vec<SchemaNode>),
}

/// One compiled schema node.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: NodeKind,
    pub description: Option<String>,
}

/// A compiled output schema.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    root: SchemaNode,
}

impl OutputSchema {
    /// Compile a JSON Schema document.
    ///
    /// The root must be a JSON object describing an object.
    pub fn compile(document: &Value) -> Result<Self, SchemaCompilationError> {
        if !document.is_object() {
            return Err(SchemaCompilationError::NonObjectRoot);
        }

        let mut compiler = Compiler { nodes: 0 };
        let root = compiler.node(document, "#", 0)?;
        if !matches!(root.kind, NodeKind::Object { .. }) {
            return Err(SchemaCompilationError::RootNotObjectType {
                pointer: "#".to_string(),
            });
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    /// Check `value` against the schema.
    pub fn validate(&self, value: &Value) -> Result<(), SchemaViolation> {
        self.root.validate(value, "")
    }

    /// The compiled schema as normalized JSON Schema.
    pub fn to_json_schema(&self) -> Value {
        self.root.to_json_schema()
    }
}

struct Compiler {
    nodes: usize,
}

impl Compiler {
    fn node(
        &mut self,
        schema: &Value,
        pointer: &str,
        depth: usize,
    ) -> Result<SchemaNode, SchemaCompilationError> {
        if depth > MAX_DEPTH {
            return Err(SchemaCompilationError::TooDeep {
                pointer: pointer.to_string(),
                max: MAX_DEPTH,
            });
        }
        self.nodes += 1;
        if self.nodes > MAX_NODES {
            return Err(SchemaCompilationError::TooLarge { max: MAX_NODES });
        }

        let map = schema
            .as_object()
            .ok_or_else(|| SchemaCompilationError::NotAnObject {
                pointer: pointer.to_string(),
            })?;

        check_keywords(map, pointer)?;

        let description = match map.get("description") {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(malformed(pointer, "\"description\" must be a string")),
        };

        let nullable = match map.get("nullable") {
            None => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => return Err(malformed(pointer, "\"nullable\" must be a boolean")),
        };

        let kind = self.kind(map, pointer, depth)?;
        let node = SchemaNode { kind, description };

        Ok(if nullable {
            SchemaNode {
                description: node.description.clone(),
                kind: NodeKind::Nullable(Box::new(node)),
            }
        } else {
            node
        })
    }

    fn kind(
        &mut self,
        map: &Map<String, Value>,
        pointer: &str,
        depth: usize,
    ) -> Result<NodeKind, SchemaCompilationError> {
        if let Some(values) = map.get("enum") {
            return enum_kind(values, pointer);
        }
        if let Some(value) = map.get("const") {
            return Ok(NodeKind::Enum(vec![value.clone()]));
        }
        if let Some(alternatives) = map.get("anyOf") {
            return self.any_of(alternatives, &format!("{}/anyOf", pointer), depth);
        }

        match map.get("type") {
            None => Err(SchemaCompilationError::MissingType {
                pointer: pointer.to_string(),
            }),
            Some(Value::String(name)) => self.typed(name, map, pointer, depth),
            Some(Value::Array(names)) => self.type_list(names, map, pointer, depth),
            Some(_) => Err(malformed(pointer, "\"type\" must be a string or a list of strings")),
        }
    }

    /// `"type": ["string", "null"]` and friends.
    fn type_list(
        &mut self,
        names: &[Value],
        map: &Map<String, Value>,
        pointer: &str,
        depth: usize,
    ) -> Result<NodeKind, SchemaCompilationError> {
        let mut names: Vec<&str> = names
            .iter()
            .map(|n| n.as_str().ok_or_else(|| malformed(pointer, "\"type\" entries must be strings")))
            .collect::<Result<_, _>>()?;
        if names.is_empty() {
            return Err(malformed(pointer, "\"type\" list is empty"));
        }

        let nullable = names.contains(&"null") && names.len() > 1;
        names.retain(|n| !nullable || *n != "null");

        let kind = if names.len() == 1 {
            self.typed(names[0], map, pointer, depth)?
        } else {
            let alternatives = names
                .iter()
                .map(|name| {
                    Ok(SchemaNode {
                        kind: self.typed(name, map, pointer, depth)?,
                        description: None,
                    })
                })
                .collect::<Result<Vec<_>, SchemaCompilationError>>()?;
            NodeKind::AnyOf(alternatives)
        };

        Ok(if nullable {
            NodeKind::Nullable(Box::new(SchemaNode {
                kind,
                description: None,
            }))
        } else {
            kind
        })
    }

    fn typed(
        &mut self,
        name: &str,
        map: &Map<String, Value>,
        pointer: &str,
        depth: usize,
    ) -> Result<NodeKind, SchemaCompilationError> {
        match name {
            "object" => self.object(map, pointer, depth),
            "array" => self.array(map, pointer, depth),
            "string" => Ok(NodeKind::String {
                min_length: usize_keyword(map, "minLength", pointer)?,
                max_length: usize_keyword(map, "maxLength", pointer)?,
            }),
            "number" | "integer" => Ok(NodeKind::Number {
                integer: name == "integer",
                minimum: f64_keyword(map, "minimum", pointer)?,
                maximum: f64_keyword(map, "maximum", pointer)?,
            }),
            "boolean" => Ok(NodeKind::Boolean),
            "null" => Ok(NodeKind::Null),
            other => Err(SchemaCompilationError::UnsupportedType {
                pointer: pointer.to_string(),
                found: other.to_string(),
            }),
        }
    }

    fn object(
        &mut self,
        map: &Map<String, Value>,
        pointer: &str,
        depth: usize,
    ) -> Result<NodeKind, SchemaCompilationError> {
        let mut properties = Vec::new();
        match map.get("properties") {
            None => {}
            Some(Value::Object(props)) => {
                for (name, schema) in props {
                    let child = format!("{}/properties/{}", pointer, escape_pointer(name));
                    properties.push((name.clone(), self.node(schema, &child, depth + 1)?));
                }
            }
            Some(_) => return Err(malformed(pointer, "\"properties\" must be an object")),
        }

        let mut required = BTreeSet::new();
        match map.get("required") {
            None => {}
            Some(Value::Array(names)) => {
                for name in names {
                    let name = name
                        .as_str()
                        .ok_or_else(|| malformed(pointer, "\"required\" entries must be strings"))?;
                    if !properties.iter().any(|(p, _)| p == name) {
                        return Err(malformed(
                            pointer,
                            &format!("required property \"{}\" is not declared", name),
                        ));
                    }
                    required.insert(name.to_string());
                }
            }
            Some(_) => return Err(malformed(pointer, "\"required\" must be a list")),
        }

        let additional_properties = match map.get("additionalProperties") {
            None => true,
            Some(Value::Bool(b)) => *b,
            Some(_) => {
                return Err(SchemaCompilationError::UnsupportedKeyword {
                    pointer: pointer.to_string(),
                    keyword: "additionalProperties".to_string(),
                })
            }
        };

        Ok(NodeKind::Object {
            properties,
            required,
            additional_properties,
        })
    }

    fn array(
        &mut self,
        map: &Map<String, Value>,
        pointer: &str,
        depth: usize,
    ) -> Result<NodeKind, SchemaCompilationError> {
        let items = match map.get("items") {
            Some(items @ Value::Object(_)) => {
                self.node(items, &format!("{}/items", pointer), depth + 1)?
            }
            Some(_) => return Err(malformed(pointer, "\"items\" must be a single schema object")),
            None => return Err(malformed(pointer, "array schema needs \"items\"")),
        };

        let min_items = usize_keyword(map, "minItems", pointer)?;
        let max_items = usize_keyword(map, "maxItems", pointer)?;
        if let (Some(min), Some(max)) = (min_items, max_items) {
            if min > max {
                return Err(malformed(pointer, "\"minItems\" exceeds \"maxItems\""));
            }
        }

        Ok(NodeKind::Array {
            items: Box::new(items),
            min_items,
            max_items,
        })
    }

    fn any_of(
        &mut self,
        alternatives: &Value,
        pointer: &str,
        depth: usize,
    ) -> Result<NodeKind, SchemaCompilationError> {
        let list = alternatives
            .as_array()
            .filter(|list| !list.is_empty())
            .ok_or_else(|| malformed(pointer, "must be a non-empty list of schemas"))?;

        let mut nodes = Vec::with_capacity(list.len());
        for (i, alternative) in list.iter().enumerate() {
            nodes.push(self.node(alternative, &format!("{}/{}", pointer, i), depth + 1)?);
        }

        // anyOf [X, null] is the common spelling of a nullable X.
        let (nulls, rest): (Vec<_>, Vec<_>) = nodes
            .into_iter()
            .partition(|n| matches!(n.kind, NodeKind::Null));
        Ok(match (nulls.is_empty(), rest.len()) {
            (false, 1) => NodeKind::Nullable(Box::new(rest.into_iter().next().ok_or_else(
                || malformed(pointer, "empty alternative list"),
            )?)),
            (false, 0) => NodeKind::Null,
            (false, _) => NodeKind::Nullable(Box::new(SchemaNode {
                kind: NodeKind::AnyOf(rest),
                description: None,
            })),
            (true, _) => NodeKind::AnyOf(rest),
        })
    }
}

fn check_keywords(map: &Map<String, Value>, pointer: &str) -> Result<(), SchemaCompilationError> {
    const KNOWN: &[&str] = &[
        "type",
        "description",
        "nullable",
        "properties",
        "required",
        "additionalProperties",
        "items",
        "minItems",
        "maxItems",
        "minLength",
        "maxLength",
        "minimum",
        "maximum",
        "enum",
        "const",
        "anyOf",
    ];

    for keyword in map.keys() {
        if !KNOWN.contains(&keyword.as_str()) && !IGNORED_KEYWORDS.contains(&keyword.as_str()) {
            return Err(SchemaCompilationError::UnsupportedKeyword {
                pointer: pointer.to_string(),
                keyword: keyword.clone(),
            });
        }
    }
    Ok(())
}

fn enum_kind(values: &Value, pointer: &str) -> Result<NodeKind, SchemaCompilationError> {
    let list = values
        .as_array()
        .filter(|list| !list.is_empty())
        .ok_or_else(|| malformed(pointer, "\"enum\" must be a non-empty list"))?;
    if list.iter().any(|v| v.is_object() || v.is_array()) {
        return Err(malformed(pointer, "\"enum\" values must be scalars"));
    }
    Ok(NodeKind::Enum(list.clone()))
}

fn usize_keyword(
    map: &Map<String, Value>,
    keyword: &str,
    pointer: &str,
) -> Result<Option<usize>, SchemaCompilationError> {
    match map.get(keyword) {
        None => Ok(None),
        Some(v) => v
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| malformed(pointer, &format!("\"{}\" must be a non-negative integer", keyword))),
    }
}

fn f64_keyword(
    map: &Map<String, Value>,
    keyword: &str,
    pointer: &str,
) -> Result<Option<f64>, SchemaCompilationError> {
    match map.get(keyword) {
        None => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| malformed(pointer, &format!("\"{}\" must be a number", keyword))),
    }
}

fn malformed(pointer: &str, message: &str) -> SchemaCompilationError {
    SchemaCompilationError::Malformed {
        pointer: pointer.to_string(),
        message: message.to_string(),
    }
}

/// Escape a key for use in a JSON pointer.
fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl SchemaNode {
    fn violation(pointer: &str, message: impl Into<String>) -> SchemaViolation {
        SchemaViolation {
            pointer: if pointer.is_empty() {
                "/".to_string()
            } else {
                pointer.to_string()
            },
            message: message.into(),
        }
    }

    fn validate(&self, value: &Value, pointer: &str) -> Result<(), SchemaViolation> {
        match &self.kind {
            NodeKind::Object {
                properties,
                required,
                additional_properties,
            } => {
                let map = value.as_object().ok_or_else(|| {
                    Self::violation(pointer, format!("expected object, found {}", type_name(value)))
                })?;
                for name in required {
                    if !map.contains_key(name) {
                        return Err(Self::violation(
                            pointer,
                            format!("missing required property \"{}\"", name),
                        ));
                    }
                }
                for (name, schema) in properties {
                    if let Some(child) = map.get(name) {
                        schema.validate(child, &format!("{}/{}", pointer, escape_pointer(name)))?;
                    }
                }
                if !additional_properties {
                    if let Some(extra) = map.keys().find(|k| !properties.iter().any(|(p, _)| p == *k)) {
                        return Err(Self::violation(
                            pointer,
                            format!("unexpected property \"{}\"", extra),
                        ));
                    }
                }
                Ok(())
            }
            NodeKind::Array {
                items,
                min_items,
                max_items,
            } => {
                let list = value.as_array().ok_or_else(|| {
                    Self::violation(pointer, format!("expected array, found {}", type_name(value)))
                })?;
                if let Some(min) = min_items {
                    if list.len() < *min {
                        return Err(Self::violation(
                            pointer,
                            format!("expected at least {} items, found {}", min, list.len()),
                        ));
                    }
                }
                if let Some(max) = max_items {
                    if list.len() > *max {
                        return Err(Self::violation(
                            pointer,
                            format!("expected at most {} items, found {}", max, list.len()),
                        ));
                    }
                }
                for (i, item) in list.iter().enumerate() {
                    items.validate(item, &format!("{}/{}", pointer, i))?;
                }
                Ok(())
            }
            NodeKind::String {
                min_length,
                max_length,
            } => {
                let s = value.as_str().ok_or_else(|| {
                    Self::violation(pointer, format!("expected string, found {}", type_name(value)))
                })?;
                let len = s.chars().count();
                if min_length.is_some_and(|min| len < min) || max_length.is_some_and(|max| len > max) {
                    return Err(Self::violation(pointer, "string length out of bounds"));
                }
                Ok(())
            }
            NodeKind::Number {
                integer,
                minimum,
                maximum,
            } => {
                let n = value.as_f64().ok_or_else(|| {
                    Self::violation(pointer, format!("expected number, found {}", type_name(value)))
                })?;
                if *integer && n.fract() != 0.0 {
                    return Err(Self::violation(pointer, format!("expected integer, found {}", n)));
                }
                if minimum.is_some_and(|min| n < min) || maximum.is_some_and(|max| n > max) {
                    return Err(Self::violation(pointer, format!("{} is out of bounds", n)));
                }
                Ok(())
            }
            NodeKind::Boolean => match value {
                Value::Bool(_) => Ok(()),
                other => Err(Self::violation(
                    pointer,
                    format!("expected boolean, found {}", type_name(other)),
                )),
            },
            NodeKind::Null => match value {
                Value::Null => Ok(()),
                other => Err(Self::violation(
                    pointer,
                    format!("expected null, found {}", type_name(other)),
                )),
            },
            NodeKind::Enum(allowed) => {
                if allowed.contains(value) {
                    Ok(())
                } else {
                    Err(Self::violation(pointer, format!("{} is not an allowed value", value)))
                }
            }
            NodeKind::Nullable(inner) => {
                if value.is_null() {
                    Ok(())
                } else {
                    inner.validate(value, pointer)
                }
            }
            NodeKind::AnyOf(alternatives) => {
                if alternatives.iter().any(|alt| alt.validate(value, pointer).is_ok()) {
                    Ok(())
                } else {
                    Err(Self::violation(
                        pointer,
                        format!("matches none of {} alternatives", alternatives.len()),
                    ))
                }
            }
        }
    }

    fn to_json_schema(&self) -> Value {
        let mut schema = match &self.kind {
            NodeKind::Object {
                properties,
                required,
                additional_properties,
            } => {
                let props: Map<String, Value> = properties
                    .iter()
                    .map(|(name, node)| (name.clone(), node.to_json_schema()))
                    .collect();
                let mut object = json!({
                    "type": "object",
                    "properties": props,
                    "required": required.iter().collect::<Vec<_>>(),
                });
                if !additional_properties {
                    object["additionalProperties"] = Value::Bool(false);
                }
                object
            }
            NodeKind::Array {
                items,
                min_items,
                max_items,
            } => {
                let mut array = json!({ "type": "array", "items": items.to_json_schema() });
                if let Some(min) = min_items {
                    array["minItems"] = json!(min);
                }
                if let Some(max) = max_items {
                    array["maxItems"] = json!(max);
                }
                array
            }
            NodeKind::String {
                min_length,
                max_length,
            } => {
                let mut string = json!({ "type": "string" });
                if let Some(min) = min_length {
                    string["minLength"] = json!(min);
                }
                if let Some(max) = max_length {
                    string["maxLength"] = json!(max);
                }
                string
            }
            NodeKind::Number {
                integer,
                minimum,
                maximum,
            } => {
                let name = if *integer { "integer" } else { "number" };
                let mut number = json!({ "type": name });
                if let Some(min) = minimum {
                    number["minimum"] = json!(min);
                }
                if let Some(max) = maximum {
                    number["maximum"] = json!(max);
                }
                number
            }
            NodeKind::Boolean => json!({ "type": "boolean" }),
            NodeKind::Null => json!({ "type": "null" }),
            NodeKind::Enum(values) => json!({ "enum": values }),
            NodeKind::Nullable(inner) => {
                json!({ "anyOf": [inner.to_json_schema(), { "type": "null" }] })
            }
            NodeKind::AnyOf(alternatives) => json!({
                "anyOf": alternatives.iter().map(SchemaNode::to_json_schema).collect::<Vec<_>>()
            }),
        };

        if let (Some(description), Some(map)) = (&self.description, schema.as_object_mut()) {
            map.insert("description".to_string(), Value::String(description.clone()));
        }
        schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press_releases() -> Value {
        json!({
            "type": "object",
            "properties": {
                "items": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "title": {"type": "string", "description": "The title"},
                            "publish_date": {"type": ["string", "null"]}
                        },
                        "required": ["title"]
                    }
                }
            },
            "required": ["items"]
        })
    }

    #[test]
    fn test_compile_and_validate() {
        let schema = OutputSchema::compile(&press_releases()).unwrap();

        assert!(schema
            .validate(&json!({"items": [{"title": "A", "publish_date": null}, {"title": "B"}]}))
            .is_ok());

        let err = schema
            .validate(&json!({"items": [{"title": "A"}, {"publish_date": "Dec 4"}]}))
            .unwrap_err();
        assert_eq!(err.pointer, "/items/1");
        assert!(err.message.contains("title"));

        let err = schema.validate(&json!({"items": "none"})).unwrap_err();
        assert_eq!(err.pointer, "/items");
    }

    #[test]
    fn test_rejects_ref() {
        let err = OutputSchema::compile(&json!({
            "type": "object",
            "properties": {"next": {"$ref": "#"}}
        }))
        .unwrap_err();
        assert_eq!(
            err,
            SchemaCompilationError::UnsupportedKeyword {
                pointer: "#/properties/next".to_string(),
                keyword: "$ref".to_string(),
            }
        );
    }

    #[test]
    fn test_rejects_one_of() {
        let err = OutputSchema::compile(&json!({
            "type": "object",
            "properties": {"x": {"oneOf": [{"type": "string"}, {"type": "number"}]}}
        }))
        .unwrap_err();
        assert_eq!(
            err,
            SchemaCompilationError::UnsupportedKeyword {
                pointer: "#/properties/x".to_string(),
                keyword: "oneOf".to_string(),
            }
        );
    }

    #[test]
    fn test_rejects_missing_type() {
        let err = OutputSchema::compile(&json!({
            "type": "object",
            "properties": {"stars": {"description": "number of stars"}}
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaCompilationError::MissingType { ref pointer } if pointer == "#/properties/stars"));
    }

    #[test]
    fn test_rejects_non_object_roots() {
        assert_eq!(
            OutputSchema::compile(&json!("z.object({})")).unwrap_err(),
            SchemaCompilationError::NonObjectRoot
        );
        assert!(matches!(
            OutputSchema::compile(&json!({"type": "string"})).unwrap_err(),
            SchemaCompilationError::RootNotObjectType { .. }
        ));
    }

    #[test]
    fn test_rejects_code_like_content() {
        let err = OutputSchema::compile(&json!({
            "type": "object",
            "properties": {"x": {"type": "require('child_process').exec('rm -rf /')"}}
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaCompilationError::UnsupportedType { .. }));
    }

    #[test]
    fn test_depth_limit() {
        let mut schema = json!({"type": "string"});
        for _ in 0..(MAX_DEPTH + 5) {
            schema = json!({"type": "object", "properties": {"n": schema}});
        }
        assert!(matches!(
            OutputSchema::compile(&schema).unwrap_err(),
            SchemaCompilationError::TooDeep { .. }
        ));
    }

    #[test]
    fn test_size_limit() {
        let props: Map<String, Value> = (0..MAX_NODES + 1)
            .map(|i| (format!("p{}", i), json!({"type": "string"})))
            .collect();
        let err = OutputSchema::compile(&json!({"type": "object", "properties": props})).unwrap_err();
        assert_eq!(err, SchemaCompilationError::TooLarge { max: MAX_NODES });
    }

    #[test]
    fn test_required_must_be_declared() {
        let err = OutputSchema::compile(&json!({
            "type": "object",
            "properties": {},
            "required": ["stars"]
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaCompilationError::Malformed { .. }));
    }

    #[test]
    fn test_enum_integer_and_bounds() {
        let schema = OutputSchema::compile(&json!({
            "type": "object",
            "properties": {
                "status": {"enum": ["open", "closed"]},
                "count": {"type": "integer", "minimum": 0},
                "tags": {"type": "array", "items": {"type": "string"}, "maxItems": 2}
            },
            "additionalProperties": false
        }))
        .unwrap();

        assert!(schema.validate(&json!({"status": "open", "count": 3})).is_ok());
        assert!(schema.validate(&json!({"status": "pending"})).is_err());
        assert!(schema.validate(&json!({"count": 1.5})).is_err());
        assert!(schema.validate(&json!({"count": -1})).is_err());
        assert!(schema.validate(&json!({"tags": ["a", "b", "c"]})).is_err());
        assert!(schema.validate(&json!({"other": true})).is_err());
    }

    #[test]
    fn test_any_of_with_null_is_nullable() {
        let schema = OutputSchema::compile(&json!({
            "type": "object",
            "properties": {
                "price": {"anyOf": [{"type": "number"}, {"type": "null"}]}
            }
        }))
        .unwrap();

        match &schema.root().kind {
            NodeKind::Object { properties, .. } => {
                assert!(matches!(properties[0].1.kind, NodeKind::Nullable(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(schema.validate(&json!({"price": null})).is_ok());
        assert!(schema.validate(&json!({"price": "free"})).is_err());
    }

    #[test]
    fn test_to_json_schema_normalizes() {
        let schema = OutputSchema::compile(&press_releases()).unwrap();
        let emitted = schema.to_json_schema();

        assert_eq!(emitted["required"], json!(["items"]));
        let item = &emitted["properties"]["items"]["items"];
        assert_eq!(item["properties"]["title"]["description"], "The title");
        assert_eq!(
            item["properties"]["publish_date"],
            json!({"anyOf": [{"type": "string"}, {"type": "null"}]})
        );

        // Re-emitted schemas compile to the same tree.
        assert_eq!(OutputSchema::compile(&emitted).unwrap(), schema);
    }
}
