//! Business-object tree
//!
//! A business object is the host diagram's in-memory representation of one
//! element or of a nested extension structure. The panel never owns these
//! trees: it borrows them from the host for the duration of one read or write.
//!
//! In JSON form the type tag is stored under `$type` and the textual body
//! (if any) under `$body`; every other key is a property.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// JSON key holding the node type tag
pub const TYPE_KEY: &str = "$type";

/// JSON key holding the node body
pub const BODY_KEY: &str = "$body";

#[derive(Debug, Error, PartialEq)]
pub enum NodeError {
    #[error("Business object is missing its $type tag")]
    MissingType,

    #[error("Expected an object for a business object, found {0}")]
    NotAnObject(&'static str),

    #[error("Unsupported value for property '{property}': {found}")]
    UnsupportedValue { property: String, found: &'static str },
}

/// A leaf value stored on a business object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl Scalar {
    /// Creates a text scalar
    pub fn text(value: impl Into<String>) -> Self {
        Scalar::Text(value.into())
    }

    /// Returns true for values a presence test treats as missing
    pub fn is_empty(&self) -> bool {
        matches!(self, Scalar::Text(s) if s.is_empty())
    }

    /// Returns the text content, if this is a text scalar
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Converts a JSON leaf into a scalar
    ///
    /// Numbers that do not fit an `i64` are kept as their text form.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => Some(
                n.as_i64()
                    .map(Scalar::Integer)
                    .unwrap_or_else(|| Scalar::Text(n.to_string())),
            ),
            Value::String(s) => Some(Scalar::Text(s.clone())),
            _ => None,
        }
    }

    /// Converts this scalar into its JSON form
    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Integer(n) => Value::from(*n),
            Scalar::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Integer(n) => write!(f, "{}", n),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

/// The value held by a named property
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    /// A leaf attribute
    Scalar(Scalar),

    /// A single nested node
    Node(BusinessObject),

    /// An ordered sequence of nested nodes
    Nodes(Vec<BusinessObject>),
}

/// One node of the business-object tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct BusinessObject {
    type_tag: String,
    properties: IndexMap<String, Property>,
    body: Option<String>,
}

impl BusinessObject {
    /// Creates an empty node of the given type
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            properties: IndexMap::new(),
            body: None,
        }
    }

    /// Builder: sets a scalar property
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.properties
            .insert(name.into(), Property::Scalar(value.into()));
        self
    }

    /// Builder: sets a single child node
    pub fn with_child(mut self, name: impl Into<String>, child: BusinessObject) -> Self {
        self.properties.insert(name.into(), Property::Node(child));
        self
    }

    /// Builder: sets a sequence of child nodes
    pub fn with_children(mut self, name: impl Into<String>, children: Vec<BusinessObject>) -> Self {
        self.properties.insert(name.into(), Property::Nodes(children));
        self
    }

    /// Builder: sets the body text
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Returns the type tag (e.g. `bpmn:ServiceTask`)
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    /// Gets a property by name
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// Gets a scalar property by name
    pub fn scalar(&self, name: &str) -> Option<&Scalar> {
        match self.properties.get(name) {
            Some(Property::Scalar(s)) => Some(s),
            _ => None,
        }
    }

    /// Sets a scalar property, or removes it when `value` is `None`
    pub fn set_scalar(&mut self, name: &str, value: Option<Scalar>) {
        match value {
            Some(v) => {
                self.properties.insert(name.to_string(), Property::Scalar(v));
            }
            None => {
                self.properties.shift_remove(name);
            }
        }
    }

    /// Iterates over property names in insertion order
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Returns the body text
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Sets or clears the body text
    pub fn set_body(&mut self, body: Option<String>) {
        self.body = body;
    }

    /// Returns the nodes held by a property as a slice
    ///
    /// A single node is viewed as a one-element slice; scalars and missing
    /// properties yield an empty slice.
    pub fn children(&self, name: &str) -> &[BusinessObject] {
        match self.properties.get(name) {
            Some(Property::Node(node)) => std::slice::from_ref(node),
            Some(Property::Nodes(nodes)) => nodes,
            _ => &[],
        }
    }

    /// Mutable counterpart of [`children`](Self::children)
    pub fn children_mut(&mut self, name: &str) -> &mut [BusinessObject] {
        match self.properties.get_mut(name) {
            Some(Property::Node(node)) => std::slice::from_mut(node),
            Some(Property::Nodes(nodes)) => nodes,
            _ => &mut [],
        }
    }

    /// Attaches a child node and returns its position in [`children`](Self::children)
    ///
    /// With `many` the child is appended to an existing sequence, or the
    /// property becomes a one-element sequence. Without it the child becomes
    /// the property's sole value.
    pub fn attach(&mut self, name: &str, child: BusinessObject, many: bool) -> usize {
        if many {
            if let Some(Property::Nodes(nodes)) = self.properties.get_mut(name) {
                nodes.push(child);
                return nodes.len() - 1;
            }
            self.properties
                .insert(name.to_string(), Property::Nodes(vec![child]));
        } else {
            self.properties
                .insert(name.to_string(), Property::Node(child));
        }
        0
    }

    /// Detaches the child at `index`, dropping the property once it is empty
    pub fn detach(&mut self, name: &str, index: usize) -> Option<BusinessObject> {
        match self.properties.get_mut(name) {
            Some(Property::Node(_)) if index == 0 => match self.properties.shift_remove(name) {
                Some(Property::Node(node)) => Some(node),
                _ => None,
            },
            Some(Property::Nodes(nodes)) if index < nodes.len() => {
                let removed = nodes.remove(index);
                if nodes.is_empty() {
                    self.properties.shift_remove(name);
                }
                Some(removed)
            }
            _ => None,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn property_from_json(name: &str, value: Value) -> Result<Option<Property>, NodeError> {
    match value {
        Value::Null => Ok(None),
        Value::Object(_) => Ok(Some(Property::Node(BusinessObject::try_from(value)?))),
        Value::Array(items) => {
            let mut nodes = Vec::with_capacity(items.len());
            for item in items {
                if !item.is_object() {
                    return Err(NodeError::UnsupportedValue {
                        property: name.to_string(),
                        found: json_kind(&item),
                    });
                }
                nodes.push(BusinessObject::try_from(item)?);
            }
            Ok(Some(Property::Nodes(nodes)))
        }
        leaf => Ok(Scalar::from_json(&leaf).map(Property::Scalar)),
    }
}

impl TryFrom<Value> for BusinessObject {
    type Error = NodeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let map = match value {
            Value::Object(map) => map,
            other => return Err(NodeError::NotAnObject(json_kind(&other))),
        };

        let mut type_tag = None;
        let mut body = None;
        let mut properties = IndexMap::new();

        for (key, value) in map {
            match key.as_str() {
                TYPE_KEY => type_tag = value.as_str().map(str::to_string),
                BODY_KEY => body = value.as_str().map(str::to_string),
                _ => {
                    if let Some(property) = property_from_json(&key, value)? {
                        properties.insert(key, property);
                    }
                }
            }
        }

        Ok(Self {
            type_tag: type_tag.ok_or(NodeError::MissingType)?,
            properties,
            body,
        })
    }
}

impl From<BusinessObject> for Value {
    fn from(node: BusinessObject) -> Self {
        let mut map = Map::new();
        map.insert(TYPE_KEY.to_string(), Value::String(node.type_tag));

        for (key, property) in node.properties {
            let value = match property {
                Property::Scalar(s) => s.to_json(),
                Property::Node(child) => Value::from(child),
                Property::Nodes(children) => {
                    Value::Array(children.into_iter().map(Value::from).collect())
                }
            };
            map.insert(key, value);
        }

        if let Some(body) = node.body {
            map.insert(BODY_KEY.to_string(), Value::String(body));
        }

        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service_task() -> BusinessObject {
        serde_json::from_value(json!({
            "$type": "bpmn:ServiceTask",
            "id": "serviceTask",
            "flowable:type": "http",
            "extensionElements": {
                "$type": "bpmn:ExtensionElements",
                "values": [
                    { "$type": "flowable:Field", "name": "requestMethod", "expression": "GET" },
                    { "$type": "flowable:Field", "name": "requestUrl", "stringValue": "localhost:8080" }
                ]
            },
            "documentation": [
                { "$type": "bpmn:Documentation", "$body": "Documentation 222" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn parses_nested_json() {
        let task = service_task();

        assert_eq!(task.type_tag(), "bpmn:ServiceTask");
        assert_eq!(task.scalar("flowable:type"), Some(&Scalar::text("http")));

        let wrapper = &task.children("extensionElements")[0];
        assert_eq!(wrapper.type_tag(), "bpmn:ExtensionElements");
        assert_eq!(wrapper.children("values").len(), 2);

        let docs = task.children("documentation");
        assert_eq!(docs[0].body(), Some("Documentation 222"));
    }

    #[test]
    fn json_roundtrip_preserves_tree() {
        let task = service_task();
        let json = serde_json::to_string(&task).unwrap();
        let parsed: BusinessObject = serde_json::from_str(&json).unwrap();

        assert_eq!(task, parsed);
    }

    #[test]
    fn missing_type_is_rejected() {
        let result: Result<BusinessObject, _> = serde_json::from_value(json!({ "id": "x" }));
        assert!(result.is_err());
    }

    #[test]
    fn array_of_scalars_is_rejected() {
        let err = BusinessObject::try_from(json!({ "$type": "t", "tags": ["a", "b"] })).unwrap_err();
        assert_eq!(
            err,
            NodeError::UnsupportedValue {
                property: "tags".to_string(),
                found: "string"
            }
        );
    }

    #[test]
    fn set_scalar_none_removes_property() {
        let mut node = BusinessObject::new("bpmn:Task").with("name", "Review");
        node.set_scalar("name", None);

        assert!(node.get("name").is_none());
        assert_eq!(node.property_names().count(), 0);
    }

    #[test]
    fn attach_builds_sequences() {
        let mut node = BusinessObject::new("bpmn:ExtensionElements");

        assert_eq!(node.attach("values", BusinessObject::new("flowable:Field"), true), 0);
        assert_eq!(node.attach("values", BusinessObject::new("flowable:Field"), true), 1);
        assert_eq!(node.children("values").len(), 2);

        assert_eq!(node.attach("single", BusinessObject::new("x"), false), 0);
        assert_eq!(node.children("single").len(), 1);
    }

    #[test]
    fn detach_drops_empty_sequences() {
        let mut node = BusinessObject::new("bpmn:ExtensionElements")
            .with_children("values", vec![BusinessObject::new("flowable:Field")]);

        assert!(node.detach("values", 0).is_some());
        assert!(node.get("values").is_none());
        assert!(node.detach("values", 0).is_none());
    }

    #[test]
    fn empty_text_is_empty() {
        assert!(Scalar::text("").is_empty());
        assert!(!Scalar::Bool(false).is_empty());
        assert!(!Scalar::Integer(0).is_empty());
    }
}
