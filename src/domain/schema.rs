//! Panel configuration schema
//!
//! The configuration names locations and, per element type, the editable
//! fields. An element type either maps field identifiers directly to field
//! descriptors, or declares subtypes gated by criteria (optionally next to a
//! generic `fields` map used when no subtype matches). The reserved `common`
//! entry lists fields shown for every element.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::location::{LocationTable, RawStep};
use super::node::Scalar;

/// Element entry holding the fields shared by every element type
pub const COMMON: &str = "common";

/// Element key holding the generic field map next to subtypes
pub const GENERIC_FIELDS: &str = "fields";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Unknown location: {0}")]
    UnknownLocation(String),

    #[error("Malformed location '{name}': {reason}")]
    MalformedLocation { name: String, reason: String },

    #[error("Malformed configuration for '{element}': {reason}")]
    MalformedElement { element: String, reason: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Input widget used for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InputKind {
    #[default]
    String,
    TextArea,
    Integer,
    Boolean,
}

impl InputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::String => "string",
            InputKind::TextArea => "textArea",
            InputKind::Integer => "integer",
            InputKind::Boolean => "boolean",
        }
    }
}

impl From<String> for InputKind {
    /// Unknown kinds fall back to a plain text input
    fn from(value: String) -> Self {
        match value.as_str() {
            "string" => InputKind::String,
            "textArea" => InputKind::TextArea,
            "integer" => InputKind::Integer,
            "boolean" => InputKind::Boolean,
            other => {
                log::warn!(kind = other; "Unknown input type, using a text input");
                InputKind::String
            }
        }
    }
}

impl From<InputKind> for String {
    fn from(kind: InputKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one field is located and displayed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Location name
    pub location: String,

    /// Input widget
    #[serde(rename = "type", default)]
    pub kind: InputKind,

    /// Suggested values
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub readonly: bool,

    /// Display label, derived from the field identifier when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl FieldDescriptor {
    /// Creates a text field at the given location
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            kind: InputKind::default(),
            values: Vec::new(),
            readonly: false,
            name: None,
        }
    }
}

/// Field identifier → descriptor, in declaration order
pub type FieldMap = IndexMap<String, FieldDescriptor>;

/// A condition used to pick a subtype
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    /// Field identifier the location is resolved with
    pub id: String,

    /// Location name
    pub location: String,

    /// Expected value; without one the criterion tests presence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Scalar>,
}

impl Criterion {
    /// 2 for an exact-value test, 1 for a presence test
    pub fn specificity(&self) -> u32 {
        if self.value.is_some() {
            2
        } else {
            1
        }
    }
}

/// One of several field schemas applicable to an element type
#[derive(Debug, Clone, PartialEq)]
pub struct SubtypeDefinition {
    pub name: String,
    pub criteria: Vec<Criterion>,
    pub fields: FieldMap,
}

impl SubtypeDefinition {
    /// Sum of the criteria specificities
    pub fn specificity(&self) -> u32 {
        self.criteria.iter().map(Criterion::specificity).sum()
    }

    /// Returns true if a criterion with the same id and location is required
    pub fn requires(&self, criterion: &Criterion) -> bool {
        self.criteria
            .iter()
            .any(|c| c.id == criterion.id && c.location == criterion.location)
    }
}

/// Field configuration of one element type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementConfig {
    /// Generic fields, used when the type has no subtypes or none matches
    pub fields: Option<FieldMap>,

    /// Subtypes in declaration order
    pub subtypes: Vec<SubtypeDefinition>,
}

impl ElementConfig {
    pub fn has_subtypes(&self) -> bool {
        !self.subtypes.is_empty()
    }

    pub fn subtype(&self, name: &str) -> Option<&SubtypeDefinition> {
        self.subtypes.iter().find(|s| s.name == name)
    }

    pub fn subtype_names(&self) -> impl Iterator<Item = &str> {
        self.subtypes.iter().map(|s| s.name.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    locations: IndexMap<String, Vec<RawStep>>,

    #[serde(default)]
    elements: IndexMap<String, IndexMap<String, RawEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Field(FieldDescriptor),
    Subtype(RawSubtype),
    Fields(FieldMap),
    Other(Value),
}

#[derive(Debug, Deserialize)]
struct RawSubtype {
    criteria: Vec<Criterion>,
    #[serde(default)]
    fields: FieldMap,
}

/// A loaded panel configuration
#[derive(Debug, Clone, Default)]
pub struct PanelConfig {
    locations: LocationTable,
    common: FieldMap,
    elements: IndexMap<String, ElementConfig>,
    warnings: Vec<ConfigurationError>,
}

impl PanelConfig {
    /// Parses a JSON configuration
    pub fn from_json_str(content: &str) -> Result<Self, ConfigurationError> {
        let raw: RawConfig =
            serde_json::from_str(content).map_err(|e| ConfigurationError::Parse(e.to_string()))?;
        Ok(Self::from_raw(raw))
    }

    /// Parses a YAML configuration
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigurationError> {
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| ConfigurationError::Parse(e.to_string()))?;
        Ok(Self::from_raw(raw))
    }

    /// The Flowable configuration shipped with the crate
    pub fn builtin() -> Result<Self, ConfigurationError> {
        Self::from_json_str(BUILTIN_CONFIG)
    }

    fn from_raw(raw: RawConfig) -> Self {
        let (locations, mut warnings) = LocationTable::compile(&raw.locations);
        let mut common = FieldMap::new();
        let mut elements = IndexMap::new();

        for (element, entries) in raw.elements {
            if element == COMMON {
                for (field, entry) in entries {
                    match entry {
                        RawEntry::Field(descriptor) => {
                            common.insert(field, descriptor);
                        }
                        _ => warnings.push(ConfigurationError::MalformedElement {
                            element: COMMON.to_string(),
                            reason: format!("'{}' is not a field descriptor", field),
                        }),
                    }
                }
                continue;
            }

            let config = Self::element_from_raw(&element, entries, &mut warnings);
            elements.insert(element, config);
        }

        let mut config = Self {
            locations,
            common,
            elements,
            warnings,
        };
        config.check_field_locations();

        for warning in &config.warnings {
            log::warn!("{}", warning);
        }
        config
    }

    fn element_from_raw(
        element: &str,
        entries: IndexMap<String, RawEntry>,
        warnings: &mut Vec<ConfigurationError>,
    ) -> ElementConfig {
        let mut config = ElementConfig::default();

        for (key, entry) in entries {
            match entry {
                RawEntry::Field(descriptor) => {
                    config
                        .fields
                        .get_or_insert_with(FieldMap::new)
                        .insert(key, descriptor);
                }
                RawEntry::Fields(fields) if key == GENERIC_FIELDS => {
                    config.fields.get_or_insert_with(FieldMap::new).extend(fields);
                }
                RawEntry::Subtype(subtype) => config.subtypes.push(SubtypeDefinition {
                    name: key,
                    criteria: subtype.criteria,
                    fields: subtype.fields,
                }),
                RawEntry::Fields(_) => warnings.push(ConfigurationError::MalformedElement {
                    element: element.to_string(),
                    reason: format!("subtype '{}' has no criteria", key),
                }),
                RawEntry::Other(value) => {
                    let reason = if value.get(GENERIC_FIELDS).is_some_and(Value::is_array)
                        || (key == GENERIC_FIELDS && value.is_array())
                    {
                        format!("'{}' uses an array field list; only field maps are supported", key)
                    } else {
                        format!("'{}' is neither a field nor a subtype", key)
                    };
                    warnings.push(ConfigurationError::MalformedElement {
                        element: element.to_string(),
                        reason,
                    });
                }
            }
        }

        config
    }

    fn check_field_locations(&mut self) {
        let subtype_fields = self.elements.values().flat_map(|element| {
            element
                .fields
                .iter()
                .chain(element.subtypes.iter().map(|s| &s.fields))
        });
        let criteria = self
            .elements
            .values()
            .flat_map(|element| element.subtypes.iter().flat_map(|s| &s.criteria))
            .map(|c| &c.location);

        let mut unknown: Vec<String> = std::iter::once(&self.common)
            .chain(subtype_fields)
            .flat_map(|fields| fields.values().map(|f| &f.location))
            .chain(criteria)
            .filter(|location| !self.locations.contains(location))
            .cloned()
            .collect();
        unknown.sort();
        unknown.dedup();

        self.warnings
            .extend(unknown.into_iter().map(ConfigurationError::UnknownLocation));
    }

    pub fn locations(&self) -> &LocationTable {
        &self.locations
    }

    /// Fields shown for every element
    pub fn common(&self) -> &FieldMap {
        &self.common
    }

    pub fn element(&self, element_type: &str) -> Option<&ElementConfig> {
        self.elements.get(element_type)
    }

    /// Problems found while loading; none of them are fatal
    pub fn warnings(&self) -> &[ConfigurationError] {
        &self.warnings
    }
}

/// Source of [`PanelConfig::builtin`]
pub const BUILTIN_CONFIG: &str = include_str!("../../assets/flowable.json");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_config_loads_cleanly() {
        let config = PanelConfig::builtin().unwrap();

        assert!(config.warnings().is_empty(), "{:?}", config.warnings());
        assert!(config.common().contains_key("name"));

        let service = config.element("bpmn:ServiceTask").unwrap();
        let names: Vec<_> = service.subtype_names().collect();
        assert_eq!(names, vec!["http", "ai", "java"]);

        let script = config.element("bpmn:ScriptTask").unwrap();
        assert!(!script.has_subtypes());
        assert!(script.fields.as_ref().unwrap().contains_key("script"));
    }

    #[test]
    fn subtype_specificity_sums_criteria() {
        let config = PanelConfig::builtin().unwrap();
        let service = config.element("bpmn:ServiceTask").unwrap();

        assert_eq!(service.subtype("http").unwrap().specificity(), 2);
        assert_eq!(service.subtype("java").unwrap().specificity(), 1);
    }

    #[test]
    fn generic_fields_sit_next_to_subtypes() {
        let config = PanelConfig::from_json_str(
            r#"{
                "locations": { "attribute": [{ "property": "$id" }] },
                "elements": {
                    "bpmn:Task": {
                        "fields": { "note": { "location": "attribute" } },
                        "special": {
                            "criteria": [{ "id": "kind", "location": "attribute", "value": "special" }],
                            "fields": { "extra": { "location": "attribute", "type": "integer" } }
                        }
                    }
                }
            }"#,
        )
        .unwrap();

        let task = config.element("bpmn:Task").unwrap();
        assert!(task.fields.as_ref().unwrap().contains_key("note"));
        assert_eq!(
            task.subtype("special").unwrap().fields["extra"].kind,
            InputKind::Integer
        );
    }

    #[test]
    fn legacy_array_fields_are_reported() {
        let config = PanelConfig::from_json_str(
            r#"{
                "locations": { "attribute": [{ "property": "$id" }] },
                "elements": {
                    "bpmn:ScriptTask": { "fields": [{ "id": "scriptFormat", "location": "attribute" }] }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.warnings().len(), 1);
        assert!(matches!(
            &config.warnings()[0],
            ConfigurationError::MalformedElement { element, .. } if element == "bpmn:ScriptTask"
        ));
    }

    #[test]
    fn unknown_field_locations_are_reported() {
        let config = PanelConfig::from_json_str(
            r#"{ "elements": { "common": { "name": { "location": "nowhere" } } } }"#,
        )
        .unwrap();

        assert_eq!(
            config.warnings(),
            &[ConfigurationError::UnknownLocation("nowhere".to_string())]
        );
    }

    #[test]
    fn unknown_input_kind_falls_back_to_text() {
        let descriptor: FieldDescriptor =
            serde_json::from_str(r#"{ "location": "attribute", "type": "color" }"#).unwrap();
        assert_eq!(descriptor.kind, InputKind::String);
    }

    #[test]
    fn yaml_config_is_supported() {
        let config = PanelConfig::from_yaml_str(
            r#"
locations:
  attribute:
    - property: $id
elements:
  common:
    name:
      location: attribute
"#,
        )
        .unwrap();

        assert!(config.locations().contains("attribute"));
        assert!(config.common().contains_key("name"));
    }

    #[test]
    fn unparsable_config_is_an_error() {
        assert!(matches!(
            PanelConfig::from_json_str("{ not json"),
            Err(ConfigurationError::Parse(_))
        ));
    }
}
