//! Location descriptors
//!
//! A location is a named chain of steps leading from a business object to a
//! leaf value. Raw steps from the configuration are compiled once into the
//! closed [`Step`] enum and kept in a [`LocationTable`]; steps are not re-parsed at
//! resolution time.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::node::{BusinessObject, Scalar};
use super::schema::ConfigurationError;

/// Reserved value replaced by the field identifier being resolved
pub const FIELD_ID: &str = "$id";

/// A location step as written in the configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStep {
    /// Property to navigate, or `$id`
    pub property: String,

    /// Node type the step selects (and creates on write)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,

    /// The property holds zero or more nodes
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub array: bool,

    /// Sub-property constraints, values may be `$id`
    #[serde(rename = "where", default, skip_serializing_if = "IndexMap::is_empty")]
    pub filter: IndexMap<String, Value>,
}

/// A property name that may stand for the field identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyName {
    Literal(String),
    FieldId,
}

impl PropertyName {
    fn parse(raw: &str) -> Self {
        if raw == FIELD_ID {
            PropertyName::FieldId
        } else {
            PropertyName::Literal(raw.to_string())
        }
    }

    /// Returns the concrete property name for `field`
    pub fn resolve<'a>(&'a self, field: &'a str) -> &'a str {
        match self {
            PropertyName::Literal(name) => name,
            PropertyName::FieldId => field,
        }
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resolve(FIELD_ID))
    }
}

/// Expected value of a where-clause constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expected {
    Literal(Scalar),
    FieldId,
}

impl Expected {
    /// Materializes the expected value for `field`
    pub fn resolve(&self, field: &str) -> Scalar {
        match self {
            Expected::Literal(value) => value.clone(),
            Expected::FieldId => Scalar::text(field),
        }
    }

    /// Returns true if `actual` satisfies the constraint
    ///
    /// Empty values never match, on either side.
    pub fn accepts(&self, actual: &Scalar, field: &str) -> bool {
        if actual.is_empty() {
            return false;
        }
        match self {
            Expected::Literal(expected) => !expected.is_empty() && expected == actual,
            Expected::FieldId => !field.is_empty() && actual.as_str() == Some(field),
        }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Literal(value) => write!(f, "{}", value),
            Expected::FieldId => f.write_str(FIELD_ID),
        }
    }
}

/// The where-clause of a step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter(Vec<(String, Expected)>);

impl Filter {
    /// Returns true if every constraint holds on `node`
    pub fn accepts(&self, node: &BusinessObject, field: &str) -> bool {
        self.0.iter().all(|(key, expected)| {
            node.scalar(key)
                .is_some_and(|actual| expected.accepts(actual, field))
        })
    }

    /// Initial properties for a node created by this step
    pub fn assignments(&self, field: &str) -> Vec<(String, Scalar)> {
        self.0
            .iter()
            .map(|(key, expected)| (key.clone(), expected.resolve(field)))
            .collect()
    }

    /// Returns true if `key` is constrained by this filter
    pub fn constrains(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A compiled location step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Typed step: selects child nodes of `node_type`, creates one on write
    Child {
        property: PropertyName,
        node_type: String,
        filter: Filter,
        many: bool,
    },

    /// Untyped intermediate step: navigates but cannot create
    Navigate {
        property: PropertyName,
        filter: Filter,
    },

    /// Untyped terminal step: the leaf scalar lives on the parent
    Attribute { property: PropertyName },
}

impl Step {
    /// The property this step navigates
    pub fn property(&self) -> &PropertyName {
        match self {
            Step::Child { property, .. }
            | Step::Navigate { property, .. }
            | Step::Attribute { property } => property,
        }
    }

    pub fn is_attribute(&self) -> bool {
        matches!(self, Step::Attribute { .. })
    }

    /// Returns true if `node` is selected by this step
    pub fn accepts(&self, node: &BusinessObject, field: &str) -> bool {
        match self {
            Step::Child {
                node_type, filter, ..
            } => node.type_tag() == node_type && filter.accepts(node, field),
            Step::Navigate { filter, .. } => filter.accepts(node, field),
            Step::Attribute { .. } => false,
        }
    }

    /// Collects the selected children of every parent, flattening sequences
    pub fn collect<'a>(&self, parents: &[&'a BusinessObject], field: &str) -> Vec<&'a BusinessObject> {
        let name = self.property().resolve(field);
        parents
            .iter()
            .flat_map(|parent| parent.children(name))
            .filter(|child| self.accepts(child, field))
            .collect()
    }

    /// Position of the first selected child of `parent`
    pub fn find_index(&self, parent: &BusinessObject, field: &str) -> Option<usize> {
        parent
            .children(self.property().resolve(field))
            .iter()
            .position(|child| self.accepts(child, field))
    }

    /// Returns true if `node` holds nothing beyond what this step put there
    pub fn is_vacant(&self, node: &BusinessObject) -> bool {
        let filter = match self {
            Step::Child { filter, .. } | Step::Navigate { filter, .. } => filter,
            Step::Attribute { .. } => return false,
        };
        node.body().is_none() && node.property_names().all(|key| filter.constrains(key))
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (filter, many) = match self {
            Step::Child {
                property,
                node_type,
                filter,
                many,
            } => {
                write!(f, "{}<{}>", property, node_type)?;
                (filter, *many)
            }
            Step::Navigate { property, filter } => {
                write!(f, "{}", property)?;
                (filter, false)
            }
            Step::Attribute { property } => return write!(f, "@{}", property),
        };
        if many {
            f.write_str("*")?;
        }
        if !filter.is_empty() {
            let constraints: Vec<String> = filter
                .0
                .iter()
                .map(|(key, expected)| format!("{}={}", key, expected))
                .collect();
            write!(f, "[{}]", constraints.join(","))?;
        }
        Ok(())
    }
}

/// A named, compiled chain of steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationDescriptor {
    name: String,
    steps: Vec<Step>,
}

impl LocationDescriptor {
    /// Compiles raw configuration steps
    ///
    /// An untyped step becomes an [`Step::Attribute`] when it is last and a
    /// [`Step::Navigate`] otherwise.
    pub fn compile(name: &str, raw: &[RawStep]) -> Result<Self, ConfigurationError> {
        let malformed = |reason: String| ConfigurationError::MalformedLocation {
            name: name.to_string(),
            reason,
        };

        if raw.is_empty() {
            return Err(malformed("location has no steps".to_string()));
        }

        let mut steps = Vec::with_capacity(raw.len());
        for (index, step) in raw.iter().enumerate() {
            if step.property.is_empty() {
                return Err(malformed(format!("step {} has an empty property", index + 1)));
            }

            let property = PropertyName::parse(&step.property);
            let is_last = index + 1 == raw.len();

            let mut constraints = Vec::with_capacity(step.filter.len());
            for (key, value) in &step.filter {
                let expected = match value {
                    Value::String(s) if s == FIELD_ID => Expected::FieldId,
                    other => Expected::Literal(Scalar::from_json(other).ok_or_else(|| {
                        malformed(format!("where-clause '{}' must be a scalar", key))
                    })?),
                };
                constraints.push((key.clone(), expected));
            }
            let filter = Filter(constraints);

            let compiled = match &step.node_type {
                Some(node_type) => Step::Child {
                    property,
                    node_type: node_type.clone(),
                    filter,
                    many: step.array,
                },
                None if is_last => {
                    if !filter.is_empty() {
                        log::warn!(location = name; "Ignoring where-clause on attribute step");
                    }
                    Step::Attribute { property }
                }
                None => Step::Navigate { property, filter },
            };
            steps.push(compiled);
        }

        Ok(Self {
            name: name.to_string(),
            steps,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Returns true for a single attribute step on the element itself
    pub fn is_attribute(&self) -> bool {
        matches!(self.steps.as_slice(), [Step::Attribute { .. }])
    }
}

impl fmt::Display for LocationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<String> = self.steps.iter().map(ToString::to_string).collect();
        f.write_str(&steps.join(" / "))
    }
}

/// All locations of a configuration, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationTable {
    locations: IndexMap<String, LocationDescriptor>,
}

impl LocationTable {
    /// Compiles every raw location
    ///
    /// Malformed locations are left out of the table and reported alongside it.
    pub fn compile(raw: &IndexMap<String, Vec<RawStep>>) -> (Self, Vec<ConfigurationError>) {
        let mut locations = IndexMap::new();
        let mut errors = Vec::new();

        for (name, steps) in raw {
            match LocationDescriptor::compile(name, steps) {
                Ok(descriptor) => {
                    locations.insert(name.clone(), descriptor);
                }
                Err(e) => errors.push(e),
            }
        }

        (Self { locations }, errors)
    }

    /// Looks up a location by name
    pub fn get(&self, name: &str) -> Result<&LocationDescriptor, ConfigurationError> {
        self.locations
            .get(name)
            .ok_or_else(|| ConfigurationError::UnknownLocation(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.locations.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocationDescriptor> {
        self.locations.values()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
