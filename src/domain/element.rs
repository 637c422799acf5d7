//! Diagram elements as seen by the panel

use std::fmt;

use serde::{Deserialize, Serialize};

use super::node::BusinessObject;

/// Identity of a diagram element
///
/// The panel keeps identities, never references: the host may rebuild its
/// whole model on re-import.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A diagram element: identity, element type and business object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: ElementId,

    /// Element type (e.g. `bpmn:ServiceTask`)
    #[serde(rename = "type")]
    pub element_type: String,

    pub business_object: BusinessObject,
}

impl Element {
    /// Creates an element whose business object has the element's type
    pub fn new(id: impl Into<String>, element_type: impl Into<String>) -> Self {
        let element_type = element_type.into();
        let id = ElementId::new(id);
        Self {
            business_object: BusinessObject::new(element_type.clone()).with("id", id.as_str()),
            id,
            element_type,
        }
    }

    /// Creates an element around an existing business object
    pub fn with_business_object(id: impl Into<String>, business_object: BusinessObject) -> Self {
        Self {
            id: ElementId::new(id),
            element_type: business_object.type_tag().to_string(),
            business_object,
        }
    }
}
