//! In-memory diagram host
//!
//! Keeps elements in a registry, creates nodes through a [`TypeRegistry`] and
//! records every propagated mutation with a revision number.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{ApplyError, DiagramHost, HostEvent, HostEventHandler, NodeFactory, PropertyUpdate};
use crate::domain::{BusinessObject, Element, ElementId, Scalar};

/// Node types the host model knows about
///
/// An empty registry accepts every type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRegistry(BTreeSet<String>);

impl TypeRegistry {
    /// A registry that accepts any node type
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Returns true if nodes of this type can be created
    pub fn knows(&self, type_tag: &str) -> bool {
        self.0.is_empty() || self.0.contains(type_tag)
    }
}

impl<S: Into<String>> FromIterator<S> for TypeRegistry {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl NodeFactory for TypeRegistry {
    fn create(&self, type_tag: &str, properties: Vec<(String, Scalar)>) -> Result<BusinessObject, ApplyError> {
        if !self.knows(type_tag) {
            return Err(ApplyError::UnknownType(type_tag.to_string()));
        }
        Ok(properties
            .into_iter()
            .fold(BusinessObject::new(type_tag), |node, (key, value)| node.with(key, value)))
    }
}

/// A propagated change, as recorded on the host's command stack
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mutation {
    pub revision: u64,
    pub element: ElementId,
    pub updates: Vec<PropertyUpdate>,
}

/// Serialized form of a diagram
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagramDocument {
    #[serde(default, skip_serializing_if = "is_permissive")]
    pub types: TypeRegistry,

    #[serde(default)]
    pub elements: Vec<Element>,
}

fn is_permissive(types: &TypeRegistry) -> bool {
    types.0.is_empty()
}

/// Diagram host backed by an in-memory element registry
#[derive(Debug, Clone, Default)]
pub struct InMemoryDiagram {
    types: TypeRegistry,
    elements: IndexMap<ElementId, Element>,
    revision: u64,
    mutations: Vec<Mutation>,
}

impl InMemoryDiagram {
    /// Creates an empty diagram
    pub fn new(types: TypeRegistry) -> Self {
        Self {
            types,
            ..Self::default()
        }
    }

    /// Adds or replaces an element
    pub fn insert(&mut self, element: Element) {
        self.elements.insert(element.id.clone(), element);
    }

    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Number of mutations propagated so far
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Mutation log, oldest first
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Replaces the whole model and announces the import
    pub fn import<E>(&mut self, document: DiagramDocument, handler: &mut E)
    where
        E: HostEventHandler<Self>,
    {
        let DiagramDocument { types, elements } = document;
        self.types = types;
        self.elements = elements.into_iter().map(|e| (e.id.clone(), e)).collect();
        self.revision = 0;
        self.mutations.clear();

        log::debug!(elements = self.elements.len(); "Diagram imported");
        handler.on_event(self, HostEvent::ImportDone);
    }

    /// Changes the selection and notifies the handler
    pub fn select<E>(&mut self, selection: Vec<ElementId>, handler: &mut E)
    where
        E: HostEventHandler<Self>,
    {
        handler.on_event(self, HostEvent::SelectionChanged { selection });
    }

    /// Serializable snapshot of the model
    pub fn to_document(&self) -> DiagramDocument {
        DiagramDocument {
            types: self.types.clone(),
            elements: self.elements.values().cloned().collect(),
        }
    }
}

impl From<DiagramDocument> for InMemoryDiagram {
    fn from(document: DiagramDocument) -> Self {
        Self {
            types: document.types,
            elements: document
                .elements
                .into_iter()
                .map(|e| (e.id.clone(), e))
                .collect(),
            revision: 0,
            mutations: Vec::new(),
        }
    }
}

impl DiagramHost for InMemoryDiagram {
    fn element_type(&self, id: &ElementId) -> Option<&str> {
        self.elements.get(id).map(|e| e.element_type.as_str())
    }

    fn business_object(&self, id: &ElementId) -> Option<&BusinessObject> {
        self.elements.get(id).map(|e| &e.business_object)
    }

    fn edit(&mut self, id: &ElementId) -> Option<(&mut BusinessObject, &dyn NodeFactory)> {
        let element = self.elements.get_mut(id)?;
        Some((&mut element.business_object, &self.types))
    }

    fn update_properties(&mut self, id: &ElementId, updates: &[PropertyUpdate]) -> Result<(), ApplyError> {
        if !self.elements.contains_key(id) {
            return Err(ApplyError::UnknownElement(id.clone()));
        }

        self.revision += 1;
        self.mutations.push(Mutation {
            revision: self.revision,
            element: id.clone(),
            updates: updates.to_vec(),
        });
        log::debug!(element = id.as_str(), revision = self.revision; "Properties updated");
        Ok(())
    }
}
