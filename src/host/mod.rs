//! # Host Diagram Adapter
//!
//! Boundary between the panel core and the diagram modeling library that owns
//! the business-object tree.
//!
//! ## Capabilities
//!
//! | Capability | Rust surface |
//! |------------|--------------|
//! | Selection change notification | [`HostEvent`] dispatched to a [`HostEventHandler`] |
//! | Mutation propagation (model, undo stack) | [`DiagramHost::update_properties`] |
//! | Node construction | [`NodeFactory::create`] |
//! | Raw property access | [`BusinessObject`] getters and setters |
//!
//! ## Ownership
//!
//! The host owns every business object. The panel borrows one through
//! [`DiagramHost::edit`] for the duration of a single operation and keeps only
//! [`ElementId`]s between events.
//!
//! ## Key Types
//!
//! - [`DiagramHost`] - What the panel needs from the modeling library
//! - [`InMemoryDiagram`] - Host implementation backed by an element registry
//! - [`TypeRegistry`] - Known node types, used as the node factory

mod memory;

use serde::Serialize;
use thiserror::Error;

use crate::domain::{BusinessObject, ElementId, Scalar};

pub use memory::{DiagramDocument, InMemoryDiagram, Mutation, TypeRegistry};

/// A write rejected by the host
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApplyError {
    #[error("Unknown element: {0}")]
    UnknownElement(ElementId),

    #[error("Unknown node type: {0}")]
    UnknownType(String),

    #[error("Location '{location}' cannot create untyped node '{property}'")]
    Unreachable { location: String, property: String },

    #[error("Update rejected for {element}: {reason}")]
    Rejected { element: ElementId, reason: String },
}

/// One named property change reported to the host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyUpdate {
    /// Field identifier
    pub field: String,

    /// Location the field was written through
    pub location: String,

    /// New value, `None` when cleared
    pub value: Option<Scalar>,
}

/// Creates business-object nodes for the host model
pub trait NodeFactory {
    /// Creates a node of `type_tag` with initial scalar properties
    fn create(&self, type_tag: &str, properties: Vec<(String, Scalar)>) -> Result<BusinessObject, ApplyError>;
}

/// What the panel core needs from the diagram modeling library
pub trait DiagramHost {
    /// Element type of an element
    fn element_type(&self, id: &ElementId) -> Option<&str>;

    /// Business object of an element
    fn business_object(&self, id: &ElementId) -> Option<&BusinessObject>;

    /// Borrows an element's business object for mutation, with the node factory
    fn edit(&mut self, id: &ElementId) -> Option<(&mut BusinessObject, &dyn NodeFactory)>;

    /// Propagates applied changes to the host model
    fn update_properties(&mut self, id: &ElementId, updates: &[PropertyUpdate]) -> Result<(), ApplyError>;
}

/// Events the host dispatches to the panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A diagram finished importing; the model is ready
    ImportDone,

    /// The selection changed
    SelectionChanged { selection: Vec<ElementId> },
}

/// Receives host events synchronously
pub trait HostEventHandler<H: ?Sized> {
    fn on_event(&mut self, host: &mut H, event: HostEvent);
}
