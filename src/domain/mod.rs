//! Domain models for the property panel
//!
//! Contains the business-object tree and the configuration schema, without
//! any I/O concerns.

mod element;
mod location;
mod node;
mod schema;

pub use element::{Element, ElementId};
pub use location::{Expected, Filter, LocationDescriptor, LocationTable, PropertyName, RawStep, Step, FIELD_ID};
pub use node::{BusinessObject, NodeError, Property, Scalar, BODY_KEY, TYPE_KEY};
pub use schema::{
    ConfigurationError, Criterion, ElementConfig, FieldDescriptor, FieldMap, InputKind, PanelConfig,
    SubtypeDefinition, BUILTIN_CONFIG, COMMON, GENERIC_FIELDS,
};
