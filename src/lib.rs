//! bpmn-panel - A configuration-driven property panel for BPMN diagrams
//!
//! Fields are declared in a panel configuration as paths ("locations") into
//! an element's business-object tree. The panel reads and writes those paths,
//! picks the subtype of multi-purpose elements such as service tasks, buffers
//! edits until they are saved and reports every change back to the diagram
//! host.

pub mod domain;
pub mod engine;
pub mod host;
pub mod panel;
pub mod storage;
pub mod cli;

pub use domain::{BusinessObject, Element, ElementId, PanelConfig, Scalar};
pub use engine::{Disambiguator, PendingChanges, Resolver};
pub use host::{DiagramHost, HostEvent, InMemoryDiagram};
pub use panel::{Panel, PanelView};
