//! # Property Panel
//!
//! The panel context ties the configuration, the draft buffer and the
//! selected element together, and reacts to host events.
//!
//! ## Event Flow
//!
//! | Trigger | Effect |
//! |---------|--------|
//! | `ImportDone` | Marks the model ready, drops drafts of vanished elements |
//! | `SelectionChanged` (one element) | Flush, determine subtype, render |
//! | `SelectionChanged` (zero or many) | Flush, clear the view |
//! | [`Panel::input`] | Stage a draft for the selected element |
//! | [`Panel::switch_subtype`] | Flush, rewrite criteria, notify host, render |
//!
//! ## State
//!
//! The panel keeps only element identities between calls. Business objects
//! are borrowed from the host for one operation at a time.

pub mod form;

use std::collections::BTreeSet;

use log::{debug, info, warn};

use crate::domain::{ElementId, FieldDescriptor, PanelConfig};
use crate::engine::{Disambiguator, PendingChange, PendingChanges, Resolver};
use crate::host::{ApplyError, DiagramHost, HostEvent, HostEventHandler, PropertyUpdate};

pub use form::{
    CurrentValue, FieldGroup, FieldInput, FieldValue, FieldView, InputError, Notice, NoticeLevel,
    PanelView, Section, TypeSelector,
};

/// Property panel state for one diagram editor
#[derive(Debug, Default)]
pub struct Panel {
    config: PanelConfig,
    pending: PendingChanges,
    current: Option<ElementId>,
    selected_subtype: Option<String>,
    rendering: bool,
    ready: bool,
    view: Option<PanelView>,
    notice: Option<Notice>,
}

impl Panel {
    pub fn new(config: PanelConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Unsaved drafts
    pub fn pending(&self) -> &PendingChanges {
        &self.pending
    }

    /// The selected element, if exactly one is selected
    pub fn current(&self) -> Option<&ElementId> {
        self.current.as_ref()
    }

    pub fn selected_subtype(&self) -> Option<&str> {
        self.selected_subtype.as_deref()
    }

    /// True once the host finished importing a diagram
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// The last rendered view
    pub fn view(&self) -> Option<&PanelView> {
        self.view.as_ref()
    }

    /// Feedback from the last save
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Reacts to a host event
    pub fn handle_event<H: DiagramHost + ?Sized>(&mut self, host: &mut H, event: HostEvent) {
        match event {
            HostEvent::ImportDone => self.on_import(host),
            HostEvent::SelectionChanged { selection } => {
                if !self.ready {
                    debug!("Ignoring selection before import");
                    return;
                }
                match selection.as_slice() {
                    [id] => {
                        self.select(host, id.clone());
                    }
                    _ => self.clear_selection(host),
                }
            }
        }
    }

    fn on_import<H: DiagramHost + ?Sized>(&mut self, host: &mut H) {
        self.ready = true;

        let vanished: BTreeSet<ElementId> = self
            .pending
            .iter()
            .filter(|change| host.element_type(&change.element).is_none())
            .map(|change| change.element.clone())
            .collect();
        let dropped: usize = vanished
            .iter()
            .map(|id| self.pending.discard_element(id))
            .sum();
        if dropped > 0 {
            warn!(dropped = dropped; "Discarded drafts of elements that no longer exist");
        }

        match self.current.clone() {
            Some(id) if host.element_type(&id).is_some() => {
                self.selected_subtype = self.determine_subtype(&*host, &id);
                self.render(&*host);
            }
            Some(_) => self.reset_selection(),
            None => {}
        }
        info!("Diagram ready");
    }

    /// Selects one element: flushes drafts, picks the subtype and renders
    pub fn select<H: DiagramHost + ?Sized>(&mut self, host: &mut H, id: ElementId) -> Option<&PanelView> {
        self.save(host);

        if host.element_type(&id).is_none() {
            warn!(element = id.as_str(); "Selected element does not exist");
            self.reset_selection();
            return None;
        }

        self.selected_subtype = self.determine_subtype(&*host, &id);
        debug!(
            element = id.as_str(),
            subtype = self.selected_subtype.as_deref().unwrap_or("-");
            "Selected element"
        );
        self.current = Some(id);
        self.render(&*host)
    }

    /// Flushes drafts and clears the selection
    pub fn clear_selection<H: DiagramHost + ?Sized>(&mut self, host: &mut H) {
        self.save(host);
        self.reset_selection();
    }

    fn reset_selection(&mut self) {
        self.current = None;
        self.selected_subtype = None;
        self.view = None;
    }

    /// The subtype whose criteria best match the element, if any
    pub fn determine_subtype<H: DiagramHost + ?Sized>(&self, host: &H, id: &ElementId) -> Option<String> {
        let element = self.config.element(host.element_type(id)?)?;
        if !element.has_subtypes() {
            return None;
        }
        let node = host.business_object(id)?;
        Disambiguator::new(Resolver::new(self.config.locations()))
            .determine(element, node)
            .map(|subtype| subtype.name.clone())
    }

    /// Descriptor of a field shown for the selected element
    ///
    /// Looks in the common fields first, then in the selected subtype or,
    /// without one, the element's generic field map.
    pub fn field_descriptor<H: DiagramHost + ?Sized>(&self, host: &H, field: &str) -> Option<&FieldDescriptor> {
        let id = self.current.as_ref()?;
        if let Some(descriptor) = self.config.common().get(field) {
            return Some(descriptor);
        }

        let element = self.config.element(host.element_type(id)?)?;
        match self.selected_subtype.as_deref().and_then(|name| element.subtype(name)) {
            Some(subtype) => subtype.fields.get(field),
            None => element.fields.as_ref()?.get(field),
        }
    }

    /// Stages an edit of the selected element
    ///
    /// Returns false when nothing is selected, the field is not shown or it
    /// is read-only.
    pub fn input<H: DiagramHost + ?Sized>(&mut self, host: &H, field: &str, input: FieldInput) -> bool {
        let Some(id) = self.current.clone() else {
            debug!(field = field; "Input without a selection");
            return false;
        };
        let Some(descriptor) = self.field_descriptor(host, field).cloned() else {
            warn!(element = id.as_str(), field = field; "Field is not shown for this element");
            return false;
        };
        if descriptor.readonly {
            debug!(field = field; "Ignoring input for read-only field");
            return false;
        }

        self.pending.stage(PendingChange {
            element: id,
            field: field.to_string(),
            descriptor,
            value: input.into_value(),
        });
        true
    }

    /// Applies every draft to the model
    ///
    /// Returns the notice to show, or `None` when there was nothing to save
    /// or the model is not ready yet.
    pub fn save<H: DiagramHost + ?Sized>(&mut self, host: &mut H) -> Option<Notice> {
        if !self.ready {
            if !self.pending.is_empty() {
                debug!(pending = self.pending.len(); "Model not ready, keeping drafts");
            }
            return None;
        }

        let resolver = Resolver::new(self.config.locations());
        let status = self
            .pending
            .flush(|change| apply_change(host, resolver, change));
        info!("Flushed drafts: {}", status);

        let notice = Notice::from_status(status);
        if notice.is_some() {
            self.notice = notice.clone();
        }
        notice
    }

    /// Switches the selected element to another subtype
    ///
    /// Drafts are flushed first. Unknown subtypes and a missing selection
    /// are logged no-ops.
    pub fn switch_subtype<H: DiagramHost + ?Sized>(&mut self, host: &mut H, name: &str) -> Result<(), ApplyError> {
        let Some(id) = self.current.clone() else {
            debug!(subtype = name; "Subtype switch without a selection");
            return Ok(());
        };
        let known = host
            .element_type(&id)
            .and_then(|element_type| self.config.element(element_type))
            .is_some_and(|element| element.subtype(name).is_some());
        if !known {
            warn!(element = id.as_str(), subtype = name; "Unknown subtype");
            return Ok(());
        }

        self.save(host);

        let element_type = host
            .element_type(&id)
            .map(str::to_string)
            .ok_or_else(|| ApplyError::UnknownElement(id.clone()))?;
        let element = self
            .config
            .element(&element_type)
            .ok_or_else(|| ApplyError::UnknownType(element_type.clone()))?;
        let (node, factory) = host
            .edit(&id)
            .ok_or_else(|| ApplyError::UnknownElement(id.clone()))?;

        let updates = Disambiguator::new(Resolver::new(self.config.locations()))
            .switch_to(element, node, factory, name)?;
        if !updates.is_empty() {
            host.update_properties(&id, &updates)?;
        }

        info!(element = id.as_str(), subtype = name; "Switched subtype");
        self.selected_subtype = Some(name.to_string());
        self.render(&*host);
        Ok(())
    }

    /// Rebuilds the view of the selected element
    ///
    /// Drafts take precedence over model values. Returns `None` without a
    /// selection or while a render is already in progress.
    pub fn render<H: DiagramHost + ?Sized>(&mut self, host: &H) -> Option<&PanelView> {
        if self.rendering {
            return None;
        }
        let Some(id) = self.current.clone() else {
            self.view = None;
            return None;
        };
        let Some(element_type) = host.element_type(&id) else {
            self.reset_selection();
            return None;
        };

        self.rendering = true;
        let resolver = Resolver::new(self.config.locations());
        let node = host.business_object(&id);
        let pending = &self.pending;

        let view = form::build_view(
            &id,
            element_type,
            &self.config,
            self.selected_subtype.as_deref(),
            |field, descriptor| match pending.get(&id, field) {
                Some(draft) => CurrentValue {
                    value: draft.value.clone(),
                    dirty: true,
                },
                None => CurrentValue {
                    value: node.and_then(|n| resolver.read(n, field, &descriptor.location)),
                    dirty: false,
                },
            },
        );

        self.rendering = false;
        self.view = Some(view);
        self.view.as_ref()
    }
}

impl<H: DiagramHost + ?Sized> HostEventHandler<H> for Panel {
    fn on_event(&mut self, host: &mut H, event: HostEvent) {
        self.handle_event(host, event);
    }
}

/// Writes one draft and reports it to the host if the value changed
fn apply_change<H: DiagramHost + ?Sized>(
    host: &mut H,
    resolver: Resolver<'_>,
    change: &PendingChange,
) -> Result<(), ApplyError> {
    let location = change.descriptor.location.as_str();
    let (node, factory) = host
        .edit(&change.element)
        .ok_or_else(|| ApplyError::UnknownElement(change.element.clone()))?;

    let old = resolver.read(node, &change.field, location);
    resolver.write(node, factory, &change.field, location, change.value.as_ref())?;
    if change.value.is_none() {
        resolver.prune(node, &change.field, location);
    }
    let new = resolver.read(node, &change.field, location);

    if old == new {
        debug!(element = change.element.as_str(), field = change.field.as_str(); "Value unchanged");
        return Ok(());
    }

    host.update_properties(
        &change.element,
        &[PropertyUpdate {
            field: change.field.clone(),
            location: location.to_string(),
            value: change.value.clone(),
        }],
    )
}
