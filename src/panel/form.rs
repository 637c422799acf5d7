//! Form view model
//!
//! A pure description of what the panel shows for one element: field groups,
//! the subtype selector and per-field values. Building a view never touches
//! the model; values are supplied by the caller.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::domain::{ElementConfig, ElementId, FieldDescriptor, FieldMap, InputKind, PanelConfig, Scalar};
use crate::engine::FlushStatus;

/// Title of the group built from the `common` fields
pub const BASIC_GROUP: &str = "Basic Properties";

/// Title of the subtype selector group
pub const TYPE_GROUP: &str = "Type Configuration";

/// Title of the group built from an element's generic field map
pub const ELEMENT_GROUP: &str = "Element Properties";

pub const SAVED_MESSAGE: &str = "Properties saved successfully";
pub const FAILED_MESSAGE: &str = "Some properties failed to save";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("'{0}' is not an integer")]
    NotAnInteger(String),

    #[error("'{0}' is not a boolean")]
    NotABoolean(String),
}

/// Value shown in a field's input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(Option<i64>),
    Boolean(bool),
}

impl FieldValue {
    /// Converts a model value for display in an input of `kind`
    ///
    /// Absent text is shown as an empty string and an absent flag as
    /// unchecked. Integers stored as text are parsed when possible.
    pub fn from_scalar(kind: InputKind, value: Option<&Scalar>) -> Self {
        match kind {
            InputKind::String | InputKind::TextArea => {
                FieldValue::Text(value.map(ToString::to_string).unwrap_or_default())
            }
            InputKind::Integer => FieldValue::Integer(match value {
                Some(Scalar::Integer(n)) => Some(*n),
                Some(Scalar::Text(s)) => s.trim().parse().ok(),
                _ => None,
            }),
            InputKind::Boolean => FieldValue::Boolean(match value {
                Some(Scalar::Bool(b)) => *b,
                Some(Scalar::Text(s)) => s.eq_ignore_ascii_case("true"),
                Some(Scalar::Integer(n)) => *n != 0,
                None => false,
            }),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(Some(n)) => write!(f, "{}", n),
            FieldValue::Integer(None) => Ok(()),
            FieldValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// A user edit, as produced by an input widget
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldInput {
    Text(String),

    /// `None` for an emptied number input
    Integer(Option<i64>),

    Boolean(bool),
}

impl FieldInput {
    /// Parses raw text typed for an input of `kind`
    pub fn parse(kind: InputKind, raw: &str) -> Result<Self, InputError> {
        match kind {
            InputKind::String | InputKind::TextArea => Ok(FieldInput::Text(raw.to_string())),
            InputKind::Integer => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Ok(FieldInput::Integer(None));
                }
                trimmed
                    .parse()
                    .map(|n| FieldInput::Integer(Some(n)))
                    .map_err(|_| InputError::NotAnInteger(raw.to_string()))
            }
            InputKind::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(FieldInput::Boolean(true)),
                "false" | "no" | "off" | "0" | "" => Ok(FieldInput::Boolean(false)),
                _ => Err(InputError::NotABoolean(raw.to_string())),
            },
        }
    }

    /// The value to stage; empty inputs and unchecked boxes clear the field
    pub fn into_value(self) -> Option<Scalar> {
        match self {
            FieldInput::Text(s) if s.is_empty() => None,
            FieldInput::Text(s) => Some(Scalar::Text(s)),
            FieldInput::Integer(n) => n.map(Scalar::Integer),
            FieldInput::Boolean(true) => Some(Scalar::Bool(true)),
            FieldInput::Boolean(false) => None,
        }
    }
}

/// Current value of a field and whether it comes from an unsaved draft
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrentValue {
    pub value: Option<Scalar>,
    pub dirty: bool,
}

/// One rendered field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldView {
    pub id: String,
    pub label: String,
    pub kind: InputKind,
    pub value: FieldValue,
    pub readonly: bool,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    /// The value is an unsaved draft
    pub dirty: bool,
}

/// A titled list of fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldGroup {
    pub title: String,
    pub fields: Vec<FieldView>,
}

/// Subtype choice for elements with several interpretations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeSelector {
    pub options: Vec<String>,
    pub selected: Option<String>,
}

/// One block of the panel, in display order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Section {
    Fields(FieldGroup),
    TypeSelector(TypeSelector),
}

/// Everything the panel shows for the selected element
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelView {
    pub element: ElementId,
    pub element_type: String,
    pub sections: Vec<Section>,
}

impl PanelView {
    /// Iterates over every field of every group
    pub fn fields(&self) -> impl Iterator<Item = &FieldView> {
        self.sections.iter().flat_map(|section| match section {
            Section::Fields(group) => group.fields.as_slice(),
            Section::TypeSelector(_) => &[][..],
        })
    }

    /// Looks up a field by identifier
    pub fn field(&self, id: &str) -> Option<&FieldView> {
        self.fields().find(|f| f.id == id)
    }

    /// Looks up a group by title
    pub fn group(&self, title: &str) -> Option<&FieldGroup> {
        self.sections.iter().find_map(|section| match section {
            Section::Fields(group) if group.title == title => Some(group),
            _ => None,
        })
    }

    pub fn type_selector(&self) -> Option<&TypeSelector> {
        self.sections.iter().find_map(|section| match section {
            Section::TypeSelector(selector) => Some(selector),
            Section::Fields(_) => None,
        })
    }
}

impl fmt::Display for PanelView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.element, self.element_type)?;

        for section in &self.sections {
            writeln!(f)?;
            writeln!(f)?;
            match section {
                Section::Fields(group) => {
                    write!(f, "{}", group.title)?;
                    for field in &group.fields {
                        writeln!(f)?;
                        write!(f, "  {}", field)?;
                    }
                }
                Section::TypeSelector(selector) => {
                    write!(f, "{}", TYPE_GROUP)?;
                    writeln!(f)?;
                    write!(
                        f,
                        "  Type: {} [{}]",
                        selector.selected.as_deref().unwrap_or("-- Select Type --"),
                        selector.options.join(", ")
                    )?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for FieldView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.dirty { "*" } else { "" };
        let value = self.value.to_string().replace('\n', "\n    ");
        write!(f, "{}{}: {}", self.label, marker, value)?;
        if !self.options.is_empty() {
            write!(f, " [{}]", self.options.join(", "))?;
        }
        if self.readonly {
            f.write_str(" (readonly)")?;
        }
        Ok(())
    }
}

/// Derives a label from a field identifier
///
/// The namespace prefix is dropped and camelCase is split into words:
/// `flowable:delegateExpression` becomes `Delegate Expression`.
pub fn format_field_id(id: &str) -> String {
    let local = id.rsplit(':').next().unwrap_or(id);
    let mut label = String::with_capacity(local.len() + 4);

    for (i, c) in local.chars().enumerate() {
        if i == 0 {
            label.extend(c.to_uppercase());
        } else if c.is_uppercase() {
            label.push(' ');
            label.push(c);
        } else {
            label.push(c);
        }
    }
    label
}

/// Configured label, or one derived from the identifier
pub fn field_label(id: &str, descriptor: &FieldDescriptor) -> String {
    descriptor
        .name
        .clone()
        .unwrap_or_else(|| format_field_id(id))
}

/// Builds a view from the configuration and a value lookup
///
/// `value_of` is called once per rendered field, in display order.
pub fn build_view<F>(
    element: &ElementId,
    element_type: &str,
    config: &PanelConfig,
    selected: Option<&str>,
    mut value_of: F,
) -> PanelView
where
    F: FnMut(&str, &FieldDescriptor) -> CurrentValue,
{
    let mut sections = Vec::new();

    if !config.common().is_empty() {
        sections.push(Section::Fields(group(BASIC_GROUP, config.common(), &mut value_of)));
    }

    if let Some(element_config) = config.element(element_type) {
        type_sections(element_config, selected, &mut sections, &mut value_of);
    }

    PanelView {
        element: element.clone(),
        element_type: element_type.to_string(),
        sections,
    }
}

fn type_sections<F>(
    element: &ElementConfig,
    selected: Option<&str>,
    sections: &mut Vec<Section>,
    value_of: &mut F,
) where
    F: FnMut(&str, &FieldDescriptor) -> CurrentValue,
{
    let subtype = selected.and_then(|name| element.subtype(name));

    if element.has_subtypes() {
        sections.push(Section::TypeSelector(TypeSelector {
            options: element.subtype_names().map(str::to_string).collect(),
            selected: subtype.map(|s| s.name.clone()),
        }));
    }

    match (subtype, &element.fields) {
        (Some(subtype), _) => {
            if !subtype.fields.is_empty() {
                let title = format!("{} Properties", subtype.name);
                sections.push(Section::Fields(group(&title, &subtype.fields, value_of)));
            }
        }
        (None, Some(fields)) => {
            sections.push(Section::Fields(group(ELEMENT_GROUP, fields, value_of)));
        }
        (None, None) => {}
    }
}

fn group<F>(title: &str, fields: &FieldMap, value_of: &mut F) -> FieldGroup
where
    F: FnMut(&str, &FieldDescriptor) -> CurrentValue,
{
    let fields = fields
        .iter()
        .map(|(id, descriptor)| {
            let current = value_of(id, descriptor);
            FieldView {
                id: id.clone(),
                label: field_label(id, descriptor),
                kind: descriptor.kind,
                value: FieldValue::from_scalar(descriptor.kind, current.value.as_ref()),
                readonly: descriptor.readonly,
                options: descriptor.values.clone(),
                dirty: current.dirty,
            }
        })
        .collect();

    FieldGroup {
        title: title.to_string(),
        fields,
    }
}

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient feedback after a save
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    /// Notice for a flush outcome; an empty flush has none
    pub fn from_status(status: FlushStatus) -> Option<Self> {
        match status {
            FlushStatus::NothingToDo => None,
            FlushStatus::AllSucceeded { .. } => Some(Notice {
                level: NoticeLevel::Success,
                message: SAVED_MESSAGE.to_string(),
            }),
            FlushStatus::SomeFailed { .. } => Some(Notice {
                level: NoticeLevel::Error,
                message: FAILED_MESSAGE.to_string(),
            }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
