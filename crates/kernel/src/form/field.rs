//! The field abstraction shared by built-in elements and custom fields.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::request::{Method, Request};

use super::render::{FieldView, RenderSink};

/// What a field learns about its owning form when it is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub form_name: String,
    pub method: Method,
}

impl Binding {
    pub fn new(form_name: impl Into<String>, method: Method) -> Self {
        Self {
            form_name: form_name.into(),
            method,
        }
    }

    /// Whether the request carries this form's identity key.
    ///
    /// Anonymous forms post an empty identity value, which matches here too.
    pub fn is_submitted(&self, request: &Request) -> bool {
        request.params(self.method).get_str(super::IDENTITY_FIELD)
            == Some(self.form_name.as_str())
    }
}

/// Field variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Password,
    Textarea,
    Checkbox,
    MultiCheckbox,
    Radiobutton,
    Dropdown,
    Date,
    Time,
    File,
    Image,
    Hidden,
    Button,
    /// A field implemented outside this crate.
    Custom,
}

impl FieldKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Password => "password",
            FieldKind::Textarea => "textarea",
            FieldKind::Checkbox => "checkbox",
            FieldKind::MultiCheckbox => "multi_checkbox",
            FieldKind::Radiobutton => "radiobutton",
            FieldKind::Dropdown => "dropdown",
            FieldKind::Date => "date",
            FieldKind::Time => "time",
            FieldKind::File => "file",
            FieldKind::Image => "image",
            FieldKind::Hidden => "hidden",
            FieldKind::Button => "button",
            FieldKind::Custom => "custom",
        }
    }

    /// Prefix of the template variable a field of this kind is parsed into.
    pub fn template_prefix(&self) -> &'static str {
        match self {
            FieldKind::Checkbox | FieldKind::MultiCheckbox => "chk",
            FieldKind::Dropdown => "ddm",
            FieldKind::Radiobutton => "rbt",
            FieldKind::File | FieldKind::Image => "file",
            FieldKind::Hidden => "hid",
            FieldKind::Button => "btn",
            FieldKind::Text
            | FieldKind::Password
            | FieldKind::Textarea
            | FieldKind::Date
            | FieldKind::Time
            | FieldKind::Custom => "txt",
        }
    }

    /// File-like fields travel outside the parameter stores.
    pub fn is_file(&self) -> bool {
        matches!(self, FieldKind::File | FieldKind::Image)
    }
}

/// The current value of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Flag(b) => !b,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(v) => v.is_empty(),
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Text(String::new())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Flag(b)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(v: Vec<String>) -> Self {
        FieldValue::List(v)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Flag(b) => write!(f, "{b}"),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::List(v) => f.write_str(&v.join(", ")),
        }
    }
}

/// Value-reading capability.
pub trait HasValue {
    fn value(&self, request: &Request) -> FieldValue;
}

/// Error-reporting capability.
pub trait HasErrors {
    /// The field's own validation error text; empty when valid.
    fn errors(&self) -> String;
}

/// One named input of a form.
///
/// Capabilities are optional: iteration over a registry switches on
/// [`Field::as_value`] and [`Field::as_errors`], never on concrete types.
pub trait Field: fmt::Debug + Send + Sync + 'static {
    fn name(&self) -> &str;

    fn kind(&self) -> FieldKind;

    /// Called on registration with the owning form's name and method.
    fn bind(&mut self, binding: Binding);

    fn as_value(&self) -> Option<&dyn HasValue> {
        None
    }

    fn as_errors(&self) -> Option<&dyn HasErrors> {
        None
    }

    /// Hand this field to a render sink.
    fn parse(&self, request: &Request, sink: &mut dyn RenderSink) -> anyhow::Result<()> {
        let view = FieldView::new(self.name(), self.kind())
            .value(self.as_value().map(|v| v.value(request)))
            .errors(self.as_errors().map(|e| e.errors()));
        sink.add_field(view)
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
