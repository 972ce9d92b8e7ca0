//! Built-in form elements.

use std::any::Any;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{FormError, FormResult};
use crate::request::{ParamValue, Request};

use super::field::{Binding, Field, FieldKind, FieldValue, HasErrors, HasValue};
use super::render::{FieldView, RenderSink, camel_case};

/// Loose e-mail shape check; deliverability is not our concern.
///
/// # Panics
///
/// Panics if the hard-coded regex literal is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex literal"));

/// Default mask for date fields (day-month-year).
pub const DEFAULT_DATE_MASK: &str = "d-m-Y";

/// A select option as `(value, label)`.
pub type SelectOption = (String, String);

/// A built-in form element covering every standard field variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormElement {
    /// Field name, unique within its form.
    pub name: String,

    /// Element type with type-specific configuration.
    #[serde(flatten)]
    pub element_type: ElementType,

    /// Value used until the form is submitted.
    #[serde(default)]
    pub default_value: FieldValue,

    /// Markup attributes (id, class, ...).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,

    #[serde(skip)]
    errors: String,

    #[serde(skip)]
    binding: Option<Binding>,
}

/// Element type variants with type-specific configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementType {
    /// Single-line text input.
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },

    Password {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },

    Textarea,

    Checkbox,

    MultiCheckbox { options: Vec<SelectOption> },

    Radiobutton { options: Vec<SelectOption> },

    Dropdown {
        options: Vec<SelectOption>,
        #[serde(default)]
        multiple: bool,
    },

    Date {
        #[serde(default = "default_mask")]
        mask: String,
    },

    Time,

    File,

    Image,

    Hidden,

    Button {
        #[serde(default = "default_button_type")]
        button_type: String,
    },
}

fn default_mask() -> String {
    DEFAULT_DATE_MASK.to_string()
}

fn default_button_type() -> String {
    "submit".to_string()
}

impl ElementType {
    pub fn kind(&self) -> FieldKind {
        match self {
            ElementType::Text { .. } => FieldKind::Text,
            ElementType::Password { .. } => FieldKind::Password,
            ElementType::Textarea => FieldKind::Textarea,
            ElementType::Checkbox => FieldKind::Checkbox,
            ElementType::MultiCheckbox { .. } => FieldKind::MultiCheckbox,
            ElementType::Radiobutton { .. } => FieldKind::Radiobutton,
            ElementType::Dropdown { .. } => FieldKind::Dropdown,
            ElementType::Date { .. } => FieldKind::Date,
            ElementType::Time => FieldKind::Time,
            ElementType::File => FieldKind::File,
            ElementType::Image => FieldKind::Image,
            ElementType::Hidden => FieldKind::Hidden,
            ElementType::Button { .. } => FieldKind::Button,
        }
    }

    /// CSS class applied to new elements of this type.
    fn default_class(&self) -> Option<&'static str> {
        match self {
            ElementType::Text { .. } => Some("inputText"),
            ElementType::Password { .. } => Some("inputPassword"),
            ElementType::Textarea => Some("inputTextarea"),
            ElementType::Checkbox | ElementType::MultiCheckbox { .. } => Some("inputCheckbox"),
            ElementType::Radiobutton { .. } => Some("inputRadio"),
            ElementType::Dropdown { .. } => Some("inputDropdown"),
            ElementType::Date { .. } => Some("inputDate"),
            ElementType::Time => Some("inputTime"),
            ElementType::File | ElementType::Image => Some("inputFile"),
            ElementType::Button { .. } => Some("inputButton"),
            ElementType::Hidden => None,
        }
    }

    fn options(&self) -> &[SelectOption] {
        match self {
            ElementType::MultiCheckbox { options }
            | ElementType::Radiobutton { options }
            | ElementType::Dropdown { options, .. } => options,
            _ => &[],
        }
    }
}

impl FormElement {
    /// Create a text field.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ElementType::Text { max_length: None })
    }

    /// Create a password field.
    pub fn password(name: impl Into<String>) -> Self {
        Self::new(name, ElementType::Password { max_length: None })
    }

    /// Create a textarea.
    pub fn textarea(name: impl Into<String>) -> Self {
        Self::new(name, ElementType::Textarea)
    }

    /// Create a single checkbox.
    pub fn checkbox(name: impl Into<String>, checked: bool) -> Self {
        Self::new(name, ElementType::Checkbox).default_value(checked)
    }

    /// Create a group of checkboxes sharing one name.
    pub fn multi_checkbox(
        name: impl Into<String>,
        options: Vec<SelectOption>,
        checked: Vec<String>,
    ) -> Self {
        Self::new(name, ElementType::MultiCheckbox { options }).default_value(checked)
    }

    /// Create a radio button group.
    pub fn radiobutton(
        name: impl Into<String>,
        options: Vec<SelectOption>,
        checked: Option<&str>,
    ) -> Self {
        Self::new(name, ElementType::Radiobutton { options })
            .default_value(checked.unwrap_or_default())
    }

    /// Create a single-selection dropdown.
    pub fn dropdown(
        name: impl Into<String>,
        options: Vec<SelectOption>,
        selected: Option<&str>,
    ) -> Self {
        Self::new(
            name,
            ElementType::Dropdown {
                options,
                multiple: false,
            },
        )
        .default_value(selected.unwrap_or_default())
    }

    /// Create a dropdown allowing several selections.
    pub fn multi_dropdown(
        name: impl Into<String>,
        options: Vec<SelectOption>,
        selected: Vec<String>,
    ) -> Self {
        Self::new(
            name,
            ElementType::Dropdown {
                options,
                multiple: true,
            },
        )
        .default_value(selected)
    }

    /// Create a date field using a `d`, `m`, `Y`/`y` mask.
    pub fn date(name: impl Into<String>, mask: Option<&str>) -> Self {
        Self::new(
            name,
            ElementType::Date {
                mask: mask.unwrap_or(DEFAULT_DATE_MASK).to_string(),
            },
        )
    }

    /// Create a time field (`HH:MM`).
    pub fn time(name: impl Into<String>) -> Self {
        Self::new(name, ElementType::Time)
    }

    /// Create a file upload field.
    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, ElementType::File)
    }

    /// Create an image upload field.
    pub fn image(name: impl Into<String>) -> Self {
        Self::new(name, ElementType::Image)
    }

    /// Create a hidden field.
    pub fn hidden(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(name, ElementType::Hidden).default_value(value)
    }

    /// Create a button; `button_type` defaults to `submit`.
    pub fn button(
        name: impl Into<String>,
        label: impl Into<String>,
        button_type: Option<&str>,
    ) -> Self {
        Self::new(
            name,
            ElementType::Button {
                button_type: button_type.unwrap_or("submit").to_string(),
            },
        )
        .default_value(FieldValue::Text(label.into()))
    }

    fn new(name: impl Into<String>, element_type: ElementType) -> Self {
        let name = name.into();
        let default_value = match element_type {
            ElementType::Checkbox => FieldValue::Flag(false),
            ElementType::MultiCheckbox { .. }
            | ElementType::Dropdown { multiple: true, .. } => FieldValue::List(Vec::new()),
            _ => FieldValue::default(),
        };

        let mut attributes = IndexMap::new();
        attributes.insert("id".to_string(), camel_case(&name, true));
        if let Some(class) = element_type.default_class() {
            attributes.insert("class".to_string(), class.to_string());
        }

        Self {
            name,
            element_type,
            default_value,
            attributes,
            errors: String::new(),
            binding: None,
        }
    }

    /// Set the default value.
    pub fn default_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.default_value = value.into();
        self
    }

    /// Set a markup attribute.
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Set max length for text and password fields.
    pub fn max_length(mut self, max: usize) -> Self {
        if let ElementType::Text { ref mut max_length }
        | ElementType::Password { ref mut max_length } = self.element_type
        {
            *max_length = Some(max);
        }
        self
    }

    pub fn get_attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn set_default_value(&mut self, value: impl Into<FieldValue>) -> &mut Self {
        self.default_value = value.into();
        self
    }

    pub fn options(&self) -> &[SelectOption] {
        self.element_type.options()
    }

    /// Append to this field's error text.
    pub fn add_error(&mut self, error: &str) -> &mut Self {
        self.errors.push_str(error.trim());
        self
    }

    /// Replace this field's error text.
    pub fn set_error(&mut self, error: &str) -> &mut Self {
        self.errors = error.trim().to_string();
        self
    }

    /// The owning form, once registered.
    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    /// The raw submitted parameter, or `None` when the form was not submitted.
    fn submitted<'r>(&self, request: &'r Request) -> Option<&'r ParamValue> {
        let binding = self.binding.as_ref()?;
        if !binding.is_submitted(request) {
            return None;
        }
        request.params(binding.method).get(&self.name)
    }

    /// The submitted scalar, trimmed; empty when absent.
    fn submitted_text(&self, request: &Request) -> String {
        match self.submitted(request) {
            Some(ParamValue::Single(s)) => s.trim().to_string(),
            Some(ParamValue::Multiple(v)) => v.first().map(|s| s.trim().to_string()).unwrap_or_default(),
            None => String::new(),
        }
    }

    fn record(&mut self, ok: bool, error: &str) -> bool {
        if !ok && !error.trim().is_empty() {
            self.set_error(error);
        }
        ok
    }

    /// Check that something was submitted for this field.
    pub fn is_filled(&mut self, request: &Request, error: &str) -> bool {
        let ok = if self.element_type.kind().is_file() {
            self.binding
                .as_ref()
                .is_some_and(|b| b.is_submitted(request))
                && request.files.get(&self.name).is_some_and(|f| f.size > 0)
        } else {
            self.submitted(request).is_some_and(|v| !v.is_empty())
        };
        self.record(ok, error)
    }

    /// Check that the submitted value looks like an e-mail address.
    pub fn is_email(&mut self, request: &Request, error: &str) -> bool {
        let ok = EMAIL.is_match(&self.submitted_text(request));
        self.record(ok, error)
    }

    /// Check that the submitted value consists of digits only.
    pub fn is_numeric(&mut self, request: &Request, error: &str) -> bool {
        let value = self.submitted_text(request);
        let ok = !value.is_empty() && value.chars().all(|c| c.is_ascii_digit());
        self.record(ok, error)
    }

    /// Check the submitted value against a regular expression.
    ///
    /// An invalid pattern is a programmer error.
    pub fn is_valid_against_regexp(
        &mut self,
        request: &Request,
        pattern: &str,
        error: &str,
    ) -> FormResult<bool> {
        let re = Regex::new(pattern)
            .map_err(|e| FormError::InvalidArgument(format!("invalid pattern {pattern:?}: {e}")))?;
        let ok = re.is_match(&self.submitted_text(request));
        Ok(self.record(ok, error))
    }

    /// Check that the submitted value is at most `max` characters.
    pub fn is_max_length(&mut self, request: &Request, max: usize, error: &str) -> bool {
        let ok = self.submitted_text(request).chars().count() <= max;
        self.record(ok, error)
    }

    /// Check that the submitted value is a real date in this field's mask.
    pub fn is_date(&mut self, request: &Request, error: &str) -> bool {
        let mask = match &self.element_type {
            ElementType::Date { mask } => mask.clone(),
            _ => DEFAULT_DATE_MASK.to_string(),
        };
        let ok = NaiveDate::parse_from_str(&self.submitted_text(request), &chrono_format(&mask))
            .is_ok();
        self.record(ok, error)
    }

    /// Check that the submitted value is a `HH:MM` time.
    pub fn is_time(&mut self, request: &Request, error: &str) -> bool {
        let ok = NaiveTime::parse_from_str(&self.submitted_text(request), "%H:%M").is_ok();
        self.record(ok, error)
    }

    /// Check that the checkbox was ticked.
    pub fn is_checked(&mut self, request: &Request, error: &str) -> bool {
        let ok = self.submitted(request).is_some_and(|v| !v.is_empty());
        self.record(ok, error)
    }

    /// Check the uploaded file's extension against an allow-list.
    pub fn is_allowed_extension(
        &mut self,
        request: &Request,
        extensions: &[&str],
        error: &str,
    ) -> bool {
        let ok = request
            .files
            .get(&self.name)
            .and_then(|f| f.extension())
            .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)));
        self.record(ok, error)
    }

    /// Check that the uploaded file is at most `max_bytes` large.
    pub fn is_allowed_file_size(&mut self, request: &Request, max_bytes: u64, error: &str) -> bool {
        let ok = request
            .files
            .get(&self.name)
            .is_some_and(|f| f.size <= max_bytes);
        self.record(ok, error)
    }
}

/// Translate a `d-m-Y` style mask into a chrono format string.
fn chrono_format(mask: &str) -> String {
    let mut format = String::with_capacity(mask.len() * 2);
    for c in mask.chars() {
        match c {
            'd' => format.push_str("%d"),
            'm' => format.push_str("%m"),
            'Y' => format.push_str("%Y"),
            'y' => format.push_str("%y"),
            '%' => format.push_str("%%"),
            other => format.push(other),
        }
    }
    format
}

/// Submitted values restricted to the allowed options.
fn allowed(submitted: Option<&ParamValue>, options: &[SelectOption]) -> Vec<String> {
    submitted
        .map(ParamValue::to_list)
        .unwrap_or_default()
        .into_iter()
        .filter(|v| options.iter().any(|(key, _)| key == v))
        .collect()
}

impl HasValue for FormElement {
    fn value(&self, request: &Request) -> FieldValue {
        let submitted_form = self
            .binding
            .as_ref()
            .is_some_and(|b| b.is_submitted(request));
        if !submitted_form {
            return self.default_value.clone();
        }

        let submitted = self.submitted(request);
        match &self.element_type {
            ElementType::Button { .. } => self.default_value.clone(),
            ElementType::Checkbox => FieldValue::Flag(submitted.is_some_and(|v| !v.is_empty())),
            ElementType::MultiCheckbox { options }
            | ElementType::Dropdown {
                options,
                multiple: true,
            } => FieldValue::List(allowed(submitted, options)),
            ElementType::Radiobutton { options }
            | ElementType::Dropdown {
                options,
                multiple: false,
            } => {
                let value = submitted.and_then(ParamValue::as_str).unwrap_or_default();
                if options.iter().any(|(key, _)| key == value) {
                    FieldValue::Text(value.to_string())
                } else {
                    FieldValue::Text(String::new())
                }
            }
            _ => FieldValue::Text(match submitted {
                Some(ParamValue::Single(s)) => s.clone(),
                Some(ParamValue::Multiple(v)) => v.first().cloned().unwrap_or_default(),
                None => String::new(),
            }),
        }
    }
}

impl HasErrors for FormElement {
    fn errors(&self) -> String {
        self.errors.clone()
    }
}

impl Field for FormElement {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> FieldKind {
        self.element_type.kind()
    }

    fn bind(&mut self, binding: Binding) {
        self.binding = Some(binding);
    }

    fn as_value(&self) -> Option<&dyn HasValue> {
        match self.element_type {
            ElementType::File | ElementType::Image => None,
            _ => Some(self),
        }
    }

    fn as_errors(&self) -> Option<&dyn HasErrors> {
        match self.element_type {
            ElementType::Hidden | ElementType::Button { .. } => None,
            _ => Some(self),
        }
    }

    fn parse(&self, request: &Request, sink: &mut dyn RenderSink) -> anyhow::Result<()> {
        let view = FieldView::new(&self.name, self.kind())
            .value(self.as_value().map(|v| v.value(request)))
            .errors(self.as_errors().map(|e| e.errors()))
            .attributes(self.attributes.clone())
            .options(self.options().to_vec());
        sink.add_field(view)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
