//! Handing a form to a rendering sink.
//!
//! Widget markup is the sink's business; this module only describes what
//! each field and the form tag carry.

use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;

use crate::request::Request;

use super::element::SelectOption;
use super::field::{FieldKind, FieldValue};
use super::types::Form;
use super::{IDENTITY_FIELD, TOKEN_FIELD};

/// Receives parsed fields and the form tag.
pub trait RenderSink {
    fn add_field(&mut self, field: FieldView) -> Result<()>;

    fn add_form(&mut self, form: FormView) -> Result<()>;
}

/// Everything a template needs to draw one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldView {
    pub name: String,
    pub kind: FieldKind,
    /// Template variable name, e.g. `txtUserName`.
    pub variable: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
}

impl FieldView {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        let variable = format!(
            "{}{}",
            kind.template_prefix(),
            camel_case(name.trim_end_matches("[]"), false)
        );
        Self {
            name,
            kind,
            variable,
            value: None,
            errors: None,
            attributes: IndexMap::new(),
            options: Vec::new(),
        }
    }

    pub fn value(mut self, value: Option<FieldValue>) -> Self {
        self.value = value;
        self
    }

    pub fn errors(mut self, errors: Option<String>) -> Self {
        self.errors = errors;
        self
    }

    pub fn attributes(mut self, attributes: IndexMap<String, String>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    /// Name of the template variable holding this field's error text.
    pub fn error_variable(&self) -> String {
        format!("{}Error", self.variable)
    }
}

/// The form tag as seen by a template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormView {
    pub name: String,
    pub action: String,
    pub method: String,
    pub parameters_html: String,
    pub use_token: bool,
    /// Hidden inputs for the identity and token fields.
    pub hidden_html: String,
    pub errors: String,
}

impl FormView {
    /// Describe the form tag.
    pub fn from_form(form: &Form) -> Self {
        let mut hidden_html = String::new();
        for name in [IDENTITY_FIELD, TOKEN_FIELD] {
            if let Ok(element) = form.element(name) {
                hidden_html.push_str(&format!(
                    r#"<input type="hidden" name="{}" id="{}" value="{}" />"#,
                    html_escape(name),
                    html_escape(element.get_attribute("id").unwrap_or(name)),
                    html_escape(&element.default_value.to_string()),
                ));
            }
        }

        Self {
            name: form.name().to_string(),
            action: form.action().to_string(),
            method: form.method().as_str().to_string(),
            parameters_html: form.parameters_html(),
            use_token: form.use_token(),
            hidden_html,
            errors: form.errors(),
        }
    }
}

impl Form {
    /// Parse every user-visible field into `sink`, then the form tag.
    ///
    /// The identity and token fields are part of the tag, not parsed
    /// separately.
    pub fn parse(&self, request: &Request, sink: &mut dyn RenderSink) -> Result<()> {
        for (name, field) in self.registry.iter() {
            if name == IDENTITY_FIELD || name == TOKEN_FIELD {
                continue;
            }
            field.parse(request, sink)?;
        }
        sink.add_form(FormView::from_form(self))
    }
}

/// `user_name` to `UserName`, or `userName` with `lower_first`.
pub fn camel_case(value: &str, lower_first: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for part in value.split('_').filter(|p| !p.is_empty()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    if lower_first {
        let mut chars = out.chars();
        if let Some(first) = chars.next() {
            return first.to_lowercase().chain(chars).collect();
        }
    }
    out
}

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::session::MemorySession;

    #[derive(Default)]
    struct Recorder {
        fields: Vec<FieldView>,
        forms: Vec<FormView>,
    }

    impl RenderSink for Recorder {
        fn add_field(&mut self, field: FieldView) -> Result<()> {
            self.fields.push(field);
            Ok(())
        }

        fn add_form(&mut self, form: FormView) -> Result<()> {
            self.forms.push(form);
            Ok(())
        }
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("user_name", false), "UserName");
        assert_eq!(camel_case("user_name", true), "userName");
        assert_eq!(camel_case("form_token_login", true), "formTokenLogin");
        assert_eq!(camel_case("", true), "");
    }

    #[test]
    fn test_html_escape_special_chars() {
        assert_eq!(
            html_escape("<script>alert('xss')</script>"),
            "&lt;script&gt;alert(&#x27;xss&#x27;)&lt;/script&gt;"
        );
        assert_eq!(html_escape("a & b"), "a &amp; b");
    }

    #[test]
    fn test_field_view_variables() {
        let view = FieldView::new("first_name", FieldKind::Text);
        assert_eq!(view.variable, "txtFirstName");
        assert_eq!(view.error_variable(), "txtFirstNameError");

        let view = FieldView::new("tags[]", FieldKind::MultiCheckbox);
        assert_eq!(view.variable, "chkTags");
    }

    #[test]
    fn test_parse_skips_identity_and_token() {
        let mut session = MemorySession::new();
        let mut form = Form::builder("login")
            .action("/login")
            .build_with_token(&mut session);
        form.add_text("username", None).unwrap();
        form.add_password("password", None).unwrap();

        let mut sink = Recorder::default();
        form.parse(&Request::post([("form", "login")]), &mut sink)
            .unwrap();

        let names: Vec<_> = sink.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["username", "password"]);
        assert_eq!(sink.forms.len(), 1);

        let tag = &sink.forms[0];
        assert_eq!(tag.action, "/login");
        assert_eq!(tag.method, "post");
        assert!(tag.use_token);
        assert!(tag.hidden_html.contains(r#"name="form" id="formLogin" value="login""#));
        assert!(tag.hidden_html.contains(r#"name="form_token""#));
    }

    #[test]
    fn test_file_view_has_no_value() {
        let mut form = Form::new("f");
        form.add_file("cv").unwrap();

        let mut sink = Recorder::default();
        form.parse(&Request::post([("form", "f")]), &mut sink)
            .unwrap();

        assert_eq!(sink.fields[0].value, None);
        assert_eq!(sink.fields[0].errors, Some(String::new()));
        assert!(sink.forms[0].parameters_html.contains("multipart/form-data"));
    }
}
