//! The form aggregate and its builder.

use indexmap::IndexMap;

use crate::config::FormDefaults;
use crate::error::FormResult;
use crate::request::Method;
use crate::session::SessionStore;

use super::csrf::get_token;
use super::element::{FormElement, SelectOption};
use super::field::{Binding, Field};
use super::registry::{FieldRegistry, FieldSet};
use super::render::camel_case;
use super::{IDENTITY_FIELD, TOKEN_FIELD};

/// Cached outcome of validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verdict {
    #[default]
    Unvalidated,
    Valid,
    Invalid,
}

/// A server-side form: its fields, token policy and validation state.
#[derive(Debug)]
pub struct Form {
    pub(super) name: String,
    pub(super) method: Method,
    pub(super) action: String,
    pub(super) use_token: bool,
    pub(super) token_error: String,
    pub(super) parameters: IndexMap<String, String>,
    pub(super) registry: FieldRegistry,
    /// Errors added by the caller through [`Form::add_error`].
    pub(super) form_errors: Vec<String>,
    /// Errors collected by the last validation pass.
    pub(super) collected: Vec<String>,
    pub(super) verdict: Verdict,
}

/// Builder for [`Form`].
#[derive(Debug, Clone)]
pub struct FormBuilder {
    name: String,
    action: String,
    method: Method,
    token_error: String,
    parameters: IndexMap<String, String>,
}

impl FormBuilder {
    /// Set the form action URL.
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    /// Set the form method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the form method by name; unknown names mean `post`.
    pub fn method_str(mut self, method: &str) -> Self {
        self.method = Method::parse_lenient(method);
        self
    }

    /// Apply application-wide defaults.
    pub fn defaults(mut self, defaults: &FormDefaults) -> Self {
        self.token_error = defaults.token_error.clone();
        self
    }

    /// Message recorded when token verification fails.
    pub fn token_error(mut self, error: impl Into<String>) -> Self {
        self.token_error = error.into();
        self
    }

    /// Add an attribute to the form tag.
    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Build a form without anti-forgery protection.
    pub fn build(self) -> Form {
        self.finish(None)
    }

    /// Build a form protected by the session's anti-forgery token.
    pub fn build_with_token(self, session: &mut dyn SessionStore) -> Form {
        let token = get_token(session);
        self.finish(Some(token))
    }

    fn finish(self, token: Option<String>) -> Form {
        let mut form = Form {
            name: self.name,
            method: self.method,
            action: String::new(),
            use_token: token.is_some(),
            token_error: self.token_error,
            parameters: self.parameters,
            registry: FieldRegistry::new(),
            form_errors: Vec::new(),
            collected: Vec::new(),
            verdict: Verdict::Unvalidated,
        };
        form.set_action(&self.action);

        let binding = form.binding();
        let identity = FormElement::hidden(IDENTITY_FIELD, form.name.as_str())
            .attribute("id", camel_case(&format!("form_{}", form.name), true));
        form.registry.insert(Box::new(identity), &binding);

        if let Some(token) = token {
            let token = FormElement::hidden(TOKEN_FIELD, token)
                .attribute("id", camel_case(&format!("form_token_{}", form.name), true));
            form.registry.insert(Box::new(token), &binding);
        }
        form
    }
}

impl Form {
    /// Start building a form with the given name.
    pub fn builder(name: impl Into<String>) -> FormBuilder {
        let defaults = FormDefaults::default();
        FormBuilder {
            name: name.into(),
            action: String::new(),
            method: Method::Post,
            token_error: defaults.token_error,
            parameters: IndexMap::new(),
        }
    }

    /// A plain `post` form without token.
    pub fn new(name: impl Into<String>) -> Self {
        Self::builder(name).build()
    }

    pub(super) fn binding(&self) -> Binding {
        Binding::new(self.name.clone(), self.method)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn use_token(&self) -> bool {
        self.use_token
    }

    pub fn token_error(&self) -> &str {
        &self.token_error
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// Set the action URL; double quotes are escaped.
    pub fn set_action(&mut self, action: &str) -> &mut Self {
        self.action = action.replace('"', "&quot;");
        self
    }

    /// Change the method; registered fields are re-bound.
    pub fn set_method(&mut self, method: Method) -> &mut Self {
        self.method = method;
        let binding = self.binding();
        self.registry.rebind(&binding);
        self
    }

    pub fn set_token_error(&mut self, error: impl Into<String>) -> &mut Self {
        self.token_error = error.into();
        self
    }

    pub fn set_parameter(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn set_parameters<K, V>(&mut self, parameters: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in parameters {
            self.set_parameter(key, value);
        }
        self
    }

    pub fn parameters(&self) -> &IndexMap<String, String> {
        &self.parameters
    }

    /// Form-tag attributes as ` key="value"` pairs.
    pub fn parameters_html(&self) -> String {
        self.parameters
            .iter()
            .map(|(key, value)| format!(" {key}=\"{value}\""))
            .collect()
    }

    /// Add a form-level error.
    ///
    /// A non-empty error after validation turns a valid verdict invalid.
    pub fn add_error(&mut self, error: &str) -> &mut Self {
        let error = error.trim();
        if error.is_empty() {
            return self;
        }
        self.form_errors.push(error.to_string());
        if self.verdict == Verdict::Valid {
            self.verdict = Verdict::Invalid;
        }
        self
    }

    /// All errors: the last pass's token and field errors, then form-level
    /// errors, newline-joined.
    pub fn errors(&self) -> String {
        self.collected
            .iter()
            .chain(self.form_errors.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Register one field or a nested collection of fields.
    pub fn add(&mut self, fields: impl Into<FieldSet>) -> FormResult<()> {
        let binding = self.binding();
        let registered = self.registry.add(fields, &binding)?;
        if registered.files > 0 && !self.parameters.contains_key("enctype") {
            self.set_parameter("enctype", "multipart/form-data");
        }
        Ok(())
    }

    fn add_element(&mut self, element: FormElement) -> FormResult<&mut FormElement> {
        let name = element.name.clone();
        self.add(element)?;
        self.element_mut(&name)
    }

    pub fn add_button(
        &mut self,
        name: &str,
        label: &str,
        button_type: Option<&str>,
    ) -> FormResult<&mut FormElement> {
        self.add_element(FormElement::button(name, label, button_type))
    }

    pub fn add_checkbox(&mut self, name: &str, checked: bool) -> FormResult<&mut FormElement> {
        self.add_element(FormElement::checkbox(name, checked))
    }

    pub fn add_date(
        &mut self,
        name: &str,
        value: Option<&str>,
        mask: Option<&str>,
    ) -> FormResult<&mut FormElement> {
        self.add_element(FormElement::date(name, mask).default_value(value.unwrap_or_default()))
    }

    pub fn add_dropdown(
        &mut self,
        name: &str,
        options: Vec<SelectOption>,
        selected: Option<&str>,
    ) -> FormResult<&mut FormElement> {
        self.add_element(FormElement::dropdown(name, options, selected))
    }

    pub fn add_multi_dropdown(
        &mut self,
        name: &str,
        options: Vec<SelectOption>,
        selected: Vec<String>,
    ) -> FormResult<&mut FormElement> {
        self.add_element(FormElement::multi_dropdown(name, options, selected))
    }

    pub fn add_file(&mut self, name: &str) -> FormResult<&mut FormElement> {
        self.add_element(FormElement::file(name))
    }

    pub fn add_hidden(&mut self, name: &str, value: &str) -> FormResult<&mut FormElement> {
        self.add_element(FormElement::hidden(name, value))
    }

    pub fn add_image(&mut self, name: &str) -> FormResult<&mut FormElement> {
        self.add_element(FormElement::image(name))
    }

    pub fn add_multi_checkbox(
        &mut self,
        name: &str,
        options: Vec<SelectOption>,
        checked: Vec<String>,
    ) -> FormResult<&mut FormElement> {
        self.add_element(FormElement::multi_checkbox(name, options, checked))
    }

    pub fn add_password(&mut self, name: &str, value: Option<&str>) -> FormResult<&mut FormElement> {
        self.add_element(FormElement::password(name).default_value(value.unwrap_or_default()))
    }

    pub fn add_radiobutton(
        &mut self,
        name: &str,
        options: Vec<SelectOption>,
        checked: Option<&str>,
    ) -> FormResult<&mut FormElement> {
        self.add_element(FormElement::radiobutton(name, options, checked))
    }

    pub fn add_text(&mut self, name: &str, value: Option<&str>) -> FormResult<&mut FormElement> {
        self.add_element(FormElement::text(name).default_value(value.unwrap_or_default()))
    }

    pub fn add_textarea(&mut self, name: &str, value: Option<&str>) -> FormResult<&mut FormElement> {
        self.add_element(FormElement::textarea(name).default_value(value.unwrap_or_default()))
    }

    pub fn add_time(&mut self, name: &str, value: Option<&str>) -> FormResult<&mut FormElement> {
        self.add_element(FormElement::time(name).default_value(value.unwrap_or_default()))
    }

    /// Add several checkboxes from `(name, checked)` pairs.
    pub fn add_checkboxes(&mut self, fields: &[(&str, bool)]) -> FormResult<()> {
        self.add(
            fields
                .iter()
                .map(|(name, checked)| FormElement::checkbox(*name, *checked))
                .collect::<Vec<_>>(),
        )
    }

    /// Add several hidden fields from `(name, value)` pairs.
    pub fn add_hiddens(&mut self, fields: &[(&str, &str)]) -> FormResult<()> {
        self.add(
            fields
                .iter()
                .map(|(name, value)| FormElement::hidden(*name, *value))
                .collect::<Vec<_>>(),
        )
    }

    /// Add several password fields from `(name, default)` pairs.
    pub fn add_passwords(&mut self, fields: &[(&str, &str)]) -> FormResult<()> {
        self.add(
            fields
                .iter()
                .map(|(name, value)| FormElement::password(*name).default_value(*value))
                .collect::<Vec<_>>(),
        )
    }

    /// Add several textareas from `(name, default)` pairs.
    pub fn add_textareas(&mut self, fields: &[(&str, &str)]) -> FormResult<()> {
        self.add(
            fields
                .iter()
                .map(|(name, value)| FormElement::textarea(*name).default_value(*value))
                .collect::<Vec<_>>(),
        )
    }

    /// Add several text fields from `(name, default)` pairs.
    pub fn add_texts(&mut self, fields: &[(&str, &str)]) -> FormResult<()> {
        self.add(
            fields
                .iter()
                .map(|(name, value)| FormElement::text(*name).default_value(*value))
                .collect::<Vec<_>>(),
        )
    }

    /// Add several time fields from `(name, default)` pairs.
    pub fn add_times(&mut self, fields: &[(&str, &str)]) -> FormResult<()> {
        self.add(
            fields
                .iter()
                .map(|(name, value)| FormElement::time(*name).default_value(*value))
                .collect::<Vec<_>>(),
        )
    }

    pub fn add_files(&mut self, names: &[&str]) -> FormResult<()> {
        self.add(names.iter().map(|n| FormElement::file(*n)).collect::<Vec<_>>())
    }

    pub fn add_images(&mut self, names: &[&str]) -> FormResult<()> {
        self.add(names.iter().map(|n| FormElement::image(*n)).collect::<Vec<_>>())
    }

    pub fn exists_field(&self, name: &str) -> bool {
        self.registry.exists(name)
    }

    /// Fetch a field; unknown names are a programmer error.
    pub fn field(&self, name: &str) -> FormResult<&dyn Field> {
        self.registry.get(name)
    }

    pub fn field_mut(&mut self, name: &str) -> FormResult<&mut dyn Field> {
        self.registry.get_mut(name)
    }

    /// Fetch a built-in element.
    pub fn element(&self, name: &str) -> FormResult<&FormElement> {
        self.registry.get_as::<FormElement>(name)
    }

    pub fn element_mut(&mut self, name: &str) -> FormResult<&mut FormElement> {
        self.registry.get_as_mut::<FormElement>(name)
    }

    /// All fields in registration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &dyn Field)> {
        self.registry.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::FormError;
    use crate::form::field::FieldKind;
    use crate::session::MemorySession;

    #[test]
    fn test_builder_defaults() {
        let form = Form::new("contact");
        assert_eq!(form.name(), "contact");
        assert_eq!(form.method(), Method::Post);
        assert_eq!(form.action(), "");
        assert!(!form.use_token());
        assert_eq!(form.token_error(), "Invalid token");
        assert_eq!(form.verdict(), Verdict::Unvalidated);
    }

    #[test]
    fn test_identity_field_registered() {
        let form = Form::new("login_form");
        let identity = form.element(IDENTITY_FIELD).unwrap();
        assert_eq!(identity.kind(), FieldKind::Hidden);
        assert_eq!(identity.default_value.as_str(), Some("login_form"));
        assert_eq!(identity.get_attribute("id"), Some("formLoginForm"));
        assert!(!form.exists_field(TOKEN_FIELD));
    }

    #[test]
    fn test_token_field_registered() {
        let mut session = MemorySession::new();
        let form = Form::builder("login").build_with_token(&mut session);

        assert!(form.use_token());
        let token = form.element(TOKEN_FIELD).unwrap();
        assert_eq!(
            token.default_value.as_str().map(str::to_string),
            crate::session::SessionStore::get(&session, crate::session::TOKEN_SESSION_KEY)
        );
        assert_eq!(token.get_attribute("id"), Some("formTokenLogin"));
    }

    #[test]
    fn test_method_str_is_lenient() {
        assert_eq!(Form::builder("f").method_str("GET").build().method(), Method::Get);
        assert_eq!(Form::builder("f").method_str("put").build().method(), Method::Post);
    }

    #[test]
    fn test_set_action_escapes_quotes() {
        let form = Form::builder("f").action("/a?q=\"x\"").build();
        assert_eq!(form.action(), "/a?q=&quot;x&quot;");
    }

    #[test]
    fn test_parameters_html() {
        let mut form = Form::builder("f").parameter("class", "wide").build();
        form.set_parameters([("data-x", "1")]);
        assert_eq!(form.parameters_html(), " class=\"wide\" data-x=\"1\"");
    }

    #[test]
    fn test_file_field_sets_enctype_once() {
        let mut form = Form::new("upload");
        form.add_file("a").unwrap();
        form.set_parameter("enctype", "custom");
        form.add_image("b").unwrap();

        assert_eq!(form.parameters().get("enctype").map(String::as_str), Some("custom"));
        assert_eq!(
            form.parameters().keys().filter(|k| *k == "enctype").count(),
            1
        );
    }

    #[test]
    fn test_typed_factories_return_element() {
        let mut form = Form::new("f");
        form.add_text("name", Some("Jo"))
            .unwrap()
            .set_attribute("placeholder", "Your name");

        let element = form.element("name").unwrap();
        assert_eq!(element.get_attribute("placeholder"), Some("Your name"));
        assert_eq!(element.default_value.as_str(), Some("Jo"));
    }

    #[test]
    fn test_bulk_factories() {
        let mut form = Form::new("f");
        form.add_texts(&[("first", ""), ("last", "Doe")]).unwrap();
        form.add_checkboxes(&[("a", true), ("b", false)]).unwrap();
        form.add_files(&["cv"]).unwrap();

        let names: Vec<_> = form.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec![IDENTITY_FIELD, "first", "last", "a", "b", "cv"]);
        assert!(form.parameters().contains_key("enctype"));
    }

    #[test]
    fn test_unknown_field_is_not_found() {
        let form = Form::new("f");
        assert!(matches!(form.field("ghost"), Err(FormError::NotFound(_))));
    }

    #[test]
    fn test_set_method_rebinds_fields() {
        let mut form = Form::new("f");
        form.add_text("q", None).unwrap();
        form.set_method(Method::Get);
        assert_eq!(
            form.element("q").unwrap().binding().map(|b| b.method),
            Some(Method::Get)
        );
    }

    #[test]
    fn test_add_error_trims_and_skips_blank() {
        let mut form = Form::new("f");
        form.add_error("  Something broke  ");
        form.add_error("   ");
        assert_eq!(form.errors(), "Something broke");
    }
}
