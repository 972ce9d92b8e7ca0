//! Render sink collecting parsed forms into a Tera context.

use anyhow::Result;
use tera::Context;

use crate::form::{FieldView, FormView, RenderSink};

/// Collects field and form views as template variables.
///
/// Each field is exposed under its template variable (`txtUserName`) with
/// its error text under the same name plus `Error`. The form tag is exposed
/// as `form_<name>`. All fields are also listed in order under `fields`.
#[derive(Debug, Default)]
pub struct TemplateSink {
    context: Context,
    fields: Vec<FieldView>,
    forms: Vec<String>,
}

impl TemplateSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing context, e.g. one carrying page variables.
    pub fn with_context(context: Context) -> Self {
        Self {
            context,
            ..Self::default()
        }
    }

    /// Insert an extra template variable.
    pub fn insert<T: serde::Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        self.context.insert(key, value);
    }

    /// Names of the forms added so far.
    pub fn forms(&self) -> &[String] {
        &self.forms
    }

    /// The context to render with.
    pub fn context(&self) -> Context {
        let mut context = self.context.clone();
        context.insert("fields", &self.fields);
        context
    }
}

impl RenderSink for TemplateSink {
    fn add_field(&mut self, field: FieldView) -> Result<()> {
        self.context.insert(field.variable.as_str(), &field);
        self.context
            .insert(field.error_variable(), field.errors.as_deref().unwrap_or(""));
        self.fields.push(field);
        Ok(())
    }

    fn add_form(&mut self, form: FormView) -> Result<()> {
        let key = format!("form_{}", form.name);
        self.context.insert(key.as_str(), &form);
        self.forms.push(form.name);
        Ok(())
    }
}
