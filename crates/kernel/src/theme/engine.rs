//! Theme engine with Tera templates.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tera::Tera;
use tracing::debug;

use super::sink::TemplateSink;

const LOGIN_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><title>{{ title | default(value="Sign in") }}</title></head>
<body>
{% if form_login.errors %}
<p class="errors">{{ form_login.errors | escape | linebreaksbr | safe }}</p>
{% endif %}
<form action="{{ form_login.action | safe }}" method="{{ form_login.method }}"{{ form_login.parameters_html | safe }}>
{{ form_login.hidden_html | safe }}
<label for="{{ txtUsername.attributes.id }}">Username</label>
<input type="text" name="username" id="{{ txtUsername.attributes.id }}" value="{{ txtUsername.value }}" />
<label for="{{ txtPassword.attributes.id }}">Password</label>
<input type="password" name="password" id="{{ txtPassword.attributes.id }}" value="" />
<label><input type="checkbox" name="remember" value="1"{% if chkRemember.value %} checked{% endif %} /> Remember me</label>
<button type="submit" name="login">{{ btnLogin.value }}</button>
</form>
</body>
</html>
"#;

const WELCOME_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Welcome</title></head>
<body><p>Welcome, {{ username }}.</p></body>
</html>
"#;

/// Theme engine for rendering parsed forms.
pub struct ThemeEngine {
    tera: Tera,
}

impl ThemeEngine {
    /// Create a new theme engine loading templates from the given directory.
    pub fn new(template_dir: &Path) -> Result<Self> {
        let pattern = template_dir.join("**/*.html");
        let pattern_str = pattern
            .to_str()
            .context("invalid template directory path")?;

        let mut tera = Tera::new(pattern_str).context("failed to initialize Tera templates")?;
        Self::register_filters(&mut tera);

        let template_names: Vec<_> = tera.get_template_names().collect();
        debug!(count = template_names.len(), "loaded templates");

        Ok(Self { tera })
    }

    /// Create a theme engine with no templates (for testing).
    pub fn empty() -> Self {
        let mut tera = Tera::default();
        Self::register_filters(&mut tera);
        Self { tera }
    }

    /// Create a theme engine holding the templates of the demo server.
    pub fn builtin() -> Result<Self> {
        let mut engine = Self::empty();
        engine
            .tera
            .add_raw_templates(vec![
                ("login.html", LOGIN_TEMPLATE),
                ("welcome.html", WELCOME_TEMPLATE),
            ])
            .context("failed to parse built-in templates")?;
        Ok(engine)
    }

    /// Register custom Tera filters.
    fn register_filters(tera: &mut Tera) {
        // `{{ option | selected(value=field.value) }}` for options and checkbox groups.
        tera.register_filter(
            "selected",
            |value: &tera::Value, args: &HashMap<String, tera::Value>| {
                let option = tera::try_get_value!("selected", "value", String, value);
                let selected = match args.get("value") {
                    Some(tera::Value::String(s)) => *s == option,
                    Some(tera::Value::Array(items)) => {
                        items.iter().any(|item| item.as_str() == Some(option.as_str()))
                    }
                    _ => false,
                };
                Ok(tera::Value::Bool(selected))
            },
        );
    }

    /// Get a mutable reference to Tera (for adding templates at runtime).
    pub fn tera_mut(&mut self) -> &mut Tera {
        &mut self.tera
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template(name).is_ok()
    }

    /// Render a template against the variables collected by a sink.
    pub fn render(&self, template: &str, sink: &TemplateSink) -> Result<String> {
        self.tera
            .render(template, &sink.context())
            .with_context(|| format!("failed to render template: {template}"))
    }

    /// Render a template against a plain context.
    pub fn render_context(&self, template: &str, context: &tera::Context) -> Result<String> {
        self.tera
            .render(template, context)
            .with_context(|| format!("failed to render template: {template}"))
    }
}

impl std::fmt::Debug for ThemeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeEngine")
            .field("template_count", &self.tera.get_template_names().count())
            .finish()
    }
}

/// Wrap ThemeEngine in Arc for sharing across handlers.
pub type SharedThemeEngine = Arc<ThemeEngine>;
