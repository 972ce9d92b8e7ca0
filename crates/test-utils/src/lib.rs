//! Formwork test utilities.
//!
//! Helpers for integration testing: request builders, stub fields and
//! assertion utilities for form tests.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use formwork_kernel::form::{
    Binding, Field, FieldKind, FieldValue, HasErrors, HasValue, TOKEN_FIELD,
};
use formwork_kernel::request::Request;
use formwork_kernel::session::{MemorySession, SessionStore, TOKEN_SESSION_KEY};

/// A POST request submitting `form_name` with the given fields.
pub fn post_submission(form_name: &str, fields: &[(&str, &str)]) -> Request {
    Request::post(std::iter::once(("form", form_name)).chain(fields.iter().copied()))
}

/// A GET request submitting `form_name` with the given fields.
pub fn get_submission(form_name: &str, fields: &[(&str, &str)]) -> Request {
    Request::get(std::iter::once(("form", form_name)).chain(fields.iter().copied()))
}

/// A POST submission that also carries the session's form token.
pub fn post_with_token(
    form_name: &str,
    session: &impl SessionStore,
    fields: &[(&str, &str)],
) -> Request {
    let mut request = post_submission(form_name, fields);
    if let Some(token) = session.get(TOKEN_SESSION_KEY) {
        request.body.insert(TOKEN_FIELD, token);
    }
    request
}

/// A fresh session with a fixed id.
pub fn test_session() -> MemorySession {
    MemorySession::with_id("test-session")
}

/// A custom field that counts how often its errors are read.
///
/// Clones share the counter, so a test can keep one handle while the form
/// owns the other.
#[derive(Debug, Clone)]
pub struct CountingField {
    name: String,
    error: String,
    value: String,
    reads: Arc<AtomicUsize>,
    binding: Option<Binding>,
}

impl CountingField {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            error: String::new(),
            value: String::new(),
            reads: Arc::new(AtomicUsize::new(0)),
            binding: None,
        }
    }

    /// Make the field report `error` on every read.
    pub fn with_error(mut self, error: &str) -> Self {
        self.error = error.to_string();
        self
    }

    /// Fixed value reported by the field.
    pub fn with_value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    /// How many times `errors()` was called.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }
}

impl HasErrors for CountingField {
    fn errors(&self) -> String {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.error.clone()
    }
}

impl HasValue for CountingField {
    fn value(&self, _request: &Request) -> FieldValue {
        FieldValue::Text(self.value.clone())
    }
}

impl Field for CountingField {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> FieldKind {
        FieldKind::Custom
    }

    fn bind(&mut self, binding: Binding) {
        self.binding = Some(binding);
    }

    fn as_value(&self) -> Option<&dyn HasValue> {
        Some(self)
    }

    fn as_errors(&self) -> Option<&dyn HasErrors> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A custom field with no value and no errors, e.g. a markup block.
#[derive(Debug, Clone)]
pub struct InertField {
    name: String,
}

impl InertField {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Field for InertField {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> FieldKind {
        FieldKind::Custom
    }

    fn bind(&mut self, _binding: Binding) {}

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Assertion helpers.
pub mod assert {
    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that a string does not contain a substring.
    pub fn not_contains(haystack: &str, needle: &str) {
        assert!(
            !haystack.contains(needle),
            "Expected string to NOT contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that newline-joined error text consists of exactly `lines`.
    pub fn error_lines(errors: &str, lines: &[&str]) {
        let actual: Vec<&str> = if errors.is_empty() {
            Vec::new()
        } else {
            errors.split('\n').collect()
        };
        assert_eq!(actual, lines, "error text mismatch:\n{errors}");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use formwork_kernel::request::Method;

    #[test]
    fn test_post_submission_sets_identity() {
        let request = post_submission("login", &[("user", "ada")]);
        assert_eq!(request.params(Method::Post).get_str("form"), Some("login"));
        assert_eq!(request.params(Method::Post).get_str("user"), Some("ada"));
        assert!(request.query.is_empty());
    }

    #[test]
    fn test_get_submission_uses_query() {
        let request = get_submission("search", &[("q", "rust")]);
        assert_eq!(request.params(Method::Get).get_str("form"), Some("search"));
        assert!(request.body.is_empty());
    }

    #[test]
    fn test_post_with_token() {
        let mut session = test_session();
        session.insert("form_token", "abc".to_string());
        let request = post_with_token("f", &session, &[]);
        assert_eq!(request.body.get_str("form_token"), Some("abc"));
    }

    #[test]
    fn test_counting_field_counts_reads() {
        let field = CountingField::new("x").with_error("bad");
        let handle = field.clone();
        assert_eq!(field.errors(), "bad");
        assert_eq!(field.errors(), "bad");
        assert_eq!(handle.reads(), 2);
    }

    #[test]
    fn test_assertions() {
        assert::contains("hello world", "world");
        assert::not_contains("hello world", "foo");
        assert::error_lines("a\nb", &["a", "b"]);
        assert::error_lines("", &[]);
    }
}
