//! Field registry: name to field, in insertion order.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::error::{FormError, FormResult};
use crate::request::ParamStore;

use super::IDENTITY_FIELD;
use super::element::FormElement;
use super::field::{Binding, Field};

/// One field or a nested collection of fields, flattened on registration.
#[derive(Debug)]
pub enum FieldSet {
    One(Box<dyn Field>),
    Many(Vec<FieldSet>),
}

impl FieldSet {
    /// Wrap any field implementation.
    pub fn one(field: impl Field) -> Self {
        FieldSet::One(Box::new(field))
    }

    /// Build a field set from JSON element definitions.
    ///
    /// Objects are element definitions, arrays nest; anything else is not a
    /// field and is rejected.
    pub fn from_json(value: &Value) -> FormResult<Self> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(Self::from_json)
                .collect::<FormResult<Vec<_>>>()
                .map(FieldSet::Many),
            Value::Object(_) => serde_json::from_value::<FormElement>(value.clone())
                .map(|element| FieldSet::One(Box::new(element)))
                .map_err(|e| FormError::InvalidArgument(e.to_string())),
            other => Err(FormError::InvalidArgument(format!(
                "expected a field definition, got {other}"
            ))),
        }
    }

    /// Flatten nested collections depth-first, preserving order.
    pub fn flatten(self) -> Vec<Box<dyn Field>> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(self, out: &mut Vec<Box<dyn Field>>) {
        match self {
            FieldSet::One(field) => out.push(field),
            FieldSet::Many(sets) => {
                for set in sets {
                    set.flatten_into(out);
                }
            }
        }
    }
}

impl From<FormElement> for FieldSet {
    fn from(element: FormElement) -> Self {
        FieldSet::One(Box::new(element))
    }
}

impl From<Box<dyn Field>> for FieldSet {
    fn from(field: Box<dyn Field>) -> Self {
        FieldSet::One(field)
    }
}

impl From<Vec<FieldSet>> for FieldSet {
    fn from(sets: Vec<FieldSet>) -> Self {
        FieldSet::Many(sets)
    }
}

impl From<Vec<FormElement>> for FieldSet {
    fn from(elements: Vec<FormElement>) -> Self {
        FieldSet::Many(elements.into_iter().map(FieldSet::from).collect())
    }
}

/// Outcome of a registration call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registered {
    /// Number of fields registered.
    pub added: usize,

    /// Number of file-type fields among them.
    pub files: usize,
}

/// Outcome of a cleanup pass over a parameter store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cleanup {
    pub removed: usize,
    pub inserted: usize,
}

/// Owns the fields of one form.
#[derive(Debug, Default)]
pub struct FieldRegistry {
    fields: IndexMap<String, Box<dyn Field>>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register fields, binding each to the owning form.
    ///
    /// A field replaces any earlier field of the same name, keeping the
    /// earlier position. Nothing is registered if any field is invalid.
    pub fn add(&mut self, fields: impl Into<FieldSet>, binding: &Binding) -> FormResult<Registered> {
        let fields = fields.into().flatten();

        if let Some(field) = fields.iter().find(|f| f.name().trim().is_empty()) {
            return Err(FormError::InvalidArgument(format!(
                "a {} field needs a name",
                field.kind().type_name()
            )));
        }

        let mut registered = Registered::default();
        for field in fields {
            if field.kind().is_file() {
                registered.files += 1;
            }
            self.insert(field, binding);
            registered.added += 1;
        }

        Ok(registered)
    }

    /// Register a single field whose name is already known to be valid.
    pub(crate) fn insert(&mut self, mut field: Box<dyn Field>, binding: &Binding) {
        field.bind(binding.clone());
        debug!(
            form = %binding.form_name,
            field = %field.name(),
            kind = field.kind().type_name(),
            "field registered"
        );
        self.fields.insert(field.name().to_string(), field);
    }

    /// Re-bind every field, e.g. after the form's method changed.
    pub fn rebind(&mut self, binding: &Binding) {
        for field in self.fields.values_mut() {
            field.bind(binding.clone());
        }
    }

    pub fn exists(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn get(&self, name: &str) -> FormResult<&dyn Field> {
        self.fields
            .get(name)
            .map(|f| f.as_ref())
            .ok_or_else(|| FormError::NotFound(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> FormResult<&mut dyn Field> {
        match self.fields.get_mut(name) {
            Some(field) => Ok(field.as_mut()),
            None => Err(FormError::NotFound(name.to_string())),
        }
    }

    /// Look up a field that must be of concrete type `T`.
    pub fn get_as<T: Field>(&self, name: &str) -> FormResult<&T> {
        self.get(name)?
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| FormError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    pub fn get_as_mut<T: Field>(&mut self, name: &str) -> FormResult<&mut T> {
        self.get_mut(name)?
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| FormError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// All fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn Field)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Request keys a submission of this form is expected to carry.
    ///
    /// File fields travel separately; the identity key is always expected.
    pub fn expected_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .fields
            .values()
            .filter(|f| !f.kind().is_file())
            .map(|f| f.name())
            .collect();
        if !keys.contains(&IDENTITY_FIELD) {
            keys.push(IDENTITY_FIELD);
        }
        keys
    }

    /// Strip undeclared keys from `params` and default missing ones to "".
    pub fn cleanup(&self, params: &mut ParamStore) -> Cleanup {
        let expected = self.expected_keys();
        let before = params.len();
        params.retain(|key| expected.contains(&key));
        let removed = before - params.len();

        let mut inserted = 0;
        for key in expected {
            if !params.contains_key(key) {
                params.insert(key, "");
                inserted += 1;
            }
        }

        Cleanup { removed, inserted }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::request::Method;

    fn binding() -> Binding {
        Binding::new("test", Method::Post)
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let mut registry = FieldRegistry::new();
        registry
            .add(
                vec![
                    FormElement::text("c"),
                    FormElement::text("a"),
                    FormElement::text("b"),
                ],
                &binding(),
            )
            .unwrap();

        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_add_overwrites_same_name_in_place() {
        let mut registry = FieldRegistry::new();
        registry.add(FormElement::text("a"), &binding()).unwrap();
        registry.add(FormElement::text("b"), &binding()).unwrap();
        registry.add(FormElement::password("a"), &binding()).unwrap();

        assert_eq!(registry.len(), 2);
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(
            registry.get("a").unwrap().kind(),
            super::super::field::FieldKind::Password
        );
    }

    #[test]
    fn test_nested_sets_are_flattened() {
        let set = FieldSet::Many(vec![
            FieldSet::from(FormElement::text("a")),
            FieldSet::Many(vec![
                FieldSet::from(FormElement::text("b")),
                FieldSet::Many(vec![FieldSet::from(FormElement::file("c"))]),
            ]),
        ]);

        let mut registry = FieldRegistry::new();
        let registered = registry.add(set, &binding()).unwrap();
        assert_eq!(registered, Registered { added: 3, files: 1 });
    }

    #[test]
    fn test_unnamed_field_is_rejected_atomically() {
        let mut registry = FieldRegistry::new();
        let result = registry.add(
            vec![FormElement::text("ok"), FormElement::text("  ")],
            &binding(),
        );
        assert!(matches!(result, Err(FormError::InvalidArgument(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_from_json_rejects_non_fields() {
        let err = FieldSet::from_json(&serde_json::json!([{"name": "a", "type": "text"}, 42]))
            .unwrap_err();
        assert!(matches!(err, FormError::InvalidArgument(_)));

        let err = FieldSet::from_json(&serde_json::json!({"type": "text"})).unwrap_err();
        assert!(matches!(err, FormError::InvalidArgument(_)));
    }

    #[test]
    fn test_from_json_nested() {
        let set = FieldSet::from_json(&serde_json::json!([
            {"name": "title", "type": "text", "max_length": 20},
            [{"name": "body", "type": "textarea"}, {"name": "upload", "type": "file"}]
        ]))
        .unwrap();
        let fields = set.flatten();
        let names: Vec<_> = fields.iter().map(|f| f.name().to_string()).collect();
        assert_eq!(names, vec!["title", "body", "upload"]);
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let registry = FieldRegistry::new();
        assert!(matches!(registry.get("nope"), Err(FormError::NotFound(n)) if n == "nope"));
    }

    #[test]
    fn test_expected_keys_skip_files_and_include_identity() {
        let mut registry = FieldRegistry::new();
        registry
            .add(
                vec![
                    FormElement::text("name"),
                    FormElement::file("upload"),
                    FormElement::image("photo"),
                ],
                &binding(),
            )
            .unwrap();
        assert_eq!(registry.expected_keys(), vec!["name", IDENTITY_FIELD]);
    }

    #[test]
    fn test_cleanup() {
        let mut registry = FieldRegistry::new();
        registry
            .add(vec![FormElement::text("a"), FormElement::text("b")], &binding())
            .unwrap();

        let mut params = ParamStore::from_pairs([("a", "1"), ("evil", "x")]);
        let report = registry.cleanup(&mut params);

        assert_eq!(report, Cleanup { removed: 1, inserted: 2 });
        assert_eq!(params.get_str("a"), Some("1"));
        assert_eq!(params.get_str("b"), Some(""));
        assert_eq!(params.get_str(IDENTITY_FIELD), Some(""));
        assert!(!params.contains_key("evil"));
    }
}
