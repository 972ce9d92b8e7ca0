//! Value extraction.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::request::Request;

use super::field::FieldValue;
use super::registry::FieldRegistry;
use super::types::Form;

/// A field name to leave out of [`Form::values`], or a nested group of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Excluded {
    Name(String),
    Group(Vec<Excluded>),
}

impl Excluded {
    fn collect_into(self, names: &mut HashSet<String>) {
        match self {
            Excluded::Name(name) => {
                names.insert(name);
            }
            Excluded::Group(group) => {
                for item in group {
                    item.collect_into(names);
                }
            }
        }
    }
}

impl From<&str> for Excluded {
    fn from(name: &str) -> Self {
        Excluded::Name(name.to_string())
    }
}

impl From<String> for Excluded {
    fn from(name: String) -> Self {
        Excluded::Name(name)
    }
}

impl<T: Into<Excluded>> From<Vec<T>> for Excluded {
    fn from(items: Vec<T>) -> Self {
        Excluded::Group(items.into_iter().map(Into::into).collect())
    }
}

impl From<&[&str]> for Excluded {
    fn from(names: &[&str]) -> Self {
        Excluded::Group(names.iter().map(|n| Excluded::from(*n)).collect())
    }
}

/// Flatten exclusion arguments into one set of names.
pub fn flatten_exclusions<E: Into<Excluded>>(excluded: impl IntoIterator<Item = E>) -> HashSet<String> {
    let mut names = HashSet::new();
    for item in excluded {
        item.into().collect_into(&mut names);
    }
    names
}

/// Read the value of every value-carrying field of `registry`, in
/// registration order, skipping excluded names.
pub fn extract_values(
    registry: &FieldRegistry,
    request: &Request,
    excluded: &HashSet<String>,
) -> IndexMap<String, FieldValue> {
    registry
        .iter()
        .filter(|(name, _)| !excluded.contains(*name))
        .filter_map(|(name, field)| {
            field
                .as_value()
                .map(|reader| (name.to_string(), reader.value(request)))
        })
        .collect()
}

impl Form {
    /// Current values of all value-carrying fields, leaving out the
    /// excluded names. Each argument is a name or a nested group of names.
    pub fn values<E: Into<Excluded>>(
        &self,
        request: &Request,
        excluded: impl IntoIterator<Item = E>,
    ) -> IndexMap<String, FieldValue> {
        extract_values(&self.registry, request, &flatten_exclusions(excluded))
    }

    /// Current values of all value-carrying fields.
    pub fn all_values(&self, request: &Request) -> IndexMap<String, FieldValue> {
        self.values(request, Vec::<Excluded>::new())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::form::IDENTITY_FIELD;
    use crate::form::element::FormElement;
    use crate::form::field::Binding;
    use crate::request::Method;

    #[test]
    fn test_extract_values_excludes_name() {
        let mut registry = FieldRegistry::new();
        registry
            .add(
                vec![
                    FormElement::text("a"),
                    FormElement::text("b"),
                    FormElement::text("c"),
                ],
                &Binding::new("f", Method::Post),
            )
            .unwrap();
        let request = Request::post([("form", "f"), ("a", "1"), ("b", "2"), ("c", "3")]);

        let values = extract_values(&registry, &request, &flatten_exclusions(["b"]));

        let expected: IndexMap<String, FieldValue> = [
            ("a".to_string(), FieldValue::from("1")),
            ("c".to_string(), FieldValue::from("3")),
        ]
        .into_iter()
        .collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn test_extract_values_does_not_mutate() {
        let (form, request) = abc_form();
        let first = form.all_values(&request);
        let second = form.all_values(&request);
        assert_eq!(first, second);
    }

    fn abc_form() -> (Form, Request) {
        let mut form = Form::new("f");
        form.add_texts(&[("a", ""), ("b", ""), ("c", "")]).unwrap();
        let request = Request::post([("form", "f"), ("a", "1"), ("b", "2"), ("c", "3")]);
        (form, request)
    }

    #[test]
    fn test_exclude_single_name() {
        let (form, request) = abc_form();
        let values = form.values(&request, [IDENTITY_FIELD, "b"]);

        let expected: IndexMap<String, FieldValue> = [
            ("a".to_string(), FieldValue::from("1")),
            ("c".to_string(), FieldValue::from("3")),
        ]
        .into_iter()
        .collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn test_nested_exclusions() {
        let (form, request) = abc_form();
        let values = form.values(
            &request,
            [
                Excluded::from(vec!["a", IDENTITY_FIELD]),
                Excluded::from(vec![Excluded::from("c")]),
            ],
        );
        let keys: Vec<_> = values.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b"]);
    }

    #[test]
    fn test_all_values_includes_identity_and_skips_files() {
        let (mut form, request) = abc_form();
        form.add_file("upload").unwrap();
        let values = form.all_values(&request);

        let keys: Vec<_> = values.keys().map(String::as_str).collect();
        assert_eq!(keys, vec![IDENTITY_FIELD, "a", "b", "c"]);
        assert_eq!(values[IDENTITY_FIELD], FieldValue::from("f"));
    }

    #[test]
    fn test_values_use_defaults_before_submit() {
        let mut form = Form::new("f");
        form.add_text("q", Some("default")).unwrap();
        let values = form.values(&Request::post([("q", "typed")]), [IDENTITY_FIELD]);
        assert_eq!(values["q"], FieldValue::from("default"));
    }

    #[test]
    fn test_flatten_exclusions() {
        let names = flatten_exclusions([
            Excluded::from("x"),
            Excluded::from(&["y", "z"][..]),
            Excluded::from(vec![vec!["w"]]),
        ]);
        assert_eq!(names.len(), 4);
        assert!(names.contains("w"));
    }
}
