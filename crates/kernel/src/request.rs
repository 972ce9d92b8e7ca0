//! Request-parameter stores.
//!
//! The form never reads ambient request state. Handlers build a [`Request`]
//! from the inbound HTTP request and pass it to each form operation, which
//! keeps the whole validation pass testable without a server.

use std::fmt;

use axum::http;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Submission method configured on a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    #[default]
    Post,
}

impl Method {
    /// Parse a method name, falling back to `post` for anything unknown.
    pub fn parse_lenient(method: &str) -> Self {
        if method.trim().eq_ignore_ascii_case("get") {
            Method::Get
        } else {
            Method::Post
        }
    }

    /// Lowercase method name as used in markup.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
        }
    }

    /// Whether an inbound HTTP method is this method (case-insensitive).
    pub fn matches(&self, http_method: &http::Method) -> bool {
        http_method.as_str().eq_ignore_ascii_case(self.as_str())
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single submitted parameter: one string, or a list for `name[]` keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Single(String),
    Multiple(Vec<String>),
}

impl ParamValue {
    /// The scalar value, if this parameter is not a list.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Single(s) => Some(s),
            ParamValue::Multiple(_) => None,
        }
    }

    /// All values as a list (a scalar becomes a one-element list).
    pub fn to_list(&self) -> Vec<String> {
        match self {
            ParamValue::Single(s) => vec![s.clone()],
            ParamValue::Multiple(v) => v.clone(),
        }
    }

    /// Whether this parameter carries no meaningful content.
    pub fn is_empty(&self) -> bool {
        match self {
            ParamValue::Single(s) => s.trim().is_empty(),
            ParamValue::Multiple(v) => v.iter().all(|s| s.trim().is_empty()),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Single(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Single(s)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        ParamValue::Multiple(v)
    }
}

/// Ordered key to value(s) mapping for one request method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamStore {
    params: IndexMap<String, ParamValue>,
}

impl ParamStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from key/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<ParamValue>,
    {
        Self {
            params: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parse an `application/x-www-form-urlencoded` string.
    ///
    /// Keys ending in `[]` are collected into a list under the bare name.
    pub fn from_urlencoded(input: &str) -> Self {
        let mut store = Self::new();
        for (key, value) in url::form_urlencoded::parse(input.as_bytes()) {
            match key.strip_suffix("[]") {
                Some(base) => {
                    let entry = store
                        .params
                        .entry(base.to_string())
                        .or_insert_with(|| ParamValue::Multiple(Vec::new()));
                    match entry {
                        ParamValue::Multiple(list) => list.push(value.into_owned()),
                        ParamValue::Single(_) => {
                            *entry = ParamValue::Multiple(vec![value.into_owned()]);
                        }
                    }
                }
                None => {
                    store
                        .params
                        .insert(key.into_owned(), ParamValue::Single(value.into_owned()));
                }
            }
        }
        store
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    /// Scalar value for a key, if present and not a list.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(ParamValue::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.params.shift_remove(key)
    }

    /// Keep only the keys for which the predicate holds.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.params.retain(|k, _| keep(k));
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Metadata of an uploaded file. The upload transport itself is handled
/// elsewhere; forms only inspect what arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Client-side file name.
    pub file_name: String,

    /// Size in bytes.
    pub size: u64,

    /// Declared MIME type.
    pub content_type: Option<String>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, size: u64) -> Self {
        Self {
            file_name: file_name.into(),
            size,
            content_type: None,
        }
    }

    /// Lowercased extension of the file name, without the dot.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
    }
}

/// One inbound request as seen by a form.
#[derive(Debug, Clone)]
pub struct Request {
    /// Inbound HTTP method.
    pub method: http::Method,

    /// Query-string parameters (the `get` store).
    pub query: ParamStore,

    /// Body parameters (the `post` store).
    pub body: ParamStore,

    /// Uploaded files keyed by field name.
    pub files: IndexMap<String, UploadedFile>,
}

impl Request {
    pub fn new(method: http::Method) -> Self {
        Self {
            method,
            query: ParamStore::new(),
            body: ParamStore::new(),
            files: IndexMap::new(),
        }
    }

    /// A GET request with the given query parameters.
    pub fn get<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<ParamValue>,
    {
        Self::new(http::Method::GET).with_query(ParamStore::from_pairs(pairs))
    }

    /// A POST request with the given body parameters.
    pub fn post<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<ParamValue>,
    {
        Self::new(http::Method::POST).with_body(ParamStore::from_pairs(pairs))
    }

    pub fn with_query(mut self, query: ParamStore) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: ParamStore) -> Self {
        self.body = body;
        self
    }

    pub fn with_file(mut self, name: impl Into<String>, file: UploadedFile) -> Self {
        self.files.insert(name.into(), file);
        self
    }

    /// The parameter store a form with the given method reads from.
    pub fn params(&self, method: Method) -> &ParamStore {
        match method {
            Method::Get => &self.query,
            Method::Post => &self.body,
        }
    }

    pub fn params_mut(&mut self, method: Method) -> &mut ParamStore {
        match method {
            Method::Get => &mut self.query,
            Method::Post => &mut self.body,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse_lenient() {
        assert_eq!(Method::parse_lenient("GET"), Method::Get);
        assert_eq!(Method::parse_lenient(" get "), Method::Get);
        assert_eq!(Method::parse_lenient("post"), Method::Post);
        assert_eq!(Method::parse_lenient("delete"), Method::Post);
        assert_eq!(Method::parse_lenient(""), Method::Post);
    }

    #[test]
    fn test_method_matches_http() {
        assert!(Method::Post.matches(&http::Method::POST));
        assert!(!Method::Post.matches(&http::Method::GET));
        assert!(Method::Get.matches(&http::Method::GET));
    }

    #[test]
    fn test_from_urlencoded() {
        let store = ParamStore::from_urlencoded("form=login&name=John+Doe&tags[]=a&tags[]=b");
        assert_eq!(store.get_str("form"), Some("login"));
        assert_eq!(store.get_str("name"), Some("John Doe"));
        assert_eq!(
            store.get("tags"),
            Some(&ParamValue::Multiple(vec!["a".to_string(), "b".to_string()]))
        );
    }

    #[test]
    fn test_urlencoded_preserves_order() {
        let store = ParamStore::from_urlencoded("c=3&a=1&b=2");
        let keys: Vec<_> = store.keys().collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_param_value_is_empty() {
        assert!(ParamValue::from("  ").is_empty());
        assert!(!ParamValue::from("x").is_empty());
        assert!(ParamValue::Multiple(vec![]).is_empty());
    }

    #[test]
    fn test_uploaded_file_extension() {
        assert_eq!(
            UploadedFile::new("Photo.JPG", 10).extension(),
            Some("jpg".to_string())
        );
        assert_eq!(UploadedFile::new("README", 10).extension(), None);
    }

    #[test]
    fn test_request_params_by_method() {
        let request = Request::post([("a", "1")]).with_query(ParamStore::from_pairs([("b", "2")]));
        assert_eq!(request.params(Method::Post).get_str("a"), Some("1"));
        assert_eq!(request.params(Method::Get).get_str("b"), Some("2"));
    }
}
