//! Server-side forms.
//!
//! A [`Form`] owns a [`FieldRegistry`] of named fields, protects itself with
//! a per-session anti-forgery token, detects its own submission, validates
//! and reports errors, extracts values and hands itself to a [`RenderSink`].
//!
//! The request and the session are passed into every operation that needs
//! them; a form never holds on to either.

pub mod csrf;
mod element;
mod field;
mod registry;
mod render;
mod submission;
mod types;
mod validate;
mod values;

/// Hidden field carrying the form name; its presence marks a submission.
pub const IDENTITY_FIELD: &str = "form";

/// Hidden field carrying the anti-forgery token.
pub const TOKEN_FIELD: &str = "form_token";

pub use csrf::{TokenRejection, get_token, has_token, verify_token};
pub use element::{DEFAULT_DATE_MASK, ElementType, FormElement, SelectOption};
pub use field::{Binding, Field, FieldKind, FieldValue, HasErrors, HasValue};
pub use registry::{Cleanup, FieldRegistry, FieldSet, Registered};
pub use render::{FieldView, FormView, RenderSink, camel_case, html_escape};
pub use types::{Form, FormBuilder, Verdict};
pub use values::{Excluded, extract_values, flatten_exclusions};
