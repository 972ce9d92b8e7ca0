//! Formwork kernel library.
//!
//! Server-side forms: field registry, anti-forgery tokens, submission
//! detection, validation, value extraction and template rendering.
//! The `formwork` binary serves a small demonstration of the API.

pub mod config;
pub mod error;
pub mod form;
pub mod request;
pub mod routes;
pub mod session;
pub mod state;
pub mod theme;

pub use config::{Config, FormDefaults};
pub use error::{AppError, FormError, FormResult};
pub use form::{Field, FieldValue, Form, FormElement, Verdict};
pub use request::{Method, ParamStore, Request};
pub use session::{MemorySession, SessionStore, SharedSession};
