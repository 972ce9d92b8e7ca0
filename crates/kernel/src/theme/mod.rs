//! Theme engine and template rendering.
//!
//! Parsed forms are collected into a Tera context by [`TemplateSink`] and
//! rendered by [`ThemeEngine`].

mod engine;
mod sink;

pub use engine::{SharedThemeEngine, ThemeEngine};
pub use sink::TemplateSink;
