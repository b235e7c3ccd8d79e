//! Shared helpers: prompt templates and answer formatting.

pub mod formatter;
pub mod prompts;

pub use formatter::{format_number, format_value};
