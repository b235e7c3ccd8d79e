//! Tool document types: the YAML schema the LLM authors.
//!
//! A `ToolDocument` is pure data: it describes *what* a capability is and
//! *which* whitelisted entry point it runs. The
//! [`CodeSynthesisLoader`](super::CodeSynthesisLoader) selects one
//! definition from it and turns it into a
//! [`SynthesizedCapability`](super::SynthesizedCapability).
//!
//! # Example YAML
//!
//! ```yaml
//! tool:
//!   name: Greeter
//!   description: Greets whoever the query names
//!   input: query
//!   run:
//!     kind: template
//!     text: "Hello, {query}!"
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::capabilities::InputMode;

// ============================================================================
// Document
// ============================================================================

/// The namespace produced by loading one synthesized payload.
///
/// Either a single `tool:` mapping or a `tools:` list (or both).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolDocument {
    #[serde(default)]
    pub tool: Option<ToolDefinition>,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
}

impl ToolDocument {
    /// Parse a `ToolDocument` from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// All definitions in document order.
    pub fn definitions(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tool.iter().chain(self.tools.iter())
    }

    /// Definitions named `name` that declare an entry point.
    pub fn matching(&self, name: &str) -> Vec<&ToolDefinition> {
        self.definitions()
            .filter(|d| d.name == name && d.run.is_some())
            .collect()
    }
}

// ============================================================================
// Definition
// ============================================================================

/// One capability definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Credential-service identifiers, in declaration order.
    #[serde(default)]
    pub required_credentials: Vec<String>,
    #[serde(default)]
    pub input: InputMode,
    /// Entry point, kept untyped until the definition is selected so that a
    /// malformed sibling does not poison the whole document.
    #[serde(default)]
    pub run: Option<serde_yaml::Value>,
}

impl ToolDefinition {
    /// Decode the `run` block into a typed entry point.
    pub fn run_spec(&self) -> Result<RunSpec, String> {
        let raw = self
            .run
            .clone()
            .ok_or_else(|| format!("'{}' declares no run block", self.name))?;
        serde_yaml::from_value(raw).map_err(|e| format!("invalid run block: {}", e))
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// The whitelisted entry-point kinds a synthesized capability may use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunSpec {
    /// Render `text`, substituting `{query}`.
    Template { text: String },

    /// Evaluate `formula` with `{n0}`, `{n1}`, ... bound to the numbers in the query.
    Expression { formula: String },

    /// Call an HTTP endpoint.
    Http {
        #[serde(default)]
        method: HttpMethod,
        url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default)]
        body: Option<String>,
        /// JSON pointer (RFC 6901) into the response body.
        #[serde(default)]
        extract: Option<String>,
    },
}

impl RunSpec {
    /// Rewrite every free-text field (template text, formula, URL, header
    /// values, body) with `f`. Structural fields are left alone.
    pub fn map_strings<F>(self, f: F) -> Self
    where
        F: Fn(&str) -> String,
    {
        match self {
            RunSpec::Template { text } => RunSpec::Template { text: f(&text) },
            RunSpec::Expression { formula } => RunSpec::Expression {
                formula: f(&formula),
            },
            RunSpec::Http {
                method,
                url,
                headers,
                body,
                extract,
            } => RunSpec::Http {
                method,
                url: f(&url),
                headers: headers
                    .into_iter()
                    .map(|(key, value)| {
                        let value = f(&value);
                        (key, value)
                    })
                    .collect(),
                body: body.map(|b| f(&b)),
                extract,
            },
        }
    }
}

/// HTTP verbs a synthesized capability may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HttpMethod {
    #[default]
    #[serde(rename = "GET", alias = "get")]
    Get,
    #[serde(rename = "POST", alias = "post")]
    Post,
}
