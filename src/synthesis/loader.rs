//! Code synthesis loader: LLM response text in, registered capability out.
//!
//! The loader turns a response into a capability in these steps:
//! 1. Extracting the payload between the fixed delimiter lines
//! 2. Parsing it as a [`ToolDocument`] (the syntax gate)
//! 3. Selecting the one definition carrying the requested name and a `run` block
//! 4. Checking every required credential against the [`CredentialStore`]
//! 5. Substituting placeholders into the parsed entry point, building the
//!    capability and registering it
//!
//! Nothing is registered unless every step succeeds.

use std::sync::Arc;

use crate::capabilities::CapabilityRegistry;
use crate::credentials::CredentialStore;
use crate::utilities::prompts::{END_DELIMITER, START_DELIMITER};

use super::definition::{ToolDefinition, ToolDocument};
use super::error::{CredentialGap, SynthesisError, SynthesisFailure};
use super::placeholders;
use super::runtime::SynthesizedCapability;

/// Pull the payload out of a delimited LLM response.
///
/// Both delimiter lines are required, start before end. Markdown code-fence
/// lines inside the payload are dropped.
pub fn extract_payload(response: &str) -> Result<String, SynthesisError> {
    let start = response
        .find(START_DELIMITER)
        .ok_or(SynthesisError::MalformedResponse)?;
    let body_start = start + START_DELIMITER.len();
    let end = response[body_start..]
        .find(END_DELIMITER)
        .ok_or(SynthesisError::MalformedResponse)?;

    let payload = response[body_start..body_start + end]
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(payload.trim().to_string())
}

/// Validates synthesized tool documents and installs them into the registry.
#[derive(Debug, Clone)]
pub struct CodeSynthesisLoader {
    registry: Arc<CapabilityRegistry>,
    credentials: Arc<dyn CredentialStore>,
    http: reqwest::Client,
}

impl CodeSynthesisLoader {
    /// Create a loader whose HTTP capabilities use a default client.
    pub fn new(registry: Arc<CapabilityRegistry>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            registry,
            credentials,
            http: reqwest::Client::new(),
        }
    }

    /// Use `client` for every HTTP capability this loader installs.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Install the capability `name` defined in `response`.
    ///
    /// Returns a [`CredentialGap`] when secrets are missing; the caller may
    /// store them and call again with the same response.
    pub fn synthesize(&self, name: &str, response: &str) -> Result<(), SynthesisFailure> {
        let payload = extract_payload(response)?;

        let document =
            ToolDocument::from_yaml(&payload).map_err(|e| SynthesisError::InvalidSource {
                diagnostic: e.to_string(),
                source_text: payload.clone(),
            })?;
        let definition = select(&document, name)?;

        let services =
            placeholders::required_services(&payload, &definition.required_credentials, name);
        let missing: Vec<String> = services
            .iter()
            .filter(|service| !self.credentials.contains(service))
            .cloned()
            .collect();
        if !missing.is_empty() {
            log::info!("{} is waiting on credentials for {:?}", name, missing);
            return Err(CredentialGap::new(name, missing).into());
        }

        let secrets: Vec<(String, String)> = services
            .iter()
            .filter_map(|service| {
                self.credentials
                    .get(service)
                    .map(|secret| (service.clone(), secret))
            })
            .collect();
        let generic = placeholders::generic_service(&definition.required_credentials, name);

        // Errors past this point report the unsubstituted payload.
        let load_error = |message: String| SynthesisError::Load {
            name: name.to_string(),
            message,
            source_text: payload.clone(),
        };
        // Secrets go into the parsed entry point, never into the YAML text.
        let action = definition
            .run_spec()
            .map_err(load_error)?
            .map_strings(|text| placeholders::substitute(text, &secrets, &generic));
        let secret_values = secrets.into_iter().map(|(_, secret)| secret).collect();
        let capability =
            SynthesizedCapability::from_action(definition, action, secret_values, self.http.clone())
                .map_err(load_error)?;

        self.registry.register(Arc::new(capability));
        log::info!("Synthesized capability: {}", name);
        Ok(())
    }
}

fn select<'a>(document: &'a ToolDocument, name: &str) -> Result<&'a ToolDefinition, SynthesisError> {
    let matches = document.matching(name);
    match matches.as_slice() {
        [definition] => Ok(*definition),
        [] => Err(SynthesisError::NoMatchingDefinition {
            name: name.to_string(),
        }),
        _ => Err(SynthesisError::AmbiguousDefinition {
            name: name.to_string(),
            count: matches.len(),
        }),
    }
}
