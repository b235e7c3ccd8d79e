//! Credential placeholder detection and substitution.
//!
//! Synthesized source refers to secrets through tokens of the form
//! `YOUR_<SERVICE>_API_KEY` or `YOUR_<SERVICE>`, where `<SERVICE>` is the
//! service identifier upper-cased with non-alphanumerics turned into `_`.
//! The bare `YOUR_API_KEY` token stands for the capability's primary service.

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bYOUR_([A-Z0-9_]+)\b").unwrap());

/// Token that refers to the capability's primary service.
pub const GENERIC_PLACEHOLDER: &str = "YOUR_API_KEY";

/// Upper-cased placeholder stem for a service (`OpenWeatherMap` → `OPENWEATHERMAP`).
pub fn service_stem(service: &str) -> String {
    service
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// The service the generic `YOUR_API_KEY` token binds to: the first
/// declared service, or the capability itself when none is declared.
pub fn generic_service(declared: &[String], capability: &str) -> String {
    declared
        .first()
        .cloned()
        .unwrap_or_else(|| capability.to_string())
}

/// Services a source needs: the declared ones, then any implied by
/// placeholders no declared service covers. Order is preserved and
/// duplicates are dropped.
pub fn required_services(source: &str, declared: &[String], capability: &str) -> Vec<String> {
    let mut services: Vec<String> = Vec::new();
    for service in declared {
        if !services.contains(service) {
            services.push(service.clone());
        }
    }

    for captures in PLACEHOLDER.captures_iter(source) {
        let token = &captures[0];
        let implied = if token == GENERIC_PLACEHOLDER {
            generic_service(declared, capability)
        } else {
            let id = &captures[1];
            let stem = id.strip_suffix("_API_KEY").unwrap_or(id);
            match services.iter().find(|s| service_stem(s) == stem) {
                Some(existing) => existing.clone(),
                None => stem.to_string(),
            }
        };
        if !services.contains(&implied) {
            log::debug!(
                "Placeholder {} implies undeclared service {}",
                token,
                implied
            );
            services.push(implied);
        }
    }

    services
}

/// Replace every placeholder for the given `(service, secret)` pairs.
///
/// Matching is whole-token and case-sensitive. `generic` names the service
/// whose secret fills `YOUR_API_KEY`.
pub fn substitute(source: &str, secrets: &[(String, String)], generic: &str) -> String {
    let mut resolved = source.to_string();
    for (service, secret) in secrets {
        let pattern = format!(r"\bYOUR_{}(?:_API_KEY)?\b", regex::escape(&service_stem(service)));
        // The stem is escaped, so the pattern always compiles.
        if let Ok(re) = Regex::new(&pattern) {
            resolved = re.replace_all(&resolved, NoExpand(secret)).into_owned();
        }
        if service == generic {
            resolved = resolved.replace(GENERIC_PLACEHOLDER, secret);
        }
    }
    resolved
}

/// Mask every non-empty secret in `text`.
pub fn redact(text: &str, secrets: &[String]) -> String {
    let mut masked = text.to_string();
    for secret in secrets.iter().filter(|s| !s.is_empty()) {
        masked = masked.replace(secret.as_str(), "<redacted>");
    }
    masked
}
