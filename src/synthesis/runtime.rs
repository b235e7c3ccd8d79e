//! Runtime for synthesized capabilities.
//!
//! A [`SynthesizedCapability`] executes one of the whitelisted entry points
//! from [`RunSpec`]. Generated documents cannot reach anything else: no
//! filesystem, no processes, and no network beyond the single declared
//! HTTP request.
//!
//! Secrets substituted into the entry point are remembered so they can be
//! masked in error messages and `Debug` output.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::definition::{HttpMethod, RunSpec, ToolDefinition};
use super::placeholders::redact;
use crate::capabilities::{Capability, CapabilityError, InputMode};
use crate::evaluator;
use crate::utilities::format_number;
use crate::utilities::formatter::truncate;

static NUMBER_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+(?:\.\d+)?").unwrap());
static NUMBER_SLOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{n(\d+)\}").unwrap());

const QUERY_SLOT: &str = "{query}";

/// A capability installed from an LLM-authored tool document.
#[derive(Clone)]
pub struct SynthesizedCapability {
    name: String,
    description: String,
    required_credentials: Vec<String>,
    input_mode: InputMode,
    action: RunSpec,
    secrets: Vec<String>,
    http: reqwest::Client,
}

impl SynthesizedCapability {
    /// Build and validate a capability from a selected definition, using its
    /// `run` block as written.
    pub fn from_definition(
        definition: &ToolDefinition,
        http: reqwest::Client,
    ) -> Result<Self, String> {
        Self::from_action(definition, definition.run_spec()?, Vec::new(), http)
    }

    /// Build and validate a capability whose entry point has already been
    /// resolved. `secrets` are the values substituted into `action`; they are
    /// masked in every error this capability reports.
    ///
    /// Validation is static: templates must be non-empty, formulas must parse
    /// with every slot bound, and URLs must be absolute `http`/`https`.
    pub fn from_action(
        definition: &ToolDefinition,
        action: RunSpec,
        secrets: Vec<String>,
        http: reqwest::Client,
    ) -> Result<Self, String> {
        validate(&action).map_err(|e| redact(&e, &secrets))?;
        Ok(Self {
            name: definition.name.clone(),
            description: definition.description.clone(),
            required_credentials: definition.required_credentials.clone(),
            input_mode: definition.input,
            action,
            secrets,
            http,
        })
    }

    async fn execute(&self, query: &str) -> Result<Value, CapabilityError> {
        match &self.action {
            RunSpec::Template { text } => Ok(Value::String(text.replace(QUERY_SLOT, query))),
            RunSpec::Expression { formula } => {
                let numbers: Vec<f64> = NUMBER_LITERAL
                    .find_iter(query)
                    .filter_map(|m| m.as_str().parse().ok())
                    .collect();
                let bound = bind_numbers(formula, &numbers)?;
                let value = evaluator::evaluate_expression(&bound)?;
                Ok(serde_json::Number::from_f64(value)
                    .map(Value::Number)
                    .unwrap_or(Value::Null))
            }
            RunSpec::Http {
                method,
                url,
                headers,
                body,
                extract,
            } => {
                self.call_http(
                    *method,
                    url,
                    headers,
                    body.as_deref(),
                    extract.as_deref(),
                    query,
                )
                .await
            }
        }
    }

    async fn call_http(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &BTreeMap<String, String>,
        body: Option<&str>,
        extract: Option<&str>,
        query: &str,
    ) -> Result<Value, CapabilityError> {
        let url = url.replace(QUERY_SLOT, &urlencoding::encode(query));
        let mut request = match method {
            HttpMethod::Get => self.http.get(&url),
            HttpMethod::Post => self.http.post(&url),
        };
        for (key, value) in headers {
            request = request.header(key.as_str(), value.replace(QUERY_SLOT, query));
        }
        if let Some(body) = body {
            let rendered = body.replace(QUERY_SLOT, query);
            request = match serde_json::from_str::<Value>(&rendered) {
                Ok(json) => request.json(&json),
                Err(_) => request.body(rendered),
            };
        }

        log::debug!("{}: {:?} request", self.name, method);
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(CapabilityError::Http(format!(
                "status {}: {}",
                status,
                truncate(&text, 200)
            )));
        }

        match extract {
            Some(pointer) => {
                let json: Value = serde_json::from_str(&text)
                    .map_err(|e| CapabilityError::UnexpectedResponse(e.to_string()))?;
                json.pointer(pointer).cloned().ok_or_else(|| {
                    CapabilityError::UnexpectedResponse(format!(
                        "response has no value at {}",
                        pointer
                    ))
                })
            }
            None => Ok(serde_json::from_str(&text).unwrap_or(Value::String(text))),
        }
    }

    fn mask(&self, error: CapabilityError) -> CapabilityError {
        if self.secrets.is_empty() {
            return error;
        }
        match error {
            CapabilityError::Http(m) => CapabilityError::Http(redact(&m, &self.secrets)),
            CapabilityError::UnexpectedResponse(m) => {
                CapabilityError::UnexpectedResponse(redact(&m, &self.secrets))
            }
            CapabilityError::Execution(m) => CapabilityError::Execution(redact(&m, &self.secrets)),
            other => other,
        }
    }
}

impl fmt::Debug for SynthesizedCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = self.action.clone().map_strings(|s| redact(s, &self.secrets));
        f.debug_struct("SynthesizedCapability")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("required_credentials", &self.required_credentials)
            .field("input_mode", &self.input_mode)
            .field("action", &action)
            .finish()
    }
}

#[async_trait]
impl Capability for SynthesizedCapability {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn required_credentials(&self) -> &[String] {
        &self.required_credentials
    }

    fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    async fn run(&self, input: Option<&str>) -> Result<Value, CapabilityError> {
        if self.input_mode == InputMode::Query && input.is_none() {
            return Err(CapabilityError::MissingInput(self.name.clone()));
        }
        self.execute(input.unwrap_or_default())
            .await
            .map_err(|e| self.mask(e))
    }
}

/// Replace `{nK}` slots with the K-th number, parenthesized.
fn bind_numbers(formula: &str, numbers: &[f64]) -> Result<String, CapabilityError> {
    let mut unbound = None;
    let bound = NUMBER_SLOT.replace_all(formula, |caps: &regex::Captures<'_>| {
        let index: usize = caps[1].parse().unwrap_or(usize::MAX);
        match numbers.get(index) {
            Some(n) => format!("({})", format_number(*n)),
            None => {
                unbound.get_or_insert(index);
                String::new()
            }
        }
    });
    match unbound {
        Some(index) => Err(CapabilityError::Execution(format!(
            "formula needs {{n{}}} but the query has {} number(s)",
            index,
            numbers.len()
        ))),
        None => Ok(bound.into_owned()),
    }
}

fn validate(action: &RunSpec) -> Result<(), String> {
    match action {
        RunSpec::Template { text } => {
            if text.trim().is_empty() {
                return Err("template text is empty".to_string());
            }
        }
        RunSpec::Expression { formula } => {
            let sample = NUMBER_SLOT.replace_all(formula, "1");
            evaluator::parse(&sample).map_err(|e| format!("invalid formula: {}", e))?;
        }
        RunSpec::Http { url, .. } => {
            let sample = url.replace(QUERY_SLOT, "q");
            let parsed =
                reqwest::Url::parse(&sample).map_err(|e| format!("invalid url '{}': {}", url, e))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(format!("unsupported url scheme '{}'", parsed.scheme()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesis::definition::ToolDocument;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn build(yaml: &str) -> Result<SynthesizedCapability, String> {
        let doc = ToolDocument::from_yaml(yaml).unwrap();
        let def = doc.definitions().next().unwrap().clone();
        SynthesizedCapability::from_definition(&def, reqwest::Client::new())
    }

    /// Serve one HTTP response on a local port. The handle yields the raw
    /// request the client sent.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let length = text[..head_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (base, handle)
    }

    fn http_tool(name: &str, run: &str) -> SynthesizedCapability {
        build(&format!("tool:\n  name: {}\n  run: {}", name, run)).unwrap()
    }

    #[tokio::test]
    async fn test_template_capability() {
        let cap = build(
            r#"
tool:
  name: Greeter
  description: Greets
  run: { kind: template, text: "Hello, {query}!" }
"#,
        )
        .unwrap();
        assert_eq!(cap.run(Some("Ada")).await.unwrap(), Value::from("Hello, Ada!"));
    }

    #[tokio::test]
    async fn test_expression_capability_binds_numbers() {
        let cap = build(
            r#"
tool:
  name: CelsiusToFahrenheit
  run: { kind: expression, formula: "{n0} * 9 / 5 + 32" }
"#,
        )
        .unwrap();
        let result = cap.run(Some("convert 100 degrees")).await.unwrap();
        assert_eq!(result.as_f64(), Some(212.0));

        let negative = cap.run(Some("what is -40 in fahrenheit")).await.unwrap();
        assert_eq!(negative.as_f64(), Some(-40.0));
    }

    #[tokio::test]
    async fn test_expression_with_missing_number() {
        let cap = build(
            r#"
tool:
  name: Adder
  run: { kind: expression, formula: "{n0} + {n1}" }
"#,
        )
        .unwrap();
        let err = cap.run(Some("just 3")).await.unwrap_err();
        assert!(err.to_string().contains("{n1}"));
    }

    #[tokio::test]
    async fn test_no_input_capability_runs_without_query() {
        let cap = build(
            r#"
tool:
  name: Motto
  input: none
  run: { kind: template, text: "Ship it." }
"#,
        )
        .unwrap();
        assert_eq!(cap.input_mode(), InputMode::NoInput);
        assert_eq!(cap.run(None).await.unwrap(), Value::from("Ship it."));
    }

    #[tokio::test]
    async fn test_http_get_encodes_query_and_extracts() {
        let (base, server) = serve_once("200 OK", r#"{"data":[{"name":"Paris"}]}"#).await;
        let cap = http_tool(
            "Lookup",
            &format!(
                r#"{{ kind: http, url: "{}/search?q={{query}}", extract: /data/0/name }}"#,
                base
            ),
        );

        let result = cap.run(Some("new york & co")).await.unwrap();
        assert_eq!(result, Value::from("Paris"));

        let request = server.await.unwrap();
        let request_line = request.lines().next().unwrap();
        assert_eq!(request_line, "GET /search?q=new%20york%20%26%20co HTTP/1.1");
    }

    #[tokio::test]
    async fn test_http_post_sends_headers_and_body() {
        let (base, server) = serve_once("200 OK", r#"{"ok":true}"#).await;
        let cap = http_tool(
            "Poster",
            &format!(
                r#"{{ kind: http, method: POST, url: "{}/items", headers: {{ X-Token: abc }}, body: '{{"q": "{{query}}"}}' }}"#,
                base
            ),
        );

        let result = cap.run(Some("hi")).await.unwrap();
        assert_eq!(result, serde_json::json!({"ok": true}));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /items HTTP/1.1"));
        assert!(request.to_lowercase().contains("x-token: abc"));
        assert!(request.ends_with(r#"{"q":"hi"}"#));
    }

    #[tokio::test]
    async fn test_http_error_status_is_capability_error() {
        let (base, server) = serve_once("503 Service Unavailable", "down for maintenance").await;
        let cap = http_tool("Flaky", &format!(r#"{{ kind: http, url: "{}/x" }}"#, base));

        match cap.run(Some("q")).await {
            Err(CapabilityError::Http(message)) => {
                assert!(message.contains("503"));
                assert!(message.contains("down for maintenance"));
            }
            other => panic!("unexpected {:?}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_http_missing_pointer_is_unexpected_response() {
        let (base, server) = serve_once("200 OK", r#"{"a":1}"#).await;
        let cap = http_tool(
            "Pointer",
            &format!(r#"{{ kind: http, url: "{}/x", extract: /b }}"#, base),
        );

        match cap.run(Some("q")).await {
            Err(CapabilityError::UnexpectedResponse(message)) => {
                assert!(message.contains("/b"))
            }
            other => panic!("unexpected {:?}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_errors_mask_secrets() {
        let doc = ToolDocument::from_yaml(
            "tool: { name: Acme, run: { kind: http, url: 'http://127.0.0.1:1/?k=TOPSECRET123&q={query}' } }",
        )
        .unwrap();
        let def = doc.definitions().next().unwrap();
        let cap = SynthesizedCapability::from_action(
            def,
            def.run_spec().unwrap(),
            vec!["TOPSECRET123".to_string()],
            reqwest::Client::new(),
        )
        .unwrap();

        let err = cap.run(Some("hi")).await.unwrap_err().to_string();
        assert!(!err.contains("TOPSECRET123"), "{}", err);
        assert!(!format!("{:?}", cap).contains("TOPSECRET123"));
    }

    #[tokio::test]
    async fn test_transport_errors_omit_the_url() {
        let cap = http_tool(
            "Refused",
            r#"{ kind: http, url: "http://127.0.0.1:1/path?key=inline-key-42" }"#,
        );
        match cap.run(Some("q")).await {
            Err(CapabilityError::Http(message)) => {
                assert!(!message.contains("inline-key-42"), "{}", message)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_validation_rejects_bad_entry_points() {
        assert!(build("tool: { name: A, run: { kind: template, text: '  ' } }").is_err());
        assert!(build("tool: { name: B, run: { kind: expression, formula: '{n0} +' } }").is_err());
        assert!(build("tool: { name: C, run: { kind: expression, formula: 'os.system(1)' } }").is_err());
        assert!(build("tool: { name: D, run: { kind: http, url: 'file:///etc/passwd' } }").is_err());
        assert!(build("tool: { name: E, run: { kind: http, url: 'not a url' } }").is_err());
    }

    #[test]
    fn test_bind_numbers() {
        assert_eq!(bind_numbers("{n0}*{n1}", &[2.0, -3.5]).unwrap(), "(2)*(-3.5)");
    }
}
