//! Fixed prompt templates sent to the completion collaborator.
//!
//! Both templates carry a `{{context}}` placeholder. The construction
//! template binds the model to the delimiter protocol the synthesis loader
//! parses: the tool document must sit between [`START_DELIMITER`] and
//! [`END_DELIMITER`] lines, verbatim.

/// Opening delimiter line of a synthesized tool document.
pub const START_DELIMITER: &str = "# Start of Example Code File #";

/// Closing delimiter line of a synthesized tool document.
pub const END_DELIMITER: &str = "# End of Example Code File #";

/// Placeholder substituted in both templates.
pub const CONTEXT_PLACEHOLDER: &str = "{{context}}";

/// Capability-listing template.
pub const TOOL_LIST_PROMPT: &str = r#"
The user has given a task or set of tasks for which they want to build an agent. The user has provided the following information:

{{context}}

Based on the context, list tools the agent would need to complete the task.

For example, if someone asks for a recipe, the agent would need a recipe tool. If someone asks for a weather forecast, the agent would need a weather tool. If someone asks for a math computation, the agent would need a calculator tool.

Answer with one tool name per line, written in CamelCase (for example WeatherTool), and nothing else.
"#;

/// Capability-construction template.
pub const TOOL_CONSTRUCTOR_PROMPT: &str = r#"
The user has provided a list of tools the agent would need to complete a task. The user has provided the following information:

{{context}}

Construct the tool as a YAML tool document. You must write the document in its entirety.

A tool document has a single `tool` mapping with these keys:
- name: the exact tool name given above
- description: one sentence describing what the tool does
- required_credentials: list of external services whose API keys the tool needs (may be empty)
- input: `query` if the tool reads the user's query, `none` otherwise
- run: how the tool produces its answer, one of
  - kind: template, text: "...{query}..."
  - kind: expression, formula: an arithmetic formula over {n0}, {n1}, ... (the numbers found in the query)
  - kind: http, method: GET or POST, url: "...{query}...", optional headers, optional body, optional extract (a JSON pointer into the response)

Wherever an API key is needed, write the placeholder YOUR_<SERVICE>_API_KEY with the service name in upper case.

Your reply must consist of the document wrapped in these exact delimiter lines, with no text before or after them. Here is an example:

# Start of Example Code File #
tool:
  name: WeatherTool
  description: Reports the current weather for a city named in the query.
  required_credentials: [OpenWeatherMap]
  input: query
  run:
    kind: http
    method: GET
    url: "https://api.openweathermap.org/data/2.5/weather?q={query}&appid=YOUR_OPENWEATHERMAP_API_KEY"
    extract: /weather/0/description
# End of Example Code File #
"#;

/// Format the capability-listing prompt for `query`.
pub fn tool_list_prompt(query: &str) -> String {
    TOOL_LIST_PROMPT.replace(CONTEXT_PLACEHOLDER, query)
}

/// Format the capability-construction prompt for capability `name`.
pub fn tool_constructor_prompt(name: &str) -> String {
    TOOL_CONSTRUCTOR_PROMPT.replace(CONTEXT_PLACEHOLDER, &format!("Tool to construct: {}", name))
}
