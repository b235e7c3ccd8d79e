//! toolsmith command-line binary.
//!
//! Runs one query through the engine and prints the trace and answer.
//!
//! # Environment Variables
//!
//! - `TOOLSMITH_API_KEY` / `GROQ_API_KEY`: completion endpoint key
//! - `TOOLSMITH_CONFIG`: optional YAML config file, env vars override it
//! - `TOOLSMITH_KEY_<Service>`: seeds the credential store
//! - `RUST_LOG`: tracing filter (default: "info,toolsmith=debug")
//!
//! # Usage
//!
//! ```bash
//! toolsmith "What is 6 times 7?"
//! toolsmith "weather in Paris" --json
//! ```

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use toolsmith::{EngineConfig, InMemoryCredentialStore, OpenAICompatibleClient, Orchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,toolsmith=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut json = false;
    let mut words = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => json = true,
            "-h" | "--help" => {
                println!("usage: toolsmith <query> [--json]");
                return Ok(());
            }
            _ => words.push(arg),
        }
    }
    if words.is_empty() {
        bail!("usage: toolsmith <query> [--json]");
    }
    let query = words.join(" ");

    let config = load_config()?;
    tracing::info!(model = %config.model, "toolsmith v{}", toolsmith::VERSION);

    let llm = Arc::new(OpenAICompatibleClient::from_config(&config).context("building LLM client")?);
    let credentials = Arc::new(InMemoryCredentialStore::from_env_prefix("TOOLSMITH_KEY_"));
    let orchestrator = Orchestrator::new(llm, credentials, &config);

    let result = orchestrator.process(&query).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for (i, step) in result.trace.iter().enumerate() {
            println!("{:>2}. {}", i + 1, step.description);
        }
        println!();
        println!("{}", result.final_answer);
        if let Some(pending) = &result.pending_credential {
            println!();
            println!("Set TOOLSMITH_KEY_{}=<secret> and run again.", pending.service);
        }
    }
    Ok(())
}

fn load_config() -> Result<EngineConfig> {
    let mut config = match std::env::var("TOOLSMITH_CONFIG") {
        Ok(path) if !path.is_empty() => EngineConfig::from_yaml_file(&path)
            .with_context(|| format!("reading config file {}", path))?,
        _ => EngineConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}
