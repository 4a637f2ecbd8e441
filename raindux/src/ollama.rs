use miette::{Context, IntoDiagnostic, Result};

use crate::APP_USER_AGENT;

pub(crate) mod chat;

const DEFAULT_HOST: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "tinyllama";

#[derive(Debug, Clone)]
pub struct Config {
    host: String,
    model: String,
}

pub struct Client {
    http: reqwest::Client,
    host: String,
}

impl Config {
    /// Reads the Ollama endpoint and model name from the environment,
    /// falling back to a local default install. No variable is required.
    pub fn from_env() -> Self {
        let host = std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let model = std::env::var("RAINDUX_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Self { host, model }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn client(&self) -> Result<Client> {
        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .into_diagnostic()
            .wrap_err("Could not build reqwest client")?;

        Ok(Client {
            http,
            host: self.host.trim_end_matches('/').to_string(),
        })
    }
}
