use anyhow::{bail, Context, Result};

use crate::insights::prompts::PromptTemplate;
use crate::llm_client::{DEFAULT_MODEL, OPENAI_API_URL};

/// Default request body ceiling: 20 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Resolved once at startup and shared read-only with every handler.
#[derive(Debug, Clone)]
pub struct Config {
    /// `None` when `OPENAI_API_KEY` is unset. The server still starts;
    /// model-backed routes answer with a missing-credential error.
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_api_url: String,
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
    /// Template used by `POST /api/send-text`.
    pub send_text_template: PromptTemplate,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            openai_api_key: optional_env("OPENAI_API_KEY"),
            openai_model: optional_env("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            openai_api_url: optional_env("OPENAI_API_URL")
                .unwrap_or_else(|| OPENAI_API_URL.to_string()),
            host: optional_env("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: optional_env("PORT")
                .unwrap_or_else(|| "5000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            max_body_bytes: match optional_env("MAX_BODY_BYTES") {
                Some(raw) => raw
                    .parse::<usize>()
                    .context("MAX_BODY_BYTES must be a byte count")?,
                None => DEFAULT_MAX_BODY_BYTES,
            },
            send_text_template: parse_template(
                optional_env("INSIGHT_TEMPLATE").as_deref().unwrap_or("insights"),
            )?,
        })
    }
}

/// Blank values count as unset so `OPENAI_API_KEY=` in a `.env` file behaves like absence.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_template(raw: &str) -> Result<PromptTemplate> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "insights" => Ok(PromptTemplate::Insights),
        "summary" => Ok(PromptTemplate::Summary),
        other => bail!("INSIGHT_TEMPLATE must be 'insights' or 'summary', got '{other}'"),
    }
}

#[cfg(test)]
impl Config {
    /// Configuration used by handler tests; never touches the process environment.
    pub fn for_tests(api_key: Option<&str>) -> Self {
        Config {
            openai_api_key: api_key.map(str::to_string),
            openai_model: DEFAULT_MODEL.to_string(),
            openai_api_url: OPENAI_API_URL.to_string(),
            host: "127.0.0.1".to_string(),
            port: 5000,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            send_text_template: PromptTemplate::Insights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_template_accepts_known_names() {
        assert_eq!(parse_template("insights").unwrap(), PromptTemplate::Insights);
        assert_eq!(parse_template(" Summary ").unwrap(), PromptTemplate::Summary);
    }

    #[test]
    fn test_parse_template_rejects_unknown_name() {
        let err = parse_template("poetry").unwrap_err();
        assert!(err.to_string().contains("poetry"));
    }

    #[test]
    fn test_default_body_limit_is_twenty_mebibytes() {
        assert_eq!(DEFAULT_MAX_BODY_BYTES, 20_971_520);
    }
}
