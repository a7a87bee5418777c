//! AI backend configuration and validation.
//!
//! # Responsibility
//! - Describe which provider is configured and where it lives.
//! - Reject unusable endpoints and blank credentials before any call.
//!
//! # Invariants
//! - A config that passes `validate()` has an http(s) URL and a non-blank key.
//! - API keys never appear in `Debug` output or logs.

use crate::ai::error::{AiError, AiResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};

/// Env var selecting the provider id.
pub const ENV_PROVIDER: &str = "LAZYNOTE_AI_PROVIDER";
/// Env var holding the endpoint base URL.
pub const ENV_BASE_URL: &str = "LAZYNOTE_AI_BASE_URL";
/// Env var holding the API key.
pub const ENV_API_KEY: &str = "LAZYNOTE_AI_API_KEY";
/// Env var holding the optional model name.
pub const ENV_MODEL: &str = "LAZYNOTE_AI_MODEL";

static HTTP_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/?#]+[^\s]*$").expect("valid http url regex"));

/// Backend family. Only used for selection; wire protocols live outside core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiProvider {
    OpenaiCompatible,
    Gemini,
    Anthropic,
    Ollama,
}

impl AiProvider {
    /// Stable provider id used by the registry.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenaiCompatible => "openai_compatible",
            Self::Gemini => "gemini",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai_compatible" | "openai" => Some(Self::OpenaiCompatible),
            "gemini" => Some(Self::Gemini),
            "anthropic" => Some(Self::Anthropic),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Local runtimes accept requests without a key.
    pub fn requires_credential(self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

/// Connection settings for one backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiBackendConfig {
    pub provider: AiProvider,
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: Option<String>,
}

impl Debug for AiBackendConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiBackendConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

impl AiBackendConfig {
    /// Parses a JSON settings document.
    pub fn from_json(raw: &str) -> AiResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Reads settings from `LAZYNOTE_AI_*` environment variables.
    ///
    /// Returns `None` when the provider or URL variable is absent.
    pub fn from_env() -> Option<Self> {
        let provider = AiProvider::parse(&std::env::var(ENV_PROVIDER).ok()?)?;
        let base_url = std::env::var(ENV_BASE_URL).ok()?;
        let api_key = std::env::var(ENV_API_KEY).unwrap_or_default();
        let model = std::env::var(ENV_MODEL)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Some(Self {
            provider,
            base_url,
            api_key,
            model,
        })
    }

    /// Validates endpoint and credential.
    ///
    /// # Errors
    /// - `InvalidUrl` when `base_url` is not an absolute http(s) URL.
    /// - `MissingCredential` when the provider needs a key and it is blank.
    pub fn validate(&self) -> AiResult<()> {
        let url = self.base_url.trim();
        if !HTTP_URL_RE.is_match(url) {
            return Err(AiError::InvalidUrl(url.to_string()));
        }
        if self.provider.requires_credential() && self.api_key.trim().is_empty() {
            return Err(AiError::MissingCredential);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{AiBackendConfig, AiProvider};
    use crate::ai::error::AiError;

    fn config(provider: AiProvider, url: &str, key: &str) -> AiBackendConfig {
        AiBackendConfig {
            provider,
            base_url: url.to_string(),
            api_key: key.to_string(),
            model: None,
        }
    }

    #[test]
    fn validate_rejects_non_http_url() {
        let err = config(AiProvider::Gemini, "ftp://x", "k")
            .validate()
            .expect_err("ftp must be rejected");
        assert!(matches!(err, AiError::InvalidUrl(_)));
        assert!(config(AiProvider::Gemini, "https://", "k").validate().is_err());
    }

    #[test]
    fn validate_requires_key_except_for_local_runtime() {
        let err = config(AiProvider::OpenaiCompatible, "https://api.example.com/v1", " ")
            .validate()
            .expect_err("blank key must be rejected");
        assert_eq!(err, AiError::MissingCredential);
        config(AiProvider::Ollama, "http://localhost:11434", "")
            .validate()
            .expect("ollama needs no key");
    }

    #[test]
    fn from_json_reads_camel_case_and_debug_redacts_key() {
        let parsed = AiBackendConfig::from_json(
            r#"{"provider":"anthropic","baseUrl":"https://api.example.com","apiKey":"secret"}"#,
        )
        .expect("config should parse");
        assert_eq!(parsed.provider, AiProvider::Anthropic);
        assert!(!format!("{parsed:?}").contains("secret"));
    }
}
