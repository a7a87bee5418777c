//! Error taxonomy for AI backend calls.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for AI backend APIs.
pub type AiResult<T> = Result<T, AiError>;

/// Failure of one AI intent.
///
/// Schema incompleteness (missing report, empty task list) is not an error;
/// clients recover it with a single retry and then return partial results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiError {
    /// Configured endpoint is not a usable http(s) URL.
    InvalidUrl(String),
    /// No credential or no active backend is configured.
    MissingCredential,
    /// Transport or HTTP failure reported by the backend collaborator.
    BadResponse { code: u16, message: Option<String> },
    /// Response could not be decoded into the expected JSON shape.
    DecodingFailed(String),
    /// Response decoded but carried no usable content.
    EmptyResponse,
}

/// UI locale for user-facing error messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    En,
    ZhHans,
}

impl Locale {
    /// Resolves a BCP-47-ish tag (`zh`, `zh-Hans-CN`, `en_US`...).
    pub fn from_tag(tag: &str) -> Self {
        let normalized = tag.trim().to_ascii_lowercase();
        if normalized.starts_with("zh") {
            Self::ZhHans
        } else {
            Self::En
        }
    }
}

impl AiError {
    /// Stable machine-readable code for FFI envelopes and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "invalid_url",
            Self::MissingCredential => "missing_credential",
            Self::BadResponse { .. } => "bad_response",
            Self::DecodingFailed(_) => "decoding_failed",
            Self::EmptyResponse => "empty_response",
        }
    }

    /// Human-readable message for display in the app.
    pub fn user_message(&self, locale: Locale) -> String {
        match (locale, self) {
            (Locale::En, Self::InvalidUrl(url)) => {
                format!("The AI service address \"{url}\" is not valid. Check your AI settings.")
            }
            (Locale::En, Self::MissingCredential) => {
                "No AI service is configured. Add an API key in settings and try again."
                    .to_string()
            }
            (Locale::En, Self::BadResponse { code, message }) => match message {
                Some(message) => format!("The AI service returned an error ({code}): {message}"),
                None => format!("The AI service returned an error ({code}). Please try again."),
            },
            (Locale::En, Self::DecodingFailed(_)) => {
                "The AI response could not be read. Please try again.".to_string()
            }
            (Locale::En, Self::EmptyResponse) => {
                "The AI service returned an empty result. Please try again.".to_string()
            }
            (Locale::ZhHans, Self::InvalidUrl(url)) => {
                format!("AI 服务地址“{url}”无效，请检查 AI 设置。")
            }
            (Locale::ZhHans, Self::MissingCredential) => {
                "尚未配置 AI 服务，请在设置中填写 API Key 后重试。".to_string()
            }
            (Locale::ZhHans, Self::BadResponse { code, message }) => match message {
                Some(message) => format!("AI 服务返回错误（{code}）：{message}"),
                None => format!("AI 服务返回错误（{code}），请稍后重试。"),
            },
            (Locale::ZhHans, Self::DecodingFailed(_)) => {
                "无法解析 AI 返回的内容，请重试。".to_string()
            }
            (Locale::ZhHans, Self::EmptyResponse) => "AI 返回了空结果，请重试。".to_string(),
        }
    }
}

impl Display for AiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUrl(url) => write!(f, "invalid backend url: `{url}`"),
            Self::MissingCredential => write!(f, "backend credential is missing"),
            Self::BadResponse {
                code,
                message: Some(message),
            } => write!(f, "bad response ({code}): {message}"),
            Self::BadResponse {
                code,
                message: None,
            } => write!(f, "bad response ({code})"),
            Self::DecodingFailed(details) => write!(f, "response decoding failed: {details}"),
            Self::EmptyResponse => write!(f, "backend returned an empty response"),
        }
    }
}

impl Error for AiError {}

impl From<serde_json::Error> for AiError {
    fn from(value: serde_json::Error) -> Self {
        Self::DecodingFailed(value.to_string())
    }
}
