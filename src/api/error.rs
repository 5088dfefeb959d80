use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error ({status} {code}): {detail}")]
    Api {
        status: u16,
        code: String,
        detail: String,
    },

    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Unauthorized: the panel rejected the configured API key")]
    Unauthorized,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error body returned by the panel: `{ "errors": [{ "code", "status", "detail" }] }`
#[derive(Debug, Deserialize)]
struct PanelErrorBody {
    #[serde(default)]
    errors: Vec<PanelErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct PanelErrorEntry {
    #[serde(default)]
    code: String,
    #[serde(default)]
    detail: String,
}

impl ApiError {
    /// Classify a non-success response from its status and raw body
    pub fn from_response(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => return ApiError::Unauthorized,
            429 => return ApiError::RateLimited,
            _ => {}
        }

        match serde_json::from_str::<PanelErrorBody>(body) {
            Ok(parsed) if !parsed.errors.is_empty() => {
                let first = &parsed.errors[0];
                ApiError::Api {
                    status,
                    code: first.code.clone(),
                    detail: first.detail.clone(),
                }
            }
            _ => ApiError::Http {
                status,
                body: body.to_string(),
            },
        }
    }

    /// Whether a later attempt could succeed without user intervention
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::RateLimited => true,
            ApiError::Http { status, .. } | ApiError::Api { status, .. } => *status >= 500,
            ApiError::Decode(_) | ApiError::Unauthorized | ApiError::Config(_) => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}
