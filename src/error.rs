use reqwest::StatusCode;
use std::collections::HashMap;

pub const FALLBACK_MESSAGE: &str = "Request failed";

lazy_static::lazy_static! {
    static ref ERROR_MESSAGES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("FILE_NOT_SUPPORTED", "Unsupported file format");
        m.insert("FILE_TOO_LARGE", "File exceeds the size limit");
        m.insert("DURATION_TOO_LONG", "Media duration exceeds the limit");
        m.insert("INSUFFICIENT_QUOTA", "Insufficient quota");
        m.insert("ENGINE_UNAVAILABLE", "No transcription engine is available");
        m.insert("TRANSCRIPTION_FAILED", "Transcription failed");
        m.insert("FILE_NOT_FOUND", "File not found");
        m.insert("TASK_NOT_FOUND", "Task not found");
        m.insert("INVALID_FORMAT", "Invalid output format");
        m.insert("UPLOAD_FAILED", "File upload failed");
        m
    };
}

/// Readable message for a backend error code.
pub fn error_message(code: &str) -> &'static str {
    ERROR_MESSAGES.get(code).copied().unwrap_or("Unknown error")
}

/// Failures of a single API call. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Session expired or not logged in")]
    Unauthorized,

    /// The server answered `success: false`.
    #[error("{message}")]
    Rejected {
        message: String,
        code: Option<String>,
    },

    #[error("Service error ({status}): {message}")]
    Status { status: StatusCode, message: String },

    #[error("Response carried no data")]
    MissingData,

    #[error("Failed to reach service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to parse service response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn rejected(message: impl Into<String>, code: Option<String>) -> Self {
        let message = message.into();
        let message = if !message.is_empty() {
            message
        } else if let Some(code) = code.as_deref() {
            error_message(code).to_string()
        } else {
            FALLBACK_MESSAGE.to_string()
        };
        ApiError::Rejected { message, code }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_uses_server_message() {
        let err = ApiError::rejected("quota exhausted", Some("INSUFFICIENT_QUOTA".into()));
        assert_eq!(err.to_string(), "quota exhausted");
        assert_eq!(err.code(), Some("INSUFFICIENT_QUOTA"));
    }

    #[test]
    fn test_rejected_falls_back_to_code_then_generic() {
        let err = ApiError::rejected("", Some("TASK_NOT_FOUND".into()));
        assert_eq!(err.to_string(), "Task not found");

        let err = ApiError::rejected("", None);
        assert_eq!(err.to_string(), FALLBACK_MESSAGE);
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(error_message("SOMETHING_ELSE"), "Unknown error");
    }
}
