//! Structured errors for the host surface.
//!
//! Worker failures use `aquanev_core::Error`; these cover tool input that
//! refers to host state which does not exist.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Invalid tool parameters (e.g., unknown client kind).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No displayed notification carries this tag.
    #[error("UNKNOWN_NOTIFICATION: {0}")]
    UnknownNotification(String),
}

impl From<HostError> for McpError {
    fn from(err: HostError) -> Self {
        let (code, message) = match &err {
            HostError::InvalidInput(msg) => (-32602, msg.clone()),
            HostError::UnknownNotification(tag) => (-32004, format!("no notification with tag {tag}")),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err: McpError = HostError::InvalidInput("kind".into()).into();
        assert_eq!(err.code, ErrorCode(-32602));

        let err: McpError = HostError::UnknownNotification("aquanev".into()).into();
        assert_eq!(err.code, ErrorCode(-32004));
        assert!(err.message.contains("aquanev"));
    }

    #[test]
    fn test_display() {
        assert_eq!(HostError::UnknownNotification("x".into()).to_string(), "UNKNOWN_NOTIFICATION: x");
    }
}
