use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable classification attached to every error that reaches a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Credential,
    Source,
    Transform,
    Write,
    Connection,
    Validation,
    Session,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Credential => "credential",
            ErrorKind::Source => "source",
            ErrorKind::Transform => "transform",
            ErrorKind::Write => "write",
            ErrorKind::Connection => "connection",
            ErrorKind::Validation => "validation",
            ErrorKind::Session => "session",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable error summary stored on a session and pushed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Request validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid request: {0}")]
pub struct ValidationError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::Connection).unwrap();
        assert_eq!(json, r#""connection""#);
        assert_eq!(ErrorKind::Transform.to_string(), "transform");
    }
}
