//! Gateway error taxonomy
//!
//! Every component catches these at its own boundary and swaps in its
//! documented fallback. None of them reach the caller of a conversation turn.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// Transport failure reaching the inference service
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status from the service
    #[error("Service error ({status}): {body}")]
    Service { status: u16, body: String },

    /// Empty, unparseable or schema-mismatched reply
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The reply matched none of the known classification labels
    #[error("Ambiguous classification: {0:?}")]
    ClassificationAmbiguous(String),

    /// The fixed deadline elapsed
    #[error("Request timed out after {0}s")]
    Timeout(u64),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Short label for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Network(_) => "network",
            GatewayError::Service { .. } => "service",
            GatewayError::MalformedResponse(_) => "malformed_response",
            GatewayError::ClassificationAmbiguous(_) => "classification_ambiguous",
            GatewayError::Timeout(_) => "timeout",
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(GatewayError::Timeout(10).kind(), "timeout");
        assert_eq!(
            GatewayError::Service { status: 529, body: "overloaded".into() }.kind(),
            "service"
        );
        assert_eq!(GatewayError::network("refused").kind(), "network");
    }

    #[test]
    fn test_json_errors_are_malformed() {
        let err: GatewayError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, GatewayError::MalformedResponse(_)));
    }

    #[test]
    fn test_display() {
        let err = GatewayError::Service { status: 500, body: "boom".into() };
        assert_eq!(err.to_string(), "Service error (500): boom");
    }
}
