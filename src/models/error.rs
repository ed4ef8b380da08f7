//! Error types for the invocation adapter.
//!
//! Every failure the adapter can hit while translating an invocation is a
//! variant here. None of them are retried: each one fails the invocation and
//! is reported back to the platform.

use lambda_runtime::Diagnostic;
use thiserror::Error;

/// Failure while adapting one invocation.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The POST body was neither JSON text nor valid base64.
    #[error("POST body is neither JSON nor valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// The base64-decoded POST body is not UTF-8 text.
    #[error("decoded POST body is not valid UTF-8: {0}")]
    DecodedBodyNotUtf8(#[source] std::string::FromUtf8Error),

    /// The application produced a body that is not UTF-8 text.
    #[error("response body is not valid UTF-8: {0}")]
    ResponseBodyNotUtf8(#[source] std::string::FromUtf8Error),

    /// The status line passed to start_response has no numeric code.
    #[error("invalid status line: {0:?}")]
    InvalidStatus(String),

    /// The application returned without calling start_response.
    #[error("application did not call start_response")]
    ResponseNotStarted,

    /// The constructed request environment is malformed.
    #[error("invalid request environment: {0}")]
    InvalidEnviron(String),

    /// The invocation payload does not match the gateway event shape.
    #[error("invalid invocation event: {0}")]
    InvalidEvent(#[from] serde_json::Error),

    /// The payload did not come through the HTTP routing layer.
    #[error("event has no httpMethod and cannot be adapted")]
    UnsupportedEvent,

    /// The wrapped application failed.
    #[error(transparent)]
    Application(#[from] anyhow::Error),
}

impl AdapterError {
    /// Stable error type reported to the platform.
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidBase64(_) | Self::DecodedBodyNotUtf8(_) => "InvalidBody",
            Self::ResponseBodyNotUtf8(_) | Self::InvalidStatus(_) | Self::ResponseNotStarted => {
                "InvalidResponse"
            }
            Self::InvalidEnviron(_) => "InvalidEnviron",
            Self::InvalidEvent(_) => "InvalidInput",
            Self::UnsupportedEvent => "UnsupportedEvent",
            Self::Application(_) => "ApplicationError",
        }
    }

    /// Recovers an adapter error the application propagated through `anyhow`.
    ///
    /// Applications usually forward start_response failures with `?`, which
    /// boxes them into an `anyhow::Error`. Those are unwrapped so callers see
    /// the underlying variant.
    #[must_use]
    pub fn from_application(error: anyhow::Error) -> Self {
        match error.downcast::<Self>() {
            Ok(adapter_error) => adapter_error,
            Err(other) => Self::Application(other),
        }
    }
}

impl From<AdapterError> for Diagnostic {
    fn from(error: AdapterError) -> Self {
        Self {
            error_type: error.error_type().to_string(),
            // Use {:#} to get the full error chain with causes
            error_message: match &error {
                AdapterError::Application(inner) => format!("{inner:#}"),
                other => other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_types_are_stable() {
        assert_eq!(AdapterError::ResponseNotStarted.error_type(), "InvalidResponse");
        assert_eq!(AdapterError::UnsupportedEvent.error_type(), "UnsupportedEvent");
        assert_eq!(
            AdapterError::InvalidEnviron("x".to_string()).error_type(),
            "InvalidEnviron"
        );
    }

    #[test]
    fn test_from_application_unwraps_adapter_errors() {
        let boxed = anyhow::Error::new(AdapterError::InvalidStatus("OK".to_string()));
        assert!(matches!(
            AdapterError::from_application(boxed),
            AdapterError::InvalidStatus(status) if status == "OK"
        ));
    }

    #[test]
    fn test_from_application_keeps_other_errors() {
        let error = AdapterError::from_application(anyhow::anyhow!("database is down"));
        assert_eq!(error.error_type(), "ApplicationError");
        assert_eq!(error.to_string(), "database is down");
    }

    #[test]
    fn test_diagnostic_carries_error_chain() {
        let inner = anyhow::anyhow!("connection refused").context("loading user");
        let diagnostic: Diagnostic = AdapterError::Application(inner).into();
        assert_eq!(diagnostic.error_type, "ApplicationError");
        assert_eq!(diagnostic.error_message, "loading user: connection refused");
    }
}
