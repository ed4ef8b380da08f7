use lambda_runtime::tracing::{debug, error, warn};
use lambda_runtime::{Diagnostic, LambdaEvent};
use serde_json::Value;

use crate::adapter::{Adapter, Application, is_gateway_event};
use crate::models::{AdapterError, InvocationEvent, InvocationResponse};

/// Parses a raw invocation payload into a gateway event.
///
/// # Errors
///
/// Returns `AdapterError::UnsupportedEvent` if the payload has no
/// `httpMethod`, or `AdapterError::InvalidEvent` if it does not match the
/// gateway event shape.
pub fn parse_event(payload: Value) -> Result<InvocationEvent, AdapterError> {
    if !is_gateway_event(&payload) {
        return Err(AdapterError::UnsupportedEvent);
    }
    Ok(serde_json::from_value(payload)?)
}

/// Lambda event handler. Adapts a gateway invocation for the wrapped
/// application. Logs the full event when `RUST_LOG=debug/trace`.
///
/// Payloads that did not come through the HTTP routing layer have no
/// start_response callback to hand over and are rejected.
///
/// # Errors
///
/// Returns a `Diagnostic` error with one of the following types:
///
/// - `UnsupportedEvent`: The payload has no `httpMethod`
/// - `InvalidInput`: The payload does not match the gateway event shape
/// - `InvalidBody`: A POST body is neither JSON nor base64-encoded text
/// - `InvalidEnviron`: The request environment is malformed
/// - `InvalidResponse`: The application's status line or body is unusable
/// - `ApplicationError`: The application failed
pub fn function_handler<A: Application>(
    adapter: &Adapter<A>,
    event: LambdaEvent<Value>,
) -> Result<InvocationResponse, Diagnostic> {
    let (payload, context) = event.into_parts();
    debug!(request_id = %context.request_id, payload = ?payload, "Received invocation");

    let event = parse_event(payload).map_err(|e| {
        warn!(error = %e, "Rejecting invocation");
        Diagnostic::from(e)
    })?;

    adapter.adapt_and_invoke(event).map_err(|e| {
        error!(error = %e, error_type = e.error_type(), "Invocation failed");
        Diagnostic::from(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_event_rejects_non_gateway_payload() {
        let result = parse_event(json!({"REQUEST_METHOD": "GET"}));
        assert!(matches!(result, Err(AdapterError::UnsupportedEvent)));
    }

    #[test]
    fn test_parse_event_rejects_malformed_gateway_payload() {
        let result = parse_event(json!({"httpMethod": 42}));
        assert!(matches!(result, Err(AdapterError::InvalidEvent(_))));
    }

    #[test]
    fn test_parse_event_accepts_gateway_payload() {
        let event = parse_event(json!({"httpMethod": "GET", "path": "/"})).unwrap();
        assert_eq!(event.http_method, "GET");
    }
}
