//! Bridges gateway invocations to a synchronous request/response application.
//!
//! A gateway event goes through four steps: the event is patched, a request
//! environment is built from it, the application is called with a
//! start_response callback backed by a [`ResponseCapture`], and the captured
//! status, headers and body are patched into an [`InvocationResponse`].
//!
//! Invocations that did not come through the HTTP routing layer already carry
//! an environment and a callback; those are handed to the application as-is.

pub mod capture;
pub mod environ;
pub mod patch;

use anyhow::Result;
use lambda_runtime::tracing::{debug, info};
use serde_json::Value;

pub use capture::ResponseCapture;
pub use environ::{make_environ, validate_environ};
pub use patch::{patch_event, patch_response};

use crate::config::{AdapterConfig, BodyMode};
use crate::models::{AdapterError, Environ, InvocationEvent, InvocationResponse};

/// Response-start callback handed to the application.
pub trait StartResponse {
    /// Records the status line and response headers.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::InvalidStatus` if the status line has no
    /// numeric code.
    fn start_response(
        &mut self,
        status: &str,
        headers: Vec<(String, String)>,
    ) -> Result<(), AdapterError>;
}

impl<F> StartResponse for F
where
    F: FnMut(&str, Vec<(String, String)>) -> Result<(), AdapterError>,
{
    fn start_response(
        &mut self,
        status: &str,
        headers: Vec<(String, String)>,
    ) -> Result<(), AdapterError> {
        self(status, headers)
    }
}

/// Response body as produced by the application, chunk by chunk.
pub type BodyChunks = Box<dyn Iterator<Item = Vec<u8>> + Send>;

/// Synchronous request handler.
///
/// Implementations call `start_response` exactly once before returning the
/// body chunks.
pub trait Application: Send + Sync {
    /// Handles one request.
    ///
    /// # Errors
    ///
    /// Any error is propagated to the platform as an invocation failure.
    fn call(&self, environ: Environ, start_response: &mut dyn StartResponse)
    -> Result<BodyChunks>;
}

impl<F> Application for F
where
    F: Fn(Environ, &mut dyn StartResponse) -> Result<BodyChunks> + Send + Sync,
{
    fn call(
        &self,
        environ: Environ,
        start_response: &mut dyn StartResponse,
    ) -> Result<BodyChunks> {
        self(environ, start_response)
    }
}

/// Pins a closure to the [`Application`] signature.
pub const fn app_fn<F>(f: F) -> F
where
    F: Fn(Environ, &mut dyn StartResponse) -> Result<BodyChunks> + Send + Sync,
{
    f
}

/// One invocation as seen by the adapter.
pub enum Invocation<'a> {
    /// Routed through the API gateway; needs translation.
    Gateway(InvocationEvent),
    /// Already a request environment with its callback.
    Direct {
        environ: Environ,
        start_response: &'a mut dyn StartResponse,
    },
}

/// Result of [`Adapter::handle`].
pub enum Outcome {
    Response(InvocationResponse),
    /// The application's own result for a direct invocation.
    Passthrough(BodyChunks),
}

/// Whether a raw payload came through the HTTP routing layer.
#[must_use]
pub fn is_gateway_event(payload: &Value) -> bool {
    payload.get("httpMethod").is_some()
}

/// Wraps an application so it can serve gateway invocations.
pub struct Adapter<A> {
    app: A,
    body_mode: BodyMode,
}

impl<A: Application> Adapter<A> {
    #[must_use]
    pub fn new(app: A) -> Self {
        Self::with_config(app, &AdapterConfig::default())
    }

    #[must_use]
    pub const fn with_config(app: A, config: &AdapterConfig) -> Self {
        Self {
            app,
            body_mode: config.body_mode,
        }
    }

    #[must_use]
    pub const fn body_mode(&self) -> BodyMode {
        self.body_mode
    }

    /// Dispatches an invocation to the matching path.
    ///
    /// # Errors
    ///
    /// See [`Adapter::adapt_and_invoke`] and [`Adapter::passthrough`].
    pub fn handle(&self, invocation: Invocation<'_>) -> Result<Outcome, AdapterError> {
        match invocation {
            Invocation::Gateway(event) => self.adapt_and_invoke(event).map(Outcome::Response),
            Invocation::Direct {
                environ,
                start_response,
            } => self
                .passthrough(environ, start_response)
                .map(Outcome::Passthrough),
        }
    }

    /// Calls the application with an untranslated environment and callback.
    ///
    /// # Errors
    ///
    /// Returns whatever the application fails with.
    pub fn passthrough(
        &self,
        environ: Environ,
        start_response: &mut dyn StartResponse,
    ) -> Result<BodyChunks, AdapterError> {
        debug!(message = "Passing direct invocation through");
        self.app
            .call(environ, start_response)
            .map_err(AdapterError::from_application)
    }

    /// Runs a gateway event through the application.
    ///
    /// # Errors
    ///
    /// Returns an error if the POST body cannot be decoded, the environment
    /// is malformed, the application fails or never starts its response, or
    /// the response body is not UTF-8.
    pub fn adapt_and_invoke(
        &self,
        event: InvocationEvent,
    ) -> Result<InvocationResponse, AdapterError> {
        info!(
            method = %event.http_method,
            path = %event.path,
            body_len = event.body.as_ref().map_or(0, String::len),
            "Adapting gateway invocation"
        );

        let event = patch_event(event)?;
        let environ = make_environ(&event)?;
        debug!(environ = ?environ.vars(), "Built request environment");

        let mut capture = ResponseCapture::default();
        let chunks = self
            .app
            .call(environ, &mut capture)
            .map_err(AdapterError::from_application)?;

        let body = self.collect_body(chunks);
        let (status_code, headers) = capture.finish()?;
        let response = patch_response(status_code, headers, body)?;

        info!(
            status = response.status_code,
            body_len = response.body.len(),
            "Invocation adapted"
        );
        Ok(response)
    }

    fn collect_body(&self, mut chunks: BodyChunks) -> Vec<u8> {
        match self.body_mode {
            BodyMode::FirstChunk => chunks.next().unwrap_or_default(),
            BodyMode::Joined => chunks.flatten().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn chunks(parts: &[&str]) -> BodyChunks {
        let owned: Vec<Vec<u8>> = parts.iter().map(|p| p.as_bytes().to_vec()).collect();
        Box::new(owned.into_iter())
    }

    fn event(method: &str) -> InvocationEvent {
        InvocationEvent {
            http_method: method.to_string(),
            path: "/".to_string(),
            ..InvocationEvent::default()
        }
    }

    #[test]
    fn test_is_gateway_event() {
        assert!(is_gateway_event(&json!({"httpMethod": "GET"})));
        assert!(!is_gateway_event(&json!({"REQUEST_METHOD": "GET"})));
    }

    #[test]
    fn test_first_chunk_only_by_default() {
        let adapter = Adapter::new(app_fn(|_environ, start| {
            start.start_response("200 OK", Vec::new())?;
            Ok(chunks(&["first", "second"]))
        }));

        let response = adapter.adapt_and_invoke(event("GET")).unwrap();
        assert_eq!(response.body, "first");
    }

    #[test]
    fn test_joined_body_mode() {
        let config = AdapterConfig {
            body_mode: BodyMode::Joined,
        };
        let adapter = Adapter::with_config(
            app_fn(|_environ, start| {
                start.start_response("200 OK", Vec::new())?;
                Ok(chunks(&["first", "-", "second"]))
            }),
            &config,
        );

        let response = adapter.adapt_and_invoke(event("GET")).unwrap();
        assert_eq!(response.body, "first-second");
    }

    #[test]
    fn test_empty_body_sequence() {
        let adapter = Adapter::new(app_fn(|_environ, start| {
            start.start_response("204 NO CONTENT", Vec::new())?;
            Ok(chunks(&[]))
        }));

        let response = adapter.adapt_and_invoke(event("DELETE")).unwrap();
        assert_eq!(response.status_code, 204);
        assert_eq!(response.body, "");
    }

    #[test]
    fn test_missing_start_response() {
        let adapter = Adapter::new(app_fn(|_environ, _start| Ok(chunks(&["x"]))));

        let result = adapter.adapt_and_invoke(event("GET"));
        assert!(matches!(result, Err(AdapterError::ResponseNotStarted)));
    }

    #[test]
    fn test_bad_status_propagates_as_adapter_error() {
        let adapter = Adapter::new(app_fn(|_environ, start| {
            start.start_response("OK", Vec::new())?;
            Ok(chunks(&["x"]))
        }));

        let result = adapter.adapt_and_invoke(event("GET"));
        assert!(matches!(result, Err(AdapterError::InvalidStatus(_))));
    }

    #[test]
    fn test_application_error_propagates() {
        let adapter = Adapter::new(app_fn(|_environ, _start| {
            Err(anyhow::anyhow!("template not found"))
        }));

        let result = adapter.adapt_and_invoke(event("GET"));
        assert!(matches!(
            result,
            Err(AdapterError::Application(error)) if error.to_string() == "template not found"
        ));
    }

    #[test]
    fn test_handle_direct_passes_environ_through() {
        let adapter = Adapter::new(app_fn(|environ, start| {
            start.start_response("201 CREATED", Vec::new())?;
            Ok(chunks(&[environ.path_info(), "|", environ.get_or_empty("CUSTOM")]))
        }));

        let environ = Environ::from_vars(HashMap::from([
            ("PATH_INFO".to_string(), "/kept/as/is".to_string()),
            ("CUSTOM".to_string(), "value".to_string()),
        ]));
        let mut capture = ResponseCapture::default();

        let outcome = adapter
            .handle(Invocation::Direct {
                environ,
                start_response: &mut capture,
            })
            .unwrap();

        let Outcome::Passthrough(body) = outcome else {
            panic!("expected passthrough");
        };
        let body: Vec<Vec<u8>> = body.collect();
        assert_eq!(
            body,
            vec![b"/kept/as/is".to_vec(), b"|".to_vec(), b"value".to_vec()]
        );
        assert_eq!(capture.status(), Some(201));
    }

    #[test]
    fn test_closure_as_start_response() {
        let adapter = Adapter::new(app_fn(|_environ, start| {
            start.start_response("200 OK", vec![("X-Id".to_string(), "7".to_string())])?;
            Ok(chunks(&["raw"]))
        }));

        let mut seen = Vec::new();
        let mut start_response =
            |status: &str, headers: Vec<(String, String)>| -> Result<(), AdapterError> {
                seen.push((status.to_string(), headers));
                Ok(())
            };

        let body: Vec<Vec<u8>> = adapter
            .passthrough(Environ::default(), &mut start_response)
            .unwrap()
            .collect();

        assert_eq!(body, vec![b"raw".to_vec()]);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "200 OK");
    }

    #[test]
    fn test_handle_gateway_translates() {
        let adapter = Adapter::new(app_fn(|environ, start| {
            start.start_response("200 OK", Vec::new())?;
            Ok(chunks(&[environ.path_info()]))
        }));

        let mut gateway_event = event("GET");
        gateway_event.path = "/deep/link".to_string();

        let outcome = adapter.handle(Invocation::Gateway(gateway_event)).unwrap();
        let Outcome::Response(response) = outcome else {
            panic!("expected response");
        };
        assert_eq!(response.body, "/");
    }
}
