use anyhow::Result;
use lambda_runtime::{Error, LambdaEvent, service_fn};
use serde_json::Value;
use yappa::adapter::{Adapter, Application, BodyChunks, StartResponse};
use yappa::config::AdapterConfig;
use yappa::handler::function_handler;
use yappa::models::Environ;

/// Plain-text responder served when no other application is wired in.
struct Greeter;

impl Application for Greeter {
    fn call(&self, environ: Environ, start_response: &mut dyn StartResponse) -> Result<BodyChunks> {
        let body = match environ.request_method() {
            "POST" => String::from_utf8_lossy(environ.body()).into_owned(),
            method => format!(
                "Hello from {method} {}?{}",
                environ.path_info(),
                environ.query_string()
            ),
        };

        start_response.start_response(
            "200 OK",
            vec![(
                "Content-Type".to_string(),
                "text/plain; charset=utf-8".to_string(),
            )],
        )?;
        Ok(Box::new(std::iter::once(body.into_bytes())))
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Use Lambda runtime's built-in tracing subscriber for CloudWatch Logs
    lambda_runtime::tracing::init_default_subscriber();

    let config = AdapterConfig::from_env()?;
    let adapter = Adapter::with_config(Greeter, &config);
    let adapter = &adapter;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        function_handler(adapter, event)
    }))
    .await
}
