//! Pre- and post-processing applied around the application call.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use lambda_runtime::tracing::debug;

use super::environ::normalize_header_name;
use crate::models::{AdapterError, InvocationEvent, InvocationResponse};

/// Forwarding headers blanked before the environment is built.
const BLANKED_HEADERS: [&str; 3] = ["Host", "X-Forwarded-Port", "X-Forwarded-Proto"];

/// Prefix left on redirect targets built from blanked scheme/host/port.
const EMPTY_ORIGIN_PREFIX: &str = ":///";

const REDIRECT_STATUS: u16 = 302;

/// Non-finite number literals that lenient JSON parsers accept.
const NON_FINITE_LITERALS: [&str; 2] = ["NaN", "Infinity"];

/// Prepares a gateway event for environment construction.
///
/// - the path is forced to `/`
/// - `Host`, `X-Forwarded-Port` and `X-Forwarded-Proto` are set to empty
///   strings, whatever casing the gateway used
/// - a POST body that is not JSON text is treated as base64 and decoded,
///   skipping any characters outside the base64 alphabet (line breaks of
///   wrapped encodings, for instance)
///
/// # Errors
///
/// Returns an error if a non-JSON POST body is not valid base64, or decodes
/// to bytes that are not UTF-8.
pub fn patch_event(mut event: InvocationEvent) -> Result<InvocationEvent, AdapterError> {
    "/".clone_into(&mut event.path);

    let blanked: Vec<String> = BLANKED_HEADERS
        .iter()
        .map(|name| normalize_header_name(name))
        .collect();
    event
        .headers
        .retain(|name, _| !blanked.contains(&normalize_header_name(name)));
    for name in BLANKED_HEADERS {
        event.headers.insert(name.to_string(), String::new());
    }

    if event.http_method == "POST"
        && let Some(body) = event.body.as_mut()
        && !is_json_text(body)
    {
        debug!(body_len = body.len(), "POST body is not JSON, decoding base64");
        let decoded = STANDARD.decode(base64_symbols(body))?;
        *body = String::from_utf8(decoded).map_err(AdapterError::DecodedBodyNotUtf8)?;
    }

    Ok(event)
}

/// Turns the application's output into the platform response.
///
/// A 302 whose `Location` starts with `:///` is rewritten to the
/// root-relative path behind it.
///
/// # Errors
///
/// Returns `AdapterError::ResponseBodyNotUtf8` if the body is not UTF-8.
pub fn patch_response(
    status_code: u16,
    mut headers: HashMap<String, String>,
    body: Vec<u8>,
) -> Result<InvocationResponse, AdapterError> {
    let body = String::from_utf8(body).map_err(AdapterError::ResponseBodyNotUtf8)?;

    if status_code == REDIRECT_STATUS
        && let Some(location) = headers.get_mut("Location")
        && location.starts_with(EMPTY_ORIGIN_PREFIX)
        && let Some(path) = location.strip_prefix("://")
    {
        debug!(location = %location, "Stripping empty origin from redirect");
        *location = path.to_string();
    }

    Ok(InvocationResponse {
        status_code,
        headers,
        body,
    })
}

/// Whether `text` is JSON, allowing bare `NaN` and `Infinity` numbers.
fn is_json_text(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text).is_ok()
        || serde_json::from_str::<serde_json::Value>(&zero_non_finite_literals(text)).is_ok()
}

/// Replaces `NaN` and `Infinity` outside string literals with `0`.
fn zero_non_finite_literals(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut in_string = false;
    let mut escaped = false;

    loop {
        if !in_string
            && let Some(after) = NON_FINITE_LITERALS
                .iter()
                .find_map(|literal| rest.strip_prefix(literal))
        {
            out.push('0');
            rest = after;
            continue;
        }

        let mut chars = rest.chars();
        let Some(c) = chars.next() else {
            break;
        };
        rest = chars.as_str();
        out.push(c);

        if escaped {
            escaped = false;
        } else if in_string && c == '\\' {
            escaped = true;
        } else if c == '"' {
            in_string = !in_string;
        }
    }

    out
}

/// Keeps only base64 alphabet and padding characters.
fn base64_symbols(body: &str) -> Vec<u8> {
    body.bytes()
        .filter(|&b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
        .collect()
}
