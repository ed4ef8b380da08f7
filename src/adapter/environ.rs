//! Builds the request environment from a patched gateway event.

use std::collections::HashMap;
use std::io::Cursor;

use crate::models::environ::PROTOCOL_VERSION;
use crate::models::{AdapterError, Environ, InvocationEvent};

/// Header keys stored without the `HTTP_` prefix.
const RESERVED_HEADER_KEYS: [&str; 2] = ["CONTENT_TYPE", "CONTENT_LENGTH"];

const HEADER_PREFIX: &str = "HTTP_";

const SERVER_PROTOCOL: &str = "HTTP/1.1";

/// `Content-Type` → `CONTENT_TYPE`.
#[must_use]
pub fn normalize_header_name(name: &str) -> String {
    name.replace('-', "_").to_uppercase()
}

/// Environment key a header is stored under.
#[must_use]
pub fn header_key(name: &str) -> String {
    let normalized = normalize_header_name(name);
    if RESERVED_HEADER_KEYS.contains(&normalized.as_str()) {
        normalized
    } else {
        format!("{HEADER_PREFIX}{normalized}")
    }
}

/// URL-encodes query parameters, sorted by key. `None` gives an empty string.
#[must_use]
#[allow(clippy::implicit_hasher)]
pub fn build_query_string(params: Option<&HashMap<String, String>>) -> String {
    let Some(params) = params else {
        return String::new();
    };

    let mut pairs: Vec<(&String, &String)> = params.iter().collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Translates a patched event into a validated request environment.
///
/// # Errors
///
/// Returns `AdapterError::InvalidEnviron` if the result is not a well-formed
/// request environment.
pub fn make_environ(event: &InvocationEvent) -> Result<Environ, AdapterError> {
    let mut environ = Environ::default();

    for (name, value) in &event.headers {
        environ.insert(header_key(name), value.as_str());
    }

    let host = format!(
        "{}:{}",
        environ.get_or_empty("HTTP_HOST"),
        environ.get_or_empty("HTTP_X_FORWARDED_PORT")
    );
    let server_port = environ.get_or_empty("HTTP_X_FORWARDED_PORT").to_string();
    let url_scheme = environ.get_or_empty("HTTP_X_FORWARDED_PROTO").to_string();
    let body = event.body.clone().unwrap_or_default();

    environ.insert("REQUEST_METHOD", event.http_method.as_str());
    environ.insert("PATH_INFO", event.path.as_str());
    environ.insert(
        "QUERY_STRING",
        build_query_string(event.query_string_parameters.as_ref()),
    );
    environ.insert("REMOTE_ADDR", event.source_ip());
    environ.insert("HOST", host);
    environ.insert("SCRIPT_NAME", "");
    environ.insert("SERVER_PORT", server_port);
    environ.insert("SERVER_PROTOCOL", SERVER_PROTOCOL);
    environ.insert(
        "CONTENT_LENGTH",
        if body.is_empty() {
            String::new()
        } else {
            body.len().to_string()
        },
    );

    environ.url_scheme = url_scheme;
    environ.input = Cursor::new(body.into_bytes());
    environ.version = PROTOCOL_VERSION;
    environ.multithread = false;
    environ.multiprocess = false;
    environ.run_once = true;

    validate_environ(&environ)?;
    Ok(environ)
}

/// Checks that an environment is well-formed enough to hand to an application.
///
/// # Errors
///
/// Returns `AdapterError::InvalidEnviron` describing the first problem found.
pub fn validate_environ(environ: &Environ) -> Result<(), AdapterError> {
    let invalid = |reason: String| Err(AdapterError::InvalidEnviron(reason));

    for key in ["REQUEST_METHOD", "SCRIPT_NAME", "PATH_INFO", "SERVER_PROTOCOL"] {
        if !environ.contains(key) {
            return invalid(format!("missing required key {key}"));
        }
    }

    let method = environ.request_method();
    if method.is_empty() || !method.bytes().all(is_token_byte) {
        return invalid(format!("bad REQUEST_METHOD {method:?}"));
    }

    for key in ["SCRIPT_NAME", "PATH_INFO"] {
        let value = environ.get_or_empty(key);
        if !value.is_empty() && !value.starts_with('/') {
            return invalid(format!("{key} must be empty or start with '/', got {value:?}"));
        }
    }

    let content_length = environ.get_or_empty("CONTENT_LENGTH");
    if !content_length.is_empty() && content_length.parse::<u64>().is_err() {
        return invalid(format!("bad CONTENT_LENGTH {content_length:?}"));
    }

    for key in ["HTTP_CONTENT_TYPE", "HTTP_CONTENT_LENGTH"] {
        if environ.contains(key) {
            return invalid(format!("{key} must not be set"));
        }
    }

    if !matches!(environ.url_scheme.as_str(), "" | "http" | "https") {
        return invalid(format!("bad url scheme {:?}", environ.url_scheme));
    }

    if environ.version != PROTOCOL_VERSION {
        return invalid(format!("unsupported version {:?}", environ.version));
    }

    Ok(())
}

/// RFC 9110 token characters.
const fn is_token_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(
            byte,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'|'
                | b'~'
        )
}
