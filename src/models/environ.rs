//! Request environment handed to the wrapped application.
//!
//! CGI-style variables (`REQUEST_METHOD`, `PATH_INFO`, `HTTP_*`, ...) live in
//! a string map; the protocol metadata that is not a plain string gets its
//! own field.

use std::collections::HashMap;
use std::io::Cursor;

/// Protocol version advertised to applications.
pub const PROTOCOL_VERSION: (u8, u8) = (1, 0);

/// Per-invocation request environment.
#[derive(Debug, Clone)]
pub struct Environ {
    vars: HashMap<String, String>,
    /// Request body, readable and rewindable.
    pub input: Cursor<Vec<u8>>,
    /// `http`, `https`, or empty when the scheme is unknown.
    pub url_scheme: String,
    pub version: (u8, u8),
    pub multithread: bool,
    pub multiprocess: bool,
    pub run_once: bool,
}

impl Default for Environ {
    fn default() -> Self {
        Self {
            vars: HashMap::new(),
            input: Cursor::new(Vec::new()),
            url_scheme: String::new(),
            version: PROTOCOL_VERSION,
            multithread: false,
            multiprocess: false,
            run_once: true,
        }
    }
}

impl Environ {
    /// Builds an environment from already-prepared variables, untouched.
    #[must_use]
    pub fn from_vars(vars: HashMap<String, String>) -> Self {
        Self {
            vars,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Returns the variable or an empty string when it is unset.
    #[must_use]
    pub fn get_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or_default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    #[must_use]
    pub const fn vars(&self) -> &HashMap<String, String> {
        &self.vars
    }

    #[must_use]
    pub fn request_method(&self) -> &str {
        self.get_or_empty("REQUEST_METHOD")
    }

    #[must_use]
    pub fn path_info(&self) -> &str {
        self.get_or_empty("PATH_INFO")
    }

    #[must_use]
    pub fn query_string(&self) -> &str {
        self.get_or_empty("QUERY_STRING")
    }

    /// Full request body, regardless of the input stream position.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        self.input.get_ref()
    }
}
