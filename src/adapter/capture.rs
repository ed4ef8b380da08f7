use std::collections::HashMap;

use super::StartResponse;
use crate::models::AdapterError;

/// Records what the application passes to start_response.
#[derive(Debug, Default)]
pub struct ResponseCapture {
    status: Option<u16>,
    headers: HashMap<String, String>,
}

impl ResponseCapture {
    /// The status code is the first three characters of `status` parsed as
    /// an integer. Duplicate header names keep the last value.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::InvalidStatus` if the status line does not start
    /// with a three-digit code.
    pub fn record(
        &mut self,
        status: &str,
        headers: Vec<(String, String)>,
    ) -> Result<(), AdapterError> {
        let code = status
            .get(..3)
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or_else(|| AdapterError::InvalidStatus(status.to_string()))?;

        self.status = Some(code);
        self.headers = headers.into_iter().collect();
        Ok(())
    }

    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    #[must_use]
    pub const fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Consumes the capture.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::ResponseNotStarted` if start_response was never
    /// called.
    pub fn finish(self) -> Result<(u16, HashMap<String, String>), AdapterError> {
        let status = self.status.ok_or(AdapterError::ResponseNotStarted)?;
        Ok((status, self.headers))
    }
}

impl StartResponse for ResponseCapture {
    fn start_response(
        &mut self,
        status: &str,
        headers: Vec<(String, String)>,
    ) -> Result<(), AdapterError> {
        self.record(status, headers)
    }
}
