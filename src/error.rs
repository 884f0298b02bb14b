use std::time::Duration;
use thiserror::Error;

pub type CarrierResult<T> = Result<T, CarrierError>;

/// Failure issuing the HTTP call itself.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Connection failed: {message}")]
    Connection { message: String },

    #[error("Request failed: {message}")]
    Request { message: String },
}

impl TransportError {
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            TransportError::Timeout { timeout }
        } else if err.is_connect() {
            TransportError::Connection {
                message: err.to_string(),
            }
        } else {
            TransportError::Request {
                message: err.to_string(),
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum CarrierError {
    /// A configuration key the call cannot be built without is unset.
    #[error("Carrier configuration field {field} is not set")]
    Configuration { field: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The carrier answered but the body did not pass validation.
    #[error("Carrier request to {url} failed ({reason}) with response: {body}")]
    Api {
        url: String,
        status: u16,
        reason: String,
        body: String,
    },

    /// The data send preceding a manifest print was not confirmed.
    /// Callers must abandon the whole print flow on this error.
    #[error("Can't send data to server: {body}")]
    FatalPrintPrecondition { body: String },
}

impl CarrierError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, CarrierError::FatalPrintPrecondition { .. })
    }

    /// Raw response body, when the carrier returned one.
    pub fn body(&self) -> Option<&str> {
        match self {
            CarrierError::Api { body, .. } | CarrierError::FatalPrintPrecondition { body } => {
                Some(body)
            }
            _ => None,
        }
    }
}
