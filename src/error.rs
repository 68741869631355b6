//! Error types for the parley client.
//!
//! The four exchange kinds (construction, transport, HTTP status, stream
//! parse) are the outcome taxonomy of one streaming exchange: the engine
//! reports them through the error hook and folds them into an
//! [`ExchangeOutcome`](crate::ExchangeOutcome) rather than returning `Err`.
//! The remaining kinds are ambient and flow through [`Result`] as usual.

use std::error;
use std::fmt;
use std::io;
use std::sync::Arc;

/// The main error type for the parley client.
#[derive(Clone, Debug)]
pub enum Error {
    /// The request payload or headers could not be built. No network
    /// attempt was made.
    Construction {
        /// Human-readable error message.
        message: String,
    },

    /// The network layer failed: connect, DNS, or a deadline expiring
    /// anywhere in the exchange, including mid-stream.
    Transport {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The server answered with a non-success status.
    HttpStatus {
        /// HTTP status code.
        status_code: u16,
        /// The server's reason text.
        reason: String,
    },

    /// A `data:` payload on the event stream was not valid JSON.
    StreamParse {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// I/O error from the persistence layer.
    Io {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },

    /// Error during JSON serialization or deserialization of persisted
    /// state.
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// A parameter failed validation before reaching the core.
    Validation {
        /// Human-readable error message.
        message: String,
        /// Parameter that failed validation.
        param: Option<String>,
    },
}

impl Error {
    /// Creates a new construction error.
    pub fn construction(message: impl Into<String>) -> Self {
        Error::Construction {
            message: message.into(),
        }
    }

    /// Creates a new transport error.
    pub fn transport(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Transport {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new HTTP status error.
    pub fn http_status(status_code: u16, reason: impl Into<String>) -> Self {
        Error::HttpStatus {
            status_code,
            reason: reason.into(),
        }
    }

    /// Creates a new stream parse error.
    pub fn stream_parse(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::StreamParse {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// Returns true if this error is a construction failure.
    pub fn is_construction(&self) -> bool {
        matches!(self, Error::Construction { .. })
    }

    /// Returns true if this error is a transport failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    /// Returns true if this error is an HTTP status failure.
    pub fn is_http_status(&self) -> bool {
        matches!(self, Error::HttpStatus { .. })
    }

    /// Returns true if this error is a stream parse failure.
    pub fn is_stream_parse(&self) -> bool {
        matches!(self, Error::StreamParse { .. })
    }

    /// Returns true if a whole-exchange retry could plausibly succeed
    /// without changing the inputs. Retrying is caller policy; the core
    /// never loops.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport { .. } => true,
            Error::StreamParse { .. } => true,
            Error::HttpStatus { status_code, .. } => {
                matches!(status_code, 408 | 429 | 500..=599)
            }
            _ => false,
        }
    }

    /// Returns the status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Construction { message } => {
                write!(f, "Request construction error: {message}")
            }
            Error::Transport { message, .. } => {
                write!(f, "Transport error: {message}")
            }
            Error::HttpStatus {
                status_code,
                reason,
            } => {
                write!(f, "HTTP {status_code}: {reason}")
            }
            Error::StreamParse { message, .. } => {
                write!(f, "Stream parse error: {message}")
            }
            Error::Io { message, .. } => {
                write!(f, "I/O error: {message}")
            }
            Error::Serialization { message, .. } => {
                write!(f, "Serialization error: {message}")
            }
            Error::Validation { message, param } => {
                if let Some(param) = param {
                    write!(f, "Validation error: {message} (parameter: {param})")
                } else {
                    write!(f, "Validation error: {message}")
                }
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Transport { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::StreamParse { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(source),
            Error::Serialization { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

/// A specialized Result type for parley operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_display_carries_reason() {
        let err = Error::http_status(401, "Unauthorized");
        assert_eq!(err.to_string(), "HTTP 401: Unauthorized");
        assert_eq!(err.status_code(), Some(401));
        assert!(err.is_http_status());
    }

    #[test]
    fn exchange_kind_predicates() {
        assert!(Error::construction("bad body").is_construction());
        assert!(Error::transport("refused", None).is_transport());
        assert!(Error::stream_parse("bad json", None).is_stream_parse());
        assert!(!Error::construction("bad body").is_transport());
    }

    #[test]
    fn retryability() {
        assert!(Error::transport("timeout", None).is_retryable());
        assert!(Error::stream_parse("bad json", None).is_retryable());
        assert!(Error::http_status(503, "Service Unavailable").is_retryable());
        assert!(!Error::http_status(401, "Unauthorized").is_retryable());
        assert!(!Error::construction("bad body").is_retryable());
    }
}
