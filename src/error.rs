//! Error types for the TABStack SDK.

use thiserror::Error;

/// Result type for TABStack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the TABStack SDK.
#[derive(Error, Debug)]
pub enum Error {
    /// A schema could not be built, or a JSON Schema uses a construct the DSL
    /// cannot represent.
    #[error("Schema definition error at '{pointer}': {message}")]
    SchemaDefinition {
        /// What went wrong
        message: String,
        /// JSON pointer to the offending construct (empty for the root)
        pointer: String,
    },

    /// A frame in the automate event stream could not be decoded.
    #[error("Stream decode error: {message} (frame: {frame:?})")]
    StreamDecode {
        /// What went wrong
        message: String,
        /// Raw text of the offending frame
        frame: String,
    },

    /// The request was malformed or missing required fields (400).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The API key is invalid or missing (401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The URL is invalid or inaccessible (422).
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The server failed to process the request (500).
    #[error("Server error: {0}")]
    Server(String),

    /// The requested service is not available (503).
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Any other error status returned by the API.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Network or HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request timeout.
    #[error("Request timed out")]
    Timeout,
}

impl Error {
    pub(crate) fn schema(message: impl Into<String>, pointer: impl Into<String>) -> Self {
        Error::SchemaDefinition {
            message: message.into(),
            pointer: pointer.into(),
        }
    }

    pub(crate) fn stream_decode(message: impl Into<String>, frame: impl Into<String>) -> Self {
        Error::StreamDecode {
            message: message.into(),
            frame: frame.into(),
        }
    }

    /// Map a transport error, separating out timeouts.
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else {
            Error::Http(err)
        }
    }

    /// HTTP status code for errors returned by the API.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::BadRequest(_) => Some(400),
            Error::Unauthorized(_) => Some(401),
            Error::InvalidUrl(_) => Some(422),
            Error::Server(_) => Some(500),
            Error::ServiceUnavailable(_) => Some(503),
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Create an API error from a response.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();

        let body = match response.bytes().await {
            Ok(b) => b,
            Err(e) => return Error::transport(e),
        };
        let message = error_message(&body);

        Error::from_status(status, message)
    }

    pub(crate) fn from_status(status: u16, message: String) -> Self {
        match status {
            400 => Error::BadRequest(message),
            401 => Error::Unauthorized(message),
            422 => Error::InvalidUrl(message),
            500 => Error::Server(message),
            503 => Error::ServiceUnavailable(message),
            _ => Error::Api { status, message },
        }
    }
}

#[derive(serde::Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

/// Pull a message out of an error body: the JSON `error` field, else the raw
/// text, else a generic placeholder.
fn error_message(body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ErrorResponse>(body) {
        return parsed.error.unwrap_or_else(|| "Unknown error".into());
    }
    if body.is_empty() {
        return "Unknown error".into();
    }
    String::from_utf8_lossy(body).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_from_json_body() {
        assert_eq!(error_message(br#"{"error": "bad url"}"#), "bad url");
        assert_eq!(error_message(br#"{"detail": "x"}"#), "Unknown error");
    }

    #[test]
    fn test_error_message_falls_back_to_text() {
        assert_eq!(error_message(b"gateway exploded"), "gateway exploded");
        assert_eq!(error_message(b""), "Unknown error");
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(Error::from_status(400, "m".into()), Error::BadRequest(_)));
        assert!(matches!(Error::from_status(401, "m".into()), Error::Unauthorized(_)));
        assert!(matches!(Error::from_status(422, "m".into()), Error::InvalidUrl(_)));
        assert!(matches!(Error::from_status(500, "m".into()), Error::Server(_)));
        assert!(matches!(
            Error::from_status(503, "m".into()),
            Error::ServiceUnavailable(_)
        ));

        let err = Error::from_status(418, "teapot".into());
        assert_eq!(err.status_code(), Some(418));
        assert_eq!(err.to_string(), "API error (418): teapot");
    }

    #[test]
    fn test_schema_error_display_names_pointer() {
        let err = Error::schema("unsupported keyword 'pattern'", "/properties/a/pattern");
        assert!(err.to_string().contains("/properties/a/pattern"));
        assert_eq!(err.status_code(), None);
    }
}
