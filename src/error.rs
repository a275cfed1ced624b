//! Error types.
//!
//! Two families live here. [`Error`] and [`RegistrationError`] are startup
//! failures: they surface from [`Scanner::scan`](crate::Scanner::scan),
//! [`RouteTable::build`](crate::RouteTable::build) or the server and are fatal.
//! Everything else is per-request and is turned into a structured response by
//! the [`Dispatcher`](crate::Dispatcher); none of it ever reaches hyper.

use http::StatusCode;
use thiserror::Error;

use crate::method::Method;

/// Result alias for startup-time operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Process-level failures: binding a port, reading config, registering routes.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(String),

    #[error("registration: {0}")]
    Registration(#[from] RegistrationError),
}

/// Misconfigured route metadata. Raised before any request is served.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("invalid path pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("route {method} {pattern} has no handler")]
    MissingHandler { method: Method, pattern: String },

    #[error("route {method} {pattern} binds body parameter `{name}` but consumes no body")]
    BodyWithoutConsumes { method: Method, pattern: String, name: String },

    #[error("route {method} {pattern} declares more than one body parameter")]
    MultipleBodies { method: Method, pattern: String },

    #[error("route {method} {pattern} binds path parameter `{name}` which is not a variable of the pattern")]
    UnknownPathVariable { method: Method, pattern: String, name: String },

    #[error("route {method} {pattern} binds `{name}` from {location} more than once")]
    DuplicateBinding { method: Method, pattern: String, name: String, location: &'static str },

    #[error("route {method} {pattern} path parameter `{name}` cannot be optional")]
    OptionalPathVariable { method: Method, pattern: String, name: String },

    #[error("route {method} {pattern} parameter `{name}` has a default that is not a valid {expected}")]
    InvalidDefault { method: Method, pattern: String, name: String, expected: &'static str },

    #[error("routes {method} {first} and {method} {second} overlap on {media}")]
    Ambiguous { method: Method, first: String, second: String, media: &'static str },
}

/// Codec failure in either direction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("json: {0}")]
    Json(String),

    #[error("xml: {0}")]
    Xml(String),
}

/// Failure to turn request data into a handler argument.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error("missing required parameter `{name}`")]
    Missing { name: String },

    #[error("parameter `{name}` is not a valid {expected}")]
    Conversion { name: String, expected: &'static str },

    #[error("body parameter `{name}` could not be read: {reason}")]
    Body { name: String, reason: CodecError },
}

impl BindingError {
    /// `400` for simple parameters, `422` for malformed structured bodies.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Missing { .. } | Self::Conversion { .. } => StatusCode::BAD_REQUEST,
            Self::Body { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

/// A domain error raised by a handler.
///
/// Carries the status code the client sees (500 unless declared otherwise)
/// and an optional machine-readable code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
    pub(crate) code: Option<String>,
}

impl HandlerError {
    /// A `500 Internal Server Error`.
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), code: None }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::CONFLICT, message)
    }

    /// Attach a machine-readable error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn message(&self) -> &str { &self.message }
    pub fn code(&self) -> Option<&str> { self.code.as_deref() }
}

/// Everything that can go wrong while dispatching one request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no route for {method} {path}")]
    RouteNotFound { method: String, path: String },

    #[error("more than one route matches {method} {path}")]
    RouteAmbiguous { method: String, path: String },

    #[error("none of the acceptable media types can be produced")]
    NotAcceptable,

    #[error("content type `{0}` is not supported by this route")]
    UnsupportedMediaType(String),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error("response could not be serialized: {0}")]
    Serialization(CodecError),
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::RouteAmbiguous { .. } | Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Binding(e) => e.status(),
            Self::Handler(e) => e.status,
        }
    }

    /// Machine-readable code for the error body.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::RouteNotFound { .. } => Some("route_not_found"),
            Self::RouteAmbiguous { .. } => Some("route_ambiguous"),
            Self::NotAcceptable => Some("not_acceptable"),
            Self::UnsupportedMediaType(_) => Some("unsupported_media_type"),
            Self::Binding(BindingError::Missing { .. }) => Some("missing_parameter"),
            Self::Binding(BindingError::Conversion { .. }) => Some("invalid_parameter"),
            Self::Binding(BindingError::Body { .. }) => Some("malformed_body"),
            Self::Handler(e) => e.code(),
            Self::Serialization(_) => Some("serialization_failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_status_splits_simple_and_structured() {
        let missing = BindingError::Missing { name: "page".into() };
        let body = BindingError::Body { name: "user".into(), reason: CodecError::Json("eof".into()) };
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn handler_error_defaults_to_500() {
        let e = HandlerError::new("boom");
        assert_eq!(DispatchError::from(e).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn handler_error_keeps_declared_status_and_code() {
        let e = HandlerError::conflict("taken").with_code("user_exists");
        let d = DispatchError::from(e);
        assert_eq!(d.status(), StatusCode::CONFLICT);
        assert_eq!(d.code(), Some("user_exists"));
        assert_eq!(d.to_string(), "taken");
    }

    #[test]
    fn missing_parameter_message_names_parameter() {
        let e = DispatchError::from(BindingError::Missing { name: "page".into() });
        assert!(e.to_string().contains("page"));
    }
}
