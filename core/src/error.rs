//! Error types for the reactive client.
//!
//! # Design
//! Two families with two lifetimes. `ConfigurationError` describes a broken
//! interface declaration and is returned synchronously while the client is
//! being built, so a bad method never reaches its first call.
//! `ClientError` covers everything that can go wrong during one invocation
//! and is always delivered through the invocation's future or stream.
//!
//! 4xx and 5xx get dedicated variants carrying the status and raw body.
//! `UnmatchedStatus` signals that no error decoder was registered for a
//! status, which is a gap in the client configuration rather than a
//! transient fault.

use thiserror::Error;

/// Boxed error used for transport failures and user-defined decoder errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Invalid method or template definition, detected while building a client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A `{name}` in the path or a header template has no variable parameter.
    #[error("method `{method}`: placeholder `{{{placeholder}}}` has no matching parameter")]
    UnknownPlaceholder { method: String, placeholder: String },

    /// More than one parameter is bound to the request body.
    #[error("method `{method}`: more than one parameter claims the request body")]
    MultipleBodyParameters { method: String },

    /// Two parameters share a name.
    #[error("method `{method}`: parameter `{name}` is declared more than once")]
    DuplicateParameter { method: String, name: String },

    /// Two methods of one interface share a name.
    #[error("interface `{interface}` declares method `{method}` more than once")]
    DuplicateMethod { interface: String, method: String },

    /// The return type is neither void nor a single-level value wrapper.
    #[error("method `{method}`: unsupported return type `{declared}`")]
    UnsupportedReturnType { method: String, declared: String },

    /// The body parameter type is neither a plain object nor a producer.
    #[error("method `{method}`: unsupported body type `{declared}`")]
    UnsupportedBodyType { method: String, declared: String },

    /// A wrapper whose type argument is itself parameterized.
    #[error("method `{method}`: Embedded generic type not supported (`{declared}`)")]
    EmbeddedGenericType { method: String, declared: String },

    /// Unbalanced braces or an empty placeholder in a path or header template.
    #[error("method `{method}`: malformed template `{template}`")]
    MalformedTemplate { method: String, template: String },
}

/// Errors delivered through an invocation's future or stream.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The executor failed to complete the exchange (connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// A successful response body could not be decoded into the declared type.
    #[error("decoding failed: {0}")]
    Decoding(String),

    /// A body argument could not be serialized.
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// A required placeholder, query, header or body argument was null.
    /// Detected when the call is bound and delivered through the invocation, never at build time.
    #[error("argument `{name}` is required but was null")]
    MissingArgument { name: String },

    /// The call supplied a different number of arguments than declared.
    #[error("expected {expected} arguments, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },

    /// A stream was passed where a value was expected, or the reverse.
    #[error("argument `{name}`: {reason}")]
    InvalidArgument { name: String, reason: &'static str },

    /// No method with this name exists on the client.
    #[error("unknown method `{0}`")]
    UnknownMethod(String),

    /// The result was consumed with a shape the method does not return.
    #[error("method returns {actual}, cannot be consumed as {expected}")]
    ShapeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// The server returned a 4xx status.
    #[error("client error {status}: {body}")]
    Client { status: u16, body: String },

    /// The server returned a 5xx status.
    #[error("server error {status}: {body}")]
    Server { status: u16, body: String },

    /// A user-registered decoder produced its own error type.
    #[error("HTTP {status}: {source}")]
    Custom {
        status: u16,
        #[source]
        source: BoxError,
    },

    /// No registered error decoder accepts this non-2xx status.
    #[error("no error decoder registered for status {status}")]
    UnmatchedStatus { status: u16 },
}

impl ClientError {
    pub fn transport(error: impl Into<BoxError>) -> Self {
        ClientError::Transport(error.into())
    }

    /// HTTP status carried by decoded error responses.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Client { status, .. }
            | ClientError::Server { status, .. }
            | ClientError::Custom { status, .. }
            | ClientError::UnmatchedStatus { status } => Some(*status),
            _ => None,
        }
    }
}

/// Result alias for per-call operations.
pub type Result<T> = std::result::Result<T, ClientError>;
