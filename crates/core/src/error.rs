use thiserror::Error;

/// Boxed error used wherever an engine-native failure has to be carried as a cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Coarse classification of [`Error`], used by callers that only care about
/// who has to fix the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input the caller can correct (cron expression, identity key shape).
    InvalidInput,
    /// Identity key looked well formed but did not resolve to anything.
    Configuration,
    /// The underlying engine rejected the operation.
    Internal,
    /// Caller bug: missing argument or unsupported task body variant.
    Contract,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid expression.")]
    InvalidExpression {
        #[source]
        source: BoxError,
    },

    #[error("{message}")]
    InvalidArgument { message: String },

    #[error("{message}")]
    IllegalState { message: String },

    #[error("cron engine failure: {source}")]
    Internal {
        #[source]
        source: BoxError,
    },

    #[error("required argument <{name}> is missing")]
    MissingArgument { name: &'static str },

    #[error("task body <{kind}> is not supported by the {engine} engine")]
    UnsupportedTaskBody { kind: String, engine: &'static str },
}

impl Error {
    #[must_use]
    pub fn invalid_expression(source: impl Into<BoxError>) -> Self {
        Self::InvalidExpression {
            source: source.into(),
        }
    }

    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(source: impl Into<BoxError>) -> Self {
        Self::Internal {
            source: source.into(),
        }
    }

    #[must_use]
    pub fn missing_argument(name: &'static str) -> Self {
        Self::MissingArgument { name }
    }

    #[must_use]
    pub fn unsupported_body(kind: impl Into<String>, engine: &'static str) -> Self {
        Self::UnsupportedTaskBody {
            kind: kind.into(),
            engine,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidExpression { .. } | Self::InvalidArgument { .. } => ErrorKind::InvalidInput,
            Self::IllegalState { .. } => ErrorKind::Configuration,
            Self::Internal { .. } => ErrorKind::Internal,
            Self::MissingArgument { .. } | Self::UnsupportedTaskBody { .. } => ErrorKind::Contract,
        }
    }

    #[must_use]
    pub fn is_invalid_expression(&self) -> bool {
        matches!(self, Self::InvalidExpression { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use {super::*, std::error::Error as _};

    #[derive(Debug, Error)]
    #[error("engine exploded")]
    struct Exploded;

    #[test]
    fn internal_keeps_cause() {
        let err = Error::internal(Exploded);
        assert_eq!(err.kind(), ErrorKind::Internal);
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("engine exploded"));
    }

    #[test]
    fn invalid_expression_message() {
        let err = Error::invalid_expression(Exploded);
        assert_eq!(err.to_string(), "Invalid expression.");
        assert!(err.is_invalid_expression());
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn contract_errors() {
        assert_eq!(Error::missing_argument("id").kind(), ErrorKind::Contract);
        let err = Error::unsupported_body("Foo", "runner");
        assert_eq!(err.kind(), ErrorKind::Contract);
        assert_eq!(
            err.to_string(),
            "task body <Foo> is not supported by the runner engine"
        );
    }

    #[test]
    fn key_rule_errors_are_distinguishable() {
        assert_eq!(
            Error::invalid_argument("blank group").kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            Error::illegal_state("no such type").kind(),
            ErrorKind::Configuration
        );
    }
}
