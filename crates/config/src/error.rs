use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown timezone <{value}> at {path}")]
    InvalidTimezone { path: String, value: String },

    #[error("invalid value <{value}> for property {key}: {reason}")]
    InvalidProperty {
        key: String,
        value: String,
        reason: String,
    },

    #[error("thread count must be at least 1")]
    ZeroThreads,
}

impl ConfigError {
    #[must_use]
    pub fn invalid_timezone(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidTimezone {
            path: path.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn invalid_property(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidProperty {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
