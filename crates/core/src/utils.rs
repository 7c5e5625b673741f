//! Error normalisation shared by every engine adapter.
//!
//! Engines fail in their own vocabulary. Adapters run engine calls through
//! [`do_register`] / [`do_void_invoke`], which fold any failure into exactly
//! two outward buckets: [`Error::InvalidExpression`] when the failure is the
//! engine's own "bad expression" error type, [`Error::Internal`] otherwise.

use std::{any::type_name, error::Error as StdError, fmt};

use tracing::debug;

use crate::error::{BoxError, Error, Result};

/// Identifies the error type an engine raises for an unparsable expression.
#[derive(Clone, Copy)]
pub struct ExpressionErrorType {
    type_name: &'static str,
    matches: fn(&(dyn StdError + 'static)) -> bool,
}

fn is_error_of<E: StdError + 'static>(err: &(dyn StdError + 'static)) -> bool {
    err.is::<E>()
}

impl ExpressionErrorType {
    #[must_use]
    pub fn of<E: StdError + 'static>() -> Self {
        Self {
            type_name: type_name::<E>(),
            matches: is_error_of::<E>,
        }
    }

    pub fn matches(&self, err: &(dyn StdError + 'static)) -> bool {
        (self.matches)(err)
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for ExpressionErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExpressionErrorType")
            .field(&self.type_name)
            .finish()
    }
}

/// Classify an engine failure.
pub fn resolve_error(err: BoxError, invalid_expression: Option<ExpressionErrorType>) -> Error {
    match invalid_expression {
        Some(marker) if marker.matches(&*err) => {
            debug!(error = %err, marker = marker.type_name(), "engine rejected expression");
            Error::invalid_expression(err)
        },
        _ => Error::internal(err),
    }
}

/// Run an engine registration and return the id it produced.
pub fn do_register<ID, F>(register: F, invalid_expression: Option<ExpressionErrorType>) -> Result<ID>
where
    F: FnOnce() -> std::result::Result<ID, BoxError>,
{
    register().map_err(|e| resolve_error(e, invalid_expression))
}

/// Run an engine call with no result (update, remove).
pub fn do_void_invoke<F>(invoke: F, invalid_expression: Option<ExpressionErrorType>) -> Result<()>
where
    F: FnOnce() -> std::result::Result<(), BoxError>,
{
    invoke().map_err(|e| resolve_error(e, invalid_expression))
}

/// Reject blank required arguments before any engine interaction.
pub fn require_non_blank<'a>(value: &'a str, name: &'static str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(Error::missing_argument(name));
    }
    Ok(value)
}
