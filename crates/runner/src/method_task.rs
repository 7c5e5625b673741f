use std::fmt;

use {
    cronrepo_core::{BoundMethod, Error, InvocableResolver, ResolveError, Result},
    tracing::debug,
};

use crate::engine::{Task, TaskExecutor};

/// Runs one resolved method. The instance is created once, at registration.
pub struct MethodTask {
    bound: BoundMethod,
    description: String,
}

impl MethodTask {
    /// Resolve `declaring_type::method` now so a bad name fails the
    /// registration instead of every firing.
    pub fn resolve(resolver: &dyn InvocableResolver, declaring_type: &str, method: &str) -> Result<Self> {
        if declaring_type.trim().is_empty() || method.trim().is_empty() {
            return Err(Error::invalid_argument(
                "method tasks need a declaring type and a method name",
            ));
        }
        let bound = resolver
            .resolve(declaring_type, method)
            .map_err(|e| match e {
                ResolveError::Instantiation { .. } => Error::internal(e),
                ResolveError::UnknownType(_) | ResolveError::UnknownMethod { .. } => {
                    Error::illegal_state(e.to_string())
                },
            })?;
        Ok(Self {
            description: format!("{declaring_type}::{method}"),
            bound,
        })
    }
}

impl Task for MethodTask {
    fn execute(&self, executor: &TaskExecutor) -> anyhow::Result<()> {
        debug!(guid = executor.guid(), method = %self.description, "invoking method task");
        self.bound.invoke()
    }

    fn description(&self) -> Option<&str> {
        Some(&self.description)
    }
}

impl fmt::Debug for MethodTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodTask")
            .field("method", &self.description)
            .finish_non_exhaustive()
    }
}
