use std::fmt;

use {cronrepo_core::BoundMethod, tracing::debug};

use crate::engine::{Job, JobExecutionContext, JobExecutionError};

/// Job that invokes one resolved method on one instance. There is a single
/// `MethodLevelJob` per `(declaring type, method)` pair, shared by all of
/// its firings.
pub struct MethodLevelJob {
    identity: String,
    bound: BoundMethod,
}

impl MethodLevelJob {
    pub fn new(identity: impl Into<String>, bound: BoundMethod) -> Self {
        Self {
            identity: identity.into(),
            bound,
        }
    }

    /// `<declaring type>@<method>`.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn declaring_type(&self) -> &str {
        self.bound.declaring_type()
    }

    pub fn method_name(&self) -> &str {
        self.bound.method_name()
    }
}

impl Job for MethodLevelJob {
    fn execute(&self, context: &JobExecutionContext) -> Result<(), JobExecutionError> {
        debug!(job = %self.identity, trigger = %context.trigger().key(), "invoking method job");
        self.bound
            .invoke()
            .map_err(JobExecutionError::from_anyhow)
    }
}

impl fmt::Debug for MethodLevelJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodLevelJob")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
