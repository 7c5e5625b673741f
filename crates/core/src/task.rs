//! Schedule metadata carried into and out of a repository.

use serde::{Deserialize, Serialize};

use crate::body::TaskBody;

/// An expression paired with the body it should run. Consumed by
/// [`CronTaskRepository::register_task`](crate::CronTaskRepository::register_task).
#[derive(Debug)]
pub struct CronTask {
    expression: String,
    body: Box<dyn TaskBody>,
}

impl CronTask {
    pub fn new(expression: impl Into<String>, body: impl TaskBody + 'static) -> Self {
        Self::from_boxed(expression, Box::new(body))
    }

    pub fn from_boxed(expression: impl Into<String>, body: Box<dyn TaskBody>) -> Self {
        Self {
            expression: expression.into(),
            body,
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn body(&self) -> &dyn TaskBody {
        &*self.body
    }

    pub fn into_parts(self) -> (String, Box<dyn TaskBody>) {
        (self.expression, self.body)
    }
}

/// Read-only snapshot of a registered task, rebuilt on every query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronTaskInfo {
    pub id: String,
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CronTaskInfo {
    pub fn new(id: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            expression: expression.into(),
            description: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}
