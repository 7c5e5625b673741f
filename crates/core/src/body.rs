//! Task bodies: the payload executed when a schedule fires.
//!
//! [`TaskBody`] is open: engine crates add their own variants (a structured
//! job descriptor, for example) and each adapter downcasts to the variants it
//! declares support for.

use std::{
    any::{Any, type_name},
    fmt,
    sync::Arc,
};

/// Closure run by [`RunnableTaskBody`].
pub type Runnable = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// Type-erasure helpers, implemented for every sized `'static` type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T: Any + Send> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// Marker capability for anything a repository can schedule.
pub trait TaskBody: AsAny + Send + Sync + fmt::Debug {
    /// Short name used in diagnostics and in unsupported-body errors.
    fn kind(&self) -> &'static str {
        type_name::<Self>()
    }
}

impl dyn TaskBody + '_ {
    pub fn is<T: TaskBody + 'static>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: TaskBody + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Returns `None` when the body is not a `T`; check with [`Self::is`]
    /// first if the body must survive a miss.
    pub fn downcast<T: TaskBody + 'static>(self: Box<Self>) -> Option<Box<T>> {
        self.into_any().downcast::<T>().ok()
    }
}

/// A plain closure.
#[derive(Clone)]
pub struct RunnableTaskBody {
    runnable: Runnable,
    description: Option<String>,
}

impl RunnableTaskBody {
    pub fn new(runnable: Runnable) -> Self {
        Self {
            runnable,
            description: None,
        }
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::new(Arc::new(f))
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn runnable(&self) -> &Runnable {
        &self.runnable
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        (self.runnable)()
    }
}

impl fmt::Debug for RunnableTaskBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnableTaskBody")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl TaskBody for RunnableTaskBody {
    fn kind(&self) -> &'static str {
        "RunnableTaskBody"
    }
}

/// A named method on a named type, resolved through an
/// [`InvocableResolver`](crate::InvocableResolver) when the task is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodTaskBody {
    declaring_type: String,
    method: String,
}

impl MethodTaskBody {
    pub fn new(declaring_type: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            method: method.into(),
        }
    }

    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    pub fn method(&self) -> &str {
        &self.method
    }
}

impl TaskBody for MethodTaskBody {
    fn kind(&self) -> &'static str {
        "MethodTaskBody"
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        std::sync::atomic::{AtomicUsize, Ordering},
    };

    #[derive(Debug)]
    struct Opaque;

    impl TaskBody for Opaque {}

    #[test]
    fn downcast_to_declared_variant() {
        let body: Box<dyn TaskBody> = Box::new(MethodTaskBody::new("app.Reports", "daily"));
        assert!(body.is::<MethodTaskBody>());
        assert!(!body.is::<RunnableTaskBody>());
        let method = body.downcast::<MethodTaskBody>().unwrap();
        assert_eq!(method.declaring_type(), "app.Reports");
        assert_eq!(method.method(), "daily");
    }

    #[test]
    fn downcast_miss_returns_none() {
        let body: Box<dyn TaskBody> = Box::new(Opaque);
        assert!(body.downcast::<MethodTaskBody>().is_none());
    }

    #[test]
    fn default_kind_is_type_name() {
        let body: Box<dyn TaskBody> = Box::new(Opaque);
        assert!(body.kind().ends_with("Opaque"));
    }

    #[test]
    fn runnable_runs() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let body = RunnableTaskBody::from_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .with_description("tick");
        body.run().unwrap();
        body.run().unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(body.description(), Some("tick"));
    }
}
