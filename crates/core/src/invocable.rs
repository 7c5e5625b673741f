//! Name-based resolution of invocable units.
//!
//! Method task bodies and structured job keys address code by a declaring
//! type name and a method name. An [`InvocableResolver`] turns that pair into
//! a [`BoundMethod`]: a fresh instance plus a handle that calls the method on
//! it. [`MethodRegistry`] is the table-driven resolver used by applications.

use std::{
    any::{Any, type_name},
    collections::HashMap,
    fmt,
    marker::PhantomData,
    sync::Arc,
};

use {thiserror::Error, tracing::debug};

use crate::error::BoxError;

/// A type-erased instance produced by a constructor.
pub type Instance = Arc<dyn Any + Send + Sync>;

type Constructor = Arc<dyn Fn() -> anyhow::Result<Instance> + Send + Sync>;

/// A type-erased method taking its receiver as `&dyn Any`.
pub type MethodFn = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("type <{0}> is not registered")]
    UnknownType(String),

    #[error("type <{declaring_type}> has no method <{method}>")]
    UnknownMethod {
        declaring_type: String,
        method: String,
    },

    #[error("failed to instantiate <{declaring_type}>: {source}")]
    Instantiation {
        declaring_type: String,
        #[source]
        source: BoxError,
    },
}

/// A resolved method, not yet bound to an instance.
#[derive(Clone)]
pub struct MethodHandle {
    declaring_type: String,
    name: String,
    call: MethodFn,
}

impl MethodHandle {
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>, call: MethodFn) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            call,
        }
    }

    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invoke_on(&self, instance: &(dyn Any + Send + Sync)) -> anyhow::Result<()> {
        (self.call)(instance)
    }
}

impl fmt::Debug for MethodHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodHandle")
            .field("declaring_type", &self.declaring_type)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An instance together with the method to call on it.
#[derive(Clone)]
pub struct BoundMethod {
    instance: Instance,
    method: MethodHandle,
}

impl BoundMethod {
    pub fn new(instance: Instance, method: MethodHandle) -> Self {
        Self { instance, method }
    }

    pub fn declaring_type(&self) -> &str {
        self.method.declaring_type()
    }

    pub fn method_name(&self) -> &str {
        self.method.name()
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn invoke(&self) -> anyhow::Result<()> {
        self.method.invoke_on(&*self.instance)
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethod")
            .field("declaring_type", &self.method.declaring_type)
            .field("method", &self.method.name)
            .finish_non_exhaustive()
    }
}

/// Maps `(declaring type, method)` names to callable units.
pub trait InvocableResolver: Send + Sync {
    fn has_type(&self, declaring_type: &str) -> bool;

    fn has_method(&self, declaring_type: &str, method: &str) -> bool;

    fn instantiate(&self, declaring_type: &str) -> Result<Instance, ResolveError>;

    fn method(&self, declaring_type: &str, method: &str) -> Result<MethodHandle, ResolveError>;

    /// Look the method up first so a typo never costs a constructor call.
    fn resolve(&self, declaring_type: &str, method: &str) -> Result<BoundMethod, ResolveError> {
        let handle = self.method(declaring_type, method)?;
        let instance = self.instantiate(declaring_type)?;
        Ok(BoundMethod::new(instance, handle))
    }
}

struct TypeEntry {
    constructor: Constructor,
    methods: HashMap<String, MethodFn>,
}

/// Resolver backed by an explicit registration table.
#[derive(Default)]
pub struct MethodRegistry {
    types: HashMap<String, TypeEntry>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under `name`. Re-registering a name replaces its
    /// constructor and drops previously registered methods.
    pub fn register_type<T, F>(&mut self, name: impl Into<String>, constructor: F) -> TypeRegistration<'_, T>
    where
        T: Any + Send + Sync,
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let constructor: Constructor = Arc::new(move || {
            let instance: Instance = Arc::new(constructor()?);
            Ok(instance)
        });
        let name = name.into();
        self.types.insert(name.clone(), TypeEntry {
            constructor,
            methods: HashMap::new(),
        });
        TypeRegistration {
            registry: self,
            name,
            _type: PhantomData,
        }
    }

    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl InvocableResolver for MethodRegistry {
    fn has_type(&self, declaring_type: &str) -> bool {
        self.types.contains_key(declaring_type)
    }

    fn has_method(&self, declaring_type: &str, method: &str) -> bool {
        self.types
            .get(declaring_type)
            .is_some_and(|entry| entry.methods.contains_key(method))
    }

    fn instantiate(&self, declaring_type: &str) -> Result<Instance, ResolveError> {
        let entry = self
            .types
            .get(declaring_type)
            .ok_or_else(|| ResolveError::UnknownType(declaring_type.to_string()))?;
        debug!(declaring_type, "instantiating registered type");
        (entry.constructor)().map_err(|e| ResolveError::Instantiation {
            declaring_type: declaring_type.to_string(),
            source: e.into(),
        })
    }

    fn method(&self, declaring_type: &str, method: &str) -> Result<MethodHandle, ResolveError> {
        let entry = self
            .types
            .get(declaring_type)
            .ok_or_else(|| ResolveError::UnknownType(declaring_type.to_string()))?;
        let call = entry
            .methods
            .get(method)
            .ok_or_else(|| ResolveError::UnknownMethod {
                declaring_type: declaring_type.to_string(),
                method: method.to_string(),
            })?;
        Ok(MethodHandle::new(declaring_type, method, Arc::clone(call)))
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}

/// Builder returned by [`MethodRegistry::register_type`].
pub struct TypeRegistration<'a, T> {
    registry: &'a mut MethodRegistry,
    name: String,
    _type: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> TypeRegistration<'_, T> {
    #[must_use]
    pub fn method<M>(self, name: impl Into<String>, method: M) -> Self
    where
        M: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let call: MethodFn = Arc::new(move |instance: &(dyn Any + Send + Sync)| {
            let target = instance
                .downcast_ref::<T>()
                .ok_or_else(|| anyhow::anyhow!("receiver is not a {}", type_name::<T>()))?;
            method(target)
        });
        if let Some(entry) = self.registry.types.get_mut(&self.name) {
            entry.methods.insert(name.into(), call);
        }
        self
    }
}
