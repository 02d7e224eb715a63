use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
struct ServiceEntry {
    instance: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

/// Singleton service container handed to `register_services`.
///
/// Services are keyed by their concrete type. A plugin activating later can
/// look up services registered by its dependencies.
#[derive(Clone, Default)]
pub struct ServiceCollection {
    instances: HashMap<TypeId, ServiceEntry>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a singleton instance, replacing any previous instance of the same type.
    pub fn add_singleton<T>(&mut self, instance: T) -> &mut Self
    where
        T: Any + Send + Sync,
    {
        self.add_shared(Arc::new(instance))
    }

    /// Register an already shared instance.
    pub fn add_shared<T>(&mut self, instance: Arc<T>) -> &mut Self
    where
        T: Any + Send + Sync,
    {
        self.instances.insert(
            TypeId::of::<T>(),
            ServiceEntry {
                instance,
                type_name: type_name::<T>(),
            },
        );
        self
    }

    /// Get a service by concrete type T.
    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.instances
            .get(&TypeId::of::<T>())
            .and_then(|entry| Arc::downcast::<T>(entry.instance.clone()).ok())
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.instances.contains_key(&TypeId::of::<T>())
    }

    /// Type names of all registered services, sorted.
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.instances.values().map(|e| e.type_name).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCollection")
            .field("services", &self.type_names())
            .finish()
    }
}
