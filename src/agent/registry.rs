//! Explicit service registry.
//!
//! One instance per service type, created on first request and reused after
//! that. The registry is built once at process start and torn down
//! explicitly at shutdown.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

type Service = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
struct Entries {
    services: HashMap<TypeId, Service>,
    /// Registration order, used to tear down in reverse.
    order: Vec<(TypeId, &'static str)>,
}

#[derive(Default)]
pub struct ServiceRegistry {
    entries: Mutex<Entries>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing instance of `T`, if one was registered.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let entries = self.entries.lock();
        entries
            .services
            .get(&TypeId::of::<T>())
            .and_then(|service| Arc::clone(service).downcast::<T>().ok())
    }

    /// Existing instance of `T`, or a new one built by `create`.
    ///
    /// `create` runs without the registry lock held, so it may resolve other
    /// services. If two callers race, the first registration wins and both
    /// receive it.
    pub fn get_or_create<T, F>(&self, create: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        if let Some(existing) = self.get::<T>() {
            return existing;
        }
        self.register(Arc::new(create()))
    }

    /// Register `service` unless an instance of `T` already exists.
    /// Returns whichever instance ends up registered.
    pub fn register<T: Any + Send + Sync>(&self, service: Arc<T>) -> Arc<T> {
        let mut entries = self.entries.lock();
        let id = TypeId::of::<T>();
        if let Some(existing) = entries
            .services
            .get(&id)
            .and_then(|s| Arc::clone(s).downcast::<T>().ok())
        {
            return existing;
        }
        debug!("Registered service {}", type_name::<T>());
        entries.services.insert(id, service.clone());
        entries.order.push((id, type_name::<T>()));
        service
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.entries.lock().services.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every registered service, newest first. Returns how many were
    /// released. Outstanding `Arc`s held by callers stay valid.
    pub fn teardown(&self) -> usize {
        let mut entries = self.entries.lock();
        let order = std::mem::take(&mut entries.order);
        let count = order.len();
        for (id, name) in order.into_iter().rev() {
            entries.services.remove(&id);
            debug!("Released service {}", name);
        }
        count
    }
}
