//! Resolves the implementation behind a contract for each exchange.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::service::Service;

/// Supplies the service implementing a contract.
///
/// Called once per exchange, so an implementation may hand out a fresh
/// instance every time.
pub trait ServiceProvider: Send + Sync + 'static {
    fn get_service(&self, contract: &str) -> Option<Arc<Service>>;
}

/// A single shared service answers for its own contract.
impl ServiceProvider for Arc<Service> {
    fn get_service(&self, contract: &str) -> Option<Arc<Service>> {
        (self.contract() == contract).then(|| Arc::clone(self))
    }
}

type ServiceFactory = Arc<dyn Fn() -> Arc<Service> + Send + Sync>;

/// Contract-keyed collection of singleton and per-exchange services.
#[derive(Clone, Default)]
pub struct ServiceCollection {
    services: HashMap<String, ServiceFactory>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share one instance across every exchange.
    pub fn add_singleton(mut self, service: Service) -> Self {
        let contract = service.contract().to_string();
        let service = Arc::new(service);
        self.services
            .insert(contract, Arc::new(move || Arc::clone(&service)));
        self
    }

    /// Build a new instance for every exchange.
    pub fn add_transient<F>(mut self, contract: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Service + Send + Sync + 'static,
    {
        self.services
            .insert(contract.into(), Arc::new(move || Arc::new(factory())));
        self
    }
}

impl ServiceProvider for ServiceCollection {
    fn get_service(&self, contract: &str) -> Option<Arc<Service>> {
        self.services.get(contract).map(|factory| factory())
    }
}

impl fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.services.keys()).finish()
    }
}
