//! Named client registrations.
//!
//! An application talking to several endpoints registers one connector and
//! one set of options per name, then creates clients on demand.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::client::{Client, ClientOptions};
use crate::error::{IpcError, Result};
use crate::transport::Connector;

/// Creates [`Client`]s from configurations registered by name.
pub struct ClientFactory<C: Connector> {
    registrations: HashMap<String, (Arc<C>, Arc<ClientOptions>)>,
}

impl<C: Connector> ClientFactory<C> {
    pub fn new() -> Self {
        Self {
            registrations: HashMap::new(),
        }
    }

    /// Register (or replace) the configuration for `name`.
    pub fn register(mut self, name: impl Into<String>, connector: C, options: ClientOptions) -> Self {
        let name = name.into();
        tracing::debug!(client = %name, "client registered");
        self.registrations
            .insert(name, (Arc::new(connector), Arc::new(options)));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registrations.contains_key(name)
    }

    /// Create a client for `name`. Clients created for the same name share
    /// their connector and options.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::ClientNotConfigured`] if nothing is registered
    /// under `name`.
    pub fn create_client(&self, name: &str) -> Result<Client<C>> {
        let (connector, options) = self
            .registrations
            .get(name)
            .ok_or_else(|| IpcError::ClientNotConfigured(name.to_string()))?;
        Ok(Client::from_shared(Arc::clone(connector), Arc::clone(options)))
    }
}

impl<C: Connector> Default for ClientFactory<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> fmt::Debug for ClientFactory<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.registrations.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::transport::PipeConnector;

    #[test]
    fn test_unknown_name_is_not_configured() {
        let factory = ClientFactory::<PipeConnector>::new();
        let err = factory.create_client("missing").unwrap_err();
        assert!(matches!(err, IpcError::ClientNotConfigured(ref name) if name == "missing"));
        assert_eq!(err.to_string(), "IPC client 'missing' is not configured");
    }

    #[test]
    fn test_clients_use_their_registration() {
        let factory = ClientFactory::new()
            .register(
                "fast",
                PipeConnector::new("/tmp/fast.sock"),
                ClientOptions::new().connection_timeout(Duration::from_millis(100)),
            )
            .register("default", PipeConnector::new("/tmp/default.sock"), ClientOptions::default());

        assert!(factory.contains("fast"));
        let fast = factory.create_client("fast").unwrap();
        assert_eq!(fast.options().connection_timeout, Duration::from_millis(100));
        let default = factory.create_client("default").unwrap();
        assert_eq!(default.options().connection_timeout, Duration::from_secs(60));
    }
}
