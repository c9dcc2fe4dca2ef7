use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::Config;
use crate::connection::{ManageConnection, ManagerFactory};
use crate::endpoint::{EndpointPool, PoolState, PooledConnection};
use crate::error::{Error, Result};
use crate::port::PortDescriptor;

type EndpointKey = (Arc<str>, PortDescriptor);

/// The top-level connection pool: a registry of per-endpoint pools, keyed
/// by `(host, port)` and created lazily on first use.
///
/// Generic over a [`ManagerFactory`], which is asked to build one
/// connection manager per distinct endpoint the first time that endpoint
/// is requested. Use [`ConnectionPool::tcp`] for the common case of
/// pooling plain TCP connections.
///
/// [`ConnectionPool::tcp`]: ConnectionPool::tcp
pub struct ConnectionPool<F: ManagerFactory> {
    factory: F,
    config: Arc<Config>,
    registry: Mutex<HashMap<EndpointKey, Arc<EndpointPool<F::Manager>>>>,
}

impl<F: ManagerFactory> std::fmt::Debug for ConnectionPool<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let endpoints = self.registry.lock().len();
        f.debug_struct("ConnectionPool")
            .field("endpoints", &endpoints)
            .finish()
    }
}

impl<F: ManagerFactory> ConnectionPool<F> {
    /// Creates a pool with the given manager factory and configuration.
    /// No connections are opened; endpoint pools are created lazily.
    pub fn new(factory: F, config: Config) -> Self {
        ConnectionPool {
            factory,
            config: Arc::new(config),
            registry: Mutex::new(HashMap::new()),
        }
    }

    /// An idempotent lifecycle hook. Does not open any connections; a
    /// pool is just as usable without ever calling this.
    pub fn start(&self) {
        info!("connection pool starting");
    }

    /// Resolves the endpoint for `(host, port)`, creating its
    /// [`EndpointPool`] on first use, and blocks up to `timeout` for a
    /// connection.
    pub fn checkout(
        &self,
        host: &str,
        port: PortDescriptor,
        timeout: Duration,
    ) -> Result<PooledConnection<<F::Manager as ManageConnection>::Connection>> {
        let endpoint = self.endpoint_for(host, port);
        endpoint.checkout(timeout)
    }

    /// Routes `conn` back to the endpoint pool matching its remote
    /// identity and checks it in.
    ///
    /// Fails with [`Error::InvalidArgument`] if no endpoint pool has ever
    /// been created for that identity.
    pub fn checkin(
        &self,
        conn: PooledConnection<<F::Manager as ManageConnection>::Connection>,
    ) -> Result<()> {
        let endpoint = self.existing_endpoint_for(conn.remote_host(), conn.remote_port())?;
        endpoint.checkin(conn);
        Ok(())
    }

    /// Routes `conn` back to the endpoint pool matching its remote
    /// identity and destroys it.
    ///
    /// Fails with [`Error::InvalidArgument`] if no endpoint pool has ever
    /// been created for that identity, or if the endpoint pool rejects
    /// `conn` as not currently checked out.
    pub fn destroy(
        &self,
        conn: PooledConnection<<F::Manager as ManageConnection>::Connection>,
    ) -> Result<()> {
        let endpoint = self.existing_endpoint_for(conn.remote_host(), conn.remote_port())?;
        endpoint.destroy(conn)
    }

    /// Invokes `cleanup` on every endpoint pool this `ConnectionPool` has
    /// ever created. Behavior of a subsequent `checkout` is unspecified:
    /// the registry entry is not removed, so it will simply build a
    /// fresh `EndpointPool` for that key.
    pub fn shutdown(&self) {
        let endpoints: Vec<_> = {
            let registry = self.registry.lock();
            registry.values().cloned().collect()
        };
        info!(count = endpoints.len(), "shutting down connection pool");
        for endpoint in endpoints {
            endpoint.cleanup();
        }
    }

    /// A snapshot of the named endpoint's live counters, if a pool has
    /// been created for it.
    pub fn endpoint_state(&self, host: &str, port: PortDescriptor) -> Option<PoolState> {
        let registry = self.registry.lock();
        registry.get(&Self::key(host, port)).map(|p| p.state())
    }

    fn key(host: &str, port: PortDescriptor) -> EndpointKey {
        (Arc::from(host), port)
    }

    fn endpoint_for(&self, host: &str, port: PortDescriptor) -> Arc<EndpointPool<F::Manager>> {
        let key = Self::key(host, port);
        let mut registry = self.registry.lock();
        registry
            .entry(key)
            .or_insert_with(|| {
                debug!(host, port = %port, "creating endpoint pool");
                let manager = self.factory.make(host, port, self.config.clone());
                Arc::new(EndpointPool::new(
                    Arc::from(host),
                    port,
                    self.config.clone(),
                    manager,
                ))
            })
            .clone()
    }

    fn existing_endpoint_for(
        &self,
        host: &str,
        port: PortDescriptor,
    ) -> Result<Arc<EndpointPool<F::Manager>>> {
        let registry = self.registry.lock();
        registry
            .get(&Self::key(host, port))
            .cloned()
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "no endpoint pool registered for {host}:{port}"
                ))
            })
    }
}

impl ConnectionPool<crate::connection::TcpManagerFactory> {
    /// Creates a pool that hands out plain TCP connections, using the
    /// default [`TcpManagerFactory`](crate::connection::TcpManagerFactory).
    pub fn tcp(config: Config) -> Self {
        ConnectionPool::new(crate::connection::TcpManagerFactory, config)
    }
}
