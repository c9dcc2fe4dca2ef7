use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::connection::{Connection, ManageConnection};
use crate::error::{Error, Result};
use crate::port::PortDescriptor;
use crate::queue::BoundedQueue;

/// A snapshot of an [`EndpointPool`]'s live counters, useful for tests
/// and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolState {
    /// Live connections owned by this pool (available + active).
    pub count: usize,
    /// Connections currently sitting in the available queue.
    pub available: usize,
    /// Connections currently checked out by a caller.
    pub active: usize,
}

struct ConnState<C> {
    conn: C,
    connected: bool,
}

/// A connection handed out by [`EndpointPool::checkout`].
///
/// Cheaply `Clone`-able: the pool keeps its own clone in its active
/// tracking structure alongside the one returned to the caller, so that
/// a concurrent [`EndpointPool::cleanup`] can still disconnect a
/// connection the caller forgot to check in or destroy (it simply won't
/// be usable on the caller's next `send`/`receive`).
pub struct PooledConnection<C> {
    id: u64,
    host: Arc<str>,
    port: PortDescriptor,
    inner: Arc<Mutex<ConnState<C>>>,
}

impl<C> Clone for PooledConnection<C> {
    fn clone(&self) -> Self {
        PooledConnection {
            id: self.id,
            host: self.host.clone(),
            port: self.port,
            inner: self.inner.clone(),
        }
    }
}

impl<C: Connection> PooledConnection<C> {
    fn new(id: u64, host: Arc<str>, port: PortDescriptor, conn: C) -> Self {
        PooledConnection {
            id,
            host,
            port,
            inner: Arc::new(Mutex::new(ConnState {
                conn,
                connected: true,
            })),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// The host this connection belongs to; used by
    /// [`ConnectionPool`](crate::ConnectionPool) to route `checkin`/`destroy`.
    pub fn remote_host(&self) -> &str {
        &self.host
    }

    /// The port this connection belongs to; used by
    /// [`ConnectionPool`](crate::ConnectionPool) to route `checkin`/`destroy`.
    pub fn remote_port(&self) -> PortDescriptor {
        self.port
    }

    /// Writes `buf` to the underlying connection.
    pub fn send(&self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().conn.send(buf)
    }

    /// Reads into `buf` from the underlying connection.
    pub fn receive(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.lock().conn.receive(buf)
    }

    /// Runs `f` against the underlying connection, for transports that
    /// expose more than `send`/`receive`/identity.
    pub fn with<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&self.inner.lock().conn)
    }

    /// Runs `f` against the underlying connection with mutable access.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut self.inner.lock().conn)
    }

    /// Idempotently disconnects the underlying transport.
    pub(crate) fn mark_disconnected(&self) {
        let mut state = self.inner.lock();
        if state.connected {
            state.conn.disconnect();
            state.connected = false;
        }
    }
}

impl<C> std::fmt::Debug for PooledConnection<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.id)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

struct ConstructionState {
    count: usize,
    next_id: u64,
}

/// The per-endpoint substructure that owns connections and enforces the
/// cap. One instance exists per `(host, port)` pair, created lazily by a
/// [`ConnectionPool`](crate::ConnectionPool).
///
/// `checkout`/`checkin`/`destroy` take the shared side of a read/write
/// lifecycle lock, `cleanup` takes the exclusive side, and a dedicated
/// mutex nested inside the shared side guards connection creation and
/// the live connection count.
pub struct EndpointPool<M: ManageConnection> {
    host: Arc<str>,
    port: PortDescriptor,
    config: Arc<Config>,
    manager: M,
    lifecycle: RwLock<()>,
    construction: Mutex<ConstructionState>,
    available: BoundedQueue<PooledConnection<M::Connection>>,
    active: Mutex<HashMap<u64, PooledConnection<M::Connection>>>,
}

impl<M: ManageConnection> std::fmt::Debug for EndpointPool<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointPool")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("state", &self.state())
            .finish()
    }
}

impl<M: ManageConnection> EndpointPool<M> {
    pub(crate) fn new(host: Arc<str>, port: PortDescriptor, config: Arc<Config>, manager: M) -> Self {
        let capacity = config.max_connections_per_host();
        EndpointPool {
            host,
            port,
            config,
            manager,
            lifecycle: RwLock::new(()),
            construction: Mutex::new(ConstructionState {
                count: 0,
                next_id: 0,
            }),
            available: BoundedQueue::with_capacity(capacity),
            active: Mutex::new(HashMap::with_capacity(capacity)),
        }
    }

    fn wrap(&self, id: u64, raw: M::Connection) -> PooledConnection<M::Connection> {
        PooledConnection::new(id, self.host.clone(), self.port, raw)
    }

    fn timed_out(&self, source: Option<M::Error>) -> Error {
        Error::acquisition_timeout(
            &*self.host,
            self.port,
            source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        )
    }

    /// Blocks up to `timeout` for a connected connection to this
    /// endpoint, creating one if the cap allows it.
    ///
    /// Three steps: a fast path that waits on the available queue when
    /// either the cap is reached or a connection is already idle, a slow
    /// path that creates one new connection under the construction mutex
    /// when neither holds, and a final drain wait that picks up whatever
    /// the slow path (or a concurrent checkin) produced.
    pub fn checkout(&self, timeout: Duration) -> Result<PooledConnection<M::Connection>> {
        let _guard = self.lifecycle.read();
        let deadline = Instant::now() + timeout;

        let must_wait = {
            let constr = self.construction.lock();
            constr.count >= self.config.max_connections_per_host() || !self.available.is_empty()
        };

        if !must_wait {
            let mut constr = self.construction.lock();
            if constr.count < self.config.max_connections_per_host() {
                match self.manager.connect() {
                    Ok(raw) => {
                        let id = constr.next_id;
                        constr.next_id += 1;
                        constr.count += 1;
                        drop(constr);
                        trace!(host = %self.host, port = %self.port, id, "created connection");
                        self.available.push(self.wrap(id, raw));
                    }
                    Err(e) => {
                        drop(constr);
                        return Err(self.timed_out(Some(e)));
                    }
                }
            }
            // Otherwise another thread filled the cap between the fast-path
            // check and this one; fall through and wait like everyone else.
        }

        self.wait_and_take(deadline)
    }

    fn wait_and_take(&self, deadline: Instant) -> Result<PooledConnection<M::Connection>> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match self.available.pop_timeout(remaining) {
            Some(conn) => {
                self.active.lock().insert(conn.id(), conn.clone());
                Ok(conn)
            }
            None => Err(self.timed_out(None)),
        }
    }

    /// Returns a previously checked-out connection to the available
    /// queue. The connection must have come from this pool's `checkout`
    /// and not already have been checked in or destroyed; the pool does
    /// not validate this (its owning [`ConnectionPool`](crate::ConnectionPool)
    /// routes by remote identity before dispatching here).
    pub fn checkin(&self, conn: PooledConnection<M::Connection>) {
        let _guard = self.lifecycle.read();
        self.active.lock().remove(&conn.id());
        self.available.push(conn);
    }

    /// Removes a checked-out connection from tracking, disconnects it,
    /// and attempts to create a replacement so `count` is preserved.
    ///
    /// Fails with [`Error::InvalidArgument`] if `conn` is not currently
    /// tracked as checked out.
    pub fn destroy(&self, conn: PooledConnection<M::Connection>) -> Result<()> {
        let _guard = self.lifecycle.read();

        if self.active.lock().remove(&conn.id()).is_none() {
            return Err(Error::invalid_argument(format!(
                "connection {} to {}:{} is not checked out",
                conn.id(),
                self.host,
                self.port
            )));
        }

        conn.mark_disconnected();

        match self.manager.connect() {
            Ok(raw) => {
                let mut constr = self.construction.lock();
                let id = constr.next_id;
                constr.next_id += 1;
                drop(constr);
                self.available.push(self.wrap(id, raw));
            }
            Err(e) => {
                warn!(
                    host = %self.host,
                    port = %self.port,
                    error = %e,
                    "destroy: replacement connection failed, count decremented"
                );
                self.construction.lock().count -= 1;
            }
        }

        Ok(())
    }

    /// Disconnects every connection this pool can observe — available or
    /// still checked out — and resets its counters to zero.
    ///
    /// Serializes against every other operation on this pool: waits for
    /// any in-flight `checkout`/`checkin`/`destroy` to finish, and blocks
    /// any new one from starting until it returns.
    pub fn cleanup(&self) {
        let _guard = self.lifecycle.write();

        for conn in self.available.drain() {
            conn.mark_disconnected();
        }

        let mut active = self.active.lock();
        for (_, conn) in active.drain() {
            conn.mark_disconnected();
        }
        drop(active);

        self.construction.lock().count = 0;
        debug!(host = %self.host, port = %self.port, "endpoint pool cleaned up");
    }

    /// A snapshot of this pool's live counters.
    pub fn state(&self) -> PoolState {
        let count = self.construction.lock().count;
        PoolState {
            count,
            available: self.available.len(),
            active: self.active.lock().len(),
        }
    }
}
