use std::io::{self, BufReader, BufWriter, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::port::PortDescriptor;

/// The capability a pool requires from any concrete transport.
///
/// The pool treats a `Connection` as an opaque, stream-oriented channel:
/// it calls `connect`/`disconnect` to manage lifecycle and
/// `remote_host`/`remote_port` to route `checkin`/`destroy` back to the
/// owning [`EndpointPool`](crate::EndpointPool). It never calls `send` or
/// `receive` itself — those exist purely for the pool's callers.
pub trait Connection: Send + 'static {
    /// Releases the underlying transport. Idempotent: the pool never
    /// calls this twice on the same instance, but implementations may be
    /// called concurrently with `send`/`receive` racing to completion, so
    /// implementations should tolerate being called while a caller still
    /// holds a handle.
    fn disconnect(&mut self);

    /// The host this connection was established to.
    fn remote_host(&self) -> &str;

    /// The port descriptor this connection was established to.
    fn remote_port(&self) -> PortDescriptor;

    /// Writes `buf` to the transport, returning the number of bytes
    /// written. The pool never inspects or interprets this traffic.
    fn send(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Reads into `buf` from the transport, returning the number of bytes
    /// read.
    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Provides the database/endpoint-specific logic to create connections.
///
/// One `ManageConnection` instance is created per endpoint (see
/// [`ManagerFactory`]) and reused for every connection that endpoint's
/// pool ever creates, including destroy's replacement connections.
pub trait ManageConnection: Send + Sync + 'static {
    /// The connection type this manager produces.
    type Connection: Connection;
    /// The error this manager's `connect` can fail with.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Establishes a new, live connection, or fails with a transport
    /// error. The pool increments its connection count only after this
    /// returns `Ok`.
    fn connect(&self) -> Result<Self::Connection, Self::Error>;
}

/// Creates a [`ManageConnection`] bound to one endpoint.
///
/// A [`ConnectionPool`](crate::ConnectionPool) holds one `ManagerFactory`
/// and calls it once per distinct `(host, port)` pair the first time that
/// endpoint is requested.
pub trait ManagerFactory: Send + Sync + 'static {
    /// The manager type this factory produces.
    type Manager: ManageConnection;

    /// Builds a manager for the given endpoint.
    fn make(&self, host: &str, port: PortDescriptor, config: Arc<Config>) -> Self::Manager;
}

/// A plain TCP-backed [`Connection`].
///
/// Constructed disconnected; [`TcpConnection::connect`] establishes the
/// transport, applying the configured read/write buffer sizes and read
/// timeout. Not reused after `disconnect`.
pub struct TcpConnection {
    host: String,
    port: PortDescriptor,
    config: Arc<Config>,
    reader: Option<BufReader<TcpStream>>,
    writer: Option<BufWriter<TcpStream>>,
}

impl std::fmt::Debug for TcpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpConnection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl TcpConnection {
    /// Constructs a disconnected connection for the given endpoint.
    pub fn new(host: impl Into<String>, port: PortDescriptor, config: Arc<Config>) -> Self {
        TcpConnection {
            host: host.into(),
            port,
            config,
            reader: None,
            writer: None,
        }
    }

    /// Establishes the TCP transport to `host:port`.
    pub fn connect(&mut self) -> io::Result<()> {
        let stream = TcpStream::connect((self.host.as_str(), self.port.port()))?;
        stream.set_read_timeout(Some(self.config.read_timeout()))?;
        stream.set_nodelay(true)?;
        let read_half = stream.try_clone()?;

        debug!(host = %self.host, port = %self.port, "tcp connection established");

        self.reader = Some(BufReader::with_capacity(
            self.config.read_buffer_size_bytes(),
            read_half,
        ));
        self.writer = Some(BufWriter::with_capacity(
            self.config.write_buffer_size_bytes(),
            stream,
        ));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.writer.is_some()
    }
}

impl Connection for TcpConnection {
    fn disconnect(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Ok(stream) = writer.into_inner() {
                let _ = stream.shutdown(Shutdown::Both);
            }
        }
        self.reader.take();
        debug!(host = %self.host, port = %self.port, "tcp connection disconnected");
    }

    fn remote_host(&self) -> &str {
        &self.host
    }

    fn remote_port(&self) -> PortDescriptor {
        self.port
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection is closed"))?;
        let n = writer.write(buf)?;
        writer.flush()?;
        Ok(n)
    }

    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection is closed"))?;
        reader.read(buf)
    }
}

/// Produces [`TcpConnection`]s on each `connect()` call, per the
/// `ManageConnection` contract.
pub struct TcpConnectionManager {
    host: String,
    port: PortDescriptor,
    config: Arc<Config>,
}

impl std::fmt::Debug for TcpConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpConnectionManager")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl TcpConnectionManager {
    /// Builds a manager bound to one endpoint.
    pub fn new(host: impl Into<String>, port: PortDescriptor, config: Arc<Config>) -> Self {
        TcpConnectionManager {
            host: host.into(),
            port,
            config,
        }
    }
}

impl ManageConnection for TcpConnectionManager {
    type Connection = TcpConnection;
    type Error = io::Error;

    fn connect(&self) -> Result<TcpConnection, io::Error> {
        let mut conn = TcpConnection::new(self.host.clone(), self.port, self.config.clone());
        conn.connect()?;
        debug_assert!(conn.is_connected());
        Ok(conn)
    }
}

/// The default [`ManagerFactory`], producing plain [`TcpConnectionManager`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpManagerFactory;

impl ManagerFactory for TcpManagerFactory {
    type Manager = TcpConnectionManager;

    fn make(&self, host: &str, port: PortDescriptor, config: Arc<Config>) -> TcpConnectionManager {
        TcpConnectionManager::new(host, port, config)
    }
}
