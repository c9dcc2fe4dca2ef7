use std::fmt;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use hostpool::{Config, Connection, ManageConnection, ManagerFactory, PortDescriptor};

static TRACING_INIT: Once = Once::new();

/// Initializes a `tracing` subscriber for debug output, controlled by
/// `RUST_LOG` (e.g. `RUST_LOG=debug`). Safe to call from every test;
/// only the first call takes effect.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A connection that does no real I/O, for exercising pool mechanics
/// without opening sockets.
pub struct MockConnection {
    host: String,
    port: PortDescriptor,
    pub serial: usize,
}

impl MockConnection {
    pub fn serial(&self) -> usize {
        self.serial
    }
}

impl Connection for MockConnection {
    fn disconnect(&mut self) {}

    fn remote_host(&self) -> &str {
        &self.host
    }

    fn remote_port(&self) -> PortDescriptor {
        self.port
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn receive(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Ok(0)
    }
}

#[derive(Debug)]
pub struct MockConnectError;

impl fmt::Display for MockConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mock connection refused")
    }
}

impl std::error::Error for MockConnectError {}

/// A manager whose `connect` can be told to fail on a specific call
/// number (1-indexed), to exercise destroy's failed-replacement path.
pub struct MockManager {
    host: String,
    port: PortDescriptor,
    calls: AtomicUsize,
    fail_on_call: Option<usize>,
}

impl ManageConnection for MockManager {
    type Connection = MockConnection;
    type Error = MockConnectError;

    fn connect(&self) -> Result<MockConnection, MockConnectError> {
        let serial = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if Some(serial) == self.fail_on_call {
            return Err(MockConnectError);
        }
        Ok(MockConnection {
            host: self.host.clone(),
            port: self.port,
            serial,
        })
    }
}

/// Builds one [`MockManager`] per endpoint, sharing the same
/// fail-on-call configuration across every endpoint it creates.
pub struct MockFactory {
    pub fail_on_call: Option<usize>,
}

impl MockFactory {
    pub fn new() -> Self {
        MockFactory { fail_on_call: None }
    }

    pub fn failing_on_call(call: usize) -> Self {
        MockFactory {
            fail_on_call: Some(call),
        }
    }
}

impl ManagerFactory for MockFactory {
    type Manager = MockManager;

    fn make(&self, host: &str, port: PortDescriptor, _config: Arc<Config>) -> MockManager {
        MockManager {
            host: host.to_string(),
            port,
            calls: AtomicUsize::new(0),
            fail_on_call: self.fail_on_call,
        }
    }
}
