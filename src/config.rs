use std::time::Duration;

/// Immutable configuration shared by every [`EndpointPool`](crate::EndpointPool)
/// a [`ConnectionPool`](crate::ConnectionPool) creates.
///
/// Built with [`Builder`], which mirrors the validate-on-set style of a
/// typical pool builder: each setter asserts its invariant immediately
/// rather than deferring validation to construction time.
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) max_connections_per_host: usize,
    pub(crate) read_buffer_size_bytes: usize,
    pub(crate) write_buffer_size_bytes: usize,
    pub(crate) read_timeout: Duration,
}

impl Config {
    /// Returns a [`Builder`] seeded with the default configuration.
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// The cap on live connections per endpoint, and the capacity of both
    /// the available and active tracking structures.
    pub fn max_connections_per_host(&self) -> usize {
        self.max_connections_per_host
    }

    /// The receive-buffer size passed to each new connection.
    pub fn read_buffer_size_bytes(&self) -> usize {
        self.read_buffer_size_bytes
    }

    /// The send-buffer size passed to each new connection.
    pub fn write_buffer_size_bytes(&self) -> usize {
        self.write_buffer_size_bytes
    }

    /// The per-connection socket read timeout.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

impl Default for Config {
    fn default() -> Self {
        Builder::new().build()
    }
}

/// A builder for [`Config`].
#[derive(Debug, Clone)]
pub struct Builder {
    max_connections_per_host: usize,
    read_buffer_size_bytes: usize,
    write_buffer_size_bytes: usize,
    read_timeout: Duration,
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            max_connections_per_host: 10,
            read_buffer_size_bytes: 64 * 1024,
            write_buffer_size_bytes: 64 * 1024,
            read_timeout: Duration::from_secs(30),
        }
    }
}

impl Builder {
    /// Constructs a new `Builder`, seeded with default values.
    pub fn new() -> Builder {
        Default::default()
    }

    /// Sets the maximum number of connections any single endpoint's pool
    /// may hold live at once.
    ///
    /// Defaults to 10.
    pub fn max_connections_per_host(mut self, max: usize) -> Builder {
        assert!(max > 0, "max_connections_per_host must be greater than zero");
        self.max_connections_per_host = max;
        self
    }

    /// Sets the receive-buffer size given to each new connection.
    ///
    /// Defaults to 64 KiB.
    pub fn read_buffer_size_bytes(mut self, size: usize) -> Builder {
        assert!(size > 0, "read_buffer_size_bytes must be greater than zero");
        self.read_buffer_size_bytes = size;
        self
    }

    /// Sets the send-buffer size given to each new connection.
    ///
    /// Defaults to 64 KiB.
    pub fn write_buffer_size_bytes(mut self, size: usize) -> Builder {
        assert!(size > 0, "write_buffer_size_bytes must be greater than zero");
        self.write_buffer_size_bytes = size;
        self
    }

    /// Sets the per-connection socket read timeout.
    ///
    /// Defaults to 30 seconds.
    pub fn read_timeout(mut self, timeout: Duration) -> Builder {
        assert!(
            timeout > Duration::from_secs(0),
            "read_timeout must be non-zero"
        );
        self.read_timeout = timeout;
        self
    }

    /// Consumes the builder, returning the finished [`Config`].
    pub fn build(self) -> Config {
        Config {
            max_connections_per_host: self.max_connections_per_host,
            read_buffer_size_bytes: self.read_buffer_size_bytes,
            write_buffer_size_bytes: self.write_buffer_size_bytes,
            read_timeout: self.read_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.max_connections_per_host(), 10);
        assert_eq!(config.read_buffer_size_bytes(), 64 * 1024);
        assert_eq!(config.write_buffer_size_bytes(), 64 * 1024);
        assert_eq!(config.read_timeout(), Duration::from_secs(30));
    }

    #[test]
    #[should_panic(expected = "max_connections_per_host must be greater than zero")]
    fn rejects_zero_max_connections() {
        Config::builder().max_connections_per_host(0);
    }

    #[test]
    fn builder_overrides_apply() {
        let config = Config::builder()
            .max_connections_per_host(4)
            .read_timeout(Duration::from_millis(500))
            .build();
        assert_eq!(config.max_connections_per_host(), 4);
        assert_eq!(config.read_timeout(), Duration::from_millis(500));
    }
}
