//! A generic, blocking, multi-host connection pool.
//!
//! Opening a new connection every time one is needed is both inefficient
//! and can lead to resource exhaustion under load. This crate maintains
//! one bounded pool of live connections *per remote endpoint*, handing
//! them out for repeated use and bounding how many any single endpoint
//! may have open at once.
//!
//! This pool is intentionally synchronous: `checkout` blocks the calling
//! thread up to a caller-supplied timeout rather than returning a
//! future. It is agnostic to the connection type it manages —
//! implementors of [`ManageConnection`] provide the endpoint-specific
//! logic to create one, and [`ManagerFactory`] builds a manager per
//! endpoint the first time that endpoint is requested.
//!
//! # Example
//!
//! ```no_run
//! use hostpool::{Config, ConnectionPool, PortDescriptor};
//! use std::time::Duration;
//!
//! let pool = ConnectionPool::tcp(Config::builder().max_connections_per_host(8).build());
//!
//! let conn = pool
//!     .checkout("localhost", PortDescriptor::plaintext(11211), Duration::from_secs(1))
//!     .unwrap();
//! // ... use the connection ...
//! pool.checkin(conn).unwrap();
//!
//! pool.shutdown();
//! ```
#![deny(missing_debug_implementations)]

mod config;
mod connection;
mod endpoint;
mod error;
mod pool;
mod port;
mod queue;

pub use config::{Builder as ConfigBuilder, Config};
pub use connection::{
    Connection, ManageConnection, ManagerFactory, TcpConnection, TcpConnectionManager,
    TcpManagerFactory,
};
pub use endpoint::{EndpointPool, PoolState, PooledConnection};
pub use error::{Error, Result};
pub use pool::ConnectionPool;
pub use port::{PortDescriptor, Security};
