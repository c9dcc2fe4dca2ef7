use thiserror::Error;

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error raised by the pool.
///
/// `TransportError` from the design's error taxonomy is not a distinct
/// variant here: it is whatever error type the connection's
/// [`ManageConnection`](crate::ManageConnection) implementation raises,
/// boxed into [`Error::AcquisitionTimeout`]'s chained source when it
/// surfaces through `checkout`.
#[derive(Debug, Error)]
pub enum Error {
    /// `checkout` could not obtain a connection within the caller's
    /// deadline. Raised either because every slot was saturated and no
    /// connection was returned in time, or because creating a new
    /// connection failed (in which case the transport error is chained
    /// as `source`).
    #[error("timed out acquiring a connection to {host}:{port}")]
    AcquisitionTimeout {
        /// The endpoint that was being acquired.
        host: String,
        /// The endpoint's port descriptor.
        port: crate::PortDescriptor,
        /// The transport error that caused creation to fail, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },

    /// `checkin`/`destroy` was called with a connection that does not
    /// belong to the resolved endpoint, or `destroy` was called on a
    /// connection that is not currently checked out.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The blocking wait underlying a `checkout` call was cancelled by
    /// the runtime before it could resolve.
    ///
    /// This crate has no internal way to raise this variant: `parking_lot`
    /// locks never poison and plain `std::thread`s have no forcible
    /// interruption primitive. It exists so a caller running `checkout`
    /// under their own cancellable executor has somewhere to put that
    /// outcome without inventing a parallel error type.
    #[error("the blocking wait was interrupted")]
    Interrupted,
}

impl Error {
    pub(crate) fn acquisition_timeout(
        host: impl Into<String>,
        port: crate::PortDescriptor,
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Error {
        Error::AcquisitionTimeout {
            host: host.into(),
            port,
            source,
        }
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Error {
        Error::InvalidArgument(message.into())
    }
}
