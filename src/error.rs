//! Error types returned by the collective algorithms in this crate.

use thiserror::Error;

/// The error conditions a reduce-scatter-block call can report.
///
/// These map onto the small taxonomy a collective communication core
/// needs: resource exhaustion, a rejected datatype construction, a failed
/// transport operation, and an operator that reported failure. There is
/// no `Success` variant; success is `Ok(())`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Allocating a scratch buffer or datatype handle failed.
    #[error("out of resource: {0}")]
    OutOfResource(String),

    /// An indexed/pattern view was rejected by the datatype engine.
    #[error("datatype error: {0}")]
    Datatype(String),

    /// A send, receive, or wait on the transport failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The operator reported failure while reducing two buffers.
    #[error("operator error: {0}")]
    Operator(String),
}

/// A specialized `Result` type for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, Error>;
