use thiserror::Error;

pub mod pool;
pub mod postgres;

/// Errors surfaced by the credential store layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store is unreachable or rejected our credentials at connect
    /// time. Fatal to the startup path; never retried internally.
    #[error("failed to establish a store connection")]
    Setup(#[source] sqlx::Error),

    /// The pool has been shut down; no further sessions can be acquired.
    #[error("connection pool is closed")]
    PoolClosed,

    /// Unique-constraint violation on email: a registration lost the race
    /// at the database despite the protocol's pre-check.
    #[error("email is already registered")]
    DuplicateEmail,

    /// Any other store-level failure during an operation. The in-flight
    /// transaction has been rolled back.
    #[error("store query failed")]
    Query(#[source] sqlx::Error),
}
