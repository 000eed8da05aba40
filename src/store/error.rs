use thiserror::Error;

/// Errors raised by the durable document store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store could not be reached (refused, timed out, closed).
    /// The gateway absorbs these and disables itself for a backoff window.
    #[error("store unreachable: {0}")]
    Connectivity(String),
    /// Any other backend failure (schema, constraint). Propagates to callers
    /// as a configuration problem.
    #[cfg(feature = "store-sqlite")]
    #[error("store query failed")]
    Sqlx(#[source] sqlx::Error),
    #[error("stored payload decode error")]
    Decode(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, StoreError::Connectivity(_))
    }
}

#[cfg(feature = "store-sqlite")]
impl From<sqlx::Error> for StoreError {
    /// Splits driver errors into the connectivity class, which the gateway
    /// swallows, and everything else, which stays fatal.
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => StoreError::Connectivity(err.to_string()),
            sqlx::Error::Database(db) if db.message().contains("unable to open database") => {
                StoreError::Connectivity(err.to_string())
            }
            _ => StoreError::Sqlx(err),
        }
    }
}
