use crate::pokeapi::error::ApiError;
use crate::store::error::StoreError;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by the dex service layer.
#[derive(Error, Debug)]
pub enum DexError {
    #[error("upstream error")]
    Api(#[from] ApiError),
    #[error("store error")]
    Store(#[from] StoreError),
    /// A shared index rebuild failed; every caller awaiting it receives the
    /// same underlying error.
    #[error("index build failed: {0}")]
    Build(Arc<DexError>),
}

impl DexError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DexError::Api(err) if err.is_not_found())
    }
}
