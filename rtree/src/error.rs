use thiserror::Error;

#[derive(Debug, Error)]
pub enum RTreeError {
    /// Node slot bookkeeping overflowed. Only ever raised through a panic.
    #[error("node capacity exceeded (capacity: {capacity})")]
    CapacityExceeded { capacity: usize },

    #[error("invalid shape: {reason}")]
    InvalidShape { reason: String },

    #[error("node handle is stale (index: {index}, generation: {generation}, current: {current})")]
    StaleIndex {
        index: u32,
        generation: u64,
        current: u64,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid snapshot: {reason}")]
    InvalidSnapshot { reason: String },
}

pub type RTreeResult<T> = Result<T, RTreeError>;

impl RTreeError {
    pub(crate) fn invalid_shape(reason: impl Into<String>) -> Self {
        RTreeError::InvalidShape {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_snapshot(reason: impl Into<String>) -> Self {
        RTreeError::InvalidSnapshot {
            reason: reason.into(),
        }
    }
}
