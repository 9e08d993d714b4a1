//! Error types for the vakit scheduling core.

/// Top-level error type for the prayer-time scheduling system.
#[derive(Debug, thiserror::Error)]
pub enum VakitError {
    /// Key-value store read/write/remove error.
    #[error("store error: {0}")]
    Store(String),

    /// Persisted settings load/save error.
    #[error("settings error: {0}")]
    Settings(String),

    /// Prayer-time cache serialization or bookkeeping error.
    #[error("cache error: {0}")]
    Cache(String),

    /// Astronomical calculation engine error.
    #[error("engine error: {0}")]
    Engine(String),

    /// Alert registration/cancellation error.
    #[error("alert error: {0}")]
    Alert(String),

    /// Periodic job registration or execution error.
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, VakitError>;
