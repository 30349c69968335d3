use thiserror::Error;

/// Error currency of the driver traits.
///
/// Drivers surface whatever error type they have; the library wraps it into
/// [`SqlStreamsError::DriverError`] at a single boundary (the `From` impl below).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum SqlStreamsError {
    /// A failure reported by the underlying driver (statement, cursor, cell conversion).
    #[error("Driver error: {0}")]
    DriverError(#[source] BoxError),

    /// Mapping or binding misconfiguration. Permanent, never retried.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Operation attempted against a resource in the wrong state.
    #[error("Illegal state: {0}")]
    StateError(String),

    /// A mapped type's factory rejected the values read from a row.
    #[error("Failed to instantiate {target}: {source}")]
    InstantiationError {
        target: &'static str,
        #[source]
        source: BoxError,
    },
}

impl SqlStreamsError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SqlStreamsError::ConfigError(msg.into())
    }

    pub(crate) fn state(msg: impl Into<String>) -> Self {
        SqlStreamsError::StateError(msg.into())
    }

    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigError(_))
    }

    #[must_use]
    pub fn is_state_error(&self) -> bool {
        matches!(self, Self::StateError(_))
    }

    /// Re-box this error so it can travel back through a driver trait.
    pub(crate) fn into_box(self) -> BoxError {
        Box::new(self)
    }
}

/// The wrapping boundary: driver errors become `DriverError`, except errors that are
/// already ours (e.g. raised by a leased connection wrapper), which pass through as-is.
impl From<BoxError> for SqlStreamsError {
    fn from(err: BoxError) -> Self {
        match err.downcast::<SqlStreamsError>() {
            Ok(ours) => *ours,
            Err(other) => SqlStreamsError::DriverError(other),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for SqlStreamsError {
    fn from(err: rusqlite::Error) -> Self {
        SqlStreamsError::DriverError(Box::new(err))
    }
}
