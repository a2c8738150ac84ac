//! Error types for the server binary.
//!
//! [`ServerAppError`] wraps every failure mode during startup and serving
//! so `main` can propagate with `?`.

/// Top-level error for the server binary.
#[derive(Debug, thiserror::Error)]
pub enum ServerAppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: cubicle_core::config::ConfigError,
    },

    /// The configured calendar is unusable.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: cubicle_core::clock::ClockError,
    },

    /// The built-in content tables failed to load.
    #[error("catalog error: {source}")]
    Catalog {
        /// The underlying catalog error.
        #[from]
        source: cubicle_core::catalog::CatalogError,
    },

    /// The narrator could not be constructed.
    #[error("narrator error: {source}")]
    Narrator {
        /// The underlying narrator error.
        #[from]
        source: cubicle_narrator::error::NarratorRuntimeError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: cubicle_api::ServerError,
    },
}
