use crate::auth::AuthConfigError;
use std::path::PathBuf;

/// Errors loading a [`ServiceConfig`].
///
/// [`ServiceConfig`]: crate::ServiceConfig
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// The config file is not valid TOML for a service.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A header name or value is not valid HTTP.
    #[error("invalid header {name:?}")]
    InvalidHeader {
        /// The offending header name.
        name: String,
    },
    /// The config is well-formed but inconsistent.
    #[error("invalid config: {0}")]
    Validation(&'static str),
    /// The authorization file could not be loaded.
    #[error(transparent)]
    Auth(#[from] AuthConfigError),
}

/// Errors starting a listener.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// Neither a unix socket nor a TLS listener is configured.
    #[error("no transport configured")]
    NoTransport,
    /// Both a unix socket and a TLS listener are configured.
    #[error("only one of unix socket and TLS listener may be configured")]
    BothTransports,
    /// A TLS certificate or key file does not exist.
    #[error("missing file: {}", .0.display())]
    MissingFile(PathBuf),
    /// The TLS listener was requested, but the `tls` feature is disabled.
    #[error("TLS support is not enabled")]
    TlsDisabled,
    /// Binding, serving or preparing the socket failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
