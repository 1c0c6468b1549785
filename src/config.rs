//! File-based service configuration.
//!
//! ```toml
//! route = "/rpc"
//! socket = "/run/rpc.sock"
//! socket_mode = 0o660
//! behind_reverse_proxy = true
//! auth_file = "/etc/rpc/users"
//!
//! [headers]
//! Server = "rpc"
//! ```
//!
//! Methods and hooks are code, so they are added to the builder returned by
//! [`ServiceConfig::into_builder`].

use crate::{error::ConfigError, ServiceBuilder};
use http::{HeaderName, HeaderValue};
use serde::Deserialize;
use std::{collections::BTreeMap, net::SocketAddr, path::Path, path::PathBuf};

/// Largest valid value of `socket_mode`.
const MAX_SOCKET_MODE: u32 = 0o7777;

/// Service settings as read from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// HTTP route. Defaults to `/`.
    pub route: String,
    /// Unix socket path.
    pub socket: Option<PathBuf>,
    /// Unix socket permission bits.
    pub socket_mode: Option<u32>,
    /// TCP listen address for TLS.
    pub address: Option<SocketAddr>,
    /// PEM certificate chain for TLS.
    pub cert: Option<PathBuf>,
    /// PEM private key for TLS.
    pub key: Option<PathBuf>,
    /// Take client addresses from reverse proxy headers.
    pub behind_reverse_proxy: bool,
    /// Send every call to the proxy handler.
    pub proxy: bool,
    /// Static response headers.
    pub headers: BTreeMap<String, String>,
    /// Authorization file. Enables authorization when set.
    pub auth_file: Option<PathBuf>,
}

impl ServiceConfig {
    /// Read, parse and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate a config.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the settings are consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match (&self.socket, &self.address) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Validation(
                    "only one of socket and address may be set",
                ))
            }
            (None, None) => {
                return Err(ConfigError::Validation("one of socket and address must be set"))
            }
            _ => {}
        }

        if self.address.is_some() && (self.cert.is_none() || self.key.is_none()) {
            return Err(ConfigError::Validation("address requires cert and key"));
        }
        if self.address.is_none() && (self.cert.is_some() || self.key.is_some()) {
            return Err(ConfigError::Validation("cert and key require address"));
        }
        if let Some(mode) = self.socket_mode {
            if self.socket.is_none() {
                return Err(ConfigError::Validation("socket_mode requires socket"));
            }
            if mode > MAX_SOCKET_MODE {
                return Err(ConfigError::Validation("socket_mode must be at most 0o7777"));
            }
        }

        self.header_pairs().map(drop)
    }

    fn header_pairs(&self) -> Result<Vec<(HeaderName, HeaderValue)>, ConfigError> {
        self.headers
            .iter()
            .map(|(name, value)| {
                let invalid = || ConfigError::InvalidHeader { name: name.clone() };
                Ok((
                    HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?,
                    HeaderValue::from_str(value).map_err(|_| invalid())?,
                ))
            })
            .collect()
    }

    /// Validate, then create a builder with these settings. Reads the
    /// authorization file, if any.
    pub fn into_builder(self) -> Result<ServiceBuilder, ConfigError> {
        self.validate()?;

        let mut builder = if self.proxy {
            ServiceBuilder::proxy()
        } else {
            ServiceBuilder::new()
        };
        builder = builder
            .route(&self.route)
            .behind_reverse_proxy(self.behind_reverse_proxy);

        for (name, value) in self.header_pairs()? {
            builder = builder.header(name, value);
        }

        if let Some(socket) = self.socket {
            builder = builder.unix_socket(socket);
            if let Some(mode) = self.socket_mode {
                builder = builder.unix_socket_mode(mode);
            }
        }
        if let (Some(address), Some(cert), Some(key)) = (self.address, self.cert, self.key) {
            builder = builder.tcp_tls(address, cert, key);
        }
        if let Some(auth_file) = self.auth_file {
            builder = builder.authorization_from_file(auth_file)?;
        }

        Ok(builder)
    }
}
