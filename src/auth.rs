//! Basic-authentication and network authorization.
//!
//! An [`AuthTable`] maps usernames to a secret and a list of networks the
//! user may connect from. A service without a table lets every request
//! through. A service with a table denies by default.
//!
//! Tables can be built programmatically or loaded from text, one entry per
//! line:
//!
//! ```text
//! # username:secret:network[,network...]
//! alice:plaintext-secret:127.0.0.1/32
//! bob:$2b$10$...:10.0.0.0/8, 192.168.0.0/16
//! ```
//!
//! Secrets with a bcrypt marker (`$2a$`, `$2b$` or `$2y$`) are verified with
//! bcrypt. All other secrets are compared as plaintext.

use base64::{engine::general_purpose::STANDARD, Engine};
use http::{header::AUTHORIZATION, HeaderMap};
use ipnet::IpNet;
use std::{collections::HashMap, fmt, net::IpAddr, path::Path};
use tracing::debug;

/// Reasons a request is denied by the authorization gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The request carries no usable Basic credentials.
    #[error("missing basic credentials")]
    MissingCredentials,
    /// The username is not in the table.
    #[error("unknown user")]
    UnknownUser,
    /// The client address could not be resolved.
    #[error("client address unavailable")]
    NoClientAddress,
    /// The client address is outside every network of the user.
    #[error("client address not permitted")]
    NetworkDenied,
    /// The secret does not match.
    #[error("invalid secret")]
    InvalidSecret,
}

/// Errors building authorization entries.
#[derive(Debug, thiserror::Error)]
pub enum AuthConfigError {
    /// The username is empty.
    #[error("username must not be empty")]
    EmptyUsername,
    /// The secret is empty.
    #[error("secret must not be empty")]
    EmptySecret,
    /// The username or secret contains a `:`.
    #[error("username and secret must not contain ':'")]
    Separator,
    /// No networks were given.
    #[error("at least one network is required")]
    NoNetworks,
    /// A network is not valid CIDR notation.
    #[error("invalid network {network:?}: {source}")]
    InvalidNetwork {
        /// The offending network.
        network: String,
        /// The parse error.
        source: ipnet::AddrParseError,
    },
    /// A line does not have the `username:secret:networks` shape.
    #[error("expected username:secret:network[,network...]")]
    Malformed,
    /// A line of an authorization file is invalid.
    #[error("line {line}: {source}")]
    Line {
        /// 1-based line number.
        line: usize,
        /// The error on that line.
        source: Box<AuthConfigError>,
    },
    /// The authorization file could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A single authorization entry.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthEntry {
    username: String,
    secret: String,
    networks: Vec<IpNet>,
}

impl fmt::Debug for AuthEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthEntry")
            .field("username", &self.username)
            .field("networks", &self.networks)
            .finish_non_exhaustive()
    }
}

impl AuthEntry {
    /// Create a new entry.
    ///
    /// The username and secret must be non-empty and free of `:`. At least
    /// one network is required, and every network must be valid CIDR.
    pub fn new<I, N>(
        username: impl Into<String>,
        secret: impl Into<String>,
        networks: I,
    ) -> Result<Self, AuthConfigError>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        let username = username.into();
        let secret = secret.into();

        if username.is_empty() {
            return Err(AuthConfigError::EmptyUsername);
        }
        if secret.is_empty() {
            return Err(AuthConfigError::EmptySecret);
        }
        if username.contains(':') || secret.contains(':') {
            return Err(AuthConfigError::Separator);
        }

        let networks = networks
            .into_iter()
            .map(|network| {
                let network = network.as_ref().trim();
                network
                    .parse::<IpNet>()
                    .map(|net| net.trunc())
                    .map_err(|source| AuthConfigError::InvalidNetwork {
                        network: network.to_owned(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if networks.is_empty() {
            return Err(AuthConfigError::NoNetworks);
        }

        Ok(Self {
            username,
            secret,
            networks,
        })
    }

    /// Parse a `username:secret:network[,network...]` line.
    pub fn parse_line(line: &str) -> Result<Self, AuthConfigError> {
        let mut parts = line.trim().splitn(3, ':');
        let (Some(username), Some(secret), Some(networks)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthConfigError::Malformed);
        };

        let networks = networks
            .split(',')
            .map(str::trim)
            .filter(|network| !network.is_empty());
        Self::new(username, secret, networks)
    }

    /// The username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The networks the user may connect from.
    pub fn networks(&self) -> &[IpNet] {
        &self.networks
    }

    /// True if `ip` is inside one of the entry's networks.
    ///
    /// IPv4-mapped IPv6 addresses are matched as their IPv4 form.
    pub fn permits(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        self.networks.iter().any(|net| net.contains(&ip))
    }

    /// Check a provided secret against the stored one.
    pub fn verify_secret(&self, provided: &str) -> bool {
        verify_secret(&self.secret, provided)
    }
}

/// Compare a provided secret with a stored plaintext or bcrypt secret.
///
/// `$2y$` hashes are rewritten to the `$2a$` marker before verification.
/// Both name the same algorithm.
pub(crate) fn verify_secret(stored: &str, provided: &str) -> bool {
    if let Some(rest) = stored.strip_prefix("$2y$") {
        let normalized = format!("$2a${rest}");
        return bcrypt::verify(provided, &normalized).unwrap_or(false);
    }
    if stored.starts_with("$2a$") || stored.starts_with("$2b$") {
        return bcrypt::verify(provided, stored).unwrap_or(false);
    }
    stored == provided
}

/// Extract Basic credentials from the `Authorization` header.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, secret) = decoded.split_once(':')?;
    Some((username.to_owned(), secret.to_owned()))
}

/// A table of authorization entries, keyed by username.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthTable {
    entries: HashMap<String, AuthEntry>,
}

impl AuthTable {
    /// Create an empty table. An empty table denies every request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any entry with the same username.
    pub fn insert(&mut self, entry: AuthEntry) {
        self.entries.insert(entry.username.clone(), entry);
    }

    /// Look up an entry.
    pub fn get(&self, username: &str) -> Option<&AuthEntry> {
        self.entries.get(username)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse entries from text, one per line.
    ///
    /// Blank lines and lines starting with `#` are skipped. The first bad
    /// line fails the whole parse. Entries are returned in file order.
    pub fn parse(text: &str) -> Result<Vec<AuthEntry>, AuthConfigError> {
        text.lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
            .map(|(line, content)| {
                AuthEntry::parse_line(content).map_err(|source| AuthConfigError::Line {
                    line,
                    source: Box::new(source),
                })
            })
            .collect()
    }

    /// Read and parse an authorization file.
    pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<AuthEntry>, AuthConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Check a request's credentials and client address.
    pub fn check(
        &self,
        credentials: Option<(&str, &str)>,
        client_ip: Option<IpAddr>,
    ) -> Result<(), AuthError> {
        let (username, secret) = credentials.ok_or(AuthError::MissingCredentials)?;
        let entry = self.get(username).ok_or(AuthError::UnknownUser)?;
        let ip = client_ip.ok_or(AuthError::NoClientAddress)?;

        if !entry.permits(ip) {
            debug!(username, %ip, "client address outside permitted networks");
            return Err(AuthError::NetworkDenied);
        }
        if !entry.verify_secret(secret) {
            debug!(username, "secret mismatch");
            return Err(AuthError::InvalidSecret);
        }
        Ok(())
    }
}

impl Extend<AuthEntry> for AuthTable {
    fn extend<T: IntoIterator<Item = AuthEntry>>(&mut self, iter: T) {
        iter.into_iter().for_each(|entry| self.insert(entry));
    }
}

impl FromIterator<AuthEntry> for AuthTable {
    fn from_iter<T: IntoIterator<Item = AuthEntry>>(iter: T) -> Self {
        let mut table = Self::new();
        table.extend(iter);
        table
    }
}
