//! Configuration types for the synchronizer
//!
//! Resolution order for every field is: explicit argument, then compiled-in
//! default, then a fatal configuration error. The resolved value is immutable
//! for the rest of the invocation.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default ingress port
pub const DEFAULT_PORT: u16 = 22;

/// Default IP echo service queried for the current public IP
pub const DEFAULT_LOOKUP_URL: &str = "https://api.ipify.org";

/// Storage file name under `<home>/.aws`
const STATE_FILE_NAME: &str = "lastip";

/// Ingress protocol for the managed rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
}

impl Protocol {
    /// Protocol name as the cloud CLI expects it
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "icmp" => Ok(Protocol::Icmp),
            other => Err(crate::Error::config(format!(
                "Protocol '{}' is not supported. Allowed values: tcp, udp, icmp",
                other
            ))),
        }
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol::Tcp
    }
}

/// Resolved synchronizer configuration
///
/// Constructed once per invocation and validated before use; no field is
/// mutated afterwards. The lookup URL is an explicit field here rather than a
/// process-wide default so that embedded callers can run with different
/// endpoints side by side.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Security group names to reconcile, in order
    pub groups: Vec<String>,

    /// Ingress port of the managed rule
    pub port: u16,

    /// Ingress protocol of the managed rule
    pub protocol: Protocol,

    /// File holding the last authorized CIDR
    pub storage_path: PathBuf,

    /// IP echo service URL
    pub lookup_url: String,
}

impl SyncConfig {
    /// Create a configuration with compiled-in defaults for everything but
    /// the group list and storage path
    pub fn new(groups: Vec<String>, storage_path: PathBuf) -> Self {
        Self {
            groups,
            port: DEFAULT_PORT,
            protocol: Protocol::default(),
            storage_path,
            lookup_url: DEFAULT_LOOKUP_URL.to_string(),
        }
    }

    /// Validate the configuration
    ///
    /// Each violated rule is a distinct fatal error; the first one found is
    /// returned.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.groups.is_empty() {
            return Err(crate::Error::config("No security group provided"));
        }

        if self.groups.iter().any(|g| g.trim().is_empty()) {
            return Err(crate::Error::config("Security group name cannot be empty"));
        }

        if self.port == 0 {
            return Err(crate::Error::config("No port provided"));
        }

        if self.lookup_url.is_empty() {
            return Err(crate::Error::config("No IP lookup URL provided"));
        }

        if self.storage_path.as_os_str().is_empty() {
            return Err(crate::Error::config("No storage path provided"));
        }

        Ok(())
    }
}

/// Default storage path, `<home>/.aws/lastip`
///
/// Returns `None` when the home directory cannot be determined.
pub fn default_storage_path(home: Option<PathBuf>) -> Option<PathBuf> {
    home.map(|h| h.join(".aws").join(STATE_FILE_NAME))
}
