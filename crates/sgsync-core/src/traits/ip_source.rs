// # IP Source Trait
//
// Defines the interface for discovering the caller's current public IP.
//
// ## Implementations
//
// - HTTP echo service: `sgsync-ip-http` crate
// - Future: router/UPnP queries, platform-specific APIs

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

/// A dotted-quad IPv4 string as accepted by the lookup validation
///
/// The shape check is deliberately lax: exactly four groups of 1 to 3 ASCII
/// digits separated by dots, with no octet-range validation. `300.1.2.3` is
/// accepted. This is the documented contract of the lookup step, which is
/// why this type wraps a string instead of `std::net::Ipv4Addr` (whose
/// parser enforces 0-255 and would tighten the contract).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DottedQuad(String);

impl DottedQuad {
    /// Validate and wrap a candidate dotted-quad string
    pub fn parse(candidate: &str) -> Result<Self, crate::Error> {
        if is_dotted_quad(candidate) {
            Ok(Self(candidate.to_string()))
        } else {
            Err(crate::Error::ip_lookup(format!(
                "'{}' is not a dotted-quad IPv4 address",
                candidate
            )))
        }
    }

    /// The bare address string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The address as a single-host CIDR block, e.g. `203.0.113.5/32`
    pub fn to_cidr(&self) -> String {
        format!("{}/32", self.0)
    }
}

impl fmt::Display for DottedQuad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DottedQuad {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Shape predicate: four groups of 1-3 digits separated by dots
fn is_dotted_quad(s: &str) -> bool {
    let mut groups = 0;
    for group in s.split('.') {
        groups += 1;
        if groups > 4 {
            return false;
        }
        if group.is_empty() || group.len() > 3 {
            return false;
        }
        if !group.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
    }
    groups == 4
}

/// Trait for IP source implementations
///
/// A source answers one question: what is the caller's public IPv4 address
/// right now. Sources perform no retries and make no decisions about what to
/// do with the answer; that is owned by the sync engine.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Discover the current public IP address
    ///
    /// # Returns
    ///
    /// - `Ok(DottedQuad)`: The current address
    /// - `Err(Error)`: If the lookup fails or the response is not a
    ///   dotted-quad string
    async fn current(&self) -> Result<DottedQuad, crate::Error>;
}
