// # Group Gateway Trait
//
// Defines the narrow interface to the cloud provider's security groups:
// describe, revoke ingress, authorize ingress. The sync engine depends only
// on these three operations, so an implementation can be swapped from a
// subprocess around the vendor CLI to a native SDK call without touching
// reconciliation logic.
//
// ## Implementations
//
// - `aws` CLI subprocess: `sgsync-gateway-awscli` crate
// - Future: native SDK client

use crate::config::Protocol;
use async_trait::async_trait;

/// A security group as the provider describes it
///
/// Groups are looked up by name and mutated by id; nothing beyond this pair
/// is cached past a single invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroup {
    /// Provider-side group name
    pub name: String,
    /// Provider-side group id, used in mutation calls
    pub id: String,
}

/// The (protocol, port, CIDR) triple of a managed ingress rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRule {
    /// Rule protocol
    pub protocol: Protocol,
    /// Rule port
    pub port: u16,
    /// Source CIDR block, e.g. `203.0.113.5/32`
    pub cidr: String,
}

impl IngressRule {
    /// Create a rule triple
    pub fn new(protocol: Protocol, port: u16, cidr: impl Into<String>) -> Self {
        Self {
            protocol,
            port,
            cidr: cidr.into(),
        }
    }
}

/// Result of a revoke call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// The rule existed and was removed
    Revoked,
    /// The provider reported no matching rule; tolerated, not an error
    NoMatchingRule,
}

/// Result of an authorize call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizeOutcome {
    /// The rule was created
    Created,
    /// The provider rejected a duplicate of an existing rule; tolerated
    AlreadyExists,
}

/// Trait for cloud security-group gateways
///
/// Implementations are stateless and single-shot: one provider interaction
/// per call, full error propagation, no retries, no caching. The engine owns
/// every decision about which calls to make.
#[async_trait]
pub trait GroupGateway: Send + Sync {
    /// Describe security groups by name
    ///
    /// With `filter` set, only groups currently containing an ingress rule
    /// matching the given triple are returned. Names that do not resolve to
    /// any group are simply absent from the result, never an error.
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<SecurityGroup>)`: The matching groups, possibly empty
    /// - `Err(Error)`: If the describe call itself fails
    async fn describe_groups(
        &self,
        names: &[String],
        filter: Option<&IngressRule>,
    ) -> Result<Vec<SecurityGroup>, crate::Error>;

    /// Remove an ingress rule from a group
    ///
    /// A provider response meaning "no such rule" maps to
    /// [`RevokeOutcome::NoMatchingRule`]; every other failure is an error.
    async fn revoke_ingress(
        &self,
        group_id: &str,
        rule: &IngressRule,
    ) -> Result<RevokeOutcome, crate::Error>;

    /// Add an ingress rule to a group
    ///
    /// The provider rejects duplicate rules without side effects; that
    /// response maps to [`AuthorizeOutcome::AlreadyExists`] so that re-issued
    /// authorizes after a stale-state crash stay harmless.
    async fn authorize_ingress(
        &self,
        group_id: &str,
        rule: &IngressRule,
    ) -> Result<AuthorizeOutcome, crate::Error>;

    /// Gateway name for logging and error messages
    fn gateway_name(&self) -> &'static str;
}
