//! Test doubles and common utilities for reconciliation contract tests
//!
//! The doubles record every gateway call in order so tests can assert on
//! call counts and sequencing without a real cloud provider.

use sgsync_core::config::SyncConfig;
use sgsync_core::error::Result;
use sgsync_core::traits::{
    AuthorizeOutcome, DottedQuad, GroupGateway, IngressRule, IpSource, RevokeOutcome,
    SecurityGroup, StateStore,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// A recorded gateway call, in invocation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Describe {
        names: Vec<String>,
        filter_cidr: Option<String>,
    },
    Revoke {
        group_id: String,
        cidr: String,
        port: u16,
    },
    Authorize {
        group_id: String,
        cidr: String,
        port: u16,
    },
}

impl GatewayCall {
    pub fn is_revoke(&self) -> bool {
        matches!(self, GatewayCall::Revoke { .. })
    }

    pub fn is_authorize(&self) -> bool {
        matches!(self, GatewayCall::Authorize { .. })
    }

    pub fn is_mutation(&self) -> bool {
        self.is_revoke() || self.is_authorize()
    }
}

/// A gateway whose describe responses are scripted and whose calls are recorded
///
/// `groups` defines which configured names exist on the provider side;
/// `old_rule_holders` defines which of them come back from a filtered
/// describe (i.e. still carry the stale rule).
pub struct ScriptedGateway {
    groups: Vec<SecurityGroup>,
    old_rule_holders: Vec<String>,
    authorize_outcome: AuthorizeOutcome,
    calls: Arc<Mutex<Vec<GatewayCall>>>,
}

impl ScriptedGateway {
    /// Create a gateway knowing the given (name, id) groups
    pub fn new(groups: &[(&str, &str)]) -> Self {
        Self {
            groups: groups
                .iter()
                .map(|(name, id)| SecurityGroup {
                    name: name.to_string(),
                    id: id.to_string(),
                })
                .collect(),
            old_rule_holders: Vec::new(),
            authorize_outcome: AuthorizeOutcome::Created,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Mark which group names still carry the stale rule
    pub fn with_old_rule_on(mut self, names: &[&str]) -> Self {
        self.old_rule_holders = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Script the outcome of authorize calls
    pub fn with_authorize_outcome(mut self, outcome: AuthorizeOutcome) -> Self {
        self.authorize_outcome = outcome;
        self
    }

    /// Recorded calls, in order
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Create a gateway that shares the recorder with an existing one
    ///
    /// The engine takes its gateway by value; tests keep the original to
    /// inspect calls afterwards.
    pub fn sharing_recorder_with(other: &Self) -> Self {
        Self {
            groups: other.groups.clone(),
            old_rule_holders: other.old_rule_holders.clone(),
            authorize_outcome: other.authorize_outcome,
            calls: Arc::clone(&other.calls),
        }
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl GroupGateway for ScriptedGateway {
    async fn describe_groups(
        &self,
        names: &[String],
        filter: Option<&IngressRule>,
    ) -> Result<Vec<SecurityGroup>> {
        self.record(GatewayCall::Describe {
            names: names.to_vec(),
            filter_cidr: filter.map(|r| r.cidr.clone()),
        });

        let result = self
            .groups
            .iter()
            .filter(|g| names.contains(&g.name))
            .filter(|g| match filter {
                Some(_) => self.old_rule_holders.contains(&g.name),
                None => true,
            })
            .cloned()
            .collect();

        Ok(result)
    }

    async fn revoke_ingress(&self, group_id: &str, rule: &IngressRule) -> Result<RevokeOutcome> {
        self.record(GatewayCall::Revoke {
            group_id: group_id.to_string(),
            cidr: rule.cidr.clone(),
            port: rule.port,
        });
        Ok(RevokeOutcome::Revoked)
    }

    async fn authorize_ingress(
        &self,
        group_id: &str,
        rule: &IngressRule,
    ) -> Result<AuthorizeOutcome> {
        self.record(GatewayCall::Authorize {
            group_id: group_id.to_string(),
            cidr: rule.cidr.clone(),
            port: rule.port,
        });
        Ok(self.authorize_outcome)
    }

    fn gateway_name(&self) -> &'static str {
        "scripted"
    }
}

/// An IP source returning a fixed address
pub struct StaticIpSource {
    quad: DottedQuad,
}

impl StaticIpSource {
    pub fn new(ip: &str) -> Self {
        Self {
            quad: DottedQuad::parse(ip).expect("test IP must be a dotted quad"),
        }
    }
}

#[async_trait::async_trait]
impl IpSource for StaticIpSource {
    async fn current(&self) -> Result<DottedQuad> {
        Ok(self.quad.clone())
    }
}

/// A state store that reads fine but fails every write
pub struct WriteFailingStateStore {
    last: Option<String>,
}

impl WriteFailingStateStore {
    pub fn new(last: Option<&str>) -> Self {
        Self {
            last: last.map(|s| s.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl StateStore for WriteFailingStateStore {
    async fn get_last_cidr(&self) -> Result<Option<String>> {
        Ok(self.last.clone())
    }

    async fn set_last_cidr(&self, _cidr: &str) -> Result<()> {
        Err(sgsync_core::Error::storage("disk full"))
    }
}

/// Minimal valid config for the given groups
pub fn test_config(groups: &[&str]) -> SyncConfig {
    SyncConfig::new(
        groups.iter().map(|g| g.to_string()).collect(),
        PathBuf::from("/tmp/sgsync-test-lastip"),
    )
}

/// Drain all events buffered on the receiver
///
/// The engine emits with `try_send` during `run()`, so by the time `run()`
/// has returned every event is already in the channel.
pub fn drain_events(
    rx: &mut mpsc::Receiver<sgsync_core::EngineEvent>,
) -> Vec<sgsync_core::EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
