//! Minimal embedding example for sgsync-core
//!
//! Demonstrates using the engine as a library: custom trait implementations
//! wired in from application code, console output opted out by dropping the
//! event receiver, and the typed outcome inspected instead.

use sgsync_core::traits::{
    AuthorizeOutcome, DottedQuad, GroupGateway, IngressRule, IpSource, RevokeOutcome,
    SecurityGroup,
};
use sgsync_core::{MemoryStateStore, Result, SyncConfig, SyncEngine, SyncOutcome};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// IP source with a fixed answer, standing in for a real lookup
struct FixedIpSource {
    ip: &'static str,
}

#[async_trait::async_trait]
impl IpSource for FixedIpSource {
    async fn current(&self) -> Result<DottedQuad> {
        DottedQuad::parse(self.ip)
    }
}

/// An in-process "provider": group rules held in a map
struct InProcessGateway {
    rules: Mutex<HashMap<String, Vec<IngressRule>>>,
}

impl InProcessGateway {
    fn new(group_names: &[&str]) -> Self {
        Self {
            rules: Mutex::new(
                group_names
                    .iter()
                    .map(|name| (name.to_string(), Vec::new()))
                    .collect(),
            ),
        }
    }
}

#[async_trait::async_trait]
impl GroupGateway for InProcessGateway {
    async fn describe_groups(
        &self,
        names: &[String],
        filter: Option<&IngressRule>,
    ) -> Result<Vec<SecurityGroup>> {
        let rules = self.rules.lock().unwrap();
        Ok(names
            .iter()
            .filter_map(|name| {
                let group_rules = rules.get(name)?;
                if let Some(wanted) = filter {
                    if !group_rules.contains(wanted) {
                        return None;
                    }
                }
                Some(SecurityGroup {
                    name: name.clone(),
                    id: format!("local-{}", name),
                })
            })
            .collect())
    }

    async fn revoke_ingress(&self, group_id: &str, rule: &IngressRule) -> Result<RevokeOutcome> {
        let name = group_id.trim_start_matches("local-");
        let mut rules = self.rules.lock().unwrap();
        if let Some(group_rules) = rules.get_mut(name) {
            if let Some(pos) = group_rules.iter().position(|r| r == rule) {
                group_rules.remove(pos);
                return Ok(RevokeOutcome::Revoked);
            }
        }
        Ok(RevokeOutcome::NoMatchingRule)
    }

    async fn authorize_ingress(
        &self,
        group_id: &str,
        rule: &IngressRule,
    ) -> Result<AuthorizeOutcome> {
        let name = group_id.trim_start_matches("local-");
        let mut rules = self.rules.lock().unwrap();
        let group_rules = rules.get_mut(name).expect("known group");
        if group_rules.contains(rule) {
            return Ok(AuthorizeOutcome::AlreadyExists);
        }
        group_rules.push(rule.clone());
        Ok(AuthorizeOutcome::Created)
    }

    fn gateway_name(&self) -> &'static str {
        "in-process"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = SyncConfig::new(
        vec!["web-sg".to_string()],
        PathBuf::from("/tmp/sgsync-demo-lastip"),
    );

    let (engine, events) = SyncEngine::new(
        Box::new(FixedIpSource { ip: "203.0.113.5" }),
        Box::new(InProcessGateway::new(&["web-sg"])),
        Box::new(MemoryStateStore::new()),
        config,
    )?;

    // Embedded callers opt out of console output by dropping the receiver;
    // the typed outcome carries everything worth knowing.
    drop(events);

    match engine.run().await? {
        SyncOutcome::NoChange { cidr } => {
            println!("already up to date at {}", cidr);
        }
        SyncOutcome::Updated {
            previous_cidr,
            new_cidr,
            groups,
        } => {
            println!(
                "moved {} group(s) from {:?} to {}",
                groups.len(),
                previous_cidr,
                new_cidr
            );
        }
    }

    Ok(())
}
