//! Core sync engine
//!
//! The SyncEngine is responsible for:
//! - Discovering the current public IP via IpSource
//! - Comparing it against the persisted state for idempotency
//! - Revoking stale ingress rules and authorizing the current one via GroupGateway
//! - Persisting state after successful reconciliation
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐        ┌──────────────┐        ┌──────────────┐
//! │ StateStore  │──old──▶│  SyncEngine  │◀──ip───│   IpSource   │
//! └─────────────┘        └──────────────┘        └──────────────┘
//!                               │
//!                 ┌─────────────┼──────────────┐
//!                 ▼             ▼              ▼
//!          revoke stale   authorize new    persist new
//!          (GroupGateway) (GroupGateway)   (StateStore)
//! ```
//!
//! One invocation performs one pass: all revokes strictly precede all
//! authorizes, and state is persisted only after every mutation has been
//! applied. There is no retry loop and no scheduling; the engine is meant to
//! be invoked by an external scheduler.

use crate::config::SyncConfig;
use crate::error::Result;
use crate::traits::{
    AuthorizeOutcome, GroupGateway, IngressRule, IpSource, RevokeOutcome, StateStore,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Capacity of the progress event channel
///
/// A single pass emits a handful of events per configured group; the bound
/// only guards against a stalled consumer.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Events emitted by the SyncEngine
///
/// These drive the human-readable progress output of the interactive tool.
/// Consuming them is optional: dropping the receiver silences all reporting
/// without affecting reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Reconciliation started
    Started {
        groups: Vec<String>,
        previous_cidr: Option<String>,
        current_cidr: String,
    },

    /// Persisted state already matches the current IP; no calls made
    NothingToDo { cidr: String },

    /// Stale rule removed from a group
    RuleRevoked { group: String, cidr: String },

    /// Group carried no rule for the old IP; nothing to revoke
    RevokeNotApplicable { group: String },

    /// Rule for the current IP authorized on a group
    RuleAuthorized {
        group: String,
        cidr: String,
        /// The provider already had the rule (duplicate rejected, tolerated)
        already_present: bool,
    },

    /// Configured name did not resolve to any security group
    GroupNotFound { group: String },

    /// New state written
    StatePersisted { cidr: String },
}

/// Per-group result of a reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReport {
    /// Configured group name
    pub name: String,
    /// Revoke result; `None` when no revoke applied (first run, or the
    /// group carried no rule for the old IP)
    pub revoked: Option<RevokeOutcome>,
    /// Authorize result; `None` when the name resolved to no group
    pub authorized: Option<AuthorizeOutcome>,
}

/// Overall result of a reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Persisted state equals the discovered IP; nothing was touched
    NoChange { cidr: String },

    /// Rules were reconciled to the discovered IP
    Updated {
        previous_cidr: Option<String>,
        new_cidr: String,
        groups: Vec<GroupReport>,
    },
}

/// One-shot sync engine
///
/// Created per invocation; [`SyncEngine::run`] performs a single
/// reconciliation pass and returns a [`SyncOutcome`]. Any error aborts the
/// remaining steps, with one exception: a configured group name the provider
/// does not know is informational, never fatal.
pub struct SyncEngine {
    /// IP source for discovering the current address
    ip_source: Box<dyn IpSource>,

    /// Gateway to the provider's security groups
    gateway: Box<dyn GroupGateway>,

    /// Store for the last authorized CIDR
    state_store: Box<dyn StateStore>,

    /// Resolved configuration
    config: SyncConfig,

    /// When set, describes run but mutations and the state write are skipped
    dry_run: bool,

    /// Event sender for progress reporting
    event_tx: mpsc::Sender<EngineEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver). The receiver yields progress
    /// events; drop it to opt out of all reporting.
    pub fn new(
        ip_source: Box<dyn IpSource>,
        gateway: Box<dyn GroupGateway>,
        state_store: Box<dyn StateStore>,
        config: SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let engine = Self {
            ip_source,
            gateway,
            state_store,
            config,
            dry_run: false,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Enable or disable dry-run mode
    ///
    /// A dry run performs the describe calls and reports what would change,
    /// but issues no revoke/authorize calls and does not persist state (a
    /// persisted-but-unapplied CIDR would make the next live run report
    /// "nothing to do" against groups that were never touched).
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Perform one reconciliation pass
    pub async fn run(&self) -> Result<SyncOutcome> {
        let previous = self.state_store.get_last_cidr().await?;
        let current_ip = self.ip_source.current().await?;
        let cidr = current_ip.to_cidr();

        info!(
            current = %cidr,
            previous = previous.as_deref().unwrap_or("none"),
            "discovered current IP"
        );

        self.emit_event(EngineEvent::Started {
            groups: self.config.groups.clone(),
            previous_cidr: previous.clone(),
            current_cidr: cidr.clone(),
        });

        if previous.as_deref() == Some(cidr.as_str()) {
            info!("persisted state already matches, nothing to do");
            self.emit_event(EngineEvent::NothingToDo { cidr: cidr.clone() });
            return Ok(SyncOutcome::NoChange { cidr });
        }

        let mut reports: Vec<GroupReport> = self
            .config
            .groups
            .iter()
            .map(|name| GroupReport {
                name: name.clone(),
                revoked: None,
                authorized: None,
            })
            .collect();

        if let Some(old_cidr) = &previous {
            self.revoke_stale_rules(old_cidr, &mut reports).await?;
        }

        self.authorize_current_rule(&cidr, &mut reports).await?;

        if self.dry_run {
            info!("dry run, state not persisted");
        } else {
            self.state_store.set_last_cidr(&cidr).await?;
            self.emit_event(EngineEvent::StatePersisted { cidr: cidr.clone() });
        }

        Ok(SyncOutcome::Updated {
            previous_cidr: previous,
            new_cidr: cidr,
            groups: reports,
        })
    }

    /// Remove the old-IP rule from every group that still carries it
    ///
    /// The describe call is filtered by the old rule triple, so only groups
    /// that actually contain the stale rule come back; the rest are reported
    /// as not applicable.
    async fn revoke_stale_rules(
        &self,
        old_cidr: &str,
        reports: &mut [GroupReport],
    ) -> Result<()> {
        let old_rule = IngressRule::new(self.config.protocol, self.config.port, old_cidr);
        let matched = self
            .gateway
            .describe_groups(&self.config.groups, Some(&old_rule))
            .await?;

        debug!(
            matched = matched.len(),
            cidr = %old_cidr,
            "groups still carrying the stale rule"
        );

        for report in reports.iter_mut() {
            match matched.iter().find(|g| g.name == report.name) {
                Some(group) => {
                    let outcome = if self.dry_run {
                        info!(group = %group.name, id = %group.id, cidr = %old_cidr, "dry run: would revoke");
                        RevokeOutcome::Revoked
                    } else {
                        self.gateway.revoke_ingress(&group.id, &old_rule).await?
                    };
                    report.revoked = Some(outcome);
                    self.emit_event(EngineEvent::RuleRevoked {
                        group: report.name.clone(),
                        cidr: old_cidr.to_string(),
                    });
                }
                None => {
                    self.emit_event(EngineEvent::RevokeNotApplicable {
                        group: report.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Authorize the current-IP rule on every configured group
    ///
    /// This pass describes unfiltered: the filtered describe of the revoke
    /// pass only returns groups that still carried the old rule, and groups
    /// without it need the new rule too. Names the provider does not resolve
    /// are reported and skipped.
    async fn authorize_current_rule(
        &self,
        cidr: &str,
        reports: &mut [GroupReport],
    ) -> Result<()> {
        let new_rule = IngressRule::new(self.config.protocol, self.config.port, cidr);
        let all = self
            .gateway
            .describe_groups(&self.config.groups, None)
            .await?;

        for report in reports.iter_mut() {
            match all.iter().find(|g| g.name == report.name) {
                Some(group) => {
                    let outcome = if self.dry_run {
                        info!(group = %group.name, id = %group.id, cidr = %cidr, "dry run: would authorize");
                        AuthorizeOutcome::Created
                    } else {
                        self.gateway.authorize_ingress(&group.id, &new_rule).await?
                    };
                    report.authorized = Some(outcome);
                    self.emit_event(EngineEvent::RuleAuthorized {
                        group: report.name.clone(),
                        cidr: cidr.to_string(),
                        already_present: outcome == AuthorizeOutcome::AlreadyExists,
                    });
                }
                None => {
                    debug!(group = %report.name, "configured name resolved to no security group");
                    self.emit_event(EngineEvent::GroupNotFound {
                        group: report.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Emit a progress event
    ///
    /// Events are best-effort: a closed channel means the caller opted out of
    /// reporting, a full channel means the consumer stalled; neither may
    /// block or fail reconciliation.
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("event receiver dropped, progress reporting disabled");
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("event channel full, dropping progress event");
            }
        }
    }
}
