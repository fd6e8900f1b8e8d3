// # AWS CLI Gateway
//
// GroupGateway implementation that shells out to the `aws` command line
// tool. Three subcommands are used:
//
// - `aws ec2 describe-security-groups --filters ... --output json`
// - `aws ec2 revoke-security-group-ingress --group-id ... --cidr ...`
// - `aws ec2 authorize-security-group-ingress --group-id ... --cidr ...`
//
// The gateway is stateless and single-shot: one subprocess per call, full
// error propagation, no retries. Credentials and region come from the `aws`
// tool's own configuration; this crate never touches them.
//
// ## Tolerated provider responses
//
// Two nonzero exits are part of the contract rather than failures:
//
// - revoking a rule that no longer exists (`InvalidPermission.NotFound`)
// - authorizing a rule that is already present (`InvalidPermission.Duplicate`)
//
// Both map to outcome values so the engine can report them; every other
// nonzero exit is fatal and carries the raw stderr as error details.
//
// Describe lookups filter by `group-name` instead of using `--group-names`:
// the filter form simply omits names that resolve to nothing, which is what
// lets reconciliation treat unknown groups as informational.

use sgsync_core::traits::{
    AuthorizeOutcome, GroupGateway, IngressRule, RevokeOutcome, SecurityGroup,
};
use sgsync_core::{Error, Result};

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Name of the external cloud CLI
const AWS_PROGRAM: &str = "aws";

/// stderr sentinel: revoke target rule does not exist
const RULE_NOT_FOUND: &str = "InvalidPermission.NotFound";

/// stderr sentinel: authorize target rule already exists
const RULE_DUPLICATE: &str = "InvalidPermission.Duplicate";

/// Gateway to EC2 security groups via the `aws` subprocess
#[derive(Debug, Clone)]
pub struct AwsCliGateway {
    program: PathBuf,
}

/// Captured result of one subprocess invocation
struct CliOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

/// Shape of `describe-security-groups --output json`
#[derive(Debug, Deserialize)]
struct DescribeResponse {
    #[serde(rename = "SecurityGroups", default)]
    security_groups: Vec<GroupRecord>,
}

#[derive(Debug, Deserialize)]
struct GroupRecord {
    #[serde(rename = "GroupName")]
    group_name: String,
    #[serde(rename = "GroupId")]
    group_id: String,
}

impl AwsCliGateway {
    /// Locate the `aws` executable on PATH and build a gateway around it
    ///
    /// The external tool is a prerequisite of this whole program; a missing
    /// executable is a fatal prerequisite error, reported at construction
    /// time rather than at the first call.
    pub fn discover() -> Result<Self> {
        let program = which::which(AWS_PROGRAM).map_err(|_| {
            Error::prerequisite(format!(
                "the '{}' command line tool was not found on PATH",
                AWS_PROGRAM
            ))
        })?;

        tracing::debug!(program = %program.display(), "located cloud CLI");
        Ok(Self { program })
    }

    /// Build a gateway around an explicit executable path
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Path of the executable this gateway invokes
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run the CLI once with the given arguments, capturing all output
    async fn invoke(&self, args: &[String]) -> Result<CliOutput> {
        tracing::debug!(program = %self.program.display(), ?args, "invoking cloud CLI");

        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                Error::command(
                    format!("failed to run {}: {}", self.program.display(), e),
                    None,
                )
            })?;

        Ok(CliOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[async_trait::async_trait]
impl GroupGateway for AwsCliGateway {
    async fn describe_groups(
        &self,
        names: &[String],
        filter: Option<&IngressRule>,
    ) -> Result<Vec<SecurityGroup>> {
        let out = self.invoke(&describe_args(names, filter)).await?;
        if !out.success {
            return Err(Error::command(
                "describe-security-groups failed",
                Some(out.stderr),
            ));
        }

        let response: DescribeResponse = serde_json::from_str(&out.stdout)?;
        Ok(response
            .security_groups
            .into_iter()
            .map(|g| SecurityGroup {
                name: g.group_name,
                id: g.group_id,
            })
            .collect())
    }

    async fn revoke_ingress(&self, group_id: &str, rule: &IngressRule) -> Result<RevokeOutcome> {
        let out = self.invoke(&revoke_args(group_id, rule)).await?;
        if out.success {
            return Ok(RevokeOutcome::Revoked);
        }
        if is_rule_not_found(&out.stderr) {
            tracing::debug!(group_id, cidr = %rule.cidr, "rule already gone, revoke skipped");
            return Ok(RevokeOutcome::NoMatchingRule);
        }
        Err(Error::command(
            format!("revoke-security-group-ingress failed for {}", group_id),
            Some(out.stderr),
        ))
    }

    async fn authorize_ingress(
        &self,
        group_id: &str,
        rule: &IngressRule,
    ) -> Result<AuthorizeOutcome> {
        let out = self.invoke(&authorize_args(group_id, rule)).await?;
        if out.success {
            return Ok(AuthorizeOutcome::Created);
        }
        if is_duplicate_rule(&out.stderr) {
            tracing::debug!(group_id, cidr = %rule.cidr, "rule already present, authorize skipped");
            return Ok(AuthorizeOutcome::AlreadyExists);
        }
        Err(Error::command(
            format!("authorize-security-group-ingress failed for {}", group_id),
            Some(out.stderr),
        ))
    }

    fn gateway_name(&self) -> &'static str {
        "aws-cli"
    }
}

/// Arguments for the describe call, optionally filtered by a rule triple
///
/// The filtered form only returns groups currently carrying a rule that
/// matches every given `ip-permission` filter.
fn describe_args(names: &[String], filter: Option<&IngressRule>) -> Vec<String> {
    let mut args: Vec<String> = [
        "ec2",
        "describe-security-groups",
        "--output",
        "json",
        "--filters",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    args.push(format!("Name=group-name,Values={}", names.join(",")));

    if let Some(rule) = filter {
        args.push(format!("Name=ip-permission.cidr,Values={}", rule.cidr));
        args.push(format!("Name=ip-permission.from-port,Values={}", rule.port));
        args.push(format!(
            "Name=ip-permission.protocol,Values={}",
            rule.protocol
        ));
    }

    args
}

/// Arguments for the revoke call
fn revoke_args(group_id: &str, rule: &IngressRule) -> Vec<String> {
    ingress_args("revoke-security-group-ingress", group_id, rule)
}

/// Arguments for the authorize call
fn authorize_args(group_id: &str, rule: &IngressRule) -> Vec<String> {
    ingress_args("authorize-security-group-ingress", group_id, rule)
}

fn ingress_args(subcommand: &str, group_id: &str, rule: &IngressRule) -> Vec<String> {
    vec![
        "ec2".to_string(),
        subcommand.to_string(),
        "--group-id".to_string(),
        group_id.to_string(),
        "--protocol".to_string(),
        rule.protocol.to_string(),
        "--port".to_string(),
        rule.port.to_string(),
        "--cidr".to_string(),
        rule.cidr.clone(),
        "--output".to_string(),
        "json".to_string(),
    ]
}

fn is_rule_not_found(stderr: &str) -> bool {
    stderr.contains(RULE_NOT_FOUND)
}

fn is_duplicate_rule(stderr: &str) -> bool {
    stderr.contains(RULE_DUPLICATE)
}
