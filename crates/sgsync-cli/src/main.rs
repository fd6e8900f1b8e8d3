// # sgsync - security-group ingress synchronizer
//
// One invocation performs one reconciliation pass:
//
// 1. Read the last authorized CIDR from the storage file
// 2. Discover the current public IP via the configured echo service
// 3. If unchanged, stop; otherwise revoke the stale rule from every
//    configured security group that still carries it
// 4. Authorize the current IP on every configured group
// 5. Persist the new CIDR
//
// There is no built-in scheduler; run this from cron or a systemd timer.
//
// ## Usage
//
// ```bash
// sgsync -g web-sg -g db-sg -p 22 -t tcp
// sgsync -g web-sg --grabber https://ifconfig.me/ip --storage /var/lib/sgsync/lastip
// sgsync -g web-sg --dry-run
// ```
//
// Credentials and region come from the `aws` tool's own configuration;
// `SGSYNC_LOG_LEVEL` (trace|debug|info|warn|error) controls diagnostics on
// stderr. Progress lines go to stdout.

use clap::Parser;
use sgsync_core::{
    EngineEvent, Error, FileStateStore, SyncConfig, SyncEngine, config,
};
use sgsync_gateway_awscli::AwsCliGateway;
use sgsync_ip_http::HttpIpSource;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the tool
///
/// - 0: Reconciliation completed (including "nothing to do")
/// - 1: Any fatal error (configuration, prerequisite, lookup, provider, storage)
#[derive(Debug, Clone, Copy)]
enum SgsyncExitCode {
    Success = 0,
    Failure = 1,
}

impl From<SgsyncExitCode> for ExitCode {
    fn from(code: SgsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Keep security-group ingress rules pointed at the current public IP
#[derive(Debug, Parser)]
#[command(name = "sgsync", version)]
struct Cli {
    /// Security group to reconcile; repeat for multiple groups
    #[arg(short = 'g', long = "group", value_name = "GROUP")]
    groups: Vec<String>,

    /// Ingress port of the managed rule (default 22)
    #[arg(short = 'p', long = "port", value_name = "PORT")]
    port: Option<String>,

    /// Ingress protocol: tcp, udp or icmp (default tcp)
    #[arg(short = 't', long = "protocol", value_name = "PROTOCOL")]
    protocol: Option<String>,

    /// IP echo service answering GET with the caller's bare IPv4 address
    #[arg(long = "grabber", value_name = "URL")]
    grabber: Option<String>,

    /// File holding the last authorized CIDR (default <home>/.aws/lastip)
    #[arg(long = "storage", value_name = "PATH")]
    storage: Option<PathBuf>,

    /// Describe and report only; change no rules, write no state
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Explicit path to the aws executable instead of consulting PATH
    #[arg(long = "aws-bin", value_name = "PATH")]
    aws_bin: Option<PathBuf>,
}

/// Merge flags over compiled-in defaults into a validated configuration
///
/// Group list, port, protocol and URL errors here are the distinct fatal
/// conditions of the configuration step; each exits 1 with its own message.
fn resolve_config(cli: &Cli) -> Result<SyncConfig, Error> {
    let storage_path = match &cli.storage {
        Some(path) => path.clone(),
        None => config::default_storage_path(dirs::home_dir()).ok_or_else(|| {
            Error::config("cannot determine home directory; pass --storage explicitly")
        })?,
    };

    let mut resolved = SyncConfig::new(cli.groups.clone(), storage_path);

    if let Some(port) = &cli.port {
        resolved.port = port
            .parse()
            .map_err(|_| Error::config("Port must be an integer"))?;
    }

    if let Some(protocol) = &cli.protocol {
        resolved.protocol = protocol.parse()?;
    }

    if let Some(grabber) = &cli.grabber {
        resolved.lookup_url = grabber.clone();
    }

    resolved.validate()?;
    Ok(resolved)
}

/// Verify the prerequisites of the external cloud CLI
///
/// The `aws` tool keeps its configuration under `<home>/.aws`; without that
/// directory every provider call would fail anyway, so the absence is
/// reported up front.
fn check_prerequisites() -> Result<(), Error> {
    let home = dirs::home_dir()
        .ok_or_else(|| Error::prerequisite("cannot determine home directory"))?;

    let aws_dir = home.join(".aws");
    if !aws_dir.is_dir() {
        return Err(Error::prerequisite(format!(
            "{} does not exist; configure the aws CLI first",
            aws_dir.display()
        )));
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Diagnostics go to stderr so progress lines own stdout.
    let log_level = match env::var("SGSYNC_LOG_LEVEL")
        .unwrap_or_default()
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("error: failed to set tracing subscriber: {}", e);
        return SgsyncExitCode::Failure.into();
    }

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return SgsyncExitCode::Failure.into();
        }
    };

    // The whole flow is sequential blocking I/O; a single-threaded runtime
    // is all it needs.
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {}", e);
            return SgsyncExitCode::Failure.into();
        }
    };

    match rt.block_on(run(&cli, config)) {
        Ok(()) => SgsyncExitCode::Success.into(),
        Err(e) => {
            eprintln!("error: {}", e);
            if let Some(details) = e.details() {
                eprintln!("details: {}", details.trim_end());
            }
            SgsyncExitCode::Failure.into()
        }
    }
}

/// Wire the concrete implementations into the engine and run one pass
async fn run(cli: &Cli, config: SyncConfig) -> Result<(), Error> {
    check_prerequisites()?;

    let gateway = match &cli.aws_bin {
        Some(program) => AwsCliGateway::with_program(program),
        None => AwsCliGateway::discover()?,
    };

    let ip_source = HttpIpSource::new(config.lookup_url.clone());
    let state_store = FileStateStore::new(&config.storage_path);

    info!(
        groups = config.groups.len(),
        storage = %config.storage_path.display(),
        "starting reconciliation"
    );

    let (engine, events) = SyncEngine::new(
        Box::new(ip_source),
        Box::new(gateway),
        Box::new(state_store),
        config,
    )?;
    let engine = engine.with_dry_run(cli.dry_run);

    if cli.dry_run {
        println!("dry run: no rules will be changed");
    }

    let printer = tokio::spawn(print_events(events));
    let result = engine.run().await;

    // Dropping the engine closes the event channel and lets the printer drain.
    drop(engine);
    let _ = printer.await;

    result.map(|_| ())
}

/// Render engine events as progress lines on stdout
async fn print_events(mut events: tokio::sync::mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::Started {
                groups,
                previous_cidr,
                current_cidr,
            } => {
                println!("groups : {}", groups.join(", "));
                println!("old ip : {}", previous_cidr.as_deref().unwrap_or("none"));
                println!("new ip : {}", current_cidr);
            }
            EngineEvent::NothingToDo { .. } => {
                println!("nothing to do");
            }
            EngineEvent::RuleRevoked { group, .. } => {
                println!("revoke {:<24} ok", group);
            }
            EngineEvent::RevokeNotApplicable { group } => {
                println!("revoke {:<24} n/a", group);
            }
            EngineEvent::RuleAuthorized {
                group,
                already_present,
                ..
            } => {
                if already_present {
                    println!("allow  {:<24} ok (rule already present)", group);
                } else {
                    println!("allow  {:<24} ok", group);
                }
            }
            EngineEvent::GroupNotFound { group } => {
                println!("allow  {:<24} n/a", group);
            }
            EngineEvent::StatePersisted { cidr } => {
                println!("stored {}", cidr);
            }
        }
    }
}
