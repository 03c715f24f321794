// # buildfiles - hostlist generator and DNS sync
//
// This binary is a thin integration layer: all inventory logic lives in
// hostlist-core. It is responsible for:
// 1. Parsing and cross-checking the command line
// 2. Loading the configuration file
// 3. Initializing logging and the runtime
// 4. Loading and validating the host files and aliases
// 5. Writing the requested outputs and running the DNS sync
//
// ## Configuration
//
// - `--config <path>` or `HOSTLIST_CONFIG`: configuration file (default `config.yml`)
// - `HOSTLIST_LOG_LEVEL`: log level when neither `-q` nor `-v` is given
//
// ## Example
//
// ```bash
// buildfiles --dryrun              # dhcp + hosts, show the DNS diff only
// buildfiles --ansible --stdout    # print the inventory
// buildfiles --print web '!abc'    # list web hosts outside institute abc
// ```

use anyhow::{Context, Result};
use clap::Parser;
use hostlist_core::{
    Detail, Error, HostlistConfig, OutputFormat, StoreRegistry, SyncEngine, SyncMode,
    SyncOutcome, ValidatedDataset, source,
};
use std::io::{BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

mod operator;

use operator::TerminalOperator;

/// Exit codes for different termination scenarios
///
/// - 0: Clean run, including a declined or partially applied sync
/// - 1: Consistency, configuration or operator-input error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildExitCode {
    /// Normal exit
    Clean = 0,
    /// Inconsistent data, bad configuration or contradictory flags
    InputError = 1,
    /// Unexpected failure
    RuntimeError = 2,
}

impl From<BuildExitCode> for ExitCode {
    fn from(code: BuildExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl BuildExitCode {
    fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<Error>() {
            Some(
                Error::Consistency { .. }
                | Error::Config(_)
                | Error::Parse { .. }
                | Error::Validation(_)
                | Error::InvalidInput(_)
                | Error::Yaml(_),
            ) => BuildExitCode::InputError,
            _ => BuildExitCode::RuntimeError,
        }
    }
}

/// Generate configuration files from the hostlist and sync DNS
#[derive(Debug, Parser)]
#[command(name = "buildfiles", version)]
struct Cli {
    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long)]
    quiet: bool,

    /// Compute and print changes, never apply them
    #[arg(short, long = "dryrun")]
    dryrun: bool,

    /// Print the single requested output to stdout
    #[arg(long)]
    stdout: bool,

    /// Sync the DNS records with the remote store
    #[arg(long)]
    dnsvs: bool,

    /// Generate the DHCP host blocks
    #[arg(long)]
    dhcp: bool,

    /// Generate the hosts file
    #[arg(long)]
    hosts: bool,

    /// Generate the ethers file
    #[arg(long)]
    ethers: bool,

    /// Generate the Ansible inventory
    #[arg(long)]
    ansible: bool,

    /// Generate the Munin host list
    #[arg(long)]
    munin: bool,

    /// Generate the ssh known-hosts name list
    #[arg(long)]
    ssh_known_hosts: bool,

    /// Print the hosts matching the selectors
    #[arg(long)]
    print: bool,

    /// Configuration file
    #[arg(long, env = "HOSTLIST_CONFIG", default_value = hostlist_core::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Group names or hostnames; prefix with `!` to exclude
    selectors: Vec<String>,
}

/// What a run should do, after defaults and cross-flag checks
#[derive(Debug, Clone, PartialEq, Eq)]
struct Plan {
    outputs: Vec<OutputFormat>,
    sync: bool,
    mode: SyncMode,
    stdout: bool,
    quiet: bool,
}

impl Cli {
    fn requested_outputs(&self) -> Vec<OutputFormat> {
        [
            (self.dhcp, OutputFormat::Dhcp),
            (self.hosts, OutputFormat::Hosts),
            (self.ethers, OutputFormat::Ethers),
            (self.ansible, OutputFormat::Ansible),
            (self.munin, OutputFormat::Munin),
            (self.ssh_known_hosts, OutputFormat::SshKnownHosts),
        ]
        .into_iter()
        .filter_map(|(wanted, format)| wanted.then_some(format))
        .collect()
    }

    /// Resolve defaults and reject contradictory flags
    fn plan(&self) -> hostlist_core::Result<Plan> {
        if self.quiet && self.verbose > 0 {
            return Err(Error::invalid_input("-q and -v are mutually exclusive"));
        }

        let mut outputs = self.requested_outputs();
        if self.stdout && (outputs.len() != 1 || self.dnsvs) {
            return Err(Error::invalid_input(
                "--stdout requires exactly one output format",
            ));
        }

        let mut sync = self.dnsvs;
        if outputs.is_empty() && !self.dnsvs && !self.print {
            outputs = vec![OutputFormat::Dhcp, OutputFormat::Hosts];
            sync = !self.dryrun;
        }

        let dryrun = self.dryrun || self.stdout;
        Ok(Plan {
            outputs,
            sync,
            mode: if dryrun { SyncMode::DryRun } else { SyncMode::Apply },
            stdout: self.stdout,
            quiet: self.quiet || self.stdout,
        })
    }

    fn log_level(&self, quiet: bool) -> Level {
        if quiet {
            return Level::ERROR;
        }
        match self.verbose {
            0 => std::env::var("HOSTLIST_LOG_LEVEL")
                .ok()
                .and_then(|level| level.parse().ok())
                .unwrap_or(Level::INFO),
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    fn detail(&self) -> Detail {
        if self.quiet {
            Detail::Name
        } else if self.verbose > 0 {
            Detail::Full
        } else {
            Detail::Summary
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Flag conflicts are rejected before anything is loaded
    let plan = match cli.plan() {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("{}", e);
            return BuildExitCode::InputError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level(plan.quiet))
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return BuildExitCode::RuntimeError.into();
    }

    let config = match HostlistConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return BuildExitCode::InputError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return BuildExitCode::RuntimeError.into();
        }
    };

    match rt.block_on(run(&cli, &plan, config)) {
        Ok(()) => BuildExitCode::Clean.into(),
        Err(e) => {
            error!("{:#}", e);
            BuildExitCode::for_error(&e).into()
        }
    }
}

/// Load, validate, then generate and sync as planned
async fn run(cli: &Cli, plan: &Plan, config: HostlistConfig) -> Result<()> {
    let data = source::load_dataset(&config)?;
    info!(
        "Loaded {} hosts and {} aliases",
        data.hosts().len(),
        data.cnames().len()
    );

    if cli.print {
        print_hosts(&data, &cli.selectors, cli.detail())?;
    }

    for format in &plan.outputs {
        if plan.stdout {
            let rendered = format.render(&data, &config)?;
            std::io::stdout()
                .write_all(rendered.as_bytes())
                .context("failed to write to stdout")?;
        } else {
            let path = format.write(&data, &config)?;
            info!("Wrote {} to {}", format, path.display());
        }
    }

    if plan.sync {
        report(sync(&data, plan.mode, config).await?);
    }
    Ok(())
}

fn print_hosts(data: &ValidatedDataset, selectors: &[String], detail: Detail) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for host in data.hosts().selected(selectors) {
        writeln!(out, "{}", host.describe(detail))?;
    }
    Ok(())
}

/// Sync the remote store
///
/// A store that cannot be set up (missing or invalid client certificate,
/// unknown store type) skips the sync like an unreachable one.
async fn sync(
    data: &ValidatedDataset,
    mode: SyncMode,
    config: HostlistConfig,
) -> Result<SyncOutcome> {
    let registry = StoreRegistry::with_builtin();
    hostlist_dnsvs::register(&registry);

    if matches!(config.store, hostlist_core::StoreConfig::Memory) {
        warn!("No remote store configured, syncing against an empty in-memory store");
    }
    let store = match registry.create_store(&config.store) {
        Ok(store) => store,
        Err(e) => {
            warn!(
                "Could not set up the {} store, not syncing: {}",
                config.store.type_name(),
                e
            );
            return Ok(SyncOutcome::LocalOnly {
                reason: e.to_string(),
            });
        }
    };
    let operator = TerminalOperator::new(BufReader::new(std::io::stdin()));
    let (engine, _events) = SyncEngine::new(store, Box::new(operator), config)?;

    Ok(engine.run(data, mode).await?)
}

fn report(outcome: SyncOutcome) {
    match outcome {
        SyncOutcome::LocalOnly { reason } => warn!("DNS sync skipped: {}", reason),
        SyncOutcome::InSync => info!("DNS records are up to date"),
        SyncOutcome::DryRun(_) => {}
        SyncOutcome::Declined(_) => info!("Not applying changes"),
        SyncOutcome::Applied(report) => {
            if report.is_complete() {
                info!("Applied {} change(s)", report.applied);
            } else {
                warn!(
                    "Applied {} change(s), {} failed",
                    report.applied,
                    report.failed.len()
                );
            }
        }
    }
}
