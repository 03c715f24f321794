//! Reconciliation engine
//!
//! The SyncEngine brings the remote record store in line with a validated
//! local dataset:
//! - Fetching the remote records via RecordStore
//! - Diffing hosts (per address family) and aliases
//! - Presenting the change set to the Operator and asking for confirmation
//! - Applying the changes one record at a time
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ ValidatedDataset │──────────────┐
//! └──────────────────┘              │
//!                                   ▼
//!                           ┌──────────────┐
//!                           │  SyncEngine  │
//!                           └──────────────┘
//!                                   │
//!         ┌─────────────────────────┼─────────────────────────┐
//!         │                         │                         │
//!         ▼                         ▼                         ▼
//! ┌──────────────┐          ┌──────────────┐          ┌─────────────┐
//! │ RecordStore  │          │   Operator   │          │   Events    │
//! │ (read/write) │          │ (confirm)    │          │  (notify)   │
//! └──────────────┘          └──────────────┘          └─────────────┘
//! ```
//!
//! ## Run Phases
//!
//! ```text
//! Validated → FetchingRemote → { LocalOnly | RemoteLoaded }
//! RemoteLoaded → Diffed → { Done (empty) | DryRun | Confirm }
//! Confirm → { Declined | Applying } → Done
//! ```
//!
//! ## Apply Order
//!
//! Remove aliases, remove address records, add address records, add aliases.
//! A failing record is logged and skipped; the next run re-diffs and retries.

use std::fmt;

use crate::cnamelist::CNameList;
use crate::config::HostlistConfig;
use crate::consistency::{ValidatedDataset, check_consistency};
use crate::diff::{Action, Change, ChangeSet, diff_cnames, diff_hosts};
use crate::error::{Error, Result};
use crate::hostlist::Hostlist;
use crate::traits::{AddressRecord, Operator, RecordStore};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Whether confirmed changes are written to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Compute and present the changes, never write
    DryRun,
    /// Ask the operator, then write
    Apply,
}

/// Phases of a single sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Local dataset passed the consistency checks
    Validated,
    /// Reading the remote store
    FetchingRemote,
    /// Remote store unreachable, sync skipped
    LocalOnly,
    /// Remote dataset loaded
    RemoteLoaded,
    /// Change set computed
    Diffed,
    /// Waiting for the operator's answer
    Confirming,
    /// Writing changes to the store
    Applying,
    /// Run finished
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Validated => "validated",
            RunPhase::FetchingRemote => "fetching remote",
            RunPhase::LocalOnly => "local only",
            RunPhase::RemoteLoaded => "remote loaded",
            RunPhase::Diffed => "diffed",
            RunPhase::Confirming => "confirming",
            RunPhase::Applying => "applying",
            RunPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// The run entered a new phase
    PhaseChanged(RunPhase),

    /// Remote records were read
    RemoteFetched {
        hosts: usize,
        cnames: usize,
    },

    /// The remote store could not be read
    RemoteUnavailable {
        error: String,
    },

    /// The change set was computed
    ChangesComputed {
        additions: usize,
        removals: usize,
    },

    /// A single change was written
    ChangeApplied {
        action: Action,
        identity: String,
    },

    /// A single change failed and was skipped
    ChangeFailed {
        action: Action,
        identity: String,
        error: String,
    },
}

/// Result of applying a change set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Number of changes written
    pub applied: usize,
    /// One message per change that failed
    pub failed: Vec<String>,
}

impl ApplyReport {
    /// Whether every change was written
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// How a sync run ended
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The remote store was unreachable; nothing was compared
    LocalOnly {
        /// Why the fetch failed
        reason: String,
    },
    /// Local and remote agree
    InSync,
    /// Dry run; the changes were presented only
    DryRun(ChangeSet),
    /// The operator declined the changes
    Declined(ChangeSet),
    /// The changes were applied (possibly with failures)
    Applied(ApplyReport),
}

/// Reconciliation engine
///
/// ## Threading
///
/// Every store call is awaited in sequence. Nothing is spawned, so the run
/// behaves the same on a current-thread runtime as on a multi-threaded one.
pub struct SyncEngine {
    /// Remote record store
    store: Box<dyn RecordStore>,

    /// Decides whether changes are applied
    operator: Box<dyn Operator>,

    /// Run configuration
    config: HostlistConfig,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields sync events
    pub fn new(
        store: Box<dyn RecordStore>,
        operator: Box<dyn Operator>,
        config: HostlistConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.sync.event_channel_capacity);

        let engine = Self {
            store,
            operator,
            config,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run one reconciliation
    ///
    /// # Returns
    ///
    /// How the run ended. A store that cannot be read, or whose records
    /// cannot be modelled, is an outcome ([`SyncOutcome::LocalOnly`]), not
    /// an error.
    pub async fn run(&self, local: &ValidatedDataset, mode: SyncMode) -> Result<SyncOutcome> {
        self.enter(RunPhase::Validated);
        self.enter(RunPhase::FetchingRemote);

        let (remote_hosts, remote_cnames) = match self.fetch_remote().await {
            Ok(remote) => remote,
            Err(e) => {
                let what = if e.is_transport() { "read" } else { "interpret" };
                warn!(
                    "Could not {} the {} store, skipping sync: {}",
                    what,
                    self.store.store_name(),
                    e
                );
                self.emit_event(SyncEvent::RemoteUnavailable {
                    error: e.to_string(),
                });
                self.enter(RunPhase::LocalOnly);
                self.enter(RunPhase::Done);
                return Ok(SyncOutcome::LocalOnly {
                    reason: e.to_string(),
                });
            }
        };
        self.enter(RunPhase::RemoteLoaded);

        let report = check_consistency(&remote_hosts, &remote_cnames, &self.config);
        if !report.passed() {
            warn!(
                "Remote dataset has {} consistency problem(s); continuing, the sync repairs them",
                report.failures.len()
            );
        }

        let changes = ChangeSet::new(
            diff_hosts(local.hosts(), &remote_hosts),
            diff_cnames(local.cnames(), &remote_cnames),
        );
        self.emit_event(SyncEvent::ChangesComputed {
            additions: changes.additions(),
            removals: changes.removals(),
        });
        self.enter(RunPhase::Diffed);

        if changes.is_empty() {
            info!("Remote store is in sync");
            self.enter(RunPhase::Done);
            return Ok(SyncOutcome::InSync);
        }

        self.operator.present(&changes);

        if mode == SyncMode::DryRun {
            info!("Dry run, not applying changes");
            self.enter(RunPhase::Done);
            return Ok(SyncOutcome::DryRun(changes));
        }

        self.enter(RunPhase::Confirming);
        if !self.operator.confirm(&changes) {
            info!("Changes declined");
            self.enter(RunPhase::Done);
            return Ok(SyncOutcome::Declined(changes));
        }

        self.enter(RunPhase::Applying);
        let report = self.apply(&changes).await;
        self.enter(RunPhase::Done);
        Ok(SyncOutcome::Applied(report))
    }

    /// Read the remote store into host and alias lists
    pub async fn fetch_remote(&self) -> Result<(Hostlist, CNameList)> {
        let snapshot = self.store.list_records().await?;

        let hosts = Hostlist::from_remote(&snapshot.addresses, &self.config)?;
        let cnames = CNameList::from_remote(&snapshot.aliases)?;

        debug!(
            "Fetched {} hosts and {} aliases from {}",
            hosts.len(),
            cnames.len(),
            self.store.store_name()
        );
        self.emit_event(SyncEvent::RemoteFetched {
            hosts: hosts.len(),
            cnames: cnames.len(),
        });
        Ok((hosts, cnames))
    }

    /// Apply a change set in order, skipping changes that fail
    pub async fn apply(&self, changes: &ChangeSet) -> ApplyReport {
        let mut report = ApplyReport::default();

        for (action, change) in changes.steps() {
            let identity = change.identity().to_string();
            match self.apply_change(action, change).await {
                Ok(()) => {
                    info!("{} {}", sign(action), change);
                    report.applied += 1;
                    self.emit_event(SyncEvent::ChangeApplied { action, identity });
                }
                Err(e) => {
                    error!("Failed to {} {}: {}", action, change, e);
                    report.failed.push(format!("{} {}: {}", action, identity, e));
                    self.emit_event(SyncEvent::ChangeFailed {
                        action,
                        identity,
                        error: e.to_string(),
                    });
                }
            }
        }

        if !report.is_complete() {
            warn!(
                "{} change(s) failed; the next run will retry them",
                report.failed.len()
            );
        }
        report
    }

    /// Perform a single store call
    async fn apply_change(&self, action: Action, change: &Change) -> Result<()> {
        match change {
            Change::Address { host, family } => {
                let record = AddressRecord::for_host(host, *family).ok_or_else(|| {
                    Error::validation(format!("{} has no {} address", host.fqdn(), family))
                })?;
                match action {
                    Action::Add => self.store.create_address_record(&record).await,
                    Action::Remove => self.store.delete_address_record(&record).await,
                }
            }
            Change::Alias(cname) => match action {
                Action::Add => self.store.create_alias_record(cname).await,
                Action::Remove => self.store.delete_alias_record(cname).await,
            },
        }
    }

    fn enter(&self, phase: RunPhase) {
        debug!("Sync phase: {}", phase);
        self.emit_event(SyncEvent::PhaseChanged(phase));
    }

    /// Emit a sync event
    fn emit_event(&self, event: SyncEvent) {
        // A closed channel just means nobody is listening.
        if let Err(mpsc::error::TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Event channel full, dropping event. Consider increasing sync.event_channel_capacity.");
        }
    }
}

fn sign(action: Action) -> &'static str {
    match action {
        Action::Add => "+",
        Action::Remove => "-",
    }
}
