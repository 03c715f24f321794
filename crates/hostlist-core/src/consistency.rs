//! Consistency checking of a whole dataset
//!
//! [`check_consistency`] runs every check over a host list and an alias
//! list and never stops at the first problem: each failure is logged as it
//! is found, then all of them are returned together. A [`ValidatedDataset`]
//! can only be obtained from data that passed, so generators and the sync
//! engine cannot be handed an inconsistent local dataset.

use tracing::{debug, info};

use crate::cnamelist::CNameList;
use crate::config::HostlistConfig;
use crate::error::{Error, Result};
use crate::hostlist::{Hostlist, Provenance};

/// Outcome of a consistency run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// One message per failed check
    pub failures: Vec<String>,
}

impl ConsistencyReport {
    /// Whether every check passed
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Convert into a `Result`, failing with [`Error::Consistency`]
    pub fn into_result(self) -> Result<()> {
        if self.passed() {
            Ok(())
        } else {
            Err(Error::consistency(self.failures))
        }
    }
}

/// Run all consistency checks over a host list and an alias list
///
/// The range-overlap check only applies to file-sourced hosts, since remote
/// data carries no section headers.
pub fn check_consistency(
    hosts: &Hostlist,
    cnames: &CNameList,
    config: &HostlistConfig,
) -> ConsistencyReport {
    debug!("checking consistency of {} hosts, {} aliases", hosts.len(), cnames.len());

    let mut failures = Vec::new();
    failures.extend(hosts.check_nonunique(config));
    failures.extend(hosts.check_cnames(cnames));
    failures.extend(hosts.check_duplicates(config));
    failures.extend(hosts.check_missing_mac_ip());
    failures.extend(hosts.check_hosts(config));
    if hosts.provenance() == Provenance::Files {
        failures.extend(hosts.check_iprange_overlap());
    }

    if failures.is_empty() {
        info!("consistency check passed");
    }
    ConsistencyReport { failures }
}

/// A host list and alias list that passed [`check_consistency`]
#[derive(Debug, Clone)]
pub struct ValidatedDataset {
    hosts: Hostlist,
    cnames: CNameList,
}

impl ValidatedDataset {
    /// Check the dataset, keeping it only if every check passes
    pub fn validate(hosts: Hostlist, cnames: CNameList, config: &HostlistConfig) -> Result<Self> {
        Self::validate_loaded(hosts, cnames, Vec::new(), config)
    }

    /// Check a dataset whose loading already reported problems
    ///
    /// The checks run even when `load_failures` is not empty, and every
    /// problem is returned in one [`Error::Consistency`].
    pub fn validate_loaded(
        hosts: Hostlist,
        cnames: CNameList,
        mut load_failures: Vec<String>,
        config: &HostlistConfig,
    ) -> Result<Self> {
        load_failures.extend(check_consistency(&hosts, &cnames, config).failures);
        ConsistencyReport {
            failures: load_failures,
        }
        .into_result()?;
        Ok(Self { hosts, cnames })
    }

    /// The validated hosts
    pub fn hosts(&self) -> &Hostlist {
        &self.hosts
    }

    /// The validated aliases
    pub fn cnames(&self) -> &CNameList {
        &self.cnames
    }
}
