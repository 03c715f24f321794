//! Loading the local dataset from disk

pub mod cnames;
pub mod hosts;

pub use cnames::{load_cnames, parse_cnames, read_cnames};
pub use hosts::{add_host_file, load_hostlist, read_hostlist};

use crate::config::HostlistConfig;
use crate::consistency::ValidatedDataset;
use crate::error::Result;

/// Load the host files and the alias file, then check them together
///
/// Bad entries do not stop the consistency checks from running over the
/// rest, so one run reports every problem.
pub fn load_dataset(config: &HostlistConfig) -> Result<ValidatedDataset> {
    let (hosts, mut failures) = read_hostlist(config)?;
    let (cnames, cname_failures) = read_cnames(config)?;
    failures.extend(cname_failures);
    ValidatedDataset::validate_loaded(hosts, cnames, failures, config)
}
