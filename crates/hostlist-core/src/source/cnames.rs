//! Alias file loading

use tracing::{error, info};

use crate::cnamelist::CNameList;
use crate::config::HostlistConfig;
use crate::error::{Error, Result};
use crate::hostlist::Provenance;
use crate::model::CName;

/// Load the configured alias file
///
/// A missing file is an error: an empty alias list would make the sync
/// delete every remote alias.
pub fn load_cnames(config: &HostlistConfig) -> Result<CNameList> {
    let (cnames, failures) = read_cnames(config)?;
    into_result(cnames, failures)
}

/// Read the alias file, returning the aliases that parsed and the bad lines
///
/// Only a missing or unreadable file is an error.
pub fn read_cnames(config: &HostlistConfig) -> Result<(CNameList, Vec<String>)> {
    let path = config.cnames_path();
    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::config(format!("cannot read alias file {}: {}", path.display(), e)))?;
    let (cnames, failures) = parse_lines(&config.cnames_file, &content);
    info!("Loaded {} aliases from {}", cnames.len(), path.display());
    Ok((cnames, failures))
}

/// Parse alias-file content
///
/// One `cname=alias,destination` per line; `#` starts a comment. Every bad
/// line is logged before the whole file is rejected.
pub fn parse_cnames(source_name: &str, content: &str) -> Result<CNameList> {
    let (cnames, failures) = parse_lines(source_name, content);
    into_result(cnames, failures)
}

fn into_result(cnames: CNameList, failures: Vec<String>) -> Result<CNameList> {
    if failures.is_empty() {
        Ok(cnames)
    } else {
        Err(Error::consistency(failures))
    }
}

fn parse_lines(source_name: &str, content: &str) -> (CNameList, Vec<String>) {
    let mut cnames = CNameList::new(Provenance::Files);
    let mut failures = Vec::new();

    for (number, line) in content.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        match line.parse::<CName>() {
            Ok(cname) => cnames.push(cname),
            Err(e) => {
                let message =
                    Error::parse(format!("{}:{}", source_name, number + 1), e.to_string()).to_string();
                error!("{}", message);
                failures.push(message);
            }
        }
    }

    (cnames, failures)
}
