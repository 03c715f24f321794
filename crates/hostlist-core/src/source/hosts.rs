//! Host file loading
//!
//! Every `*.yml` file in the host directory is read in name order. A file
//! named `servers-abc.yml` contributes hosts of type `servers` belonging to
//! institute `abc`; `servers.yml` leaves the institute to the headers. Each
//! file is a stream of YAML documents, one per section:
//!
//! ```yaml
//! header:
//!   iprange: [198.51.100.10, 198.51.100.50]
//!   groups: [webservers]
//! hosts:
//!   - hostname: web1
//!     ip: 198.51.100.11
//!     mac: 00:11:22:33:44:55
//! ---
//! header: {}
//! hosts:
//!   - hostname: web2
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, error, info};

use crate::config::HostlistConfig;
use crate::error::{Error, Result};
use crate::hostlist::{Hostlist, Provenance};
use crate::model::{Host, HostContext, SectionHeader, Vars};

#[derive(Debug, Deserialize)]
struct RawSection {
    header: Option<SectionHeader>,
    hosts: Option<Vec<Vars>>,
}

/// Load every host file of the configured directory
///
/// Problems in one file do not stop the others from being read; all of
/// them are logged and returned together as [`Error::Consistency`], so a
/// partially loaded list is never handed out.
pub fn load_hostlist(config: &HostlistConfig) -> Result<Hostlist> {
    let (hostlist, failures) = read_hostlist(config)?;
    if !failures.is_empty() {
        return Err(Error::consistency(failures));
    }
    Ok(hostlist)
}

/// Read every host file, returning the hosts that loaded and the problems
///
/// Only an unreadable directory is an error. The list is incomplete
/// whenever problems are returned.
pub fn read_hostlist(config: &HostlistConfig) -> Result<(Hostlist, Vec<String>)> {
    let mut hostlist = Hostlist::new(Provenance::Files);
    let mut failures = Vec::new();

    for path in host_files(&config.hostlist_dir)? {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                failures.extend(add_host_file(&mut hostlist, &file_name, &content, config))
            }
            Err(e) => {
                let message = format!("Could not read {}: {}", path.display(), e);
                error!("{}", message);
                failures.push(message);
            }
        }
    }

    info!(
        "Loaded {} hosts from {}",
        hostlist.len(),
        config.hostlist_dir.display()
    );
    Ok((hostlist, failures))
}

/// Parse one host file into the list, returning its problems
///
/// Only hosts that pass validation are added.
pub fn add_host_file(
    hostlist: &mut Hostlist,
    file_name: &str,
    content: &str,
    config: &HostlistConfig,
) -> Vec<String> {
    let mut failures = Vec::new();
    let mut fail = |message: String| {
        error!("{}", message);
        failures.push(message);
    };

    let stem = file_name.strip_suffix(".yml").unwrap_or(file_name);
    let parts: Vec<&str> = stem.split('-').collect();
    let (hosttype, institute) = match parts.as_slice() {
        [hosttype] => (*hosttype, None),
        [hosttype, institute] => (*hosttype, Some(*institute)),
        _ => {
            fail(format!(
                "Filename {} contains too many dashes, expected <hosttype>-<institute>.yml",
                file_name
            ));
            return failures;
        }
    };
    debug!("Reading {} (hosttype {}, institute {:?})", file_name, hosttype, institute);

    for (index, document) in serde_yaml::Deserializer::from_str(content).enumerate() {
        let section = match RawSection::deserialize(document) {
            Ok(section) => section,
            Err(e) => {
                fail(Error::parse(file_name, format!("section {}: {}", index + 1, e)).to_string());
                // A syntax error leaves the rest of the stream unreadable.
                break;
            }
        };
        let (Some(header), Some(entries)) = (section.header, section.hosts) else {
            fail(
                Error::parse(
                    file_name,
                    format!("section {} needs both 'header' and 'hosts'", index + 1),
                )
                .to_string(),
            );
            continue;
        };

        let ctx = HostContext {
            hosttype,
            institute,
            header: Some(&header),
        };
        for entry in entries {
            match Host::from_vars(entry, &ctx, config) {
                Ok(host) => hostlist.push(host),
                Err(e) => fail(format!("{}: {}", file_name, e)),
            }
        }
        hostlist.add_header(file_name, header);
    }
    failures
}

fn host_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        Error::config(format!("cannot read host directory {}: {}", dir.display(), e))
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "yml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
