//! Alias (CNAME) entity

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// An alias record: `fqdn` resolves to `dest`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CName {
    fqdn: String,
    dest: String,
}

impl CName {
    /// Create an alias, stripping trailing dots from both names
    pub fn new(fqdn: impl AsRef<str>, dest: impl AsRef<str>) -> Result<Self> {
        let fqdn = fqdn.as_ref().trim().trim_end_matches('.');
        let dest = dest.as_ref().trim().trim_end_matches('.');
        if fqdn.is_empty() || dest.is_empty() {
            return Err(Error::validation(format!(
                "alias needs both a name and a destination, got '{}' -> '{}'",
                fqdn, dest
            )));
        }
        if fqdn == dest {
            return Err(Error::validation(format!("alias {} points to itself", fqdn)));
        }
        Ok(Self {
            fqdn: fqdn.to_string(),
            dest: dest.to_string(),
        })
    }

    /// The alias name
    pub fn fqdn(&self) -> &str {
        &self.fqdn
    }

    /// The canonical name the alias resolves to
    pub fn dest(&self) -> &str {
        &self.dest
    }
}

/// Parses an alias-file line of the form `cname=alias,destination`
impl FromStr for CName {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let rhs = line
            .trim()
            .strip_prefix("cname=")
            .ok_or_else(|| Error::validation(format!("alias line must start with 'cname=': {}", line)))?;
        let names: Vec<&str> = rhs.split(',').collect();
        if names.len() != 2 {
            return Err(Error::validation(format!(
                "alias line has the wrong format: {}",
                line
            )));
        }
        CName::new(names[0], names[1])
    }
}

impl fmt::Display for CName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CNAME: {} -> {}", self.fqdn, self.dest)
    }
}
