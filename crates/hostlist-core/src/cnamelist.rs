//! Ordered alias collection

use std::collections::BTreeMap;

use crate::error::Result;
use crate::hostlist::Provenance;
use crate::model::CName;

/// Insertion-ordered list of aliases
#[derive(Debug, Clone)]
pub struct CNameList {
    provenance: Provenance,
    cnames: Vec<CName>,
}

impl CNameList {
    /// Create an empty list
    pub fn new(provenance: Provenance) -> Self {
        Self {
            provenance,
            cnames: Vec::new(),
        }
    }

    /// Build the remote alias list from `alias -> destination` pairs
    pub fn from_remote(records: &BTreeMap<String, String>) -> Result<Self> {
        let mut list = Self::new(Provenance::Remote);
        for (fqdn, dest) in records {
            list.push(CName::new(fqdn, dest)?);
        }
        Ok(list)
    }

    /// Append an alias
    pub fn push(&mut self, cname: CName) {
        self.cnames.push(cname);
    }

    /// Where the aliases came from
    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// Iterate aliases in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, CName> {
        self.cnames.iter()
    }

    /// Number of aliases
    pub fn len(&self) -> usize {
        self.cnames.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.cnames.is_empty()
    }

    /// Find an alias by name
    pub fn get(&self, fqdn: &str) -> Option<&CName> {
        self.cnames.iter().find(|c| c.fqdn() == fqdn)
    }
}

impl<'a> IntoIterator for &'a CNameList {
    type Item = &'a CName;
    type IntoIter = std::slice::Iter<'a, CName>;

    fn into_iter(self) -> Self::IntoIter {
        self.cnames.iter()
    }
}

impl FromIterator<CName> for CNameList {
    fn from_iter<I: IntoIterator<Item = CName>>(iter: I) -> Self {
        Self {
            provenance: Provenance::Files,
            cnames: iter.into_iter().collect(),
        }
    }
}
