//! Section headers shared by all hosts of a host-file section

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

use super::vars::Vars;

/// Inclusive IPv4 address range declared in a section header
///
/// Written in YAML as a two-element list: `iprange: [10.0.0.1, 10.0.0.50]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IpRange(pub Ipv4Addr, pub Ipv4Addr);

impl IpRange {
    /// Lowest address of the range
    pub fn start(&self) -> Ipv4Addr {
        self.0
    }

    /// Highest address of the range
    pub fn end(&self) -> Ipv4Addr {
        self.1
    }

    /// Whether the address lies inside the range
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        self.0 <= ip && ip <= self.1
    }

    /// Intersection of two ranges, if they overlap
    pub fn overlap(&self, other: &IpRange) -> Option<IpRange> {
        let low = self.0.max(other.0);
        let high = self.1.min(other.1);
        (low <= high).then_some(IpRange(low, high))
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.0, self.1)
    }
}

/// Header of one host-file section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionHeader {
    /// Addresses every host of the section must fall into
    #[serde(default)]
    pub iprange: Option<IpRange>,

    /// Exempt this section's range from the overlap check
    #[serde(default)]
    pub iprange_allow_overlap: bool,

    /// Groups inherited by every host of the section (`!name` negates)
    #[serde(default)]
    pub groups: Vec<String>,

    /// Any other key, inherited into each host's property bag
    #[serde(flatten)]
    pub vars: Vars,
}
