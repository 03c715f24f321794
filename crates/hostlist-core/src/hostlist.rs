//! Ordered host collection and its consistency checks

use std::collections::{BTreeMap, HashMap};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use tracing::error;

use crate::cnamelist::CNameList;
use crate::config::HostlistConfig;
use crate::error::Result;
use crate::model::{GROUP_NEEDS_IP, GROUP_NEEDS_MAC, Host, SectionHeader};
use crate::traits::AddressRecord;

/// Where a collection was loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Local host files
    Files,
    /// The remote record store
    Remote,
}

/// Header of one host-file section, labelled with its file name
#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
    /// File the section came from
    pub source: String,
    /// The section header
    pub header: SectionHeader,
}

/// Insertion-ordered list of hosts, indexed by group
#[derive(Debug, Clone)]
pub struct Hostlist {
    provenance: Provenance,
    hosts: Vec<Host>,
    groups: BTreeMap<String, Vec<usize>>,
    headers: Vec<FileHeader>,
}

impl Hostlist {
    /// Create an empty list
    pub fn new(provenance: Provenance) -> Self {
        Self {
            provenance,
            hosts: Vec::new(),
            groups: BTreeMap::new(),
            headers: Vec::new(),
        }
    }

    /// Build the remote host list from address records
    ///
    /// IPv4 and IPv6 records of the same name are merged into one host; the
    /// shared flag of the IPv4 record decides uniqueness.
    pub fn from_remote(records: &[AddressRecord], config: &HostlistConfig) -> Result<Self> {
        let mut merged: BTreeMap<&str, (Option<Ipv4Addr>, Option<Ipv6Addr>, bool)> =
            BTreeMap::new();
        for record in records {
            let entry = merged
                .entry(record.fqdn.as_str())
                .or_insert((None, None, false));
            match record.address {
                IpAddr::V4(v4) => {
                    entry.0 = Some(v4);
                    entry.2 = record.shared;
                }
                IpAddr::V6(v6) => entry.1 = Some(v6),
            }
        }

        let mut hostlist = Self::new(Provenance::Remote);
        for (fqdn, (ip, ipv6, shared)) in merged {
            hostlist.push(Host::from_remote(fqdn, ip, ipv6, shared, config)?);
        }
        Ok(hostlist)
    }

    /// Append a host and index its groups
    pub fn push(&mut self, host: Host) {
        let index = self.hosts.len();
        for group in host.groups() {
            self.groups.entry(group.clone()).or_default().push(index);
        }
        self.hosts.push(host);
    }

    /// Record the header of a loaded file section
    pub fn add_header(&mut self, source: impl Into<String>, header: SectionHeader) {
        self.headers.push(FileHeader {
            source: source.into(),
            header,
        });
    }

    /// Where the hosts came from
    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// Iterate hosts in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Host> {
        self.hosts.iter()
    }

    /// Number of hosts
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Find a host by FQDN
    pub fn get(&self, fqdn: &str) -> Option<&Host> {
        self.hosts.iter().find(|h| h.fqdn() == fqdn)
    }

    /// Members of a group, in insertion order
    pub fn group(&self, name: &str) -> Vec<&Host> {
        self.groups
            .get(name)
            .map(|indices| indices.iter().map(|&i| &self.hosts[i]).collect())
            .unwrap_or_default()
    }

    /// Names of all groups with at least one member
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Section headers of the loaded files
    pub fn headers(&self) -> &[FileHeader] {
        &self.headers
    }

    /// Hosts matching the selectors (see [`Host::select`])
    pub fn selected<'a, S: AsRef<str>>(
        &'a self,
        selectors: &'a [S],
    ) -> impl Iterator<Item = &'a Host> + 'a {
        self.hosts.iter().filter(move |h| h.select(selectors))
    }

    /// Every host flagged non-unique must use a whitelisted address, and
    /// every host on a whitelisted address must be flagged non-unique
    pub fn check_nonunique(&self, config: &HostlistConfig) -> Vec<String> {
        let mut failures = Vec::new();
        let mut unflagged: BTreeMap<Ipv4Addr, Vec<&Host>> = BTreeMap::new();

        for host in &self.hosts {
            let whitelisted = host.ip().is_some_and(|ip| config.is_nonunique(ip));
            if whitelisted && host.is_unique() {
                if let Some(ip) = host.ip() {
                    unflagged.entry(ip).or_default().push(host);
                }
                failures.push(report(format!(
                    "Host {} uses a nonunique ip listed in the config, \
                     but is not flagged as nonunique.",
                    host
                )));
            }
            if !whitelisted && !host.is_unique() {
                failures.push(report(format!(
                    "Host {} has nonunique ip flag, but its ip is not listed in the config.",
                    host
                )));
            }
        }

        for (ip, hosts) in unflagged {
            if hosts.len() > 1 {
                let listing: Vec<String> = hosts.iter().map(|h| h.to_string()).collect();
                failures.push(report(format!(
                    "More than one host uses the nonunique ip {} without being flagged:\n{}",
                    ip,
                    listing.join("\n")
                )));
            }
        }
        failures
    }

    /// No alias may shadow a host, and every alias must point at a host
    pub fn check_cnames(&self, cnames: &CNameList) -> Vec<String> {
        let by_fqdn: HashMap<&str, &Host> = self.hosts.iter().map(|h| (h.fqdn(), h)).collect();
        let mut failures = Vec::new();
        for cname in cnames.iter() {
            if let Some(host) = by_fqdn.get(cname.fqdn()) {
                failures.push(report(format!("{} conflicts with {}.", cname, host)));
            }
            if !by_fqdn.contains_key(cname.dest()) {
                failures.push(report(format!("{} points to a non-existing host.", cname)));
            }
        }
        failures
    }

    /// Detect duplicate IP, MAC or FQDN values
    ///
    /// Whitelisted nonunique IPs are exempt.
    pub fn check_duplicates(&self, config: &HostlistConfig) -> Vec<String> {
        let mut failures = Vec::new();

        let ips = self.hosts.iter().filter_map(|h| {
            h.ip()
                .filter(|ip| !config.is_nonunique(*ip))
                .map(|ip| (ip.to_string(), h))
        });
        failures.extend(find_duplicates("ip", ips));

        let macs = self
            .hosts
            .iter()
            .filter_map(|h| h.mac().map(|mac| (mac.to_string(), h)));
        failures.extend(find_duplicates("mac", macs));

        let fqdns = self.hosts.iter().map(|h| (h.fqdn().to_string(), h));
        failures.extend(find_duplicates("fqdn", fqdns));

        failures
    }

    /// Hosts in `needs_ip` / `needs_mac` must have an IP / MAC
    ///
    /// MACs are only required of file-sourced hosts.
    pub fn check_missing_mac_ip(&self) -> Vec<String> {
        let mut failures = Vec::new();
        for host in &self.hosts {
            if host.in_group(GROUP_NEEDS_IP) && host.ip().is_none() {
                failures.push(report(format!("Missing IP in {}", host)));
            }
        }
        if self.provenance == Provenance::Files {
            for host in &self.hosts {
                if host.in_group(GROUP_NEEDS_MAC) && host.mac().is_none() {
                    failures.push(report(format!("Missing MAC in {}", host)));
                }
            }
        }
        failures
    }

    /// Run every host's own checks
    pub fn check_hosts(&self, config: &HostlistConfig) -> Vec<String> {
        self.hosts
            .iter()
            .filter(|h| !h.run_checks(config))
            .map(|h| format!("Host checks failed for {}", h.fqdn()))
            .collect()
    }

    /// Declared section ranges must not overlap unless a section opts out
    pub fn check_iprange_overlap(&self) -> Vec<String> {
        let mut failures = Vec::new();
        for (i, a) in self.headers.iter().enumerate() {
            for b in &self.headers[i + 1..] {
                let (Some(range_a), Some(range_b)) = (a.header.iprange, b.header.iprange) else {
                    continue;
                };
                if a.header.iprange_allow_overlap || b.header.iprange_allow_overlap {
                    continue;
                }
                if let Some(overlap) = range_a.overlap(&range_b) {
                    failures.push(report(format!(
                        "Found overlap from {} to {} in files {} and {}.",
                        overlap.start(),
                        overlap.end(),
                        a.source,
                        b.source
                    )));
                }
            }
        }
        failures
    }
}

impl<'a> IntoIterator for &'a Hostlist {
    type Item = &'a Host;
    type IntoIter = std::slice::Iter<'a, Host>;

    fn into_iter(self) -> Self::IntoIter {
        self.hosts.iter()
    }
}

impl std::fmt::Display for Hostlist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lines: Vec<String> = self.hosts.iter().map(|h| h.to_string()).collect();
        f.write_str(&lines.join("\n"))
    }
}

fn find_duplicates<'a>(
    prop: &str,
    values: impl Iterator<Item = (String, &'a Host)>,
) -> Vec<String> {
    let mut seen: HashMap<String, &Host> = HashMap::new();
    let mut failures = Vec::new();
    for (value, host) in values {
        if let Some(previous) = seen.insert(value.clone(), host) {
            failures.push(report(format!(
                "Found duplicate {} {} for hosts\n{}\n{}",
                prop, value, previous, host
            )));
        }
    }
    failures
}

fn report(message: String) -> String {
    error!("{}", message);
    message
}
