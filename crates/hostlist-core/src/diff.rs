//! Set differences between a local and a remote dataset
//!
//! Entities are matched by identity (FQDN for hosts, alias name for
//! aliases). An entity is "only in A" when B has no entity of that identity,
//! or has one whose propagated value differs. Because both sides are walked
//! in identity order, `diff(a, b).add == diff(b, a).remove` for every pair.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::fmt::Write as _;

use colored::Colorize;

use crate::cnamelist::CNameList;
use crate::hostlist::Hostlist;
use crate::model::{CName, Host};
use crate::traits::IpFamily;

/// Host differences, split by address family
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostDiff {
    /// Hosts whose IPv4 record exists only locally
    pub add: Vec<Host>,
    /// Hosts whose IPv4 record exists only remotely
    pub remove: Vec<Host>,
    /// Hosts whose IPv6 record exists only locally
    pub add_v6: Vec<Host>,
    /// Hosts whose IPv6 record exists only remotely
    pub remove_v6: Vec<Host>,
}

impl HostDiff {
    /// Whether both sides agree
    pub fn is_empty(&self) -> bool {
        self.add.is_empty()
            && self.remove.is_empty()
            && self.add_v6.is_empty()
            && self.remove_v6.is_empty()
    }
}

/// Alias differences
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CNameDiff {
    /// Aliases that exist only locally
    pub add: Vec<CName>,
    /// Aliases that exist only remotely
    pub remove: Vec<CName>,
}

impl CNameDiff {
    /// Whether both sides agree
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Compare two host lists
///
/// Only hosts with a public address take part; the IPv6 side additionally
/// requires an IPv6 address.
pub fn diff_hosts(ours: &Hostlist, theirs: &Hostlist) -> HostDiff {
    let (add, remove) = keyed_diff(
        &keyed_hosts(ours, IpFamily::V4),
        &keyed_hosts(theirs, IpFamily::V4),
    );
    let (add_v6, remove_v6) = keyed_diff(
        &keyed_hosts(ours, IpFamily::V6),
        &keyed_hosts(theirs, IpFamily::V6),
    );
    HostDiff {
        add,
        remove,
        add_v6,
        remove_v6,
    }
}

/// Compare two alias lists by name and destination
pub fn diff_cnames(ours: &CNameList, theirs: &CNameList) -> CNameDiff {
    let key = |list: &CNameList| -> BTreeMap<String, (String, CName)> {
        list.iter()
            .map(|c| (c.fqdn().to_string(), (c.dest().to_string(), c.clone())))
            .collect()
    };
    let (add, remove) = keyed_diff(&key(ours), &key(theirs));
    CNameDiff { add, remove }
}

/// Hosts keyed by FQDN, compared by address only
///
/// Drift in other attributes (shared flag, MAC) is not propagated.
fn keyed_hosts(list: &Hostlist, family: IpFamily) -> BTreeMap<String, (IpAddr, Host)> {
    list.iter()
        .filter(|h| h.has_public_ip())
        .filter_map(|h| {
            let address = match family {
                IpFamily::V4 => IpAddr::V4(h.ip()?),
                IpFamily::V6 => IpAddr::V6(h.ipv6()?),
            };
            Some((h.fqdn().to_string(), (address, h.clone())))
        })
        .collect()
}

/// Entries of `ours` missing from or different in `theirs`, and vice versa
fn keyed_diff<V: PartialEq, T: Clone>(
    ours: &BTreeMap<String, (V, T)>,
    theirs: &BTreeMap<String, (V, T)>,
) -> (Vec<T>, Vec<T>) {
    let only_in = |a: &BTreeMap<String, (V, T)>, b: &BTreeMap<String, (V, T)>| -> Vec<T> {
        a.iter()
            .filter(|(key, (value, _))| b.get(*key).is_none_or(|(other, _)| other != value))
            .map(|(_, (_, entity))| entity.clone())
            .collect()
    };
    (only_in(ours, theirs), only_in(theirs, ours))
}

/// Direction of a change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create on the remote store
    Add,
    /// Delete from the remote store
    Remove,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Add => f.write_str("add"),
            Action::Remove => f.write_str("remove"),
        }
    }
}

/// One record-level change
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// An A or AAAA record of a host
    Address {
        /// The host the record belongs to
        host: Host,
        /// Record family
        family: IpFamily,
    },
    /// An alias record
    Alias(CName),
}

impl Change {
    /// Identity of the changed entity
    pub fn identity(&self) -> &str {
        match self {
            Change::Address { host, .. } => host.fqdn(),
            Change::Alias(cname) => cname.fqdn(),
        }
    }

    fn sort_key(&self) -> (&str, u8) {
        match self {
            Change::Address { host, family } => (host.fqdn(), *family as u8),
            Change::Alias(cname) => (cname.fqdn(), 2),
        }
    }
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Change::Address {
                host,
                family: IpFamily::V4,
            } => write!(f, "{}", host),
            Change::Address {
                host,
                family: IpFamily::V6,
            } => match host.ipv6() {
                Some(ipv6) => write!(f, "Hostname: {}\tIPv6: {}", host.fqdn(), ipv6),
                None => write!(f, "Hostname: {}\tIPv6: (empty)", host.fqdn()),
            },
            Change::Alias(cname) => write!(f, "{}", cname),
        }
    }
}

/// Merged host and alias differences, ready to present and apply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    /// Address records to create
    pub add_hosts: Vec<Change>,
    /// Address records to delete
    pub remove_hosts: Vec<Change>,
    /// Alias records to create
    pub add_cnames: Vec<Change>,
    /// Alias records to delete
    pub remove_cnames: Vec<Change>,
}

impl ChangeSet {
    /// Merge per-family host differences and alias differences
    pub fn new(hosts: HostDiff, cnames: CNameDiff) -> Self {
        let address = |hosts: Vec<Host>, family| {
            hosts
                .into_iter()
                .map(move |host| Change::Address { host, family })
        };
        let mut add_hosts: Vec<Change> = address(hosts.add, IpFamily::V4)
            .chain(address(hosts.add_v6, IpFamily::V6))
            .collect();
        let mut remove_hosts: Vec<Change> = address(hosts.remove, IpFamily::V4)
            .chain(address(hosts.remove_v6, IpFamily::V6))
            .collect();
        add_hosts.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        remove_hosts.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        Self {
            add_hosts,
            remove_hosts,
            add_cnames: cnames.add.into_iter().map(Change::Alias).collect(),
            remove_cnames: cnames.remove.into_iter().map(Change::Alias).collect(),
        }
    }

    /// Whether nothing needs to change
    pub fn is_empty(&self) -> bool {
        self.add_hosts.is_empty()
            && self.remove_hosts.is_empty()
            && self.add_cnames.is_empty()
            && self.remove_cnames.is_empty()
    }

    /// Number of creations
    pub fn additions(&self) -> usize {
        self.add_hosts.len() + self.add_cnames.len()
    }

    /// Number of deletions
    pub fn removals(&self) -> usize {
        self.remove_hosts.len() + self.remove_cnames.len()
    }

    /// Changes in apply order
    ///
    /// Aliases are removed before the hosts they may point to, and hosts are
    /// added before the aliases that point to them.
    pub fn steps(&self) -> impl Iterator<Item = (Action, &Change)> {
        self.remove_cnames
            .iter()
            .map(|c| (Action::Remove, c))
            .chain(self.remove_hosts.iter().map(|c| (Action::Remove, c)))
            .chain(self.add_hosts.iter().map(|c| (Action::Add, c)))
            .chain(self.add_cnames.iter().map(|c| (Action::Add, c)))
    }

    /// Human-readable listing: additions in green, removals in red
    ///
    /// Entries are sorted by identity. Color follows the `colored` crate's
    /// terminal detection, so redirected output stays plain.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut additions: Vec<&Change> = self.add_hosts.iter().chain(&self.add_cnames).collect();
        let mut removals: Vec<&Change> =
            self.remove_hosts.iter().chain(&self.remove_cnames).collect();
        additions.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        removals.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        if !additions.is_empty() {
            out.push_str("Only in local files:\n");
            for change in additions {
                let _ = writeln!(out, "{}", format!("+{}", change).green());
            }
        }
        if !removals.is_empty() {
            out.push_str("Only in remote store:\n");
            for change in removals {
                let _ = writeln!(out, "{}", format!("-{}", change).red());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostlistConfig;
    use crate::hostlist::Provenance;

    fn config() -> HostlistConfig {
        let mut config = HostlistConfig::new("example.com");
        config.iprange.internal = Some("10.0.0.0/8".parse().unwrap());
        config
    }

    fn remote(entries: &[(&str, &str, Option<&str>)]) -> Hostlist {
        let mut list = Hostlist::new(Provenance::Remote);
        for (fqdn, ip, ipv6) in entries {
            list.push(
                Host::from_remote(
                    fqdn,
                    Some(ip.parse().unwrap()),
                    ipv6.map(|v| v.parse().unwrap()),
                    false,
                    &config(),
                )
                .unwrap(),
            );
        }
        list
    }

    #[test]
    fn test_changed_address_is_remove_plus_add() {
        let ours = remote(&[("a.abc.example.com", "198.51.100.1", None)]);
        let theirs = remote(&[("a.abc.example.com", "198.51.100.2", None)]);
        let diff = diff_hosts(&ours, &theirs);

        assert_eq!(diff.add.len(), 1);
        assert_eq!(diff.remove.len(), 1);
        assert_eq!(diff.add[0].ip(), Some("198.51.100.1".parse().unwrap()));
        assert_eq!(diff.remove[0].ip(), Some("198.51.100.2".parse().unwrap()));
    }

    #[test]
    fn test_shared_flag_drift_is_not_a_change() {
        let ours = remote(&[("web1.abc.example.com", "198.51.100.7", Some("2001:db8::7"))]);
        let mut theirs = Hostlist::new(Provenance::Remote);
        theirs.push(
            Host::from_remote(
                "web1.abc.example.com",
                Some("198.51.100.7".parse().unwrap()),
                Some("2001:db8::7".parse().unwrap()),
                true,
                &config(),
            )
            .unwrap(),
        );

        assert!(diff_hosts(&ours, &theirs).is_empty());
        assert!(diff_hosts(&theirs, &ours).is_empty());
    }

    #[test]
    fn test_internal_hosts_ignored() {
        let ours = remote(&[("a.abc.example.com", "10.0.0.1", None)]);
        let theirs = Hostlist::new(Provenance::Remote);
        assert!(diff_hosts(&ours, &theirs).is_empty());
    }

    #[test]
    fn test_v6_tracked_separately() {
        let ours = remote(&[("a.abc.example.com", "198.51.100.1", Some("2001:db8::1"))]);
        let theirs = remote(&[("a.abc.example.com", "198.51.100.1", None)]);
        let diff = diff_hosts(&ours, &theirs);

        assert!(diff.add.is_empty() && diff.remove.is_empty());
        assert_eq!(diff.add_v6.len(), 1);
        assert!(diff.remove_v6.is_empty());
    }

    #[test]
    fn test_cname_destination_change() {
        let ours: CNameList = vec![CName::new("www.example.com", "a.example.com").unwrap()]
            .into_iter()
            .collect();
        let theirs: CNameList = vec![CName::new("www.example.com", "b.example.com").unwrap()]
            .into_iter()
            .collect();
        let diff = diff_cnames(&ours, &theirs);
        assert_eq!(diff.add[0].dest(), "a.example.com");
        assert_eq!(diff.remove[0].dest(), "b.example.com");
        assert!(diff_cnames(&ours, &ours).is_empty());
    }

    #[test]
    fn test_steps_follow_apply_order() {
        let ours = remote(&[("new.abc.example.com", "198.51.100.1", Some("2001:db8::1"))]);
        let theirs = remote(&[("old.abc.example.com", "198.51.100.2", None)]);
        let cnames_ours: CNameList = vec![CName::new("www.example.com", "new.abc.example.com").unwrap()]
            .into_iter()
            .collect();
        let cnames_theirs: CNameList =
            vec![CName::new("ftp.example.com", "old.abc.example.com").unwrap()]
                .into_iter()
                .collect();

        let changes = ChangeSet::new(
            diff_hosts(&ours, &theirs),
            diff_cnames(&cnames_ours, &cnames_theirs),
        );
        let steps: Vec<String> = changes
            .steps()
            .map(|(action, change)| format!("{} {}", action, change.identity()))
            .collect();

        assert_eq!(
            steps,
            vec![
                "remove ftp.example.com",
                "remove old.abc.example.com",
                "add new.abc.example.com",
                "add new.abc.example.com",
                "add www.example.com",
            ]
        );
        assert_eq!(changes.additions(), 3);
        assert_eq!(changes.removals(), 2);
    }

    #[test]
    fn test_render_lists_both_sides() {
        colored::control::set_override(false);
        let ours = remote(&[("new.abc.example.com", "198.51.100.1", None)]);
        let theirs = remote(&[("old.abc.example.com", "198.51.100.2", None)]);
        let changes = ChangeSet::new(diff_hosts(&ours, &theirs), CNameDiff::default());

        assert_eq!(
            changes.render(),
            "Only in local files:\n\
             +Hostname: new.abc.example.com\tIP: 198.51.100.1\n\
             Only in remote store:\n\
             -Hostname: old.abc.example.com\tIP: 198.51.100.2\n"
        );
    }
}
