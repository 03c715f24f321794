//! Contract Test: Diff Properties
//!
//! Constraints verified:
//! - diff(A, A) is empty
//! - diff(A, B).add == diff(B, A).remove, for hosts of both families and aliases
//! - Only publicly addressed hosts take part

mod common;

use common::*;
use hostlist_core::{CNameList, Hostlist, diff_cnames, diff_hosts};

fn first() -> Hostlist {
    file_hosts(
        &[(
            "servers-abc.yml",
            "header: {}\nhosts:\n  - {hostname: a, ip: 198.51.100.1, ipv6: '2001:db8::1', mac: '00:00:00:00:00:01'}\n  - {hostname: b, ip: 198.51.100.2, mac: '00:00:00:00:00:02'}\n  - {hostname: c, ip: 10.0.0.3, mac: '00:00:00:00:00:03'}\n",
        )],
        &test_config(),
    )
}

fn second() -> Hostlist {
    file_hosts(
        &[(
            "servers-abc.yml",
            "header: {}\nhosts:\n  - {hostname: a, ip: 198.51.100.1, mac: '00:00:00:00:00:01'}\n  - {hostname: b, ip: 198.51.100.22, mac: '00:00:00:00:00:02'}\n  - {hostname: d, ip: 198.51.100.4, ipv6: '2001:db8::4', mac: '00:00:00:00:00:04'}\n",
        )],
        &test_config(),
    )
}

fn fqdns(hosts: &[hostlist_core::Host]) -> Vec<&str> {
    hosts.iter().map(|h| h.fqdn()).collect()
}

#[test]
fn diff_with_itself_is_empty() {
    assert!(diff_hosts(&first(), &first()).is_empty());
    let aliases = cnames("cname=www.example.com,a.abc.example.com\n");
    assert!(diff_cnames(&aliases, &aliases).is_empty());
}

#[test]
fn host_diff_is_symmetric() {
    let forward = diff_hosts(&first(), &second());
    let backward = diff_hosts(&second(), &first());

    assert_eq!(forward.add, backward.remove);
    assert_eq!(forward.remove, backward.add);
    assert_eq!(forward.add_v6, backward.remove_v6);
    assert_eq!(forward.remove_v6, backward.add_v6);

    assert_eq!(fqdns(&forward.add), vec!["b.abc.example.com"]);
    assert_eq!(fqdns(&forward.remove), vec!["b.abc.example.com", "d.abc.example.com"]);
    assert_eq!(fqdns(&forward.add_v6), vec!["a.abc.example.com"]);
    assert_eq!(fqdns(&forward.remove_v6), vec!["d.abc.example.com"]);
}

#[test]
fn alias_diff_is_symmetric() {
    let ours: CNameList = cnames("cname=www.example.com,a.abc.example.com\ncname=ftp.example.com,b.abc.example.com\n");
    let theirs: CNameList = cnames("cname=www.example.com,b.abc.example.com\ncname=git.example.com,a.abc.example.com\n");

    let forward = diff_cnames(&ours, &theirs);
    let backward = diff_cnames(&theirs, &ours);
    assert_eq!(forward.add, backward.remove);
    assert_eq!(forward.remove, backward.add);
    assert_eq!(forward.add.len(), 2);
    assert_eq!(forward.remove.len(), 2);
}
