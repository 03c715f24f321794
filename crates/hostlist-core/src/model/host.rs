//! Host entity
//!
//! A [`Host`] is built once per run, either from a host-file entry
//! ([`Host::from_vars`]) or from remote address records
//! ([`Host::from_remote`]), and is immutable afterwards.

use std::collections::BTreeSet;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use tracing::{debug, error};

use super::header::SectionHeader;
use super::vars::{VarValue, Vars};
use crate::config::HostlistConfig;
use crate::error::{Error, Result};

/// Group every file host belongs to unless negated with `!needs_ip`
pub const GROUP_NEEDS_IP: &str = "needs_ip";
/// Group every file host belongs to unless negated with `!needs_mac`
pub const GROUP_NEEDS_MAC: &str = "needs_mac";

/// Keys consumed into typed fields instead of the property bag
const STRUCTURAL_KEYS: &[&str] = &["hostname", "ip", "ipv6", "mac", "groups", "nonunique"];

/// Hardware address, normalized to lowercase colon-separated form
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MacAddr(String);

impl MacAddr {
    /// Borrow the normalized text form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for MacAddr {
    type Err = Error;

    /// Accepts six hex pairs separated by `:` or `-`, any case
    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        let well_formed = bytes.len() == 17
            && bytes.iter().enumerate().all(|(i, b)| {
                if i % 3 == 2 {
                    *b == b':' || *b == b'-'
                } else {
                    b.is_ascii_hexdigit()
                }
            });
        if !well_formed {
            return Err(Error::validation(format!("invalid MAC address: {}", s)));
        }
        Ok(MacAddr(s.to_ascii_lowercase().replace('-', ":")))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a file host comes from
#[derive(Debug, Clone, Copy)]
pub struct HostContext<'a> {
    /// Host category, taken from the file name
    pub hosttype: &'a str,
    /// Institute code, taken from the file name (a header may override it)
    pub institute: Option<&'a str>,
    /// Header of the section the host is declared in
    pub header: Option<&'a SectionHeader>,
}

/// How much detail [`Host::describe`] prints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detail {
    /// Hostname only
    Name,
    /// Tab-separated summary with groups
    Summary,
    /// Summary plus MAC, groups and every property
    Full,
}

/// One host of the inventory
#[derive(Debug, Clone, PartialEq)]
pub struct Host {
    hostname: String,
    prefix: String,
    domain: String,
    fqdn: String,
    ip: Option<Ipv4Addr>,
    ipv6: Option<Ipv6Addr>,
    mac: Option<MacAddr>,
    unique: bool,
    public_ip: bool,
    vars: Vars,
    groups: BTreeSet<String>,
}

impl Host {
    /// Build a host from a host-file entry
    ///
    /// Properties are layered: file-name defaults, then the section header,
    /// then the entry itself. Fails on malformed addresses, a missing
    /// hostname or institute, or an address outside the header's range.
    pub fn from_vars(entry: Vars, ctx: &HostContext<'_>, config: &HostlistConfig) -> Result<Self> {
        let mut vars = Vars::new();
        vars.insert("hosttype".to_string(), VarValue::from(ctx.hosttype));
        if let Some(institute) = ctx.institute {
            vars.insert("institute".to_string(), VarValue::from(institute));
        }
        if let Some(header) = ctx.header {
            vars.extend(header.vars.clone());
        }
        vars.extend(entry);

        let hostname = vars
            .get("hostname")
            .map(|v| v.to_string())
            .unwrap_or_default()
            .trim()
            .to_string();
        if hostname.is_empty() {
            return Err(Error::validation(format!(
                "no valid hostname given for entry {:?}",
                vars
            )));
        }

        let ip = match vars.get("ip") {
            None | Some(VarValue::Null) => None,
            Some(value) => Some(parse_ipv4(&value.to_string()).ok_or_else(|| {
                Error::validation(format!(
                    "host {} does not have a valid IP address ({})",
                    hostname, value
                ))
            })?),
        };

        let ipv6 = match vars.get("ipv6") {
            None | Some(VarValue::Null) => None,
            Some(value) => Some(value.to_string().parse::<Ipv6Addr>().map_err(|_| {
                Error::validation(format!(
                    "host {} does not have a valid IPv6 address ({})",
                    hostname, value
                ))
            })?),
        };

        let mac = match vars.get("mac") {
            None | Some(VarValue::Null) => None,
            Some(value) => Some(value.to_string().parse::<MacAddr>().map_err(|_| {
                Error::validation(format!(
                    "host {} does not have a valid MAC address ({})",
                    hostname, value
                ))
            })?),
        };

        let institute = vars
            .get("institute")
            .and_then(VarValue::as_str)
            .map(str::to_string)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::validation(format!("no institute given for {}", hostname)))?;

        let unique = !vars
            .get("nonunique")
            .and_then(VarValue::as_bool)
            .unwrap_or(false);

        let declared: Vec<String> = vars
            .get("groups")
            .map(VarValue::string_items)
            .unwrap_or_default();

        for key in STRUCTURAL_KEYS {
            vars.remove(*key);
        }

        let (prefix, domain, fqdn) = derive_names(&hostname, Some(&institute), &config.domain)?;

        let public_ip = match ip {
            Some(addr) if !config.iprange.is_internal(addr) => {
                if !config.iprange.is_external(addr) {
                    return Err(Error::validation(format!(
                        "{} has IP {} outside of the internal and external networks",
                        fqdn, addr
                    )));
                }
                true
            }
            _ => false,
        };

        if let (Some(addr), Some(range)) = (ip, ctx.header.and_then(|h| h.iprange)) {
            if !range.contains(addr) {
                return Err(Error::validation(format!(
                    "{} has IP {} outside of range {}",
                    fqdn, addr, range
                )));
            }
        }

        let header_groups = ctx.header.map(|h| h.groups.as_slice()).unwrap_or(&[]);
        let groups = compute_groups(&declared, header_groups, ctx.hosttype, &institute);

        let host = Self {
            hostname,
            prefix,
            domain,
            fqdn,
            ip,
            ipv6,
            mac,
            unique,
            public_ip,
            vars,
            groups,
        };
        debug!("Added {}", host);
        Ok(host)
    }

    /// Build a host from records fetched from the remote store
    pub fn from_remote(
        fqdn: &str,
        ip: Option<Ipv4Addr>,
        ipv6: Option<Ipv6Addr>,
        shared: bool,
        config: &HostlistConfig,
    ) -> Result<Self> {
        let fqdn = fqdn.trim_end_matches('.');
        let (prefix, domain, fqdn) = derive_names(fqdn, None, &config.domain)?;

        let mut vars = Vars::new();
        let root_suffix = format!(".{}", config.domain);
        if let Some(institute) = domain.strip_suffix(&root_suffix) {
            if !institute.is_empty() && !institute.contains('.') {
                vars.insert("institute".to_string(), VarValue::from(institute));
            }
        }

        let public_ip = ip.is_some_and(|addr| !config.iprange.is_internal(addr));

        Ok(Self {
            hostname: fqdn.clone(),
            prefix,
            domain,
            fqdn,
            ip,
            ipv6,
            mac: None,
            unique: !shared,
            public_ip,
            vars,
            groups: BTreeSet::new(),
        })
    }

    /// Name as written in the source
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Leading label of the FQDN
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// FQDN without the leading label
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Fully-qualified domain name, the host's identity
    pub fn fqdn(&self) -> &str {
        &self.fqdn
    }

    /// Primary IPv4 address
    pub fn ip(&self) -> Option<Ipv4Addr> {
        self.ip
    }

    /// IPv6 address
    pub fn ipv6(&self) -> Option<Ipv6Addr> {
        self.ipv6
    }

    /// Hardware address
    pub fn mac(&self) -> Option<&MacAddr> {
        self.mac.as_ref()
    }

    /// Whether the IPv4 address belongs to this host alone
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Whether the host has an address that is propagated to the remote store
    pub fn has_public_ip(&self) -> bool {
        self.public_ip
    }

    /// Property bag
    pub fn vars(&self) -> &Vars {
        &self.vars
    }

    /// Look up a single property
    pub fn var(&self, key: &str) -> Option<&VarValue> {
        self.vars.get(key)
    }

    /// Whether a boolean property is set to true
    pub fn flag(&self, key: &str) -> bool {
        self.var(key).and_then(VarValue::as_bool).unwrap_or(false)
    }

    /// Institute code, if known
    pub fn institute(&self) -> Option<&str> {
        self.var("institute").and_then(VarValue::as_str)
    }

    /// Host category, if known
    pub fn hosttype(&self) -> Option<&str> {
        self.var("hosttype").and_then(VarValue::as_str)
    }

    /// Computed group memberships
    pub fn groups(&self) -> &BTreeSet<String> {
        &self.groups
    }

    /// Whether the host belongs to the group
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    /// DNS aliases: the FQDN, the short name and, if the short name starts
    /// with the institute code, the short name without that prefix
    pub fn aliases(&self) -> Vec<String> {
        let mut aliases = vec![self.fqdn.clone(), self.prefix.clone()];
        if let Some(institute) = self.institute() {
            if let Some(stripped) = self.prefix.strip_prefix(institute) {
                if !stripped.is_empty() {
                    aliases.push(stripped.to_string());
                }
            }
        }
        aliases
    }

    /// Whether the host matches the selectors
    ///
    /// A selector names a group or an alias; `!name` excludes. Without any
    /// positive selector every host not excluded matches.
    pub fn select<S: AsRef<str>>(&self, selectors: &[S]) -> bool {
        let aliases = self.aliases();
        let matches = |name: &str| self.groups.contains(name) || aliases.iter().any(|a| a == name);

        let mut has_positive = false;
        let mut positive_hit = false;
        for selector in selectors {
            let selector = selector.as_ref();
            if let Some(negated) = selector.strip_prefix('!') {
                if matches(negated) {
                    return false;
                }
            } else {
                has_positive = true;
                positive_hit |= matches(selector);
            }
        }
        !has_positive || positive_hit
    }

    /// Per-host semantic checks
    ///
    /// An expired `end_date` or a vanished `user` is reported but does not
    /// fail the check; an `end_date` that is not a date does.
    pub fn run_checks(&self, config: &HostlistConfig) -> bool {
        let mut success = true;

        if let Some(end_date) = self.var("end_date") {
            match end_date.as_date() {
                Some(date) if date < chrono::Local::now().date_naive() => {
                    error!("Host end_date {} in the past for host {}.", date, self.hostname);
                }
                Some(_) => {}
                None => {
                    error!(
                        "Parsing of end_date {} led to a non-date value for host {}.",
                        end_date, self.hostname
                    );
                    success = false;
                }
            }
        }

        if config.check_users {
            if let Some(user) = self.var("user").and_then(VarValue::as_str) {
                if !user_exists(user) {
                    error!(
                        "User {} does not exist and is listed for host {}.",
                        user, self.hostname
                    );
                }
            }
        }

        success
    }

    /// Human-readable description at the given detail level
    pub fn describe(&self, detail: Detail) -> String {
        match detail {
            Detail::Name => self.hostname.clone(),
            Detail::Summary => format!("{}\tGroups: {}", self, self.group_list()),
            Detail::Full => {
                let mut out = format!(
                    "{}\tMAC: {}\tGroups: {}",
                    self,
                    self.mac
                        .as_ref()
                        .map(MacAddr::to_string)
                        .unwrap_or_else(|| "(empty)".to_string()),
                    self.group_list()
                );
                if let Some(ipv6) = self.ipv6 {
                    out.push_str(&format!("\tIPv6: {}", ipv6));
                }
                for (key, value) in &self.vars {
                    out.push_str(&format!("\n    {}: {}", key, value));
                }
                out
            }
        }
    }

    fn group_list(&self) -> String {
        self.groups.iter().cloned().collect::<Vec<_>>().join(",")
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hostname: {}\tIP: ", self.fqdn)?;
        match self.ip {
            Some(ip) if !self.unique => write!(f, "{} (nonunique)", ip),
            Some(ip) => write!(f, "{}", ip),
            None => write!(f, "(empty)"),
        }
    }
}

/// Split or synthesize `(prefix, domain, fqdn)` for a name
///
/// A name already ending in the root domain is a full FQDN; anything else
/// becomes `<name>.<institute>.<root>`.
fn derive_names(
    name: &str,
    institute: Option<&str>,
    root_domain: &str,
) -> Result<(String, String, String)> {
    let is_full = name == root_domain || name.ends_with(&format!(".{}", root_domain));
    if is_full || institute.is_none() {
        let (prefix, domain) = name.split_once('.').unwrap_or((name, ""));
        if prefix.is_empty() {
            return Err(Error::validation(format!("invalid hostname: {}", name)));
        }
        return Ok((prefix.to_string(), domain.to_string(), name.to_string()));
    }

    let institute = institute.unwrap_or_default();
    let domain = format!("{}.{}", institute, root_domain);
    let fqdn = format!("{}.{}", name, domain);
    Ok((name.to_string(), domain, fqdn))
}

/// Union of declared, inherited and derived groups, minus negated ones
fn compute_groups(
    declared: &[String],
    inherited: &[String],
    hosttype: &str,
    institute: &str,
) -> BTreeSet<String> {
    let mut groups: BTreeSet<String> = [GROUP_NEEDS_IP, GROUP_NEEDS_MAC]
        .iter()
        .map(|g| g.to_string())
        .collect();
    groups.insert(hosttype.to_string());
    groups.insert(institute.to_string());
    groups.insert(format!("{}{}", institute, hosttype));

    let mut negated = Vec::new();
    for group in inherited.iter().chain(declared) {
        match group.strip_prefix('!') {
            Some(name) => negated.push(name),
            None => {
                groups.insert(group.clone());
            }
        }
    }
    for name in negated {
        groups.remove(name);
    }
    groups
}

/// Strict dotted-quad IPv4 parsing
fn parse_ipv4(s: &str) -> Option<Ipv4Addr> {
    let s = s.trim();
    if s.split('.').count() != 4 {
        return None;
    }
    s.parse().ok()
}

fn user_exists(user: &str) -> bool {
    std::process::Command::new("id")
        .arg(user)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HostlistConfig {
        let mut config = HostlistConfig::new("example.com");
        config.iprange.internal = Some("10.0.0.0/8".parse().unwrap());
        config.iprange.external = Some("198.51.100.0/24".parse().unwrap());
        config
    }

    fn entry(yaml: &str) -> Vars {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn ctx<'a>(header: Option<&'a SectionHeader>) -> HostContext<'a> {
        HostContext {
            hosttype: "desktops",
            institute: Some("abc"),
            header,
        }
    }

    #[test]
    fn test_simple_host() {
        let host = Host::from_vars(
            entry("hostname: host1.abc.example.com\nmac: 00:12:34:ab:CD:EF\nip: 198.51.100.2\n"),
            &ctx(None),
            &config(),
        )
        .unwrap();

        assert_eq!(host.hostname(), "host1.abc.example.com");
        assert_eq!(host.fqdn(), "host1.abc.example.com");
        assert_eq!(host.mac().unwrap().as_str(), "00:12:34:ab:cd:ef");
        assert_eq!(host.ip(), Some(Ipv4Addr::new(198, 51, 100, 2)));
        assert!(host.has_public_ip());
        assert!(host.is_unique());
        assert_eq!(host.aliases(), vec!["host1.abc.example.com", "host1"]);
    }

    #[test]
    fn test_fqdn_synthesized_and_prefix_alias() {
        let host = Host::from_vars(entry("hostname: abcpc7\nip: 10.1.2.3\n"), &ctx(None), &config())
            .unwrap();

        assert_eq!(host.fqdn(), "abcpc7.abc.example.com");
        assert_eq!(host.domain(), "abc.example.com");
        assert!(!host.has_public_ip());
        assert_eq!(
            host.aliases(),
            vec!["abcpc7.abc.example.com", "abcpc7", "pc7"]
        );
    }

    #[test]
    fn test_mac_normalization() {
        let mac: MacAddr = "00-12-34-AB-CD-EF".parse().unwrap();
        assert_eq!(mac.to_string(), "00:12:34:ab:cd:ef");
        assert!("00:12:34:ab:cd".parse::<MacAddr>().is_err());
        assert!("00:12:34:ab:cd:eg".parse::<MacAddr>().is_err());
        assert!("0012.34ab.cdef.01".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_invalid_fields_rejected() {
        let cfg = config();
        assert!(Host::from_vars(entry("hostname: h\nip: 198.51.100\n"), &ctx(None), &cfg).is_err());
        assert!(Host::from_vars(entry("hostname: h\nip: 300.1.1.1\n"), &ctx(None), &cfg).is_err());
        assert!(Host::from_vars(entry("hostname: h\nmac: nope\n"), &ctx(None), &cfg).is_err());
        assert!(Host::from_vars(entry("hostname: h\nipv6: zz::1\n"), &ctx(None), &cfg).is_err());
        assert!(Host::from_vars(entry("hostname: ''\n"), &ctx(None), &cfg).is_err());
        // public address outside of the external network
        assert!(Host::from_vars(entry("hostname: h\nip: 203.0.113.5\n"), &ctx(None), &cfg).is_err());

        let no_institute = HostContext {
            hosttype: "servers",
            institute: None,
            header: None,
        };
        assert!(Host::from_vars(entry("hostname: h\n"), &no_institute, &cfg).is_err());
    }

    #[test]
    fn test_header_range_enforced() {
        let header: SectionHeader =
            serde_yaml::from_str("iprange: [198.51.100.10, 198.51.100.20]").unwrap();
        let cfg = config();

        assert!(
            Host::from_vars(entry("hostname: h\nip: 198.51.100.15\n"), &ctx(Some(&header)), &cfg)
                .is_ok()
        );
        let err = Host::from_vars(entry("hostname: h\nip: 198.51.100.21\n"), &ctx(Some(&header)), &cfg)
            .unwrap_err();
        assert!(err.to_string().contains("outside of range"));
    }

    #[test]
    fn test_group_computation() {
        let header: SectionHeader =
            serde_yaml::from_str("groups: [headergroup]\ninstitute: xyz\n").unwrap();
        let host = Host::from_vars(
            entry("hostname: h3\ngroups: [extragroup, '!needs_mac']\n"),
            &ctx(Some(&header)),
            &config(),
        )
        .unwrap();

        let groups: Vec<&str> = host.groups().iter().map(String::as_str).collect();
        assert_eq!(
            groups,
            vec!["desktops", "extragroup", "headergroup", "needs_ip", "xyz", "xyzdesktops"]
        );
        assert_eq!(host.fqdn(), "h3.xyz.example.com");

        let opted_out = Host::from_vars(
            entry("hostname: h4\ngroups: ['!headergroup', othergroup]\n"),
            &ctx(Some(&header)),
            &config(),
        )
        .unwrap();
        assert!(!opted_out.in_group("headergroup"));
        assert!(opted_out.in_group("othergroup"));
        assert!(opted_out.in_group(GROUP_NEEDS_MAC));
    }

    #[test]
    fn test_select() {
        let host = Host::from_vars(
            entry("hostname: abcpc7\nip: 10.1.2.3\ngroups: [gpu]\n"),
            &ctx(None),
            &config(),
        )
        .unwrap();

        assert!(host.select::<&str>(&[]));
        assert!(host.select(&["gpu"]));
        assert!(host.select(&["pc7"]));
        assert!(host.select(&["other", "abcdesktops"]));
        assert!(!host.select(&["other"]));
        assert!(!host.select(&["gpu", "!abcpc7"]));
        assert!(host.select(&["!other"]));
    }

    #[test]
    fn test_run_checks() {
        let cfg = config();
        let expired = Host::from_vars(
            entry("hostname: nb1\nend_date: 2001-01-01\n"),
            &ctx(None),
            &cfg,
        )
        .unwrap();
        assert!(expired.run_checks(&cfg));

        let malformed = Host::from_vars(
            entry("hostname: nb2\nend_date: someday\n"),
            &ctx(None),
            &cfg,
        )
        .unwrap();
        assert!(!malformed.run_checks(&cfg));
    }

    #[test]
    fn test_remote_host() {
        let host = Host::from_remote(
            "web1.abc.example.com.",
            Some(Ipv4Addr::new(198, 51, 100, 9)),
            None,
            true,
            &config(),
        )
        .unwrap();

        assert_eq!(host.fqdn(), "web1.abc.example.com");
        assert_eq!(host.prefix(), "web1");
        assert_eq!(host.institute(), Some("abc"));
        assert!(!host.is_unique());
        assert!(host.has_public_ip());
        assert!(host.groups().is_empty());
        assert_eq!(
            host.to_string(),
            "Hostname: web1.abc.example.com\tIP: 198.51.100.9 (nonunique)"
        );
    }
}
