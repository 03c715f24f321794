//! Output projections of a validated dataset
//!
//! Each [`OutputFormat`] renders deterministic text from the hosts and
//! aliases; nothing here mutates the dataset.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde_json::{Map, Value, json};
use tracing::info;

use crate::config::HostlistConfig;
use crate::consistency::ValidatedDataset;
use crate::error::{Error, Result};
use crate::model::{Host, VarValue};

/// A generated configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutputFormat {
    /// ISC dhcpd host blocks
    Dhcp,
    /// /etc/hosts lines
    Hosts,
    /// /etc/ethers lines
    Ethers,
    /// Ansible JSON inventory
    Ansible,
    /// Munin node list
    Munin,
    /// Name list for ssh-keyscan
    SshKnownHosts,
}

impl OutputFormat {
    /// Every format, in a fixed order
    pub const ALL: [OutputFormat; 6] = [
        OutputFormat::Dhcp,
        OutputFormat::Hosts,
        OutputFormat::Ethers,
        OutputFormat::Ansible,
        OutputFormat::Munin,
        OutputFormat::SshKnownHosts,
    ];

    /// Short name used on the command line
    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Dhcp => "dhcp",
            OutputFormat::Hosts => "hosts",
            OutputFormat::Ethers => "ethers",
            OutputFormat::Ansible => "ansible",
            OutputFormat::Munin => "munin",
            OutputFormat::SshKnownHosts => "ssh_known_hosts",
        }
    }

    /// File name inside the build directory
    pub fn file_name(&self) -> &'static str {
        match self {
            OutputFormat::Dhcp => "dhcp_hosts.conf",
            OutputFormat::Hosts => "hosts",
            OutputFormat::Ethers => "ethers",
            OutputFormat::Ansible => "ansible_inventory.json",
            OutputFormat::Munin => "munin_hosts.conf",
            OutputFormat::SshKnownHosts => "ssh_known_hosts_hosts",
        }
    }

    /// Render the dataset in this format
    pub fn render(&self, data: &ValidatedDataset, config: &HostlistConfig) -> Result<String> {
        let hosts: Vec<&Host> = data.hosts().iter().collect();
        let text = match self {
            OutputFormat::Dhcp => render_dhcp(&hosts),
            OutputFormat::Hosts => lines(hosts.iter().filter_map(|h| {
                h.ip().map(|ip| format!("{} {}", ip, h.aliases().join(" ")))
            })),
            OutputFormat::Ethers => lines(hosts.iter().flat_map(|h| match h.mac() {
                Some(mac) => h
                    .aliases()
                    .into_iter()
                    .map(|alias| format!("{} {}", mac, alias))
                    .collect(),
                None => Vec::new(),
            })),
            OutputFormat::Ansible => render_ansible(&hosts, config)?,
            OutputFormat::Munin => render_munin(&hosts),
            OutputFormat::SshKnownHosts => {
                let scanned: Vec<&&Host> = hosts
                    .iter()
                    .filter(|h| h.flag("gen_ssh_known_hosts") && h.ip().is_some())
                    .collect();
                let names = scanned
                    .iter()
                    .flat_map(|h| h.aliases())
                    .chain(scanned.iter().filter_map(|h| h.ip()).map(|ip| ip.to_string()))
                    .chain(data.cnames().iter().map(|c| c.fqdn().to_string()));
                lines(names)
            }
        };
        Ok(text)
    }

    /// Render and write into the build directory, returning the written path
    pub fn write(&self, data: &ValidatedDataset, config: &HostlistConfig) -> Result<PathBuf> {
        let content = self.render(data, config)?;
        std::fs::create_dir_all(&config.build_dir)?;
        let path = config.build_dir.join(self.file_name());
        std::fs::write(&path, content)?;
        info!("Wrote {} output to {}", self.name(), path.display());
        Ok(path)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        OutputFormat::ALL
            .into_iter()
            .find(|format| format.name() == s)
            .ok_or_else(|| Error::invalid_input(format!("unknown output format: {}", s)))
    }
}

fn lines(items: impl Iterator<Item = String>) -> String {
    items.map(|line| line + "\n").collect()
}

fn render_dhcp(hosts: &[&Host]) -> String {
    let mut out = String::new();
    for host in hosts {
        let (Some(mac), Some(ip)) = (host.mac(), host.ip()) else {
            continue;
        };
        out.push_str(&format!(
            "host {fqdn} {{\n        hardware ethernet {mac};\n        fixed-address {ip};\n        \
             option host-name \"{hostname}\";\n        option domain-name \"{domain}\";\n        }}\n",
            fqdn = host.fqdn(),
            mac = mac,
            ip = ip,
            hostname = host.hostname(),
            domain = host.domain(),
        ));
    }
    out
}

fn render_munin(hosts: &[&Host]) -> String {
    let mut out = String::new();
    for host in hosts.iter().filter(|h| h.flag("gen_munin")) {
        out.push_str(&format!(
            "[{}{};{fqdn}]\naddress {fqdn}\n",
            host.institute().unwrap_or_default(),
            host.hosttype().unwrap_or_default(),
            fqdn = host.fqdn()
        ));
        if let Some(extra) = host.var("munin") {
            for line in extra.string_items() {
                out.push_str(&line);
                out.push('\n');
            }
        }
    }
    out
}

fn render_ansible(hosts: &[&Host], config: &HostlistConfig) -> Result<String> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut hostvars = Map::new();

    let exported: Vec<&str> = ["hosttype", "institute"]
        .into_iter()
        .chain(config.ansible_vars.iter().map(String::as_str))
        .collect();

    for host in hosts {
        if host.var("ansible").is_some_and(|v| v == &VarValue::Bool(false)) {
            continue;
        }
        let mut vars = Map::new();
        if let Some(ip) = host.ip() {
            vars.insert("ip".to_string(), Value::String(ip.to_string()));
        }
        for key in &exported {
            if let Some(value) = host.var(key) {
                vars.insert(key.to_string(), serde_json::to_value(value)?);
            }
        }
        hostvars.insert(host.fqdn().to_string(), Value::Object(vars));
        for group in host.groups() {
            groups
                .entry(group.clone())
                .or_default()
                .push(host.fqdn().to_string());
        }
    }

    let mut inventory = Map::new();
    for (group, members) in groups {
        inventory.insert(group, json!({ "hosts": members }));
    }
    inventory.insert("_meta".to_string(), json!({ "hostvars": hostvars }));
    Ok(serde_json::to_string_pretty(&Value::Object(inventory))? + "\n")
}
