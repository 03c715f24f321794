//! Configuration types for the hostlist system
//!
//! The whole run shares one [`HostlistConfig`], loaded once from `config.yml`
//! and passed by reference to every component that needs it.

use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default name of the configuration file
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Main hostlist configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostlistConfig {
    /// Root domain every host FQDN ends with (e.g. "example.com")
    pub domain: String,

    /// Directory holding the `*.yml` host files and the alias file
    #[serde(default = "default_hostlist_dir")]
    pub hostlist_dir: PathBuf,

    /// Name of the alias file inside `hostlist_dir`
    #[serde(default = "default_cnames_file")]
    pub cnames_file: String,

    /// Directory generated outputs are written to
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,

    /// Internal and external address ranges
    #[serde(default)]
    pub iprange: IpRangeConfig,

    /// Addresses intentionally shared by several hosts
    #[serde(default)]
    pub nonunique_ips: BTreeSet<Ipv4Addr>,

    /// Extra host properties exported to the Ansible inventory
    #[serde(default)]
    pub ansible_vars: Vec<String>,

    /// Whether to verify that `user` properties name existing system users
    #[serde(default)]
    pub check_users: bool,

    /// Remote record store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Sync driver settings
    #[serde(default)]
    pub sync: SyncConfig,
}

impl HostlistConfig {
    /// Create a configuration for the given root domain with defaults
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            hostlist_dir: default_hostlist_dir(),
            cnames_file: default_cnames_file(),
            build_dir: default_build_dir(),
            iprange: IpRangeConfig::default(),
            nonunique_ips: BTreeSet::new(),
            ansible_vars: Vec::new(),
            check_users: false,
            store: StoreConfig::default(),
            sync: SyncConfig::default(),
        }
    }

    /// Load and validate the configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| Error::config(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        tracing::info!("loaded {}", path.display());
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.domain.trim().is_empty() {
            return Err(Error::config("domain cannot be empty"));
        }
        if self.domain.starts_with('.') || self.domain.ends_with('.') {
            return Err(Error::config(format!(
                "domain must not start or end with a dot: {}",
                self.domain
            )));
        }
        if self.cnames_file.is_empty() {
            return Err(Error::config("cnames_file cannot be empty"));
        }
        if self.sync.event_channel_capacity == 0 {
            return Err(Error::config("sync.event_channel_capacity must be > 0"));
        }
        self.store.validate()?;
        Ok(())
    }

    /// Whether the address is whitelisted as shared between hosts
    pub fn is_nonunique(&self, ip: Ipv4Addr) -> bool {
        self.nonunique_ips.contains(&ip)
    }

    /// Path of the alias file
    pub fn cnames_path(&self) -> PathBuf {
        self.hostlist_dir.join(&self.cnames_file)
    }
}

/// Internal and external address ranges
///
/// Hosts inside `internal` are never propagated to the remote store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IpRangeConfig {
    /// Network that is only reachable internally
    #[serde(default)]
    pub internal: Option<Ipv4Network>,

    /// Network every public address must belong to
    #[serde(default)]
    pub external: Option<Ipv4Network>,
}

impl IpRangeConfig {
    /// Whether the address lies in the internal network
    pub fn is_internal(&self, ip: Ipv4Addr) -> bool {
        self.internal.is_some_and(|net| net.contains(ip))
    }

    /// Whether the address lies in the external network (true if none is configured)
    pub fn is_external(&self, ip: Ipv4Addr) -> bool {
        self.external.is_none_or(|net| net.contains(ip))
    }
}

/// Remote record store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// DNSVS web API
    Dnsvs {
        /// API base URL, e.g. "https://dnsvs.example.com/api/2.1/dns"
        root_url: String,
        /// PEM file holding client certificate and key
        cert_path: PathBuf,
        /// Perform reads but only log writes
        #[serde(default)]
        dry_run: bool,
    },

    /// In-memory store (not persistent)
    #[default]
    Memory,

    /// Custom store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            StoreConfig::Dnsvs {
                root_url,
                cert_path,
                ..
            } => {
                if root_url.is_empty() {
                    return Err(Error::config("DNSVS root_url cannot be empty"));
                }
                if !root_url.starts_with("https://") && !root_url.starts_with("http://") {
                    return Err(Error::config(format!(
                        "DNSVS root_url must use HTTP or HTTPS scheme. Got: {}",
                        root_url
                    )));
                }
                if cert_path.as_os_str().is_empty() {
                    return Err(Error::config("DNSVS cert_path cannot be empty"));
                }
                Ok(())
            }
            StoreConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(Error::config("Custom store factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(Error::config("Custom store config cannot be null"));
                }
                Ok(())
            }
            StoreConfig::Memory => Ok(()),
        }
    }

    /// Get the store type name used for registry lookup
    pub fn type_name(&self) -> &str {
        match self {
            StoreConfig::Dnsvs { .. } => "dnsvs",
            StoreConfig::Memory => "memory",
            StoreConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Sync driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Capacity of the driver's event channel
    ///
    /// When full, new events are dropped with a warning.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_hostlist_dir() -> PathBuf {
    PathBuf::from("hostlists")
}

fn default_cnames_file() -> String {
    "cnames".to_string()
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_event_channel_capacity() -> usize {
    1000
}
