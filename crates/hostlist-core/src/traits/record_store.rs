// # Record Store Trait
//
// Defines the interface to the remote DNS record store.
//
// ## Implementations
//
// - DNSVS: `hostlist-dnsvs` crate
// - In-memory: `crate::store::MemoryRecordStore`
//
// ## Usage
//
// ```rust,ignore
// use hostlist_core::{AddressRecord, RecordStore};
//
// async fn show(store: &dyn RecordStore) -> hostlist_core::Result<()> {
//     for record in store.list_address_records().await? {
//         println!("{} {}", record.fqdn, record.address);
//     }
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

use crate::model::{CName, Host};

/// Address family of an address record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IpFamily {
    /// A record
    V4,
    /// AAAA record
    V6,
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::V4 => f.write_str("A"),
            IpFamily::V6 => f.write_str("AAAA"),
        }
    }
}

/// One address record as held by the remote store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AddressRecord {
    /// Record name, without trailing dot
    pub fqdn: String,
    /// Address the name resolves to
    pub address: IpAddr,
    /// Whether the address may be shared with other names
    pub shared: bool,
}

impl AddressRecord {
    /// The record a host needs for the given family, if it has that address
    pub fn for_host(host: &Host, family: IpFamily) -> Option<Self> {
        let address = match family {
            IpFamily::V4 => IpAddr::V4(host.ip()?),
            IpFamily::V6 => IpAddr::V6(host.ipv6()?),
        };
        Some(Self {
            fqdn: host.fqdn().to_string(),
            address,
            shared: !host.is_unique(),
        })
    }

    /// Address family of the record
    pub fn family(&self) -> IpFamily {
        match self.address {
            IpAddr::V4(_) => IpFamily::V4,
            IpAddr::V6(_) => IpFamily::V6,
        }
    }
}

/// Every record of the managed zone, as read at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSnapshot {
    /// A and AAAA records
    pub addresses: Vec<AddressRecord>,
    /// Aliases as `alias -> destination`
    pub aliases: BTreeMap<String, String>,
}

/// Trait for remote record stores
///
/// The sync engine is the only caller. Stores perform exactly one remote
/// operation per call and never retry; the engine logs a failed write and
/// moves on to the next change.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch every address record (A and AAAA) of the managed zone
    async fn list_address_records(&self) -> Result<Vec<AddressRecord>, crate::Error>;

    /// Fetch every alias record as `alias -> destination`
    async fn list_alias_records(&self) -> Result<BTreeMap<String, String>, crate::Error>;

    /// Fetch address and alias records together
    ///
    /// Stores that can read both from one snapshot should override this.
    async fn list_records(&self) -> Result<RecordSnapshot, crate::Error> {
        Ok(RecordSnapshot {
            addresses: self.list_address_records().await?,
            aliases: self.list_alias_records().await?,
        })
    }

    /// Create an address record
    async fn create_address_record(&self, record: &AddressRecord) -> Result<(), crate::Error>;

    /// Delete an address record
    async fn delete_address_record(&self, record: &AddressRecord) -> Result<(), crate::Error>;

    /// Create an alias record
    async fn create_alias_record(&self, cname: &CName) -> Result<(), crate::Error>;

    /// Delete an alias record
    async fn delete_alias_record(&self, cname: &CName) -> Result<(), crate::Error>;

    /// Get the store name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}

/// Helper trait for constructing record stores from configuration
pub trait RecordStoreFactory: Send + Sync {
    /// Create a RecordStore instance from configuration
    fn create(
        &self,
        config: &crate::config::StoreConfig,
    ) -> Result<Box<dyn RecordStore>, crate::Error>;
}
