// # Memory Record Store
//
// In-memory implementation of RecordStore.
//
// ## Purpose
//
// Stands in for the remote DNS store when none is configured and in tests.
// Enforces the same constraints a real store does: a name holds at most
// one record per address family, and deleting a missing record fails.
//
// ## Crash Behavior
//
// All records are lost when the process exits.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::config::StoreConfig;
use crate::model::CName;
use crate::traits::{AddressRecord, IpFamily, RecordStore, RecordStoreFactory};

#[derive(Debug, Default)]
struct Records {
    addresses: BTreeMap<(String, IpFamily), AddressRecord>,
    aliases: BTreeMap<String, String>,
}

/// In-memory record store implementation
///
/// Clones share the same records, so a test can keep a handle and inspect
/// what the engine wrote.
///
/// # Example
///
/// ```rust,no_run
/// use hostlist_core::store::MemoryRecordStore;
/// use hostlist_core::traits::{AddressRecord, RecordStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryRecordStore::new();
///     store
///         .create_address_record(&AddressRecord {
///             fqdn: "web1.abc.example.com".to_string(),
///             address: "198.51.100.7".parse()?,
///             shared: false,
///         })
///         .await?;
///
///     assert_eq!(store.list_address_records().await?.len(), 1);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    inner: Arc<RwLock<Records>>,
}

impl MemoryRecordStore {
    /// Create a new empty memory record store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with records
    pub fn with_records(
        addresses: impl IntoIterator<Item = AddressRecord>,
        aliases: impl IntoIterator<Item = CName>,
    ) -> Self {
        let records = Records {
            addresses: addresses
                .into_iter()
                .map(|r| ((r.fqdn.clone(), r.family()), r))
                .collect(),
            aliases: aliases
                .into_iter()
                .map(|c| (c.fqdn().to_string(), c.dest().to_string()))
                .collect(),
        };
        Self {
            inner: Arc::new(RwLock::new(records)),
        }
    }

    /// Total number of address and alias records
    pub async fn len(&self) -> usize {
        let guard = self.inner.read().await;
        guard.addresses.len() + guard.aliases.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list_address_records(&self) -> Result<Vec<AddressRecord>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.addresses.values().cloned().collect())
    }

    async fn list_alias_records(&self) -> Result<BTreeMap<String, String>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.aliases.clone())
    }

    async fn create_address_record(&self, record: &AddressRecord) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        let key = (record.fqdn.clone(), record.family());
        if let Some(existing) = guard.addresses.get(&key) {
            return Err(Error::store(format!(
                "{} record for {} already exists ({})",
                record.family(),
                record.fqdn,
                existing.address
            )));
        }
        if guard.aliases.contains_key(&record.fqdn) {
            return Err(Error::store(format!("{} is an alias", record.fqdn)));
        }
        guard.addresses.insert(key, record.clone());
        Ok(())
    }

    async fn delete_address_record(&self, record: &AddressRecord) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        let key = (record.fqdn.clone(), record.family());
        match guard.addresses.get(&key) {
            Some(existing) if existing.address == record.address => {
                guard.addresses.remove(&key);
                Ok(())
            }
            _ => Err(Error::not_found(format!(
                "{} {} {}",
                record.family(),
                record.fqdn,
                record.address
            ))),
        }
    }

    async fn create_alias_record(&self, cname: &CName) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        if guard.aliases.contains_key(cname.fqdn()) {
            return Err(Error::store(format!("alias {} already exists", cname.fqdn())));
        }
        if guard.addresses.keys().any(|(fqdn, _)| fqdn == cname.fqdn()) {
            return Err(Error::store(format!("{} has address records", cname.fqdn())));
        }
        guard
            .aliases
            .insert(cname.fqdn().to_string(), cname.dest().to_string());
        Ok(())
    }

    async fn delete_alias_record(&self, cname: &CName) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        match guard.aliases.get(cname.fqdn()) {
            Some(dest) if dest == cname.dest() => {
                guard.aliases.remove(cname.fqdn());
                Ok(())
            }
            _ => Err(Error::not_found(format!("alias {}", cname.fqdn()))),
        }
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}

/// Factory for the `memory` store type
pub struct MemoryStoreFactory;

impl RecordStoreFactory for MemoryStoreFactory {
    fn create(&self, config: &StoreConfig) -> Result<Box<dyn RecordStore>, Error> {
        match config {
            StoreConfig::Memory => Ok(Box::new(MemoryRecordStore::new())),
            other => Err(Error::config(format!(
                "memory store cannot be built from a {} store config",
                other.type_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fqdn: &str, address: &str) -> AddressRecord {
        AddressRecord {
            fqdn: fqdn.to_string(),
            address: address.parse().unwrap(),
            shared: false,
        }
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryRecordStore::new();
        assert!(store.is_empty().await);

        let v4 = record("a.example.com", "198.51.100.1");
        let v6 = record("a.example.com", "2001:db8::1");
        store.create_address_record(&v4).await.unwrap();
        store.create_address_record(&v6).await.unwrap();
        assert_eq!(store.len().await, 2);

        // One record per family
        assert!(store
            .create_address_record(&record("a.example.com", "198.51.100.2"))
            .await
            .is_err());

        store.delete_address_record(&v4).await.unwrap();
        assert!(store.delete_address_record(&v4).await.is_err());
        assert_eq!(store.list_address_records().await.unwrap(), vec![v6]);
    }

    #[tokio::test]
    async fn test_memory_store_aliases() {
        let store = MemoryRecordStore::with_records(vec![record("a.example.com", "198.51.100.1")], vec![]);
        let www = CName::new("www.example.com", "a.example.com").unwrap();

        store.create_alias_record(&www).await.unwrap();
        assert!(store.create_alias_record(&www).await.is_err());
        assert!(store
            .create_alias_record(&CName::new("a.example.com", "b.example.com").unwrap())
            .await
            .is_err());

        let aliases = store.list_alias_records().await.unwrap();
        assert_eq!(aliases.get("www.example.com").map(String::as_str), Some("a.example.com"));

        store.delete_alias_record(&www).await.unwrap();
        assert!(store.list_alias_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_records() {
        let store = MemoryRecordStore::new();
        let handle = store.clone();
        store
            .create_address_record(&record("a.example.com", "198.51.100.1"))
            .await
            .unwrap();
        assert_eq!(handle.len().await, 1);
    }
}
