//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal test doubles that record what the engine
//! asks of the store and the operator.

#![allow(dead_code)]

use async_trait::async_trait;
use hostlist_core::error::{Error, Result};
use hostlist_core::model::CName;
use hostlist_core::source::{add_host_file, parse_cnames};
use hostlist_core::traits::{AddressRecord, Operator, RecordStore};
use hostlist_core::{
    ChangeSet, CNameList, HostlistConfig, Hostlist, MemoryRecordStore, Provenance,
    ValidatedDataset,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A record store that logs every call before delegating to a memory store
///
/// Writes for identities listed in `fail_on` fail without touching the
/// underlying records.
#[derive(Clone)]
pub struct RecordingStore {
    inner: MemoryRecordStore,
    calls: Arc<Mutex<Vec<String>>>,
    fail_on: Arc<BTreeSet<String>>,
}

impl RecordingStore {
    pub fn new(inner: MemoryRecordStore) -> Self {
        Self {
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_on: Arc::new(BTreeSet::new()),
        }
    }

    /// Make writes for the given identities fail
    pub fn failing_on(mut self, identities: &[&str]) -> Self {
        self.fail_on = Arc::new(identities.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Calls made so far, as `"<operation> <identity>"`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Only the write calls
    pub fn writes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("list_"))
            .collect()
    }

    /// The records behind this store
    pub fn records(&self) -> MemoryRecordStore {
        self.inner.clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn write(&self, operation: &str, identity: &str) -> Result<()> {
        self.record(format!("{} {}", operation, identity));
        if self.fail_on.contains(identity) {
            return Err(Error::store(format!("injected failure for {}", identity)));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for RecordingStore {
    async fn list_address_records(&self) -> Result<Vec<AddressRecord>> {
        self.record("list_address_records".to_string());
        self.inner.list_address_records().await
    }

    async fn list_alias_records(&self) -> Result<BTreeMap<String, String>> {
        self.record("list_alias_records".to_string());
        self.inner.list_alias_records().await
    }

    async fn create_address_record(&self, record: &AddressRecord) -> Result<()> {
        self.write(&format!("create_{}", record.family()), &record.fqdn)?;
        self.inner.create_address_record(record).await
    }

    async fn delete_address_record(&self, record: &AddressRecord) -> Result<()> {
        self.write(&format!("delete_{}", record.family()), &record.fqdn)?;
        self.inner.delete_address_record(record).await
    }

    async fn create_alias_record(&self, cname: &CName) -> Result<()> {
        self.write("create_CNAME", cname.fqdn())?;
        self.inner.create_alias_record(cname).await
    }

    async fn delete_alias_record(&self, cname: &CName) -> Result<()> {
        self.write("delete_CNAME", cname.fqdn())?;
        self.inner.delete_alias_record(cname).await
    }

    fn store_name(&self) -> &'static str {
        "recording"
    }
}

/// A record store whose reads fail like an unreachable server
pub struct FailingStore {
    writes: Arc<AtomicUsize>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self {
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            writes: Arc::clone(&other.writes),
        }
    }

    fn count_write(&self) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(Error::http("connection refused"))
    }
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn list_address_records(&self) -> Result<Vec<AddressRecord>> {
        Err(Error::http("connection refused"))
    }

    async fn list_alias_records(&self) -> Result<BTreeMap<String, String>> {
        Err(Error::http("connection refused"))
    }

    async fn create_address_record(&self, _record: &AddressRecord) -> Result<()> {
        self.count_write()
    }

    async fn delete_address_record(&self, _record: &AddressRecord) -> Result<()> {
        self.count_write()
    }

    async fn create_alias_record(&self, _cname: &CName) -> Result<()> {
        self.count_write()
    }

    async fn delete_alias_record(&self, _cname: &CName) -> Result<()> {
        self.count_write()
    }

    fn store_name(&self) -> &'static str {
        "failing"
    }
}

/// A record store serving raw listings that never went through the model
///
/// Used to feed the engine records a real server could return but the
/// model rejects. Writes only count.
pub struct RawStore {
    addresses: Vec<AddressRecord>,
    aliases: BTreeMap<String, String>,
    writes: Arc<AtomicUsize>,
}

impl RawStore {
    pub fn new(addresses: Vec<AddressRecord>, aliases: &[(&str, &str)]) -> Self {
        Self {
            addresses,
            aliases: aliases
                .iter()
                .map(|(fqdn, dest)| (fqdn.to_string(), dest.to_string()))
                .collect(),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn write_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.writes)
    }

    fn count_write(&self) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl RecordStore for RawStore {
    async fn list_address_records(&self) -> Result<Vec<AddressRecord>> {
        Ok(self.addresses.clone())
    }

    async fn list_alias_records(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.aliases.clone())
    }

    async fn create_address_record(&self, _record: &AddressRecord) -> Result<()> {
        self.count_write()
    }

    async fn delete_address_record(&self, _record: &AddressRecord) -> Result<()> {
        self.count_write()
    }

    async fn create_alias_record(&self, _cname: &CName) -> Result<()> {
        self.count_write()
    }

    async fn delete_alias_record(&self, _cname: &CName) -> Result<()> {
        self.count_write()
    }

    fn store_name(&self) -> &'static str {
        "raw"
    }
}

/// An operator with a fixed answer that counts how often it was asked
#[derive(Clone)]
pub struct ScriptedOperator {
    answer: bool,
    presented: Arc<AtomicUsize>,
    confirmed: Arc<AtomicUsize>,
    last_rendering: Arc<Mutex<Option<String>>>,
}

impl ScriptedOperator {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            presented: Arc::new(AtomicUsize::new(0)),
            confirmed: Arc::new(AtomicUsize::new(0)),
            last_rendering: Arc::new(Mutex::new(None)),
        }
    }

    pub fn present_count(&self) -> usize {
        self.presented.load(Ordering::SeqCst)
    }

    pub fn confirm_count(&self) -> usize {
        self.confirmed.load(Ordering::SeqCst)
    }

    pub fn last_rendering(&self) -> Option<String> {
        self.last_rendering.lock().unwrap().clone()
    }
}

impl Operator for ScriptedOperator {
    fn present(&self, changes: &ChangeSet) {
        self.presented.fetch_add(1, Ordering::SeqCst);
        *self.last_rendering.lock().unwrap() = Some(changes.render());
    }

    fn confirm(&self, _changes: &ChangeSet) -> bool {
        self.confirmed.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

/// Configuration used by every contract test
pub fn test_config() -> HostlistConfig {
    let mut config = HostlistConfig::new("example.com");
    config.iprange.internal = Some("10.0.0.0/8".parse().unwrap());
    config.iprange.external = Some("198.51.100.0/24".parse().unwrap());
    config.sync.event_channel_capacity = 100;
    config
}

/// Build a file host list from `(file name, yaml)` pairs
///
/// Panics if any entry fails to load.
pub fn file_hosts(files: &[(&str, &str)], config: &HostlistConfig) -> Hostlist {
    let mut hosts = Hostlist::new(Provenance::Files);
    for (name, content) in files {
        let failures = add_host_file(&mut hosts, name, content, config);
        assert!(failures.is_empty(), "fixture {} failed to load: {:?}", name, failures);
    }
    hosts
}

/// Parse alias-file content
pub fn cnames(content: &str) -> CNameList {
    parse_cnames("cnames", content).unwrap()
}

/// Validate a fixture dataset, panicking if it is inconsistent
pub fn validated(hosts: Hostlist, cnames: CNameList, config: &HostlistConfig) -> ValidatedDataset {
    ValidatedDataset::validate(hosts, cnames, config).unwrap()
}

/// An address record for seeding stores
pub fn a_record(fqdn: &str, address: &str) -> AddressRecord {
    AddressRecord {
        fqdn: fqdn.to_string(),
        address: address.parse().unwrap(),
        shared: false,
    }
}

/// An alias for seeding stores
pub fn alias(fqdn: &str, dest: &str) -> CName {
    CName::new(fqdn, dest).unwrap()
}
