// # DNSVS Record Store
//
// This crate provides the DNSVS web-API implementation of the RecordStore
// trait.
//
// ## Behavior
//
// - One HTTP request per store call; no retries (a failed write is logged by
//   the engine and retried on the next run)
// - Client-certificate authentication (PEM file holding cert and key)
// - HTTP timeout configured (30 seconds)
// - Status codes mapped to typed errors (401/403, 404, everything else)
// - Dry-run mode: reads are performed, writes are only logged
//
// ## API Reference
//
// - List records: GET `{root}/record/list`
// - Create records: POST `{root}/record/create`
// - Delete records: POST `{root}/record/delete`
//
// Write bodies are JSON lists of `param_list` objects; names are sent with a
// trailing dot and the record kind is selected by `inttype`.

use async_trait::async_trait;
use hostlist_core::config::StoreConfig;
use hostlist_core::model::CName;
use hostlist_core::traits::{
    AddressRecord, IpFamily, RecordSnapshot, RecordStore, RecordStoreFactory,
};
use hostlist_core::{Error, Result};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const STORE_NAME: &str = "dnsvs";

const INTTYPE_A: &str = "dflt:0100,:,403,A";
const INTTYPE_A_SHARED: &str = "dflt:1100,:,400,A";
const INTTYPE_AAAA: &str = "dflt:0100,:,403,AAAA";
const INTTYPE_AAAA_SHARED: &str = "dflt:1100,:,400,AAAA";
const INTTYPE_CNAME: &str = "alias:0000,dflt:0100,011,CNAME";

/// One entry of the record list
#[derive(Debug, Clone, Deserialize)]
struct RecordEntry {
    fqdn: String,
    #[serde(rename = "type")]
    record_type: String,
    data: String,
    #[serde(default)]
    inttype: String,
}

/// DNSVS record store
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the store will:
/// - Perform all list requests
/// - Log the intended create/delete payload
/// - **NOT** actually modify DNS records
pub struct DnsvsStore {
    /// API base URL, without trailing slash
    root_url: String,

    /// HTTP client carrying the client certificate
    client: reqwest::Client,

    /// Dry-run mode: if true, perform reads but skip writes
    dry_run: bool,
}

impl std::fmt::Debug for DnsvsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsvsStore")
            .field("root_url", &self.root_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl DnsvsStore {
    /// Create a new DNSVS store
    ///
    /// # Parameters
    ///
    /// - `root_url`: API base URL, e.g. `https://dnsvs.example.com/api/2.1/dns`
    /// - `cert_pem`: PEM-encoded client certificate followed by its private key
    /// - `dry_run`: If true, perform reads but skip writes
    pub fn new(root_url: impl Into<String>, cert_pem: &[u8], dry_run: bool) -> Result<Self> {
        let identity = reqwest::Identity::from_pem(cert_pem)
            .map_err(|e| Error::config(format!("invalid DNSVS client certificate: {}", e)))?;
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .identity(identity)
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(root_url, client, dry_run))
    }

    /// Create a store from a certificate file
    pub fn from_cert_file(
        root_url: impl Into<String>,
        cert_path: &Path,
        dry_run: bool,
    ) -> Result<Self> {
        let pem = std::fs::read(cert_path).map_err(|e| {
            Error::config(format!(
                "cannot read DNSVS certificate {}: {}",
                cert_path.display(),
                e
            ))
        })?;
        Self::new(root_url, &pem, dry_run)
    }

    /// Create a store around an existing HTTP client
    pub fn with_client(root_url: impl Into<String>, client: reqwest::Client, dry_run: bool) -> Self {
        let root_url = root_url.into().trim_end_matches('/').to_string();
        Self {
            root_url,
            client,
            dry_run,
        }
    }

    /// Whether writes are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn url(&self, path: &str) -> String {
        format!("{}/record/{}", self.root_url, path)
    }

    /// Fetch the full record list
    ///
    /// # API Call
    ///
    /// ```http
    /// GET {root}/record/list
    /// ```
    async fn list(&self) -> Result<Vec<RecordEntry>> {
        let response = self
            .client
            .get(self.url("list"))
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e)))?;
        let response = check_status(response, "record list").await?;

        response
            .json()
            .await
            .map_err(|e| Error::provider(STORE_NAME, format!("Failed to parse record list: {}", e)))
    }

    /// POST a write request, or log it in dry-run mode
    async fn post(&self, path: &str, body: Value) -> Result<()> {
        if self.dry_run {
            tracing::info!("[DRY-RUN] Would POST {}: {}", self.url(path), body);
            return Ok(());
        }

        tracing::debug!("POST {}: {}", self.url(path), body);
        let response = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e)))?;
        check_status(response, path).await?;
        Ok(())
    }
}

/// Map non-success status codes to typed errors
async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());

    Err(match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "DNSVS rejected the client certificate. Status: {}",
            status
        )),
        404 => Error::not_found(format!("{}: {}", what, error_text)),
        _ => Error::provider(
            STORE_NAME,
            format!("{} failed: {} - {}", what, status, error_text),
        ),
    })
}

fn address_inttype(family: IpFamily, shared: bool) -> &'static str {
    match (family, shared) {
        (IpFamily::V4, false) => INTTYPE_A,
        (IpFamily::V4, true) => INTTYPE_A_SHARED,
        (IpFamily::V6, false) => INTTYPE_AAAA,
        (IpFamily::V6, true) => INTTYPE_AAAA_SHARED,
    }
}

fn absolute(name: &str) -> String {
    format!("{}.", name.trim_end_matches('.'))
}

/// Split the record list into address records and aliases
///
/// Other record types are ignored; entries that cannot be interpreted are
/// logged and skipped.
fn split_records(entries: Vec<RecordEntry>) -> RecordSnapshot {
    let mut snapshot = RecordSnapshot::default();

    for entry in entries {
        let fqdn = entry.fqdn.trim_end_matches('.').to_string();
        match entry.record_type.as_str() {
            "A" | "AAAA" => match entry.data.parse::<IpAddr>() {
                Ok(address) => snapshot.addresses.push(AddressRecord {
                    shared: entry.inttype == INTTYPE_A_SHARED
                        || entry.inttype == INTTYPE_AAAA_SHARED,
                    fqdn,
                    address,
                }),
                Err(_) => tracing::warn!(
                    "Skipping {} record {} with unparsable data {}",
                    entry.record_type,
                    fqdn,
                    entry.data
                ),
            },
            "CNAME" => {
                let dest = entry.data.trim_end_matches('.');
                if fqdn.is_empty() || dest.is_empty() {
                    tracing::warn!("Skipping CNAME record {} -> {:?}", fqdn, entry.data);
                } else {
                    snapshot.aliases.insert(fqdn, dest.to_string());
                }
            }
            _ => {}
        }
    }
    snapshot
}

fn create_address_body(record: &AddressRecord) -> Value {
    json!([{ "param_list": [
        { "name": "fqdn", "new_value": absolute(&record.fqdn) },
        { "name": "inttype", "new_value": address_inttype(record.family(), record.shared) },
        { "name": "data", "new_value": record.address.to_string() },
    ]}])
}

fn delete_address_body(record: &AddressRecord) -> Value {
    json!([{ "param_list": [
        { "name": "fqdn", "old_value": absolute(&record.fqdn) },
        { "name": "data", "old_value": record.address.to_string() },
        { "name": "inttype", "old_value": address_inttype(record.family(), record.shared) },
    ]}])
}

fn create_alias_body(cname: &CName) -> Value {
    json!([{ "param_list": [
        { "name": "fqdn", "new_value": absolute(cname.fqdn()) },
        { "name": "data", "new_value": absolute(cname.dest()) },
        { "name": "inttype", "new_value": INTTYPE_CNAME },
    ]}])
}

fn delete_alias_body(cname: &CName) -> Value {
    json!([{ "param_list": [
        { "name": "fqdn", "old_value": absolute(cname.fqdn()) },
        { "name": "data", "old_value": absolute(cname.dest()) },
        { "name": "inttype", "old_value": INTTYPE_CNAME },
    ]}])
}

#[async_trait]
impl RecordStore for DnsvsStore {
    async fn list_address_records(&self) -> Result<Vec<AddressRecord>> {
        Ok(self.list_records().await?.addresses)
    }

    async fn list_alias_records(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.list_records().await?.aliases)
    }

    /// One `record/list` call serves both record kinds
    async fn list_records(&self) -> Result<RecordSnapshot> {
        let snapshot = split_records(self.list().await?);
        tracing::debug!(
            "DNSVS holds {} address records and {} aliases",
            snapshot.addresses.len(),
            snapshot.aliases.len()
        );
        Ok(snapshot)
    }

    async fn create_address_record(&self, record: &AddressRecord) -> Result<()> {
        self.post("create", create_address_body(record)).await
    }

    async fn delete_address_record(&self, record: &AddressRecord) -> Result<()> {
        self.post("delete", delete_address_body(record)).await
    }

    async fn create_alias_record(&self, cname: &CName) -> Result<()> {
        self.post("create", create_alias_body(cname)).await
    }

    async fn delete_alias_record(&self, cname: &CName) -> Result<()> {
        self.post("delete", delete_alias_body(cname)).await
    }

    fn store_name(&self) -> &'static str {
        STORE_NAME
    }
}

/// Factory for creating DNSVS stores
pub struct DnsvsFactory;

impl RecordStoreFactory for DnsvsFactory {
    fn create(&self, config: &StoreConfig) -> Result<Box<dyn RecordStore>> {
        match config {
            StoreConfig::Dnsvs {
                root_url,
                cert_path,
                dry_run,
            } => {
                if *dry_run {
                    tracing::warn!("DNSVS store running in DRY-RUN mode - no changes will be made");
                }
                Ok(Box::new(DnsvsStore::from_cert_file(
                    root_url.clone(),
                    cert_path,
                    *dry_run,
                )?))
            }
            _ => Err(Error::config("Invalid config for DNSVS store")),
        }
    }
}

/// Register the DNSVS store with a registry
///
/// # Example
///
/// ```rust
/// let registry = hostlist_core::StoreRegistry::with_builtin();
/// hostlist_dnsvs::register(&registry);
/// assert!(registry.has_store("dnsvs"));
/// ```
pub fn register(registry: &hostlist_core::StoreRegistry) {
    registry.register_store(STORE_NAME, Box::new(DnsvsFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(fqdn: &str, record_type: &str, data: &str, inttype: &str) -> RecordEntry {
        RecordEntry {
            fqdn: fqdn.to_string(),
            record_type: record_type.to_string(),
            data: data.to_string(),
            inttype: inttype.to_string(),
        }
    }

    #[test]
    fn test_split_records() {
        let snapshot = split_records(vec![
            entry("web1.abc.example.com.", "A", "198.51.100.7", INTTYPE_A),
            entry("gw.abc.example.com.", "A", "198.51.100.1", INTTYPE_A_SHARED),
            entry("web1.abc.example.com.", "AAAA", "2001:db8::7", INTTYPE_AAAA),
            entry("www.example.com.", "CNAME", "web1.abc.example.com.", INTTYPE_CNAME),
            entry("example.com.", "MX", "10 mail.example.com.", ""),
            entry("broken.example.com.", "A", "not-an-ip", INTTYPE_A),
            entry("dangling.example.com.", "CNAME", "", INTTYPE_CNAME),
        ]);
        let (addresses, aliases) = (snapshot.addresses, snapshot.aliases);

        assert_eq!(addresses.len(), 3);
        assert_eq!(addresses[0].fqdn, "web1.abc.example.com");
        assert!(!addresses[0].shared);
        assert!(addresses[1].shared);
        assert_eq!(addresses[2].family(), IpFamily::V6);
        assert_eq!(
            aliases.get("www.example.com").map(String::as_str),
            Some("web1.abc.example.com")
        );
        assert_eq!(aliases.len(), 1);
    }

    #[test]
    fn test_list_response_parses() {
        let body = r#"[
            {"fqdn": "web1.abc.example.com.", "type": "A", "data": "198.51.100.7",
             "inttype": "dflt:0100,:,403,A", "ttl": 3600}
        ]"#;
        let entries: Vec<RecordEntry> = serde_json::from_str(body).unwrap();
        assert_eq!(entries[0].record_type, "A");
    }

    #[test]
    fn test_write_bodies() {
        let shared = AddressRecord {
            fqdn: "gw.abc.example.com".to_string(),
            address: "198.51.100.1".parse().unwrap(),
            shared: true,
        };
        let body = create_address_body(&shared);
        let params = &body[0]["param_list"];
        assert_eq!(params[0]["new_value"], "gw.abc.example.com.");
        assert_eq!(params[1]["new_value"], INTTYPE_A_SHARED);
        assert_eq!(params[2]["new_value"], "198.51.100.1");

        let body = delete_address_body(&shared);
        assert_eq!(body[0]["param_list"][0]["old_value"], "gw.abc.example.com.");

        let cname = CName::new("www.example.com", "web1.abc.example.com").unwrap();
        let body = create_alias_body(&cname);
        assert_eq!(body[0]["param_list"][1]["new_value"], "web1.abc.example.com.");
        assert_eq!(body[0]["param_list"][2]["new_value"], INTTYPE_CNAME);
        assert_eq!(delete_alias_body(&cname)[0]["param_list"][0]["old_value"], "www.example.com.");
    }

    #[test]
    fn test_inttype_per_family() {
        assert_eq!(address_inttype(IpFamily::V4, false), INTTYPE_A);
        assert_eq!(address_inttype(IpFamily::V6, true), INTTYPE_AAAA_SHARED);
    }

    #[tokio::test]
    async fn test_dry_run_never_sends() {
        // Nothing listens on this port; a real request would fail.
        let store = DnsvsStore::with_client("http://127.0.0.1:9/api/", reqwest::Client::new(), true);
        assert!(store.is_dry_run());
        assert_eq!(store.url("list"), "http://127.0.0.1:9/api/record/list");

        let cname = CName::new("www.example.com", "web1.abc.example.com").unwrap();
        store.create_alias_record(&cname).await.unwrap();
        store.delete_alias_record(&cname).await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let store = DnsvsStore::with_client("http://127.0.0.1:9", reqwest::Client::new(), false);
        let err = store.list_address_records().await.unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_factory_rejects_other_configs() {
        assert!(DnsvsFactory.create(&StoreConfig::Memory).is_err());

        let missing_cert = StoreConfig::Dnsvs {
            root_url: "https://dnsvs.example.com/api/2.1/dns".to_string(),
            cert_path: "/nonexistent/cert.pem".into(),
            dry_run: false,
        };
        assert!(matches!(DnsvsFactory.create(&missing_cert), Err(Error::Config(_))));
    }
}
