// # hostlist-core
//
// Core library for the host inventory system.
//
// ## Architecture Overview
//
// - **model**: Host, CName and section-header entities
// - **Hostlist / CNameList**: Ordered collections with the consistency checks
// - **consistency**: Runs every check and guards the local dataset
// - **diff**: Per-family host and alias differences, merged into a ChangeSet
// - **SyncEngine**: Reconciles a RecordStore with the validated local dataset
// - **StoreRegistry**: Plugin-based registry for record store factories
// - **source / output**: Loading host files and rendering generated configs
//
// ## Design Principles
//
// 1. **Validate first**: nothing is generated or synced from an inconsistent dataset
// 2. **Deterministic**: identical inputs give identical diffs, orderings and outputs
// 3. **Plugin-Based**: Stores are registered dynamically, no hard-coded if-else
// 4. **Library-First**: The binary is a thin wrapper over this crate

pub mod cnamelist;
pub mod config;
pub mod consistency;
pub mod diff;
pub mod engine;
pub mod error;
pub mod hostlist;
pub mod model;
pub mod output;
pub mod registry;
pub mod source;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use cnamelist::CNameList;
pub use config::{HostlistConfig, IpRangeConfig, StoreConfig, SyncConfig};
pub use consistency::{ConsistencyReport, ValidatedDataset, check_consistency};
pub use diff::{Action, CNameDiff, Change, ChangeSet, HostDiff, diff_cnames, diff_hosts};
pub use engine::{ApplyReport, RunPhase, SyncEngine, SyncEvent, SyncMode, SyncOutcome};
pub use error::{Error, Result};
pub use hostlist::{FileHeader, Hostlist, Provenance};
pub use model::{CName, Detail, Host};
pub use output::OutputFormat;
pub use registry::StoreRegistry;
pub use store::MemoryRecordStore;
pub use traits::{
    AddressRecord, IpFamily, Operator, RecordSnapshot, RecordStore, RecordStoreFactory,
};
