//! Core traits for the hostlist system
//!
//! - [`RecordStore`]: Read and write records of the remote DNS store
//! - [`Operator`]: Present pending changes and confirm them

pub mod operator;
pub mod record_store;

pub use operator::{FixedAnswer, Operator};
pub use record_store::{AddressRecord, IpFamily, RecordSnapshot, RecordStore, RecordStoreFactory};
