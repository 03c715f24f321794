//! Inventory entities
//!
//! - [`Host`]: an address-bearing host with derived identity and groups
//! - [`CName`]: an alias pointing at a host FQDN
//! - [`SectionHeader`]: metadata shared by the hosts of one file section

pub mod cname;
pub mod header;
pub mod host;
pub mod vars;

pub use cname::CName;
pub use header::{IpRange, SectionHeader};
pub use host::{Detail, GROUP_NEEDS_IP, GROUP_NEEDS_MAC, Host, HostContext, MacAddr};
pub use vars::{VarValue, Vars};
