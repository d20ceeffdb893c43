//! # Workgroup Client
//!
//! **Typed client for the Workgroup API.**
//!
//! - **Identity cache**: one live [`Workgroup`] per name per client, shared by
//!   every lookup until [`WorkgroupClient::clear_cache`]
//! - **Validated rosters**: members and administrators, each split into
//!   people, nested workgroups and certificates, checked before any request
//! - **Privgroups**: nested membership flattened into people, filtered by
//!   affiliation
//! - **Searches**: by name pattern, or by the person/workgroup/certificate
//!   that appears in a roster
//!
//! ## Quick Start
//!
//! ```no_run
//! use workgroup_client::{ClientConfig, NewWorkgroup, WorkgroupClient};
//!
//! # fn main() -> workgroup_client::Result<()> {
//! let client = WorkgroupClient::connect(&ClientConfig::uat("/etc/wg/client.pem"))?;
//! let workgroup = client.create(NewWorkgroup::new("research:sysadmins", "Sysadmins"))?;
//! workgroup.members()?.people().add("akkornel")?;
//! for entry in workgroup.get_privgroup()?.members {
//!     println!("{} ({})", entry.sunetid, entry.name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`client`] | Cache + front door: get, contains, create, searches |
//! | [`workgroup`] | Entity state machine, property setters, refresh/delete |
//! | [`membership`] | Roster sets, facets and containers |
//! | [`privgroup`] | Nested-membership flattening |
//! | [`search`] | Partial search results |
//! | [`api`] | Routes and status classification |
//! | [`transport`] | Authenticated HTTP channel |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `network` | Yes | Mutual-TLS transport (`reqwest` blocking + rustls) |
//! | `test_utils` | No | In-memory `FakeWorkgroupServer` for downstream tests |
//!
//! Entities use `Rc`/`RefCell`: a client and everything it hands out belong
//! to one thread.

// Crate-level lint configuration: stylistic lints only.
#![allow(
    clippy::empty_line_after_doc_comments,
    clippy::doc_lazy_continuation,
    clippy::len_without_is_empty,
    clippy::new_without_default
)]

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod membership;
pub mod privgroup;
pub mod properties;
pub mod record;
pub mod search;
pub mod transport;
pub mod validate;
pub mod workgroup;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

// ── Re-export main types ────────────────────────────────────────────────────
pub use client::WorkgroupClient;
pub use config::{ClientConfig, Environment, Timeout};
pub use error::{ConfigError, Result, TransportError, WorkgroupError};
pub use membership::{MemberId, MemberKind, Membership, MembershipContainer, Side};
pub use privgroup::{PrivgroupContents, PrivgroupEntry};
pub use properties::{Affiliation, WorkgroupFilter, WorkgroupVisibility};
pub use search::{PartialWorkgroup, SearchByResults, SearchResults};
pub use transport::Transport;
pub use workgroup::{NewWorkgroup, Workgroup, WorkgroupProperties};

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version
pub fn get_version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeWorkgroupServer;

    #[test]
    fn test_version() {
        assert!(!get_version().is_empty());
    }

    #[test]
    fn test_end_to_end() {
        let server = FakeWorkgroupServer::new();
        let client = WorkgroupClient::with_transport(server.clone());

        let team = client.create(NewWorkgroup::new("test:team", "Team")).unwrap();
        let leads = client.create(NewWorkgroup::new("test:leads", "Leads")).unwrap();
        server.add_person("lead1", "Lead, One", &[Affiliation::Staff]);
        leads.members().unwrap().people().add("lead1").unwrap();
        team.administrators().unwrap().workgroups().add(&leads).unwrap();
        team.members().unwrap().people().add("member1").unwrap();

        let privgroup = team.get_privgroup().unwrap();
        assert!(privgroup.has_administrator("lead1"));
        assert!(privgroup.has_member("member1"));

        let found = client.search_by_user("lead1").unwrap();
        assert!(found.member_of("test:leads"));

        team.delete().unwrap();
        assert!(!client.contains("test:team").unwrap());
    }
}
