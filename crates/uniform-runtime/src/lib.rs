//! Runtime for the uniform size request portal.
//!
//! - [store]: record stores behind the [store::RecordStore] trait (in-memory
//!   and SQLite)
//! - [workflow]: the approval workflow every action runs through
//! - [wire], [client] and [server]: the JSON action contract, its reqwest
//!   client and its axum server
//! - [session]: owner and staff sessions over a [backend::PortalBackend]

pub mod backend;
pub mod client;
pub mod credential;
pub mod roster;
#[cfg(feature = "portal-server")]
pub mod server;
pub mod session;
pub mod store;
pub mod wire;
pub mod workflow;

pub use backend::{LocalBackend, PortalBackend};
pub use client::{ClientConfig, HttpPortalClient};
pub use credential::{Authorizer, Credential, SharedSecretAuthorizer};
pub use roster::{import_roster, import_roster_file, RosterReport};
#[cfg(feature = "portal-server")]
pub use server::{build_router, serve, ServerConfig};
pub use session::{OwnerSession, StaffSession};
pub use store::{InMemoryRecordStore, RecordStore};
#[cfg(feature = "sqlite-persistence")]
pub use store::SqliteRecordStore;
pub use workflow::ApprovalWorkflow;
