//! helpdesk-core library.
//!
//! Support tickets move through a fixed status workflow gated by an access
//! policy, with comments open only while a ticket is being processed.
//! [`Helpdesk`] is the entry point; it is generic over a [`TicketStore`]
//! ([`MemoryStore`] or [`SqliteStore`]) and a [`clock::Clock`].
//!
//! # Conventions
//!
//! - **Errors**: domain failures are [`HelpdeskError`]; storage and config
//!   plumbing use `anyhow::Result` with context.
//! - **Logging**: `tracing` macros. `info!` for committed writes, `debug!`
//!   for policy denials, `warn!` for lost compare-and-set races.

pub mod clock;
pub mod config;
pub mod db;
pub mod desk;
pub mod error;
pub mod model;
pub mod policy;
pub mod store;
pub mod validate;
pub mod workflow;

pub use db::SqliteStore;
pub use desk::Helpdesk;
pub use error::{ErrorCode, HelpdeskError};
pub use store::{MemoryStore, TicketStore};
