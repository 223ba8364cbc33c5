//! dirforge
//!
//! A translation engine for directory and network configuration changes.
//! High-level intents become the low-level artifacts the managed services
//! consume: LDIF change records for the directory, `samba-tool` command
//! phrases for DNS and group policy, and byte-faithful edits to the DHCP
//! server's config file.
//!
//! Translation ([`intent::translate`]) is pure; the optional [`apply`]
//! layer carries artifacts to hosts over a pluggable [`executor`].
//!
#![warn(clippy::pedantic)]

pub mod apply;
pub mod config;
pub mod dhcp;
pub mod error;
pub mod executor;
pub mod intent;
pub mod ldif;
pub mod phrase;

pub use apply::{Applied, Applier};
pub use config::{Config, SharedConfig};
pub use error::Error;
pub use executor::{DynExecutor, InMemoryExecutor, RemoteExecutor};
pub use intent::{translate, Artifact, Intent};
