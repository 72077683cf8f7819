//! fleetpack-agent: Device-side reconciliation
//!
//! Polls the server for the packets a device's labels resolve to and makes
//! the install root match: unwanted packets are uninstalled, missing ones
//! fetched, verified and installed. Installed packets are tracked as
//! `<hash>.jpk` files in a local cache directory.

pub mod cache;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod source;

pub use cache::PacketCache;
pub use config::{AgentArgs, AgentConfig, AgentSettings};
pub use error::{AgentError, Result};
pub use reconcile::{ItemFailure, PassReport, Reconciler};
pub use source::PacketSource;
