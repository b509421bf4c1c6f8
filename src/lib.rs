//! # dh-ddns-updater
//!
//! A dynamic DNS updater daemon for zones hosted on Dreamhost.
//!
//! ## Features
//!
//! - Polls a public IP echo service on a fixed interval
//! - Compares each configured record's live value against the public IP
//! - Rewrites only the records that drifted (remove, then add)
//! - Keeps a small JSON state file to record what was last applied
//!
//! ## Usage
//!
//! ```bash
//! # Run with the system config
//! dh-ddns-updater
//!
//! # Run with a specific config file
//! dh-ddns-updater ./config.toml
//!
//! # Single pass, then exit
//! dh-ddns-updater ./config.toml --once
//! ```

pub mod config;
pub mod detector;
pub mod error;
pub mod providers;
pub mod reconciler;
pub mod scheduler;
pub mod state;

pub use config::{record_key, Config, DomainConfig};
pub use detector::{IpDetector, IpResolver};
pub use error::{DdnsError, Result};
pub use providers::{DnsProvider, DreamhostProvider};
pub use reconciler::{PassReport, Reconciler};
pub use scheduler::Scheduler;
pub use state::State;
