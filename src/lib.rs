//! # roleenv-config
//!
//! Continuously refreshed deployment-configuration snapshots, sourced from
//! XML files dropped into a monitored directory by an external provisioning
//! agent.
//!
//! ## Overview
//!
//! An external agent writes provisioning XML into a directory. This crate
//! finds the newest genuine configuration file in that directory (unrelated
//! XML is recognized and skipped by a content marker), transforms it into a
//! typed [`Snapshot`](snapshot::Snapshot), and hands that snapshot to
//! subscribed consumers: once at startup, and again whenever the directory
//! changes on disk and a reload produces a different configuration.
//!
//! - **Atomic publication**: readers always see a complete snapshot, never a
//!   partially built one.
//! - **Change-triggered reloads**: any change in the directory triggers a
//!   full rescan, so adds, removes, renames and overwrites all converge on
//!   the latest valid file.
//! - **Failure containment**: a failed reload is logged and the previous
//!   snapshot stays authoritative; no error ever reaches a consumer
//!   callback.
//! - **Self-healing**: watching starts even when the directory is missing or
//!   empty and recovers once files appear.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roleenv_config::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let env = RoleEnvironment::builder()
//!     .directory("/etc/roleenv")
//!     .build()
//!     .await?;
//!
//! let _subscription = env
//!     .subscribe(|snapshot| {
//!         println!(
//!             "instance {} of deployment {}",
//!             snapshot.instance_id, snapshot.deployment_id
//!         );
//!     })
//!     .await;
//!
//! // ... run the application ...
//!
//! env.close().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod notify;
pub mod snapshot;
pub mod source;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{RoleEnvironment, RoleEnvironmentBuilder};
    pub use crate::error::{ConfigError, Result, SchemaError};
    pub use crate::snapshot::{Endpoint, Instance, Role, Snapshot};
}
