//! Core lifecycle types: the configuration handle and its builder.

mod builder;
mod handle;

pub use builder::{CONFIG_DIR_ENV, RoleEnvironmentBuilder};
pub use handle::RoleEnvironment;
