//! # Tessera Core Kernel
//!
//! The `kernel` module ties the plugin system together into a load attempt.
//!
//! ## Key Responsibilities & Components:
//!
//! - **Load Attempts**: [`PluginHost`](bootstrap::PluginHost) holds the
//!   registry and [`HostSettings`](bootstrap::HostSettings), runs both
//!   validation stages and then the lifecycle orchestrator, and returns a
//!   [`StartupReport`](bootstrap::StartupReport).
//! - **Core Constants**: Directory names and defaults via the `constants` submodule.
//! - **Error Handling**: The top-level [`Error`](error::Error) and the `Result`
//!   alias plugin callbacks return, in the `error` submodule.
pub mod bootstrap;
pub mod constants;
pub mod error;

pub use bootstrap::{HostSettings, PluginHost, StartupReport};
pub use error::{Error, Result};
