//! Observability plumbing for forgelink.
//!
//! - **Logging**: human-readable or JSON output via `tracing-subscriber`
//! - **Tracing**: trace/span ID generation so every linker operation can be
//!   correlated across cache, resolver and reconciler log lines

pub mod logging;
pub mod tracing_setup;
