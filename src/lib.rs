// ABOUTME: Library root for heckx-deploy - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod backup;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod notify;
pub mod output;
pub mod probe;
pub mod runtime;
pub mod types;
