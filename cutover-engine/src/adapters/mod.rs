//! Concrete adapters behind the engine's ports
//!
//! - `github`: tarball snapshots from GitHub
//! - `vault`: environment-variable credential vault
//! - `toolchain`: external build command
//! - `http_host`: compute host behind an HTTP API
//! - `memory`: in-process implementations for local runs and tests

pub mod github;
pub mod http_host;
pub mod memory;
pub mod toolchain;
pub mod vault;
