//! Cutover Engine
//!
//! Pipeline execution and deployment-cutover logic:
//! - Ports: traits for the external collaborators (source provider,
//!   credential vault, compute host, build toolchain)
//! - Artifact store: content-addressed handoff between stages
//! - Stage executors: Source, Build, Deploy
//! - Alias manager: atomic compare-and-set cutover
//! - Orchestrator: sequential stage execution with halt-on-first-failure
//! - Run history: append-only audit records
//!
//! Infrastructure provisioning, the compiler itself, and multi-region
//! replication are out of scope; the engine only drives the collaborators
//! behind the port traits.

pub mod adapters;
pub mod alias;
pub mod history;
pub mod orchestrator;
pub mod ports;
pub mod stages;
pub mod store;
