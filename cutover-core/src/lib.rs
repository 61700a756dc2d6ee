//! Cutover Core
//!
//! Core types and abstractions for the cutover release-orchestration system.
//!
//! This crate contains:
//! - Domain types: pipelines, stages, artifacts, versions, run records
//! - Permission model: least-privilege scopes per stage
//! - Error taxonomy shared by the engine and CLI
//! - Pipeline configuration

pub mod config;
pub mod domain;
pub mod error;
pub mod permissions;
