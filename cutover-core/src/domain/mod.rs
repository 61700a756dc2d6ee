//! Domain types for release orchestration

pub mod artifact;
pub mod pipeline;
pub mod release;
pub mod run;
