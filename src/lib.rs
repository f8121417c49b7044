//! ubicheck library exports.
//!
//! The binary is a thin CLI over [`pipeline::run`]; everything is exposed
//! here so integration tests can drive the pipeline with a synthetic
//! [`extract::Extractor`].

pub mod buildroot;
pub mod checks;
pub mod common;
pub mod config;
pub mod error;
pub mod extract;
pub mod image;
pub mod pipeline;
pub mod process;
pub mod report;
pub mod runlog;
