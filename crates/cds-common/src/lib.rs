//! Shared utilities for the CDS workspace
//!
//! This crate provides the pieces every other CDS crate leans on:
//!
//! - Error types ([`error::CdsError`])
//! - Logging configuration and initialization ([`logging`])
//! - Streaming checksums ([`checksum`])
//! - Object store URIs ([`uri::ObjectRef`])
//! - Stamp-file handling ([`stamp`])

pub mod checksum;
pub mod error;
pub mod logging;
pub mod stamp;
pub mod uri;

pub use error::{CdsError, Result};
pub use uri::ObjectRef;
