//! # nydus-builder
//!
//! Drives the external `nydus-image` tool, which produces RAFS bootstraps
//! and data blobs.
//!
//! This crate provides functionality for:
//! - Creating a layer bootstrap and blob from a root filesystem
//! - Compacting a bootstrap and its blobs
//! - Generating a chunk dictionary from several bootstraps
//! - Validating a bootstrap
//!
//! Each operation turns an options struct into an argument vector and runs
//! `nydus-image` synchronously; see [`Builder`].

mod builder;
mod error;
mod options;
mod sink;

pub use builder::Builder;
pub use error::{Error, FailureKind, Result};
pub use options::{BuildOptions, CheckOptions, CompactOptions, GenerateOptions};
pub use sink::Sink;
