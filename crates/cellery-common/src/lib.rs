//! # cellery-common
//!
//! Shared types, error definitions, configuration models, and constants
//! used across the Cellery compiler workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and provides the identity primitives and error taxonomy
//! that the compose, manifest, and SDK crates build upon.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
