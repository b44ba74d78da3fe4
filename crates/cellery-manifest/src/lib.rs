//! # cellery-manifest
//!
//! Serializes a resolved cell into its two artifacts.
//!
//! - **Cell**: the Kubernetes-style `Cell` manifest (YAML).
//! - **Metadata**: the flat image metadata document (JSON).
//! - **Writer**: staged, atomic writing of both artifacts and readers for them.

pub mod cell;
pub mod metadata;
pub mod writer;
