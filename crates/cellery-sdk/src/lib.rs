//! # cellery-sdk
//!
//! Public SDK for using the cell compiler as a Rust library.
//!
//! Provides two entry points:
//! - [`pipeline`]: `build` and `run` passes over a `.cell` source directory,
//!   returning exit codes or, in their `Result` variants, the written artifacts.
//! - [`CellBuilder`](builder::CellBuilder): Fluent API for declaring a cell in
//!   code instead of a `.cell` file.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use cellery_common::types::CellImageInfo;
//!
//! let info = CellImageInfo::new("myorg", "employee", "1.0.0", "emp-inst");
//! let code = cellery_sdk::pipeline::build(Path::new("samples/employee"), "employee.cell", &info);
//! assert_eq!(code, 0);
//! ```

pub mod builder;
pub mod pipeline;
