//! # cellery-compose
//!
//! Parser, model builder, and resolver for `.cell` sources.
//!
//! Handles:
//! - **Parser**: Lexing, AST construction, and validation of `.cell` files.
//! - **Component**: Building the in-memory cell model from the AST.
//! - **Scaling**: Translating scaling blocks into HPA- or KPA-shaped policies.
//! - **Graph**: Intra-cell dependency graph and cycle detection.
//! - **Resolver**: Build-time and run-time resolution of identities and hosts.
//! - **Template**: `{{instance_name}}` expansion and host naming.
//! - **Gateway**: Aggregation of component APIs into the gateway ingress table.

pub mod component;
pub mod gateway;
pub mod graph;
pub mod model;
pub mod parser;
pub mod resolver;
pub mod scaling;
pub mod template;
