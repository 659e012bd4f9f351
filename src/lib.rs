//! mirrorgroup - RBD mirror group status and lifecycle control
//!
//! - `mirror`: state model, status decoding, lifecycle requests, polling
//! - `observability`: structured logging and counters
//! - `cli`: the `mirrorgroup` command-line tool

pub mod cli;
pub mod mirror;
pub mod observability;
