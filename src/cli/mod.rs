//! Command-line interface support for the `lineage` binary.

pub mod commands;
