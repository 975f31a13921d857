// Rust guideline compliant 2026-02-23

//! Adapters for the risk-labeling binary.
//!
//! Each sub-module either implements a hexagonal port from the `domain` crate
//! or moves tables in and out of files. Labeling logic stays in `rfm`.

pub mod csv_table;
pub mod demo_features;
pub mod demo_model;
pub mod sqlite_store;
