//! # ProfileHub Importer
//!
//! Batch reconciliation of legacy user rows into the live system.
//!
//! The importer merges an exported batch from the legacy system without
//! data loss or duplication: rows whose legacy identity already maps to a
//! local profile are skipped untouched, new rows become accounts with
//! their security questions and answers reconstructed, and a dry-run mode
//! previews a batch without persisting any user.
//!
//! ## Modules
//!
//! - `rows`: Batch row format and parsing
//! - `reconciler`: Per-row reconciliation and the batch report

pub mod reconciler;
pub mod rows;
