//! QMS: quality management records with local-first sync
//!
//! Defect reports, products and customers are kept in a local SQLite cache
//! and mirrored to a shared remote store. Every change is visible locally at
//! once; the remote copy catches up when it is reachable.

pub mod cli;
pub mod core;
pub mod entities;
