//! CLI command implementations

pub mod completions;
pub mod customer;
pub mod import;
pub mod product;
pub mod report;
pub mod status;
