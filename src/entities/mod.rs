//! Entity type definitions
//!
//! QMS keeps three collections in sync:
//!
//! - [`Report`] - customer defect reports, keyed `<year>-<seq>`, with an
//!   append-only Activity Log
//! - [`Product`] - catalog products, keyed by catalog code
//! - [`Customer`] - customers, keyed by customer code (renameable)

pub mod customer;
pub mod product;
pub mod report;

pub use customer::{Customer, CustomerPatch};
pub use product::{Product, ProductPatch};
pub use report::{Report, ReportPatch, ReportStatus};
