//! Financial report generation.
//!
//! Pure business logic over pre-aggregated rows supplied by the
//! storage layer:
//! - Trial Balance
//! - Transaction Summary
//! - Account Reconciliation

pub mod error;
pub mod service;
pub mod types;


pub use error::ReportError;
pub use service::ReportService;
pub use types::*;
