//! Core business logic for the Fintra ledger engine.
//!
//! Pure domain logic with no web or database dependencies:
//! - Double-entry ledger domain model and posting planner
//! - Transaction state machine and input validation
//! - Invariant checking (balanced entries, trial balance, reconciliation)
//! - Audit event model with severity computation
//! - Report generation

pub mod audit;
pub mod invariant;
pub mod ledger;
pub mod reports;
