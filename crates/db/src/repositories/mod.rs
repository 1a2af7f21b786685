//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the
//! application. Methods that must run inside an orchestrator
//! transaction are generic over the connection.

pub mod account;
pub mod audit;
pub mod ledger_entry;
pub mod report;
pub mod transaction;

pub use account::AccountRepository;
pub use audit::AuditRepository;
pub use ledger_entry::LedgerEntryRepository;
pub use report::ReportRepository;
pub use transaction::{NewTransaction, TransactionDetail, TransactionFilter, TransactionRepository};
