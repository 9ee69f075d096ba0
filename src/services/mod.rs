//! Business logic services.
//!
//! Services contain the application's core logic, separated from HTTP
//! handling. Every function takes the gateway and the caller's [`Session`]
//! explicitly, so the same code runs against Postgres and the in-memory
//! gateway used in tests.
//!
//! [`Session`]: crate::models::session::Session

/// Account listing and creation
pub mod account_service;
/// Category CRUD with the delete guard
pub mod category_service;
/// Installment planner and entry creation
pub mod installment_service;
/// Period report and dashboard aggregation
pub mod report_service;
/// Agenda tasks
pub mod task_service;
/// Transaction query, edit, settlement and deletion
pub mod transaction_service;
/// Transfer validation and posting
pub mod transfer_service;
