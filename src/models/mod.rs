//! Data models representing database entities and API payloads.

/// Bank account model
pub mod account;
/// Category model
pub mod category;
/// Owner session and theme
pub mod session;
/// Agenda task model
pub mod task;
/// Transaction model
pub mod transaction;
/// Transfer request
pub mod transfer;
