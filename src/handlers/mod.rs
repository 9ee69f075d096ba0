//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, the caller's session)
//! 2. Calls the matching service
//! 3. Returns HTTP response (JSON, status code)
//!
//! Handlers are generic over the gateway so the router can be exercised
//! in tests without a database.

/// Account endpoints
pub mod accounts;
/// Category endpoints
pub mod categories;
/// Change long-poll
pub mod changes;
/// Health check endpoint
pub mod health;
/// Installment plan preview
pub mod installments;
/// Period report and dashboard
pub mod reports;
/// Session and theme
pub mod session;
/// Agenda endpoints
pub mod tasks;
/// Transaction endpoints
pub mod transactions;
/// Transfer endpoint
pub mod transfers;
