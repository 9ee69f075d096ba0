//! HTTP middleware components.
//!
//! Middleware run before route handlers. Here they authenticate requests and
//! short-circuit unauthorized ones.

/// API key authentication middleware
pub mod auth;
