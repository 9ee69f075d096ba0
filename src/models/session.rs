//! Owner and session models for authentication.
//!
//! Owners authenticate with an API key. Keys are stored in the database as
//! SHA-256 hashes; the plain key never touches storage.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display theme chosen by an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "theme", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Per-request context of the authenticated owner.
///
/// Built by the auth middleware and passed explicitly into every service
/// call; nothing below the handlers looks up the owner on its own.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Session {
    /// Owner every read and write is scoped to
    pub owner_id: Uuid,

    pub display_name: String,

    pub theme: Theme,
}

/// Request body for `PUT /api/v1/session/theme`.
#[derive(Debug, Deserialize)]
pub struct ThemeRequest {
    pub theme: Theme,
}
