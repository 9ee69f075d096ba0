//! Category models.
//!
//! Categories label transactions for reports. Names are unique per owner,
//! compared case-insensitively.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::transaction::Flow;

/// Represents a category record from the database.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Category {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    /// CSS color used by charts, e.g. "#ff5252"
    pub color: String,
    pub flow: Flow,
}

/// Request body for creating or renaming a category.
///
/// ```json
/// { "name": "Food", "color": "#ff5252", "flow": "outflow" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRequest {
    pub name: String,

    #[serde(default = "default_color")]
    pub color: String,

    pub flow: Flow,
}

/// Color of categories created without one, and of the uncategorised bucket.
pub const DEFAULT_COLOR: &str = "#cbd5e1";

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

/// Query string for listing categories (`?flow=inflow`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryQuery {
    pub flow: Option<Flow>,
}
