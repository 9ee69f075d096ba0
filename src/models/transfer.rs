//! Transfer request types.
//!
//! A transfer is not stored as its own row: posting one creates an outflow
//! on the origin, an inflow on the destination and two balance updates.

use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

/// How the amount field was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountFormat {
    /// pt-BR notation, e.g. "1.234,56"
    #[default]
    Locale,
    /// Masked input where digits are cents, e.g. "123456"
    Masked,
}

/// Request body for `POST /api/v1/transfers`.
///
/// # JSON Example
///
/// ```json
/// {
///   "origin_id": "550e8400-e29b-41d4-a716-446655440000",
///   "destination_id": "660e8400-e29b-41d4-a716-446655440001",
///   "amount": "300,00",
///   "date": "2024-03-10",
///   "note": "Savings"
/// }
/// ```
///
/// `swap: true` exchanges origin and destination before validation. A missing
/// `date` means today.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferRequest {
    pub origin_id: Option<Uuid>,

    pub destination_id: Option<Uuid>,

    #[serde(default)]
    pub amount: String,

    #[serde(default)]
    pub amount_format: AmountFormat,

    pub date: Option<NaiveDate>,

    pub note: Option<String>,

    #[serde(default)]
    pub swap: bool,
}
