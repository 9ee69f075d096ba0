//! Installment plan preview.

use axum::{Json, extract::Query};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{currency, services::installment_service};

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    /// Total in pt-BR notation
    pub amount: String,
    pub date: NaiveDate,
    #[serde(default = "one")]
    pub count: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Serialize)]
pub struct PreviewItem {
    pub number: u32,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub amount_display: String,
}

#[derive(Debug, Serialize)]
pub struct PlanPreview {
    pub count: u32,
    pub amount: Decimal,
    /// Part of the total no installment carries because of rounding
    pub drift: Decimal,
    pub installments: Vec<PreviewItem>,
}

/// Show how an entry would be split, without writing anything.
///
/// # Endpoint
///
/// `GET /api/v1/installments/preview?amount=1.200,00&date=2024-01-31&count=3`
///
/// `count` is clamped to 1..=60. An amount that does not parse above zero
/// yields an empty plan.
///
/// ```json
/// {
///   "count": 3,
///   "amount": "400.00",
///   "drift": "0.00",
///   "installments": [
///     { "number": 1, "date": "2024-01-31", "amount": "400.00", "amount_display": "R$ 400,00" },
///     { "number": 2, "date": "2024-02-29", "amount": "400.00", "amount_display": "R$ 400,00" },
///     { "number": 3, "date": "2024-03-31", "amount": "400.00", "amount_display": "R$ 400,00" }
///   ]
/// }
/// ```
pub async fn preview(Query(query): Query<PreviewQuery>) -> Json<PlanPreview> {
    let plan = installment_service::plan(
        currency::parse(&query.amount),
        query.date,
        installment_service::clamp_count(query.count),
    );

    Json(PlanPreview {
        count: plan.installment_count(),
        amount: plan.amount(),
        drift: plan.drift(),
        installments: plan
            .map(|installment| PreviewItem {
                number: installment.number(),
                date: installment.date,
                amount: installment.amount,
                amount_display: currency::format(installment.amount),
            })
            .collect(),
    })
}
