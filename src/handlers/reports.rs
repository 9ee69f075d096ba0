//! Report and dashboard handlers.

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    currency,
    error::AppError,
    gateway::{DateRange, Gateway},
    models::session::Session,
    services::report_service::{self, CategoryTotals, DashboardSummary, Report},
    state::AppState,
};

/// Report window: an explicit `start`/`end`, or a `year`/`month`, or the
/// current month when neither is given.
#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl WindowQuery {
    fn window(&self, today: NaiveDate) -> Result<DateRange, AppError> {
        match (self.start, self.end, self.year, self.month) {
            (Some(start), Some(end), _, _) if start <= end => Ok(DateRange { start, end }),
            (Some(_), Some(_), _, _) => Err(AppError::InvalidRequest(
                "start must not be after end".to_string(),
            )),
            (None, None, Some(year), Some(month)) => report_service::month_window(year, month)
                .ok_or_else(|| AppError::InvalidRequest(format!("invalid month {month}"))),
            (None, None, None, None) => Ok(report_service::month_of(today)),
            _ => Err(AppError::InvalidRequest(
                "give both start and end, or both year and month".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PeriodReportResponse {
    pub window: DateRange,
    pub inflow_by_category: CategoryTotals,
    pub outflow_by_category: CategoryTotals,
    pub total_inflow: Decimal,
    pub total_inflow_display: String,
    pub total_outflow: Decimal,
    pub total_outflow_display: String,
    pub balance: Decimal,
    pub balance_display: String,
}

impl PeriodReportResponse {
    fn new(window: DateRange, report: Report) -> Self {
        Self {
            window,
            total_inflow_display: currency::format(report.total_inflow),
            total_outflow_display: currency::format(report.total_outflow),
            balance_display: currency::format(report.balance),
            inflow_by_category: report.inflow_by_category,
            outflow_by_category: report.outflow_by_category,
            total_inflow: report.total_inflow,
            total_outflow: report.total_outflow,
            balance: report.balance,
        }
    }
}

/// Formal report counting settled transactions only.
///
/// # Endpoint
///
/// `GET /api/v1/reports/period?start=2024-01-01&end=2024-01-31`
/// or `GET /api/v1/reports/period?year=2024&month=1`
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "window": { "start": "2024-01-01", "end": "2024-01-31" },
///   "inflow_by_category": [{ "category": "Salary", "total": "500.00" }],
///   "outflow_by_category": [{ "category": "Food", "total": "150.00" }],
///   "total_inflow": "500.00",
///   "total_inflow_display": "R$ 500,00",
///   "total_outflow": "150.00",
///   "total_outflow_display": "R$ 150,00",
///   "balance": "350.00",
///   "balance_display": "R$ 350,00"
/// }
/// ```
pub async fn period_report<G: Gateway>(
    State(state): State<AppState<G>>,
    Extension(session): Extension<Session>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<PeriodReportResponse>, AppError> {
    let window = query.window(Utc::now().date_naive())?;
    let report = report_service::period_report(&state.gateway, &session, window).await?;

    Ok(Json(PeriodReportResponse::new(window, report)))
}

/// Operational summary: realized income and expense, pending receivables,
/// total balance and the expense breakdown.
///
/// `GET /api/v1/dashboard?year=2024&month=1`
pub async fn dashboard<G: Gateway>(
    State(state): State<AppState<G>>,
    Extension(session): Extension<Session>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<DashboardSummary>, AppError> {
    let window = query.window(Utc::now().date_naive())?;

    Ok(Json(
        report_service::dashboard_summary(&state.gateway, &session, window).await?,
    ))
}
