//! Report aggregation.
//!
//! Groups transactions by category and flow inside an inclusive date window.
//! Two settlement policies exist and are chosen per call, never mixed inside
//! one aggregation:
//!
//! - [`ReportPolicy::SettledOnly`] for the formal period report
//! - [`ReportPolicy::Operational`] for the dashboard, where pending income is
//!   tracked separately and pending expenses are ignored
//!
//! [`aggregate`] is pure; the async functions only fetch its input.

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    currency,
    error::AppError,
    gateway::{CategoryFilter, DateRange, Gateway, TransactionFilter},
    models::{
        category::DEFAULT_COLOR,
        session::Session,
        transaction::{Flow, SettlementStatus, Transaction, TransactionResponse},
    },
};

/// Bucket for transactions without a category.
pub const GENERAL: &str = "General";

/// Number of pending receivables listed on the dashboard.
const UPCOMING_LIMIT: usize = 5;

/// Which transactions count towards a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPolicy {
    /// Settled transactions of both flows.
    SettledOnly,
    /// Settled transactions are realized; pending inflows add to
    /// [`Report::pending_inflow`]; pending outflows are ignored.
    Operational,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Decimal,
}

/// Per-category sums in first-occurrence order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CategoryTotals(Vec<CategoryTotal>);

impl CategoryTotals {
    fn add(&mut self, category: &str, amount: Decimal) {
        match self.0.iter_mut().find(|entry| entry.category == category) {
            Some(entry) => entry.total += amount,
            None => self.0.push(CategoryTotal {
                category: category.to_string(),
                total: amount,
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Largest total first; equal totals keep their original order.
    pub fn sorted_desc(&self) -> Vec<CategoryTotal> {
        let mut sorted = self.0.clone();
        sorted.sort_by(|a, b| b.total.cmp(&a.total));
        sorted
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub inflow_by_category: CategoryTotals,
    pub outflow_by_category: CategoryTotals,
    pub total_inflow: Decimal,
    pub total_outflow: Decimal,
    /// `total_inflow - total_outflow`
    pub balance: Decimal,
    /// Pending inflows; always zero under [`ReportPolicy::SettledOnly`]
    pub pending_inflow: Decimal,
}

/// Share of `part` in `total` as a percentage, 0 when `total` is zero.
pub fn percent_of(part: Decimal, total: Decimal) -> Decimal {
    if total.is_zero() {
        return Decimal::ZERO;
    }
    part * Decimal::ONE_HUNDRED / total
}

/// First to last day of a calendar month. `None` for an invalid month.
pub fn month_window(year: i32, month: u32) -> Option<DateRange> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = start.checked_add_months(Months::new(1))?.pred_opt()?;
    Some(DateRange { start, end })
}

/// Window of the month containing `date`.
pub fn month_of(date: NaiveDate) -> DateRange {
    let start = date.with_day(1).unwrap_or(date);
    let end = start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date);
    DateRange { start, end }
}

/// Group `transactions` inside `window` by flow and category name.
pub fn aggregate(transactions: &[Transaction], window: DateRange, policy: ReportPolicy) -> Report {
    let mut report = Report::default();

    for transaction in transactions
        .iter()
        .filter(|t| window.contains(t.date))
    {
        let category = transaction.category_name.as_deref().unwrap_or(GENERAL);

        match (transaction.status, transaction.flow, policy) {
            (SettlementStatus::Settled, Flow::Inflow, _) => {
                report.inflow_by_category.add(category, transaction.amount);
                report.total_inflow += transaction.amount;
            }
            (SettlementStatus::Settled, Flow::Outflow, _) => {
                report.outflow_by_category.add(category, transaction.amount);
                report.total_outflow += transaction.amount;
            }
            (SettlementStatus::Pending, Flow::Inflow, ReportPolicy::Operational) => {
                report.pending_inflow += transaction.amount;
            }
            (SettlementStatus::Pending, _, _) => {}
        }
    }

    report.balance = report.total_inflow - report.total_outflow;
    report
}

/// Formal report of one window: settled transactions only.
pub async fn period_report<G: Gateway>(
    gateway: &G,
    session: &Session,
    window: DateRange,
) -> Result<Report, AppError> {
    let filter = TransactionFilter {
        date_range: Some(window),
        status: Some(SettlementStatus::Settled),
        ..TransactionFilter::owner(session.owner_id)
    };
    let transactions = gateway.query_transactions(filter).await?;

    Ok(aggregate(&transactions, window, ReportPolicy::SettledOnly))
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpenseSlice {
    pub category: String,
    /// Chart color of the category
    pub color: String,
    pub total: Decimal,
    pub total_display: String,
    pub percent: Decimal,
}

/// Operational overview shown on the dashboard.
#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub window: DateRange,
    pub income: Decimal,
    pub income_display: String,
    pub expense: Decimal,
    pub expense_display: String,
    pub pending: Decimal,
    pub pending_display: String,
    pub total_balance: Decimal,
    pub total_balance_display: String,
    pub upcoming_receivables: Vec<TransactionResponse>,
    /// Settled expenses by category, largest first
    pub expense_breakdown: Vec<ExpenseSlice>,
}

/// Dashboard figures for `window` plus the owner's total balance.
pub async fn dashboard_summary<G: Gateway>(
    gateway: &G,
    session: &Session,
    window: DateRange,
) -> Result<DashboardSummary, AppError> {
    let filter = TransactionFilter {
        date_range: Some(window),
        ..TransactionFilter::owner(session.owner_id)
    };
    let transactions = gateway.query_transactions(filter).await?;
    let accounts = gateway.get_accounts(session.owner_id).await?;

    let report = aggregate(&transactions, window, ReportPolicy::Operational);
    let total_balance: Decimal = accounts.iter().map(|a| a.balance).sum();

    let upcoming_receivables = transactions
        .into_iter()
        .filter(|t| t.flow == Flow::Inflow && t.status == SettlementStatus::Pending)
        .take(UPCOMING_LIMIT)
        .map(TransactionResponse::from)
        .collect();

    let categories = if report.outflow_by_category.is_empty() {
        Vec::new()
    } else {
        gateway
            .get_categories(CategoryFilter {
                owner_id: session.owner_id,
                flow: Some(Flow::Outflow),
            })
            .await?
    };
    let color_of = |name: &str| {
        categories
            .iter()
            .find(|category| category.name == name)
            .map_or(DEFAULT_COLOR, |category| category.color.as_str())
            .to_string()
    };

    let expense_breakdown = report
        .outflow_by_category
        .sorted_desc()
        .into_iter()
        .map(|entry| ExpenseSlice {
            color: color_of(&entry.category),
            percent: currency::round(percent_of(entry.total, report.total_outflow)),
            total_display: currency::format(entry.total),
            category: entry.category,
            total: entry.total,
        })
        .collect();

    Ok(DashboardSummary {
        window,
        income: report.total_inflow,
        income_display: currency::format(report.total_inflow),
        expense: report.total_outflow,
        expense_display: currency::format(report.total_outflow),
        pending: report.pending_inflow,
        pending_display: currency::format(report.pending_inflow),
        total_balance,
        total_balance_display: currency::format(total_balance),
        upcoming_receivables,
        expense_breakdown,
    })
}
