//! Installment planning and entry creation.
//!
//! A purchase or receivable split in `N` parts becomes `N` pending
//! transactions, one per month, each carrying `total / N`.
//!
//! # Rounding
//!
//! Every installment gets the same amount rounded to the currency scale; the
//! remainder is not moved to the last installment. When the total does not
//! divide evenly the planned sum differs from the total by
//! [`Installments::drift`].

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    currency,
    error::AppError,
    gateway::Gateway,
    models::{
        session::Session,
        transaction::{
            CreateEntryRequest, Flow, NewTransaction, SettlementStatus, Transaction,
            TransactionPatch,
        },
    },
    services::transaction_service::{ensure_account_owned, ensure_category_owned},
};

/// Upper bound callers clamp installment counts to.
pub const MAX_INSTALLMENTS: u32 = 60;

/// Clamp a requested installment count to `1..=MAX_INSTALLMENTS`.
pub fn clamp_count(requested: u32) -> u32 {
    requested.clamp(1, MAX_INSTALLMENTS)
}

/// One dated portion of a planned total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Installment {
    /// 0-based position in the plan
    pub index: u32,
    pub date: NaiveDate,
    pub amount: Decimal,
}

impl Installment {
    /// 1-based number shown to users, as in "Rent (2/12)".
    pub fn number(&self) -> u32 {
        self.index + 1
    }
}

/// Lazy sequence of installments produced by [`plan`].
///
/// Cloning restarts nothing: a clone continues from the same position, and a
/// fresh `plan` call with the same input yields the same sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installments {
    total: Decimal,
    start: NaiveDate,
    amount: Decimal,
    count: u32,
    next: u32,
}

impl Installments {
    /// Amount each installment carries.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Number of installments in the whole plan, regardless of how many
    /// were already yielded.
    pub fn installment_count(&self) -> u32 {
        self.count
    }

    /// `total - amount * count`: what rounding left unassigned (may be negative).
    pub fn drift(&self) -> Decimal {
        self.total - self.amount * Decimal::from(self.count)
    }
}

impl Iterator for Installments {
    type Item = Installment;

    fn next(&mut self) -> Option<Installment> {
        if self.next >= self.count {
            return None;
        }
        let index = self.next;
        // Days missing from the target month clamp to its last day (Jan 31 -> Feb 29).
        let date = self.start.checked_add_months(Months::new(index))?;
        self.next += 1;

        Some(Installment {
            index,
            date,
            amount: self.amount,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count.saturating_sub(self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Installments {}

/// Split `total` into `count` monthly installments starting at `start`.
///
/// Returns an empty sequence when `total <= 0` or `count < 1`. `count` is not
/// bounded here; callers clamp it with [`clamp_count`].
pub fn plan(total: Decimal, start: NaiveDate, count: u32) -> Installments {
    if total <= Decimal::ZERO || count < 1 {
        return Installments {
            total: Decimal::ZERO,
            start,
            amount: Decimal::ZERO,
            count: 0,
            next: 0,
        };
    }

    Installments {
        total,
        start,
        amount: currency::round(total / Decimal::from(count)),
        count,
        next: 0,
    }
}

/// A receivable or payable as entered by the user.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub description: String,
    /// Amount as typed, in pt-BR notation
    pub amount_text: String,
    pub date: NaiveDate,
    pub flow: Flow,
    pub category_id: Option<Uuid>,
    pub account_id: Option<Uuid>,
    pub installments: Option<u32>,
}

impl From<CreateEntryRequest> for NewEntry {
    fn from(request: CreateEntryRequest) -> Self {
        Self {
            description: request.description,
            amount_text: request.amount,
            date: request.date,
            flow: request.flow,
            category_id: request.category_id,
            account_id: request.account_id,
            installments: request.installments,
        }
    }
}

impl NewEntry {
    fn validated(&self) -> Result<(String, Decimal), AppError> {
        let description = self.description.trim();
        if description.is_empty() {
            return Err(AppError::Validation("Description is required".to_string()));
        }

        let amount = currency::round(currency::parse(&self.amount_text));
        if amount <= Decimal::ZERO {
            return Err(AppError::Validation(
                "Amount must be greater than zero".to_string(),
            ));
        }

        Ok((description.to_string(), amount))
    }

    /// The account and category, when given, must belong to the caller.
    async fn ensure_references_owned<G: Gateway>(
        &self,
        gateway: &G,
        session: &Session,
    ) -> Result<(), AppError> {
        if let Some(account_id) = self.account_id {
            ensure_account_owned(gateway, session, account_id).await?;
        }
        if let Some(category_id) = self.category_id {
            ensure_category_owned(gateway, session, category_id).await?;
        }
        Ok(())
    }

    fn pending(
        &self,
        session: &Session,
        description: String,
        amount: Decimal,
        date: NaiveDate,
    ) -> NewTransaction {
        NewTransaction {
            owner_id: session.owner_id,
            description,
            amount,
            date,
            flow: self.flow,
            status: SettlementStatus::Pending,
            category_id: self.category_id,
            account_id: self.account_id,
        }
    }
}

/// Create a pending entry, split into monthly installments when asked.
///
/// With more than one installment every part is a separate pending
/// transaction described as `"<description> (n/N)"`, and all parts are
/// inserted as one batch.
///
/// # Returns
///
/// Ids of the created transactions, in installment order
///
/// # Errors
///
/// - `Validation`: empty description or amount that does not parse above zero
/// - `NotFound`: account or category not owned by the session
/// - `Database`: storage failure; no part of the batch is kept
pub async fn create_entry<G: Gateway>(
    gateway: &G,
    session: &Session,
    entry: NewEntry,
) -> Result<Vec<Uuid>, AppError> {
    let (description, amount) = entry.validated()?;
    entry.ensure_references_owned(gateway, session).await?;
    let count = clamp_count(entry.installments.unwrap_or(1));

    if count == 1 {
        let id = gateway
            .insert_transaction(entry.pending(session, description, amount, entry.date))
            .await?;
        tracing::info!(transaction_id = %id, flow = ?entry.flow, "Entry created");
        return Ok(vec![id]);
    }

    let installments = plan(amount, entry.date, count);
    if !installments.drift().is_zero() {
        tracing::debug!(drift = %installments.drift(), count, "Installment plan does not sum to total");
    }

    let rows: Vec<NewTransaction> = installments
        .map(|installment| {
            entry.pending(
                session,
                format!("{description} ({}/{count})", installment.number()),
                installment.amount,
                installment.date,
            )
        })
        .collect();

    let ids = gateway.insert_transactions(rows).await?;
    tracing::info!(installments = ids.len(), flow = ?entry.flow, "Installment entry created");

    Ok(ids)
}

/// Create an entry that is paid or received right away.
///
/// The row is inserted as pending and then settled, so the balance change is
/// applied by the same path as any other settlement. Installments are ignored.
///
/// # Errors
///
/// - `Validation`: invalid input, or no account selected
/// - `NotFound`: account or category not owned by the session, or the
///   inserted row could not be read back
pub async fn create_settled_entry<G: Gateway>(
    gateway: &G,
    session: &Session,
    entry: NewEntry,
) -> Result<Transaction, AppError> {
    let (description, amount) = entry.validated()?;
    if entry.account_id.is_none() {
        return Err(AppError::Validation(
            "An account is required to settle an entry".to_string(),
        ));
    }
    entry.ensure_references_owned(gateway, session).await?;

    let id = gateway
        .insert_transaction(entry.pending(session, description, amount, entry.date))
        .await?;
    gateway
        .update_transaction(
            id,
            TransactionPatch {
                status: Some(SettlementStatus::Settled),
                ..Default::default()
            },
        )
        .await?;

    tracing::info!(transaction_id = %id, flow = ?entry.flow, "Settled entry created");

    gateway
        .get_transaction(session.owner_id, id)
        .await?
        .ok_or(AppError::NotFound("transaction"))
}
