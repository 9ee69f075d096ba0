//! Transfer service - moves money between two accounts of the same owner.
//!
//! A transfer goes through `Draft → Validating → Posting → Settled`, or stops
//! at `Rejected` when validation fails.
//!
//! # Posting
//!
//! In [`TransferMode::Sequential`] (the default) posting is four separate
//! writes, each awaited before the next:
//!
//! 1. insert the settled outflow on the origin
//! 2. insert the settled inflow on the destination
//! 3. overwrite the origin balance with `balance - amount`
//! 4. overwrite the destination balance with `balance + amount`
//!
//! Balances are the ones read during validation. A failure stops the
//! sequence and nothing already written is undone; the error names the step
//! that failed and the steps that were applied.
//!
//! [`TransferMode::Atomic`] runs the same writes inside one database
//! transaction with row locks and relative balance updates.

use std::fmt;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    currency,
    error::AppError,
    gateway::{AtomicTransfer, Gateway, GatewayError, TransferPosting},
    models::{
        account::{Account, AccountResponse},
        session::Session,
        transaction::{Flow, NewTransaction, SettlementStatus},
        transfer::{AmountFormat, TransferRequest},
    },
};

/// How the four posting writes are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// Four independent writes, no rollback
    #[default]
    Sequential,
    /// One database transaction
    Atomic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferState {
    Draft,
    Validating,
    Posting,
    Settled,
    Rejected,
}

/// Why a transfer was rejected. Nothing is written in any of these cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransferRejection {
    #[error("Select two different accounts")]
    InvalidAccounts,

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Insufficient funds in the origin account")]
    InsufficientFunds,
}

impl TransferRejection {
    pub fn code(&self) -> &'static str {
        match self {
            TransferRejection::InvalidAccounts => "invalid_accounts",
            TransferRejection::InvalidAmount => "invalid_amount",
            TransferRejection::InsufficientFunds => "insufficient_funds",
        }
    }
}

/// A transfer being assembled. No side effects.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferDraft {
    pub origin: Option<Uuid>,
    pub destination: Option<Uuid>,
    pub amount_text: String,
    pub amount_format: AmountFormat,
    pub date: NaiveDate,
    pub note: Option<String>,
}

impl TransferDraft {
    /// Exchange origin and destination.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.origin, &mut self.destination);
    }

    /// Amount as the codec reads the typed text, rounded to cents so both legs
    /// and both balance writes carry the same stored value.
    pub fn amount(&self) -> Decimal {
        currency::round(match self.amount_format {
            AmountFormat::Locale => currency::parse(&self.amount_text),
            AmountFormat::Masked => currency::parse_masked(&self.amount_text),
        })
    }
}

impl From<TransferRequest> for TransferDraft {
    fn from(request: TransferRequest) -> Self {
        let mut draft = Self {
            origin: request.origin_id,
            destination: request.destination_id,
            amount_text: request.amount,
            amount_format: request.amount_format,
            date: request.date.unwrap_or_else(|| Utc::now().date_naive()),
            note: request
                .note
                .map(|note| note.trim().to_string())
                .filter(|note| !note.is_empty()),
        };
        if request.swap {
            draft.swap();
        }
        draft
    }
}

/// A transfer that passed validation against the accounts read for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTransfer {
    origin: Account,
    destination: Account,
    amount: Decimal,
    date: NaiveDate,
    note: Option<String>,
}

impl ValidatedTransfer {
    fn leg(&self, session: &Session, flow: Flow) -> NewTransaction {
        let note = self.note.as_deref().unwrap_or("No note");
        let (description, account_id) = match flow {
            Flow::Outflow => (format!("Transfer sent: {note}"), self.origin.id),
            Flow::Inflow => (format!("Transfer received: {note}"), self.destination.id),
        };

        NewTransaction {
            owner_id: session.owner_id,
            description,
            amount: self.amount,
            date: self.date,
            flow,
            status: SettlementStatus::Settled,
            category_id: None,
            account_id: Some(account_id),
        }
    }

    fn posting(&self, session: &Session) -> TransferPosting {
        TransferPosting {
            debit: self.leg(session, Flow::Outflow),
            credit: self.leg(session, Flow::Inflow),
            origin_id: self.origin.id,
            destination_id: self.destination.id,
            amount: self.amount,
        }
    }
}

/// Check a draft against the owner's accounts.
///
/// Rules run in order and the first failure wins:
///
/// 1. origin and destination selected, distinct and known
/// 2. amount above zero
/// 3. amount covered by the origin balance in `accounts`
pub fn validate(
    draft: &TransferDraft,
    accounts: &[Account],
) -> Result<ValidatedTransfer, TransferRejection> {
    let (origin_id, destination_id) = match (draft.origin, draft.destination) {
        (Some(origin), Some(destination)) if origin != destination => (origin, destination),
        _ => return Err(TransferRejection::InvalidAccounts),
    };
    let find = |id: Uuid| accounts.iter().find(|account| account.id == id);
    let (Some(origin), Some(destination)) = (find(origin_id), find(destination_id)) else {
        return Err(TransferRejection::InvalidAccounts);
    };

    let amount = draft.amount();
    if amount <= Decimal::ZERO {
        return Err(TransferRejection::InvalidAmount);
    }

    if amount > origin.balance {
        return Err(TransferRejection::InsufficientFunds);
    }

    Ok(ValidatedTransfer {
        origin: origin.clone(),
        destination: destination.clone(),
        amount,
        date: draft.date,
        note: draft.note.clone(),
    })
}

/// One write of the sequential posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostingStep {
    InsertOutflow,
    InsertInflow,
    DebitOrigin,
    CreditDestination,
}

impl fmt::Display for PostingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            PostingStep::InsertOutflow => "record the outflow on the origin account",
            PostingStep::InsertInflow => "record the inflow on the destination account",
            PostingStep::DebitOrigin => "update the origin balance",
            PostingStep::CreditDestination => "update the destination balance",
        };
        f.write_str(step)
    }
}

/// A sequential posting stopped part-way.
#[derive(Debug, thiserror::Error)]
#[error(
    "Transfer failed: could not {failed_step}. {applied} of 4 steps were applied and not rolled back",
    applied = .completed_steps.len()
)]
pub struct PostingError {
    pub failed_step: PostingStep,
    pub completed_steps: Vec<PostingStep>,
    #[source]
    pub source: GatewayError,
}

/// Outcome of a settled transfer, with balances read back after posting.
#[derive(Debug, Serialize)]
pub struct TransferReceipt {
    pub state: TransferState,
    pub debit_transaction_id: Uuid,
    pub credit_transaction_id: Uuid,
    pub amount: Decimal,
    pub amount_display: String,
    pub date: NaiveDate,
    pub origin: AccountResponse,
    pub destination: AccountResponse,
}

fn failed_at(
    step: PostingStep,
    completed: &[PostingStep],
) -> impl FnOnce(GatewayError) -> PostingError {
    let completed_steps = completed.to_vec();
    move |source| PostingError {
        failed_step: step,
        completed_steps,
        source,
    }
}

/// Apply the four writes one after another.
///
/// # Errors
///
/// Returns `PostingError` naming the failed step. Writes before it stay
/// applied.
pub async fn post<G: Gateway>(
    gateway: &G,
    session: &Session,
    transfer: &ValidatedTransfer,
) -> Result<(Uuid, Uuid), PostingError> {
    let posting = transfer.posting(session);
    let mut completed = Vec::with_capacity(4);

    let debit_id = gateway
        .insert_transaction(posting.debit)
        .await
        .map_err(failed_at(PostingStep::InsertOutflow, &completed))?;
    completed.push(PostingStep::InsertOutflow);

    let credit_id = gateway
        .insert_transaction(posting.credit)
        .await
        .map_err(failed_at(PostingStep::InsertInflow, &completed))?;
    completed.push(PostingStep::InsertInflow);

    gateway
        .update_account_balance(transfer.origin.id, transfer.origin.balance - transfer.amount)
        .await
        .map_err(failed_at(PostingStep::DebitOrigin, &completed))?;
    completed.push(PostingStep::DebitOrigin);

    gateway
        .update_account_balance(
            transfer.destination.id,
            transfer.destination.balance + transfer.amount,
        )
        .await
        .map_err(failed_at(PostingStep::CreditDestination, &completed))?;

    Ok((debit_id, credit_id))
}

/// Apply the four writes in one storage transaction.
pub async fn post_atomic<G: AtomicTransfer>(
    gateway: &G,
    session: &Session,
    transfer: &ValidatedTransfer,
) -> Result<(Uuid, Uuid), AppError> {
    match gateway
        .post_transfer_atomically(&transfer.posting(session))
        .await
    {
        Ok(legs) => Ok((legs.debit_id, legs.credit_id)),
        // Another write drained the origin between validation and the lock.
        Err(GatewayError::Rejected(_)) => Err(TransferRejection::InsufficientFunds.into()),
        Err(GatewayError::NotFound { .. }) => Err(TransferRejection::InvalidAccounts.into()),
        Err(e) => Err(e.into()),
    }
}

/// Validate and post a transfer for the session's owner.
///
/// # Process
///
/// 1. Read the owner's accounts (their balances are what validation checks)
/// 2. Validate the draft
/// 3. Post in the configured mode
/// 4. Read both accounts back for the receipt
///
/// # Errors
///
/// - `TransferRejected`: validation failed, nothing written
/// - `TransferPartiallyApplied`: sequential posting failed after some writes
/// - `Database`: storage failure before posting started
pub async fn submit<G: AtomicTransfer>(
    gateway: &G,
    session: &Session,
    draft: TransferDraft,
    mode: TransferMode,
) -> Result<TransferReceipt, AppError> {
    let accounts = gateway.get_accounts(session.owner_id).await?;

    tracing::debug!(
        owner_id = %session.owner_id,
        from = ?TransferState::Draft,
        to = ?TransferState::Validating,
        "Transfer submitted"
    );
    let transfer = validate(&draft, &accounts).inspect_err(|rejection| {
        tracing::warn!(
            owner_id = %session.owner_id,
            reason = rejection.code(),
            state = ?TransferState::Rejected,
            "Transfer rejected"
        );
    })?;

    tracing::debug!(state = ?TransferState::Posting, ?mode, "Transfer validated");
    let (debit_id, credit_id) = match mode {
        TransferMode::Sequential => post(gateway, session, &transfer).await?,
        TransferMode::Atomic => post_atomic(gateway, session, &transfer).await?,
    };

    tracing::info!(
        origin = %transfer.origin.id,
        destination = %transfer.destination.id,
        amount = %transfer.amount,
        ?mode,
        "Transfer settled"
    );

    let (origin, destination) = refreshed_accounts(gateway, session, &transfer).await;

    Ok(TransferReceipt {
        state: TransferState::Settled,
        debit_transaction_id: debit_id,
        credit_transaction_id: credit_id,
        amount: transfer.amount,
        amount_display: currency::format(transfer.amount),
        date: transfer.date,
        origin: origin.into(),
        destination: destination.into(),
    })
}

/// Both accounts as stored after posting, or as computed locally when the
/// read-back fails. The transfer itself has already succeeded at that point.
async fn refreshed_accounts<G: Gateway>(
    gateway: &G,
    session: &Session,
    transfer: &ValidatedTransfer,
) -> (Account, Account) {
    let mut origin = transfer.origin.clone();
    let mut destination = transfer.destination.clone();
    origin.balance -= transfer.amount;
    destination.balance += transfer.amount;

    match gateway.get_accounts(session.owner_id).await {
        Ok(accounts) => {
            for account in accounts {
                if account.id == origin.id {
                    origin = account;
                } else if account.id == destination.id {
                    destination = account;
                }
            }
        }
        Err(e) => tracing::warn!("Could not refresh accounts after transfer: {e}"),
    }

    (origin, destination)
}
