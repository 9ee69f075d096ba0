//! Transaction service - listing, editing, settling and deleting entries.
//!
//! Creation lives in [`super::installment_service`] because every new entry
//! may be split into installments.
//!
//! # Settlement
//!
//! `Pending` → `Settled` is the only status transition. The balance change is
//! applied by the storage layer when the status flips (and reversed when a
//! settled row is deleted), so nothing here touches balances directly.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    currency,
    error::AppError,
    gateway::{CategoryFilter, DateRange, Gateway, TransactionFilter},
    models::{
        session::Session,
        transaction::{
            SettlementStatus, Transaction, TransactionPatch, TransactionQuery, UpdateEntryRequest,
        },
    },
};

impl TransactionQuery {
    /// Gateway filter for this query, scoped to `owner_id`.
    ///
    /// An open-ended range (only `start` or only `end`) extends to year 1 or
    /// year 9999 on the missing side, both representable by Postgres `date`.
    pub fn into_filter(self, owner_id: Uuid) -> TransactionFilter {
        let date_range = match (self.start, self.end) {
            (None, None) => None,
            (start, end) => Some(DateRange {
                start: start
                    .or_else(|| NaiveDate::from_ymd_opt(1, 1, 1))
                    .unwrap_or(NaiveDate::MIN),
                end: end
                    .or_else(|| NaiveDate::from_ymd_opt(9999, 12, 31))
                    .unwrap_or(NaiveDate::MAX),
            }),
        };

        TransactionFilter {
            owner_id,
            date_range,
            account_id: self.account_id,
            category_id: self.category_id,
            status: self.status,
            flow: self.flow,
            search_text: self.q.filter(|q| !q.trim().is_empty()),
        }
    }
}

pub async fn list_transactions<G: Gateway>(
    gateway: &G,
    session: &Session,
    query: TransactionQuery,
) -> Result<Vec<Transaction>, AppError> {
    Ok(gateway
        .query_transactions(query.into_filter(session.owner_id))
        .await?)
}

async fn owned<G: Gateway>(
    gateway: &G,
    session: &Session,
    transaction_id: Uuid,
) -> Result<Transaction, AppError> {
    gateway
        .get_transaction(session.owner_id, transaction_id)
        .await?
        .ok_or(AppError::NotFound("transaction"))
}

/// Reject an account id that does not belong to the session's owner.
pub(crate) async fn ensure_account_owned<G: Gateway>(
    gateway: &G,
    session: &Session,
    account_id: Uuid,
) -> Result<(), AppError> {
    let accounts = gateway.get_accounts(session.owner_id).await?;
    if accounts.iter().any(|a| a.id == account_id) {
        Ok(())
    } else {
        Err(AppError::NotFound("account"))
    }
}

/// Reject a category id that does not belong to the session's owner.
pub(crate) async fn ensure_category_owned<G: Gateway>(
    gateway: &G,
    session: &Session,
    category_id: Uuid,
) -> Result<(), AppError> {
    let categories = gateway
        .get_categories(CategoryFilter {
            owner_id: session.owner_id,
            flow: None,
        })
        .await?;
    if categories.iter().any(|c| c.id == category_id) {
        Ok(())
    } else {
        Err(AppError::NotFound("category"))
    }
}

/// Edit description, amount, date, category or account of an entry.
///
/// The amount is rounded to cents. A `null` category clears it.
///
/// # Errors
///
/// - `NotFound`: transaction, account or category not owned by the session
/// - `Validation`: empty description or non-positive amount
/// - `AlreadySettled`: amount or account change on a settled entry, whose
///   balance effect is already applied
pub async fn update_transaction<G: Gateway>(
    gateway: &G,
    session: &Session,
    transaction_id: Uuid,
    request: UpdateEntryRequest,
) -> Result<Transaction, AppError> {
    let current = owned(gateway, session, transaction_id).await?;

    let description = match request.description {
        Some(text) if text.trim().is_empty() => {
            return Err(AppError::Validation("Description is required".to_string()));
        }
        other => other.map(|text| text.trim().to_string()),
    };

    let amount = request
        .amount
        .as_deref()
        .map(|text| currency::round(currency::parse(text)));
    if amount.is_some_and(|amount| amount <= Decimal::ZERO) {
        return Err(AppError::Validation(
            "Amount must be greater than zero".to_string(),
        ));
    }

    let moves_balance = amount.is_some_and(|a| a != current.amount)
        || request
            .account_id
            .is_some_and(|id| current.account_id != Some(id));
    if current.status == SettlementStatus::Settled && moves_balance {
        return Err(AppError::AlreadySettled);
    }

    if let Some(account_id) = request.account_id {
        ensure_account_owned(gateway, session, account_id).await?;
    }
    if let Some(Some(category_id)) = request.category_id {
        ensure_category_owned(gateway, session, category_id).await?;
    }

    let patch = TransactionPatch {
        description,
        amount,
        date: request.date,
        category_id: request.category_id,
        account_id: request.account_id,
        status: None,
    };
    gateway.update_transaction(transaction_id, patch).await?;

    owned(gateway, session, transaction_id).await
}

/// Mark a pending entry as settled, optionally choosing its account.
///
/// # Errors
///
/// - `AlreadySettled`: the entry is settled already
/// - `Validation`: neither the entry nor the request names an account
pub async fn settle_transaction<G: Gateway>(
    gateway: &G,
    session: &Session,
    transaction_id: Uuid,
    account_id: Option<Uuid>,
) -> Result<Transaction, AppError> {
    let current = owned(gateway, session, transaction_id).await?;
    if current.status == SettlementStatus::Settled {
        return Err(AppError::AlreadySettled);
    }

    let account_id = account_id.or(current.account_id).ok_or_else(|| {
        AppError::Validation("An account is required to settle an entry".to_string())
    })?;
    ensure_account_owned(gateway, session, account_id).await?;

    gateway
        .update_transaction(
            transaction_id,
            TransactionPatch {
                account_id: Some(account_id),
                status: Some(SettlementStatus::Settled),
                ..Default::default()
            },
        )
        .await?;
    tracing::info!(%transaction_id, %account_id, "Transaction settled");

    owned(gateway, session, transaction_id).await
}

/// Delete an entry. A settled entry's balance effect is reversed by storage.
pub async fn delete_transaction<G: Gateway>(
    gateway: &G,
    session: &Session,
    transaction_id: Uuid,
) -> Result<(), AppError> {
    let current = owned(gateway, session, transaction_id).await?;

    gateway.delete_transaction(transaction_id).await?;
    tracing::info!(%transaction_id, status = ?current.status, "Transaction deleted");

    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{
        gateway::memory::MemoryGateway,
        models::{
            account::Account,
            transaction::{Flow, NewTransaction},
        },
    };

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    async fn pending(
        gateway: &MemoryGateway,
        session: &Session,
        account: Option<&Account>,
        flow: Flow,
        amount: Decimal,
    ) -> Uuid {
        gateway
            .insert_transaction(NewTransaction {
                owner_id: session.owner_id,
                description: "Rent".to_string(),
                amount,
                date: date(5),
                flow,
                status: SettlementStatus::Pending,
                category_id: None,
                account_id: account.map(|a| a.id),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn settling_applies_balance_once() {
        let gateway = MemoryGateway::new();
        let session = gateway.add_owner("hash", "Ana");
        let account = gateway.add_account(session.owner_id, "Main", dec!(1000));
        let id = pending(&gateway, &session, None, Flow::Outflow, dec!(400)).await;

        let settled = settle_transaction(&gateway, &session, id, Some(account.id))
            .await
            .unwrap();
        let again = settle_transaction(&gateway, &session, id, None).await;

        assert_eq!(settled.status, SettlementStatus::Settled);
        assert_eq!(settled.account_id, Some(account.id));
        assert!(matches!(again, Err(AppError::AlreadySettled)));
        assert_eq!(gateway.account(account.id).unwrap().balance, dec!(600));
    }

    #[tokio::test]
    async fn settling_without_account_is_rejected() {
        let gateway = MemoryGateway::new();
        let session = gateway.add_owner("hash", "Ana");
        let id = pending(&gateway, &session, None, Flow::Inflow, dec!(10)).await;

        let result = settle_transaction(&gateway, &session, id, None).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn deleting_settled_entry_reverses_balance() {
        let gateway = MemoryGateway::new();
        let session = gateway.add_owner("hash", "Ana");
        let account = gateway.add_account(session.owner_id, "Main", dec!(100));
        let id = pending(&gateway, &session, Some(&account), Flow::Inflow, dec!(50)).await;
        settle_transaction(&gateway, &session, id, None).await.unwrap();
        assert_eq!(gateway.account(account.id).unwrap().balance, dec!(150));

        delete_transaction(&gateway, &session, id).await.unwrap();

        assert_eq!(gateway.account(account.id).unwrap().balance, dec!(100));
        assert!(gateway.transactions().is_empty());
    }

    #[tokio::test]
    async fn other_owner_cannot_touch_entries() {
        let gateway = MemoryGateway::new();
        let ana = gateway.add_owner("a", "Ana");
        let bruno = gateway.add_owner("b", "Bruno");
        let id = pending(&gateway, &ana, None, Flow::Outflow, dec!(10)).await;

        let result = delete_transaction(&gateway, &bruno, id).await;

        assert!(matches!(result, Err(AppError::NotFound("transaction"))));
        assert_eq!(gateway.transactions().len(), 1);
    }

    #[tokio::test]
    async fn edits_parse_amount_and_keep_settled_amounts_fixed() {
        let gateway = MemoryGateway::new();
        let session = gateway.add_owner("hash", "Ana");
        let account = gateway.add_account(session.owner_id, "Main", dec!(0));
        let id = pending(&gateway, &session, Some(&account), Flow::Outflow, dec!(10)).await;

        let edited = update_transaction(
            &gateway,
            &session,
            id,
            UpdateEntryRequest {
                amount: Some("1.250,00".to_string()),
                description: Some("  Rent April ".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(edited.amount, dec!(1250));
        assert_eq!(edited.description, "Rent April");

        settle_transaction(&gateway, &session, id, None).await.unwrap();
        let result = update_transaction(
            &gateway,
            &session,
            id,
            UpdateEntryRequest {
                amount: Some("1,00".to_string()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::AlreadySettled)));
    }

    #[tokio::test]
    async fn edits_cannot_point_at_another_owners_account_or_category() {
        let gateway = MemoryGateway::new();
        let ana = gateway.add_owner("a", "Ana");
        let bruno = gateway.add_owner("b", "Bruno");
        let anas_account = gateway.add_account(ana.owner_id, "Main", dec!(100));
        let anas_category = gateway.add_category(ana.owner_id, "Clinic", Flow::Outflow);
        let id = pending(&gateway, &bruno, None, Flow::Outflow, dec!(10)).await;

        let account = update_transaction(
            &gateway,
            &bruno,
            id,
            UpdateEntryRequest {
                account_id: Some(anas_account.id),
                ..Default::default()
            },
        )
        .await;
        let category = update_transaction(
            &gateway,
            &bruno,
            id,
            UpdateEntryRequest {
                category_id: Some(Some(anas_category.id)),
                ..Default::default()
            },
        )
        .await;
        let settle = settle_transaction(&gateway, &bruno, id, Some(anas_account.id)).await;

        assert!(matches!(account, Err(AppError::NotFound("account"))));
        assert!(matches!(category, Err(AppError::NotFound("category"))));
        assert!(matches!(settle, Err(AppError::NotFound("account"))));
        let row = &gateway.transactions()[0];
        assert_eq!(row.account_id, None);
        assert_eq!(row.category_id, None);
        assert_eq!(gateway.account(anas_account.id).unwrap().balance, dec!(100));
    }

    #[tokio::test]
    async fn null_category_clears_it_and_absent_keeps_it() {
        let gateway = MemoryGateway::new();
        let session = gateway.add_owner("hash", "Ana");
        let rent = gateway.add_category(session.owner_id, "Housing", Flow::Outflow);
        let id = pending(&gateway, &session, None, Flow::Outflow, dec!(10)).await;

        let set = update_transaction(
            &gateway,
            &session,
            id,
            UpdateEntryRequest {
                category_id: Some(Some(rent.id)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let kept = update_transaction(
            &gateway,
            &session,
            id,
            UpdateEntryRequest {
                description: Some("Rent May".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let cleared = update_transaction(
            &gateway,
            &session,
            id,
            UpdateEntryRequest {
                category_id: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(set.category_id, Some(rent.id));
        assert_eq!(kept.category_id, Some(rent.id));
        assert_eq!(cleared.category_id, None);
    }

    #[tokio::test]
    async fn edited_amounts_are_rounded_to_cents() {
        let gateway = MemoryGateway::new();
        let session = gateway.add_owner("hash", "Ana");
        let id = pending(&gateway, &session, None, Flow::Outflow, dec!(10)).await;

        let edited = update_transaction(
            &gateway,
            &session,
            id,
            UpdateEntryRequest {
                amount: Some("10,555".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(edited.amount, dec!(10.56));
    }

    #[tokio::test]
    async fn query_filters_by_open_ended_range_and_text() {
        let gateway = MemoryGateway::new();
        let session = gateway.add_owner("hash", "Ana");
        pending(&gateway, &session, None, Flow::Outflow, dec!(10)).await;

        let hits = list_transactions(
            &gateway,
            &session,
            TransactionQuery {
                start: Some(date(1)),
                q: Some("rEnT".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let misses = list_transactions(
            &gateway,
            &session,
            TransactionQuery {
                end: Some(date(4)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(hits.len(), 1);
        assert!(misses.is_empty());
    }
}
