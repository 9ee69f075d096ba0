//! Category management.
//!
//! Names are unique per owner ignoring case. A category referenced by any
//! transaction cannot be deleted; the check runs before the delete and the
//! caller gets the number of referencing transactions back.

use uuid::Uuid;

use crate::{
    error::AppError,
    gateway::{CategoryFilter, Gateway, TransactionFilter},
    models::{
        category::{Category, CategoryRequest},
        session::Session,
        transaction::Flow,
    },
};

pub async fn list_categories<G: Gateway>(
    gateway: &G,
    session: &Session,
    flow: Option<Flow>,
) -> Result<Vec<Category>, AppError> {
    let filter = CategoryFilter {
        owner_id: session.owner_id,
        flow,
    };
    Ok(gateway.get_categories(filter).await?)
}

/// Reject `name` if another category of the owner already uses it.
async fn ensure_unique_name<G: Gateway>(
    gateway: &G,
    session: &Session,
    name: &str,
    except: Option<Uuid>,
) -> Result<(), AppError> {
    let existing = list_categories(gateway, session, None).await?;
    let lowered = name.to_lowercase();

    if existing
        .iter()
        .any(|c| c.name.to_lowercase() == lowered && Some(c.id) != except)
    {
        return Err(AppError::DuplicateCategory(name.to_string()));
    }
    Ok(())
}

fn validated_name(request: &CategoryRequest) -> Result<String, AppError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Category name is required".to_string()));
    }
    Ok(name.to_string())
}

/// Create a category.
///
/// # Errors
///
/// - `Validation`: empty name
/// - `DuplicateCategory`: name already used by this owner (any case)
pub async fn create_category<G: Gateway>(
    gateway: &G,
    session: &Session,
    request: CategoryRequest,
) -> Result<Category, AppError> {
    let name = validated_name(&request)?;
    ensure_unique_name(gateway, session, &name, None).await?;

    let category = Category {
        id: Uuid::new_v4(),
        owner_id: session.owner_id,
        name,
        color: request.color,
        flow: request.flow,
    };
    gateway.upsert_category(category.clone()).await?;
    tracing::info!(category_id = %category.id, "Category created");

    Ok(category)
}

/// Rename or recolor a category.
pub async fn update_category<G: Gateway>(
    gateway: &G,
    session: &Session,
    category_id: Uuid,
    request: CategoryRequest,
) -> Result<Category, AppError> {
    let name = validated_name(&request)?;
    let existing = list_categories(gateway, session, None).await?;
    if !existing.iter().any(|c| c.id == category_id) {
        return Err(AppError::NotFound("category"));
    }
    ensure_unique_name(gateway, session, &name, Some(category_id)).await?;

    let category = Category {
        id: category_id,
        owner_id: session.owner_id,
        name,
        color: request.color,
        flow: request.flow,
    };
    gateway.upsert_category(category.clone()).await?;

    Ok(category)
}

/// Delete a category that no transaction references.
///
/// # Errors
///
/// - `NotFound`: no such category for this owner
/// - `CategoryInUse`: at least one transaction references it; nothing changes
pub async fn delete_category<G: Gateway>(
    gateway: &G,
    session: &Session,
    category_id: Uuid,
) -> Result<(), AppError> {
    let existing = list_categories(gateway, session, None).await?;
    if !existing.iter().any(|c| c.id == category_id) {
        return Err(AppError::NotFound("category"));
    }

    let referencing = gateway
        .query_transactions(TransactionFilter {
            category_id: Some(category_id),
            ..TransactionFilter::owner(session.owner_id)
        })
        .await?;
    if !referencing.is_empty() {
        tracing::warn!(
            %category_id,
            count = referencing.len(),
            "Refusing to delete category in use"
        );
        return Err(AppError::CategoryInUse {
            count: referencing.len(),
        });
    }

    gateway.delete_category(category_id).await?;
    tracing::info!(%category_id, "Category deleted");

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{
        gateway::memory::MemoryGateway,
        models::transaction::{NewTransaction, SettlementStatus},
    };

    fn request(name: &str) -> CategoryRequest {
        CategoryRequest {
            name: name.to_string(),
            color: "#ff5252".to_string(),
            flow: Flow::Outflow,
        }
    }

    #[tokio::test]
    async fn names_are_unique_ignoring_case() {
        let gateway = MemoryGateway::new();
        let session = gateway.add_owner("hash", "Ana");

        create_category(&gateway, &session, request("Food")).await.unwrap();
        let result = create_category(&gateway, &session, request(" food ")).await;

        assert!(matches!(result, Err(AppError::DuplicateCategory(_))));
        assert_eq!(gateway.categories().len(), 1);
    }

    #[tokio::test]
    async fn renaming_to_own_name_in_other_case_is_allowed() {
        let gateway = MemoryGateway::new();
        let session = gateway.add_owner("hash", "Ana");
        let food = create_category(&gateway, &session, request("Food")).await.unwrap();

        let renamed = update_category(&gateway, &session, food.id, request("FOOD"))
            .await
            .unwrap();

        assert_eq!(renamed.name, "FOOD");
    }

    #[tokio::test]
    async fn referenced_category_cannot_be_deleted() {
        let gateway = MemoryGateway::new();
        let session = gateway.add_owner("hash", "Ana");
        let food = gateway.add_category(session.owner_id, "Food", Flow::Outflow);
        gateway
            .insert_transaction(NewTransaction {
                owner_id: session.owner_id,
                description: "Lunch".to_string(),
                amount: dec!(25),
                date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                flow: Flow::Outflow,
                status: SettlementStatus::Pending,
                category_id: Some(food.id),
                account_id: None,
            })
            .await
            .unwrap();
        let before = gateway.transactions();

        let result = delete_category(&gateway, &session, food.id).await;

        assert!(matches!(result, Err(AppError::CategoryInUse { count: 1 })));
        assert_eq!(gateway.categories(), vec![food]);
        assert_eq!(gateway.transactions(), before);
    }

    #[tokio::test]
    async fn unused_category_is_deleted() {
        let gateway = MemoryGateway::new();
        let session = gateway.add_owner("hash", "Ana");
        let food = gateway.add_category(session.owner_id, "Food", Flow::Outflow);

        delete_category(&gateway, &session, food.id).await.unwrap();

        assert!(gateway.categories().is_empty());
    }

    #[tokio::test]
    async fn other_owners_categories_are_not_found() {
        let gateway = MemoryGateway::new();
        let ana = gateway.add_owner("a", "Ana");
        let bruno = gateway.add_owner("b", "Bruno");
        let food = gateway.add_category(ana.owner_id, "Food", Flow::Outflow);

        let result = delete_category(&gateway, &bruno, food.id).await;

        assert!(matches!(result, Err(AppError::NotFound("category"))));
    }
}
