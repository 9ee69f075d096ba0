//! Personal Finance Server - Main Application Entry Point
//!
//! A REST API for a personal-finance ledger: accounts, receivables and
//! payables (optionally split into monthly installments), transfers between
//! accounts, categories, an agenda, period reports and a dashboard.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx, behind the `Gateway` trait
//! - **Authentication**: API key with SHA-256 hashing, resolved to a `Session`
//! - **Change notification**: Postgres `LISTEN/NOTIFY` forwarded to a long-poll endpoint
//! - **Format**: JSON requests/responses, amounts as decimal strings
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Start the change-notification bridge
//! 5. Build HTTP router with routes and middleware
//! 6. Start server on configured port

mod config;
mod currency;
mod db;
mod error;
mod gateway;
mod handlers;
mod middleware;
mod models;
mod notify;
mod services;
mod state;

use std::time::Duration;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, patch, post, put},
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::{
    gateway::{AtomicTransfer, postgres::PgGateway},
    notify::ChangeFeed,
    state::AppState,
};

/// Build the application router.
///
/// Everything under `/api/v1` requires `Authorization: Bearer <api key>`;
/// `/health` is public.
pub fn app<G: AtomicTransfer>(state: AppState<G>) -> Router {
    use handlers::{
        accounts, categories, changes, health, installments, reports, session, tasks,
        transactions, transfers,
    };

    let authenticated_routes = Router::new()
        // Session
        .route("/api/v1/session", get(session::get_session))
        .route("/api/v1/session/theme", put(session::update_theme::<G>))
        // Accounts and transfers
        .route(
            "/api/v1/accounts",
            get(accounts::list_accounts::<G>).post(accounts::create_account::<G>),
        )
        .route("/api/v1/transfers", post(transfers::create_transfer::<G>))
        // Transactions
        .route(
            "/api/v1/transactions",
            get(transactions::list_transactions::<G>).post(transactions::create_entry::<G>),
        )
        .route(
            "/api/v1/transactions/settled",
            post(transactions::create_settled_entry::<G>),
        )
        .route(
            "/api/v1/transactions/{id}",
            patch(transactions::update_transaction::<G>)
                .delete(transactions::delete_transaction::<G>),
        )
        .route(
            "/api/v1/transactions/{id}/settle",
            post(transactions::settle_transaction::<G>),
        )
        // Categories
        .route(
            "/api/v1/categories",
            get(categories::list_categories::<G>).post(categories::create_category::<G>),
        )
        .route(
            "/api/v1/categories/{id}",
            put(categories::update_category::<G>).delete(categories::delete_category::<G>),
        )
        // Agenda
        .route(
            "/api/v1/tasks",
            get(tasks::list_tasks::<G>).post(tasks::create_task::<G>),
        )
        .route(
            "/api/v1/tasks/{id}",
            put(tasks::update_task::<G>).delete(tasks::delete_task::<G>),
        )
        .route(
            "/api/v1/tasks/{id}/complete",
            post(tasks::complete_task::<G>),
        )
        // Planning and reporting
        .route("/api/v1/installments/preview", get(installments::preview))
        .route("/api/v1/reports/period", get(reports::period_report::<G>))
        .route("/api/v1/dashboard", get(reports::dashboard::<G>))
        // Change notification
        .route("/api/v1/changes/next", get(changes::next_change::<G>))
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware::<G>,
        ));

    Router::new()
        // Public routes (no authentication required)
        .route("/health", get(health::health_check::<G>))
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!(transfer_mode = ?config.transfer_mode, "Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let gateway = PgGateway::new(pool);

    // Forward table change notifications to long-poll subscribers
    let feed = ChangeFeed::default();
    notify::spawn_pg_bridge(gateway.pool(), feed.clone()).await?;
    tracing::info!("Listening for table changes on \"{}\"", notify::CHANNEL);

    let state = AppState::new(gateway, feed)
        .with_transfer_mode(config.transfer_mode)
        .with_change_poll_max(Duration::from_secs(config.change_poll_max_secs));

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(state)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        gateway::memory::MemoryGateway,
        middleware::auth::hash_api_key,
        models::{session::Session, transaction::Flow},
        notify::Table,
    };

    const KEY: &str = "test-key";

    fn setup() -> (MemoryGateway, Session, ChangeFeed) {
        let feed = ChangeFeed::default();
        let gateway = MemoryGateway::new().with_feed(feed.clone());
        let session = gateway.add_owner(&hash_api_key(KEY), "Ana");
        (gateway, session, feed)
    }

    fn router(gateway: &MemoryGateway, feed: &ChangeFeed) -> Router {
        app(AppState::new(gateway.clone(), feed.clone())
            .with_change_poll_max(Duration::from_secs(5)))
    }

    fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {KEY}"));
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn health_is_public() {
        let (gateway, _, feed) = setup();
        let request = Request::get("/health").body(Body::empty()).unwrap();

        let (status, body) = send(router(&gateway, &feed), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["transfer_mode"], "sequential");
    }

    #[tokio::test]
    async fn api_rejects_unknown_keys() {
        let (gateway, _, feed) = setup();
        let request = Request::get("/api/v1/accounts")
            .header("Authorization", "Bearer wrong")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(router(&gateway, &feed), request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "invalid_api_key");
    }

    #[tokio::test]
    async fn transfer_endpoint_moves_money_and_rejects_bad_input() {
        let (gateway, session, feed) = setup();
        let origin = gateway.add_account(session.owner_id, "Checking", dec!(1000));
        let destination = gateway.add_account(session.owner_id, "Savings", dec!(200));

        let (status, body) = send(
            router(&gateway, &feed),
            request(
                "POST",
                "/api/v1/transfers",
                Some(json!({
                    "origin_id": origin.id,
                    "destination_id": destination.id,
                    "amount": "300,00",
                    "date": "2024-03-10"
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "settled");
        assert_eq!(body["origin"]["balance_display"], "R$ 700,00");
        assert_eq!(body["destination"]["balance_display"], "R$ 500,00");

        let (status, body) = send(
            router(&gateway, &feed),
            request(
                "POST",
                "/api/v1/transfers",
                Some(json!({
                    "origin_id": origin.id,
                    "destination_id": origin.id,
                    "amount": "10,00"
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "invalid_accounts");
    }

    #[tokio::test]
    async fn category_in_use_cannot_be_deleted_over_http() {
        let (gateway, session, feed) = setup();
        let food = gateway.add_category(session.owner_id, "Food", Flow::Outflow);

        let (status, _) = send(
            router(&gateway, &feed),
            request(
                "POST",
                "/api/v1/transactions",
                Some(json!({
                    "description": "Market",
                    "amount": "89,90",
                    "date": "2024-01-10",
                    "flow": "outflow",
                    "category_id": food.id
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let uri = format!("/api/v1/categories/{}", food.id);
        let (status, body) = send(router(&gateway, &feed), request("DELETE", &uri, None)).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "category_in_use");
        assert_eq!(gateway.categories().len(), 1);
    }

    #[tokio::test]
    async fn settled_entry_on_foreign_account_is_not_found() {
        let (gateway, _, feed) = setup();
        let other = gateway.add_owner(&hash_api_key("other-key"), "Bruno");
        let foreign = gateway.add_account(other.owner_id, "Main", dec!(1000));

        let (status, body) = send(
            router(&gateway, &feed),
            request(
                "POST",
                "/api/v1/transactions/settled",
                Some(json!({
                    "description": "Pix",
                    "amount": "900,00",
                    "date": "2024-01-05",
                    "flow": "outflow",
                    "account_id": foreign.id
                })),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
        assert_eq!(gateway.account(foreign.id).unwrap().balance, dec!(1000));
        assert!(gateway.transactions().is_empty());
    }

    #[tokio::test]
    async fn installment_preview_clamps_month_ends() {
        let (gateway, _, feed) = setup();

        let (status, body) = send(
            router(&gateway, &feed),
            request(
                "GET",
                "/api/v1/installments/preview?amount=1.200,00&date=2024-01-31&count=3",
                None,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
        assert_eq!(body["installments"].as_array().unwrap().len(), 3);
        assert_eq!(body["installments"][1]["date"], "2024-02-29");
        assert_eq!(body["installments"][2]["amount_display"], "R$ 400,00");
    }

    #[tokio::test]
    async fn period_report_groups_settled_entries() {
        let (gateway, session, feed) = setup();
        let account = gateway.add_account(session.owner_id, "Main", dec!(0));

        let (status, _) = send(
            router(&gateway, &feed),
            request(
                "POST",
                "/api/v1/transactions/settled",
                Some(json!({
                    "description": "Salary",
                    "amount": "500,00",
                    "date": "2024-01-05",
                    "flow": "inflow",
                    "account_id": account.id
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            router(&gateway, &feed),
            request("GET", "/api/v1/reports/period?year=2024&month=1", None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["inflow_by_category"][0]["category"], "General");
        assert_eq!(body["total_inflow_display"], "R$ 500,00");
        assert_eq!(gateway.account(account.id).unwrap().balance, dec!(500));
    }

    #[tokio::test]
    async fn change_poll_times_out_with_no_content() {
        let (gateway, _, feed) = setup();

        let (status, body) = send(
            router(&gateway, &feed),
            request("GET", "/api/v1/changes/next?timeout_secs=0", None),
        )
        .await;

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn change_poll_reports_the_changed_table() {
        let (gateway, _, feed) = setup();
        let publisher = feed.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            publisher.publish(Table::Tasks);
            publisher.publish(Table::BankAccounts);
        });

        let (status, body) = send(
            router(&gateway, &feed),
            request("GET", "/api/v1/changes/next?tables=bank_accounts", None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["table"], "bank_accounts");
    }
}
