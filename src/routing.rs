//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::json;
use tower_http::services::ServeDir;

use crate::{
    AppState,
    account::{create_account_endpoint, get_accounts_endpoint},
    auth::{auth_guard, log_in_endpoint, log_out_endpoint},
    category::{
        create_category_endpoint, delete_category_endpoint, get_categories_endpoint,
        update_category_endpoint,
    },
    document::upload_endpoint,
    endpoints,
    summary::get_summary_endpoint,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, export_transactions_endpoint,
        get_transactions_endpoint, update_transaction_endpoint,
    },
    user::register_user,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::COFFEE, get(get_coffee))
        .route(endpoints::USERS, post(register_user))
        .route(endpoints::LOG_IN, post(log_in_endpoint))
        .route(endpoints::LOG_OUT, get(log_out_endpoint));

    let protected_routes = Router::new()
        .route(
            endpoints::TRANSACTIONS,
            post(create_transaction_endpoint).get(get_transactions_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            put(update_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS_EXPORT,
            get(export_transactions_endpoint),
        )
        .route(
            endpoints::ACCOUNTS,
            post(create_account_endpoint).get(get_accounts_endpoint),
        )
        .route(
            endpoints::CATEGORIES,
            post(create_category_endpoint).get(get_categories_endpoint),
        )
        .route(
            endpoints::CATEGORY,
            put(update_category_endpoint).delete(delete_category_endpoint),
        )
        .route(endpoints::SUMMARY, get(get_summary_endpoint))
        .route(endpoints::UPLOAD, post(upload_endpoint))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .nest_service(
            endpoints::DOCUMENTS,
            ServeDir::new(&state.document_dir),
        )
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Attempt to get a cup of coffee from the server.
async fn get_coffee() -> Response {
    (
        StatusCode::IM_A_TEAPOT,
        Json(json!({"error": "I'm a teapot"})),
    )
        .into_response()
}

async fn get_404_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": "the requested resource could not be found"})),
    )
        .into_response()
}

#[cfg(test)]
mod routing_tests {
    use axum::http::StatusCode;

    use crate::{endpoints, test_utils::get_test_server};

    #[tokio::test]
    async fn can_get_coffee() {
        let server = get_test_server();

        server
            .get(endpoints::COFFEE)
            .await
            .assert_status(StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn unknown_route_returns_json_404() {
        let server = get_test_server();

        let response = server.get("/api/does_not_exist").await;

        response.assert_status_not_found();
        assert!(
            response.json::<serde_json::Value>().get("error").is_some(),
            "404 responses must have a JSON error body"
        );
    }

    #[tokio::test]
    async fn protected_routes_require_a_session() {
        let server = get_test_server();

        for endpoint in [
            endpoints::TRANSACTIONS,
            endpoints::TRANSACTIONS_EXPORT,
            endpoints::ACCOUNTS,
            endpoints::CATEGORIES,
            endpoints::SUMMARY,
        ] {
            server.get(endpoint).await.assert_status_unauthorized();
        }
    }
}
