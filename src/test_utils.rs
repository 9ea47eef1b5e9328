//! Helpers shared by the endpoint tests.

use axum_test::TestServer;
use rusqlite::Connection;
use serde_json::json;

use crate::{AppState, routing::build_router, user::UserID};

/// The email of the user created by [get_test_server_with_user].
pub const TEST_EMAIL: &str = "test@example.com";
/// The password used for every user created by the test helpers.
pub const TEST_PASSWORD: &str = "averysafeandsecurepassword";

/// Use the minimum bcrypt cost to keep the test suite fast.
const TEST_HASH_COST: u32 = 4;

/// Create an [AppState] backed by an in-memory database and a temporary
/// document directory.
pub fn get_test_app_state() -> AppState {
    let db_connection =
        Connection::open_in_memory().expect("Could not create in-memory SQLite database");
    let document_dir = tempfile::tempdir()
        .expect("Could not create temporary document directory")
        .keep();

    let mut state = AppState::new(db_connection, "42", document_dir)
        .expect("Could not create app state");
    state.password_hash_cost = TEST_HASH_COST;

    state
}

/// Create a test server that persists cookies between requests.
pub fn get_test_server() -> TestServer {
    let app = build_router(get_test_app_state());

    let mut server = TestServer::new(app);
    server.save_cookies();

    server
}

/// Create a test server with a registered user that is already logged in.
pub async fn get_test_server_with_user() -> (TestServer, UserID) {
    let server = get_test_server();

    let response = server
        .post(crate::endpoints::USERS)
        .json(&json!({"email": TEST_EMAIL, "password": TEST_PASSWORD}))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let user_id = UserID::new(
        response.json::<serde_json::Value>()["id"]
            .as_i64()
            .expect("user id missing from register response"),
    );

    log_in(&server, TEST_EMAIL).await;

    (server, user_id)
}

/// Log in as the user registered with `email` and [TEST_PASSWORD], replacing
/// the server's saved session cookies.
pub async fn log_in(server: &TestServer, email: &str) {
    server
        .post(crate::endpoints::LOG_IN)
        .json(&json!({"email": email, "password": TEST_PASSWORD}))
        .await
        .assert_status_ok();
}

/// Register a new user with `email` and switch the server's saved session to
/// them.
pub async fn log_in_as_new_user(server: &TestServer, email: &str) {
    server
        .post(crate::endpoints::USERS)
        .json(&json!({"email": email, "password": TEST_PASSWORD}))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    log_in(server, email).await;
}

/// Create a bank account named "Checking" with the given opening balance and
/// return its ID.
pub async fn create_test_account(server: &TestServer, balance: f64) -> i64 {
    let response = server
        .post(crate::endpoints::ACCOUNTS)
        .json(&json!({"name": "Checking", "balance": balance, "currency": "USD"}))
        .await;

    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<serde_json::Value>()["id"]
        .as_i64()
        .expect("account id missing from create response")
}

/// Create a transaction, optionally linked to an account, and return its ID.
pub async fn create_test_transaction(
    server: &TestServer,
    amount: f64,
    kind: &str,
    account_id: Option<i64>,
) -> i64 {
    let mut body = json!({
        "title": "Test transaction",
        "amount": amount,
        "type": kind,
        "category": "misc",
    });
    if let Some(account_id) = account_id {
        body["bankAccountId"] = json!(account_id);
    }

    let response = server.post(crate::endpoints::TRANSACTIONS).json(&body).await;

    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<serde_json::Value>()["id"]
        .as_i64()
        .expect("transaction id missing from create response")
}
