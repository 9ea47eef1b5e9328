use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, TransactionBehavior};
use serde_json::json;

use crate::{
    AppState, Error,
    database_id::TransactionId,
    ledger::{Posting, apply_balance_deltas, balance_deltas},
    transaction::{delete_transaction, get_transaction},
    user::UserID,
};

/// The state needed to delete a transaction.
#[derive(Debug, Clone)]
pub struct DeleteTransactionState {
    /// The database connection for managing transactions.
    db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for deleting a transaction.
///
/// If the transaction was linked to a bank account, its contribution to the
/// account's cached balance is reversed in the same SQL transaction as the
/// row delete. Attached documents are removed by the foreign key cascade.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn delete_transaction_endpoint(
    State(state): State<DeleteTransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Response, Error> {
    let mut connection = state.db_connection.lock().unwrap();

    let transaction = get_transaction(transaction_id, &connection)?;

    if transaction.user_id != user_id {
        return Err(Error::Forbidden);
    }

    let old_posting = transaction.account_id.map(|account_id| Posting {
        account_id,
        kind: transaction.kind,
        amount: transaction.amount,
    });

    let sql_transaction =
        connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

    delete_transaction(transaction_id, &sql_transaction)?;
    apply_balance_deltas(
        &balance_deltas(old_posting.as_ref(), None),
        &sql_transaction,
    )?;

    sql_transaction.commit()?;

    tracing::info!("deleted transaction {transaction_id} for user {user_id}");

    Ok(Json(json!({"success": true})).into_response())
}

#[cfg(test)]
mod delete_transaction_endpoint_tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::{
        endpoints,
        test_utils::{
            TEST_EMAIL, create_test_account, create_test_transaction, get_test_server_with_user,
            log_in, log_in_as_new_user,
        },
    };

    #[tokio::test]
    async fn delete_restores_the_account_balance() {
        let (server, _user_id) = get_test_server_with_user().await;
        let account_id = create_test_account(&server, 100.0).await;
        let transaction_id =
            create_test_transaction(&server, 25.0, "EXPENSE", Some(account_id)).await;

        let response = server
            .delete(&endpoints::format_endpoint(
                endpoints::TRANSACTION,
                transaction_id,
            ))
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<serde_json::Value>(), json!({"success": true}));

        let accounts = server.get(endpoints::ACCOUNTS).await.json::<Vec<serde_json::Value>>();
        assert_eq!(accounts[0]["balance"], 100.0);

        let transactions = server
            .get(endpoints::TRANSACTIONS)
            .await
            .json::<Vec<serde_json::Value>>();
        assert_eq!(transactions.len(), 0);
    }

    #[tokio::test]
    async fn delete_of_unlinked_transaction_succeeds() {
        let (server, _user_id) = get_test_server_with_user().await;
        let transaction_id = create_test_transaction(&server, 10.0, "EXPENSE", None).await;

        server
            .delete(&endpoints::format_endpoint(
                endpoints::TRANSACTION,
                transaction_id,
            ))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn delete_fails_on_unknown_transaction() {
        let (server, _user_id) = get_test_server_with_user().await;

        server
            .delete(&endpoints::format_endpoint(endpoints::TRANSACTION, 1337))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn delete_of_another_users_transaction_is_forbidden_with_no_side_effects() {
        let (server, _user_id) = get_test_server_with_user().await;
        let account_id = create_test_account(&server, 100.0).await;
        let transaction_id =
            create_test_transaction(&server, 25.0, "EXPENSE", Some(account_id)).await;

        log_in_as_new_user(&server, "second@example.com").await;
        server
            .delete(&endpoints::format_endpoint(
                endpoints::TRANSACTION,
                transaction_id,
            ))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        log_in(&server, TEST_EMAIL).await;
        let transactions = server
            .get(endpoints::TRANSACTIONS)
            .await
            .json::<Vec<serde_json::Value>>();
        assert_eq!(transactions.len(), 1);

        let accounts = server.get(endpoints::ACCOUNTS).await.json::<Vec<serde_json::Value>>();
        assert_eq!(accounts[0]["balance"], 75.0);
    }
}
