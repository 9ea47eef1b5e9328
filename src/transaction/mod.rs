//! Transactions, their endpoints, and the queries they share.
//!
//! Mutating endpoints (create, update, delete) route every balance change
//! through [crate::ledger] inside a single SQL transaction so that the cached
//! account balances stay consistent with the transaction rows.

mod core;
mod create_endpoint;
mod delete_endpoint;
mod export_endpoint;
mod list_endpoint;
mod update_endpoint;

pub use core::{
    NewTransaction, Transaction, TransactionKind, TransactionQuery, TransactionWithDetails,
    create_transaction_table, date_window, delete_transaction, ensure_linkable_account,
    get_transaction,
    get_transaction_with_details, get_transactions_for_user, insert_transaction,
    map_transaction_row, update_transaction, validate_amount,
};
pub use create_endpoint::create_transaction_endpoint;
pub use delete_endpoint::delete_transaction_endpoint;
pub use export_endpoint::export_transactions_endpoint;
pub use list_endpoint::get_transactions_endpoint;
pub use update_endpoint::update_transaction_endpoint;

#[cfg(test)]
mod balance_invariant_tests {
    use serde_json::json;

    use crate::{
        endpoints,
        test_utils::{create_test_account, create_test_transaction, get_test_server_with_user},
    };

    /// Recompute each account's balance from its linked transactions and
    /// compare it to the cached balance.
    async fn assert_balances_consistent(server: &axum_test::TestServer, opening_balance: f64) {
        let transactions = server
            .get(endpoints::TRANSACTIONS)
            .await
            .json::<Vec<serde_json::Value>>();
        let accounts = server
            .get(endpoints::ACCOUNTS)
            .await
            .json::<Vec<serde_json::Value>>();

        for account in accounts {
            let account_id = account["id"].as_i64().unwrap();
            let recomputed: f64 = transactions
                .iter()
                .filter(|transaction| transaction["bankAccountId"].as_i64() == Some(account_id))
                .map(|transaction| {
                    let amount = transaction["amount"].as_f64().unwrap();
                    match transaction["type"].as_str().unwrap() {
                        "INCOME" => amount,
                        _ => -amount,
                    }
                })
                .sum();

            assert_eq!(
                account["balance"].as_f64().unwrap(),
                opening_balance + recomputed,
                "cached balance of account {account_id} diverged from its transactions"
            );
        }
    }

    #[tokio::test]
    async fn balances_stay_consistent_across_a_mutation_sequence() {
        let (server, _user_id) = get_test_server_with_user().await;
        let account_a = create_test_account(&server, 100.0).await;
        let account_b = create_test_account(&server, 100.0).await;

        let income = create_test_transaction(&server, 50.0, "INCOME", Some(account_a)).await;
        let expense = create_test_transaction(&server, 30.0, "EXPENSE", Some(account_a)).await;
        create_test_transaction(&server, 20.0, "EXPENSE", Some(account_b)).await;
        assert_balances_consistent(&server, 100.0).await;

        // Move the expense to the other account.
        server
            .put(&endpoints::format_endpoint(endpoints::TRANSACTION, expense))
            .json(&json!({"bankAccountId": account_b}))
            .await
            .assert_status_ok();
        assert_balances_consistent(&server, 100.0).await;

        // Flip the income to an expense and change its amount.
        server
            .put(&endpoints::format_endpoint(endpoints::TRANSACTION, income))
            .json(&json!({"type": "EXPENSE", "amount": 75.0, "bankAccountId": account_a}))
            .await
            .assert_status_ok();
        assert_balances_consistent(&server, 100.0).await;

        server
            .delete(&endpoints::format_endpoint(endpoints::TRANSACTION, expense))
            .await
            .assert_status_ok();
        assert_balances_consistent(&server, 100.0).await;
    }
}
