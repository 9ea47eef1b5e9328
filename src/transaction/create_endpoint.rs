use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error,
    database_id::AccountId,
    ledger::{Posting, apply_balance_deltas, balance_deltas},
    transaction::{
        NewTransaction, TransactionKind, ensure_linkable_account, get_transaction_with_details,
        insert_transaction, validate_amount,
    },
    user::UserID,
};

/// The state needed to create a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for managing transactions.
    db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating a transaction.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionBody {
    /// A short human-readable title.
    title: String,
    /// A longer free-form description.
    description: Option<String>,
    /// The amount of money spent or earned, must be a positive number.
    amount: f64,
    /// Whether the transaction is income or an expense.
    #[serde(rename = "type")]
    kind: TransactionKind,
    /// The category of the transaction.
    category: String,
    /// When the transaction happened. Defaults to today.
    date: Option<Date>,
    /// The bank account to link the transaction to.
    #[serde(rename = "bankAccountId")]
    account_id: Option<AccountId>,
}

/// A route handler for creating a new transaction.
///
/// When the transaction is linked to a bank account, the account's cached
/// balance is adjusted in the same SQL transaction as the row insert.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Extension(user_id): Extension<UserID>,
    Json(body): Json<CreateTransactionBody>,
) -> Result<Response, Error> {
    if body.title.trim().is_empty() {
        return Err(Error::MissingField("title"));
    }

    if body.category.trim().is_empty() {
        return Err(Error::MissingField("category"));
    }

    validate_amount(body.amount)?;

    let date = body
        .date
        .unwrap_or_else(|| OffsetDateTime::now_utc().date());

    let mut connection = state.db_connection.lock().unwrap();
    let sql_transaction =
        connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if let Some(account_id) = body.account_id {
        ensure_linkable_account(account_id, user_id, &sql_transaction)?;
    }

    let transaction = insert_transaction(
        NewTransaction {
            title: body.title.trim().to_string(),
            description: body.description,
            amount: body.amount,
            kind: body.kind,
            category: body.category,
            date,
            account_id: body.account_id,
            user_id,
        },
        &sql_transaction,
    )?;

    let new_posting = transaction.account_id.map(|account_id| Posting {
        account_id,
        kind: transaction.kind,
        amount: transaction.amount,
    });
    apply_balance_deltas(
        &balance_deltas(None, new_posting.as_ref()),
        &sql_transaction,
    )?;

    sql_transaction.commit()?;

    tracing::info!("created transaction {} for user {user_id}", transaction.id);

    let details = get_transaction_with_details(transaction.id, &connection)?;

    Ok((StatusCode::CREATED, Json(details)).into_response())
}
