use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    database_id::{AccountId, TransactionId},
    document::{NewDocument, replace_documents},
    ledger::{Posting, apply_balance_deltas, balance_deltas},
    transaction::{
        TransactionKind, ensure_linkable_account, get_transaction, get_transaction_with_details,
        update_transaction, validate_amount,
    },
    user::UserID,
};

/// The state needed to update a transaction.
#[derive(Debug, Clone)]
pub struct UpdateTransactionState {
    /// The database connection for managing transactions.
    db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UpdateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for updating a transaction.
///
/// Fields that are omitted keep their current value, except for
/// `bankAccountId`: omitting it (or sending `null`) disconnects the
/// transaction from its account. Supplying `documents` replaces the
/// transaction's document set wholesale, an empty array clears it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTransactionBody {
    /// A short human-readable title.
    title: Option<String>,
    /// A longer free-form description. Omitting the field keeps the current
    /// value, an explicit `null` clears it.
    #[serde(default, deserialize_with = "deserialize_present")]
    description: Option<Option<String>>,
    /// The amount of money spent or earned, must be a positive number.
    amount: Option<f64>,
    /// Whether the transaction is income or an expense.
    #[serde(rename = "type")]
    kind: Option<TransactionKind>,
    /// The category of the transaction.
    category: Option<String>,
    /// When the transaction happened.
    date: Option<Date>,
    /// The bank account to link the transaction to.
    #[serde(rename = "bankAccountId")]
    account_id: Option<AccountId>,
    /// The full set of documents to attach to the transaction.
    documents: Option<Vec<NewDocument>>,
}

/// Deserialize a field that was present in the body, so that an explicit
/// `null` (`Some(None)`) can be told apart from an omitted field (`None`).
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// A route handler for updating a transaction.
///
/// All balance effects (amount or type changes, linking, unlinking,
/// reassignment between accounts) are applied in the same SQL transaction as
/// the row update by reversing the old posting and applying the new one.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn update_transaction_endpoint(
    State(state): State<UpdateTransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
    Json(body): Json<UpdateTransactionBody>,
) -> Result<Response, Error> {
    if let Some(amount) = body.amount {
        validate_amount(amount)?;
    }

    let mut connection = state.db_connection.lock().unwrap();

    let mut transaction = get_transaction(transaction_id, &connection)?;

    if transaction.user_id != user_id {
        return Err(Error::Forbidden);
    }

    let old_posting = transaction.account_id.map(|account_id| Posting {
        account_id,
        kind: transaction.kind,
        amount: transaction.amount,
    });

    if let Some(title) = body.title {
        if title.trim().is_empty() {
            return Err(Error::MissingField("title"));
        }
        transaction.title = title.trim().to_string();
    }
    if let Some(description) = body.description {
        transaction.description = description;
    }
    if let Some(amount) = body.amount {
        transaction.amount = amount;
    }
    if let Some(kind) = body.kind {
        transaction.kind = kind;
    }
    if let Some(category) = body.category {
        transaction.category = category;
    }
    if let Some(date) = body.date {
        transaction.date = date;
    }
    transaction.account_id = body.account_id;

    let sql_transaction =
        connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if let Some(account_id) = transaction.account_id {
        ensure_linkable_account(account_id, user_id, &sql_transaction)?;
    }

    update_transaction(&transaction, &sql_transaction)?;

    let new_posting = transaction.account_id.map(|account_id| Posting {
        account_id,
        kind: transaction.kind,
        amount: transaction.amount,
    });
    apply_balance_deltas(
        &balance_deltas(old_posting.as_ref(), new_posting.as_ref()),
        &sql_transaction,
    )?;

    if let Some(documents) = body.documents {
        replace_documents(transaction_id, &documents, &sql_transaction)?;
    }

    sql_transaction.commit()?;

    tracing::info!("updated transaction {transaction_id} for user {user_id}");

    let details = get_transaction_with_details(transaction_id, &connection)?;

    Ok(Json(details).into_response())
}
