use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    transaction::{TransactionQuery, TransactionWithDetails, get_transactions_for_user},
    user::UserID,
};

/// The state needed to export a user's transactions.
#[derive(Debug, Clone)]
pub struct ExportTransactionsState {
    /// The database connection for managing transactions.
    db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ExportTransactionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn write_csv(transactions: &[TransactionWithDetails]) -> Result<Vec<u8>, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(["date", "title", "description", "category", "type", "amount", "account"])
        .map_err(|error| Error::CsvError(error.to_string()))?;

    for item in transactions {
        let transaction = &item.transaction;
        let account_name = item
            .bank_account
            .as_ref()
            .map(|account| account.name.as_str())
            .unwrap_or_default();

        writer
            .write_record([
                transaction.date.to_string().as_str(),
                transaction.title.as_str(),
                transaction.description.as_deref().unwrap_or_default(),
                transaction.category.as_str(),
                transaction.kind.as_str(),
                transaction.amount.to_string().as_str(),
                account_name,
            ])
            .map_err(|error| Error::CsvError(error.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))
}

/// A route handler for exporting the requesting user's transactions as a CSV
/// attachment, honoring the same month/year/account filters as the list
/// endpoint.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn export_transactions_endpoint(
    State(state): State<ExportTransactionsState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<TransactionQuery>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().unwrap();

    let transactions = get_transactions_for_user(user_id, &query, &connection)?;
    let csv = write_csv(&transactions)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"transactions.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}
