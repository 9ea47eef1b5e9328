use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    account::{NewAccount, insert_account},
    user::UserID,
};

/// The state needed to create an account.
#[derive(Debug, Clone)]
pub struct CreateAccountState {
    /// The database connection for managing accounts.
    db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating an account.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountBody {
    /// The display name of the account.
    name: String,
    /// The bank or institution holding the account.
    institution: Option<String>,
    /// The account type, e.g. "CHECKING" or "SAVINGS".
    #[serde(rename = "type")]
    kind: Option<String>,
    /// The opening balance.
    balance: f64,
    /// The ISO currency code of the balance.
    currency: String,
    /// The display color used by clients.
    color: Option<String>,
}

/// A route handler for creating a new bank account.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn create_account_endpoint(
    State(state): State<CreateAccountState>,
    Extension(user_id): Extension<UserID>,
    Json(body): Json<CreateAccountBody>,
) -> Result<Response, Error> {
    if body.name.trim().is_empty() {
        return Err(Error::MissingField("name"));
    }

    if body.currency.trim().is_empty() {
        return Err(Error::MissingField("currency"));
    }

    if !body.balance.is_finite() {
        return Err(Error::InvalidAmount(body.balance));
    }

    let connection = state.db_connection.lock().unwrap();

    let account = insert_account(
        NewAccount {
            name: body.name.trim().to_string(),
            institution: body.institution,
            kind: body.kind,
            balance: body.balance,
            currency: body.currency,
            color: body.color,
            user_id,
        },
        &connection,
    )?;

    tracing::info!("created account {} for user {user_id}", account.id);

    Ok((StatusCode::CREATED, Json(account)).into_response())
}
