use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{AppState, Error, account::get_accounts_for_user, user::UserID};

/// The state needed to list a user's accounts.
#[derive(Debug, Clone)]
pub struct ListAccountsState {
    /// The database connection for managing accounts.
    db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListAccountsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for listing the requesting user's bank accounts, each with
/// the number of transactions linked to it.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_accounts_endpoint(
    State(state): State<ListAccountsState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().unwrap();

    let accounts = get_accounts_for_user(user_id, &connection)?;

    Ok(Json(accounts).into_response())
}
