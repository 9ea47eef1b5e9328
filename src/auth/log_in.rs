//! The log-in endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use time::Duration;

use crate::{
    AppState, Error,
    auth::cookie::set_auth_cookie,
    user::get_user_by_email,
};

/// The state needed to log a user in.
#[derive(Clone)]
pub struct LogInState {
    /// The database connection for looking up users.
    db_connection: Arc<Mutex<Connection>>,
    /// The key to be used for signing and encrypting private cookies.
    cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    cookie_duration: Duration,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
        }
    }
}

impl FromRef<LogInState> for Key {
    fn from_ref(state: &LogInState) -> Self {
        state.cookie_key.clone()
    }
}

/// The credentials sent to the log-in endpoint.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// The email address the user registered with.
    pub email: String,
    /// The plain text password.
    pub password: String,
}

/// A route handler for logging a user in with an email and password.
///
/// On success, sets the private session cookies and returns the user's ID and
/// email. An unknown email and a wrong password both produce the same `401`
/// so the response does not reveal which emails are registered.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn log_in_endpoint(
    State(state): State<LogInState>,
    jar: PrivateCookieJar,
    Json(credentials): Json<Credentials>,
) -> Result<Response, Error> {
    let user = {
        let connection = state.db_connection.lock().unwrap();

        get_user_by_email(credentials.email.trim(), &connection).map_err(|error| match error {
            Error::NotFound => Error::InvalidCredentials,
            error => error,
        })?
    };

    if !user.password_hash.verify(&credentials.password)? {
        return Err(Error::InvalidCredentials);
    }

    let jar = set_auth_cookie(jar, user.id, state.cookie_duration)?;

    tracing::info!("user {} logged in", user.id);

    Ok((jar, Json(json!({"id": user.id, "email": user.email}))).into_response())
}
