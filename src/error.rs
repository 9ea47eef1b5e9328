//! Defines the app level error type and its conversion to JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::database_id::AccountId;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request has no valid session cookie.
    #[error("the request is not authenticated")]
    Unauthorized,

    /// The requested resource belongs to a different user.
    #[error("the requested resource belongs to another user")]
    Forbidden,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The account ID on a transaction did not refer to an account the
    /// requesting user owns.
    #[error("the account {0} could not be found")]
    AccountNotFound(AccountId),

    /// A transaction amount was zero, negative or not a finite number.
    ///
    /// Amounts are stored as positive numbers, the direction of the money
    /// flow is carried by the transaction type.
    #[error("{0} is not a valid amount, amounts must be positive numbers")]
    InvalidAmount(f64),

    /// A required field was missing or empty in the request body.
    #[error("the field \"{0}\" is required")]
    MissingField(&'static str),

    /// A transaction type string was not one of the recognized kinds.
    #[error("\"{0}\" is not a valid transaction type")]
    InvalidTransactionKind(String),

    /// The string could not be parsed as an email address.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// A month query parameter was outside 1-12 or the year/month pair did
    /// not form a valid calendar date.
    #[error("invalid date window: {0}")]
    InvalidDateWindow(String),

    /// The user's email already exists in the database. The client should try
    /// again with a different email address.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// The user provided an invalid email and password combination.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// Either the user ID or expiry cookie is missing from the cookie jar in
    /// the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// There was an error parsing the date in the cookie or creating the new
    /// expiry date time.
    ///
    /// Callers should pass in the original error as a string and the date
    /// string that caused the error.
    #[error("could not format expiry cookie date-time string \"{1}\": {0}")]
    InvalidDateFormat(String, String),

    /// The multipart form could not be parsed.
    #[error("could not parse multipart form: {0}")]
    MultipartError(String),

    /// The multipart form did not contain a file part.
    #[error("a file is required")]
    MissingFile,

    /// An uploaded document could not be written to the document store.
    #[error("could not write to the document store: {0}")]
    DocumentStoreError(String),

    /// A CSV export could not be written.
    #[error("could not write CSV: {0}")]
    CsvError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<time::error::Format> for Error {
    fn from(value: time::error::Format) -> Self {
        Error::InvalidDateFormat(value.to_string(), String::new())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = match &self {
            Error::Unauthorized | Error::InvalidCredentials | Error::CookieMissing => {
                StatusCode::UNAUTHORIZED
            }
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::NotFound | Error::AccountNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidAmount(_)
            | Error::MissingField(_)
            | Error::InvalidTransactionKind(_)
            | Error::InvalidEmail(_)
            | Error::InvalidDateWindow(_)
            | Error::DuplicateEmail
            | Error::MultipartError(_)
            | Error::MissingFile => StatusCode::BAD_REQUEST,
            // Any errors that are not handled above are not intended to be
            // shown to the client in detail.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "internal server error"})),
                )
                    .into_response();
            }
        };

        (status_code, Json(json!({"error": self.to_string()}))).into_response()
    }
}
