//! Monthly income/expense totals.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{AppState, Error, transaction::date_window, user::UserID};

/// The income and expense totals for a set of transactions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    /// The sum of the amounts of income transactions.
    pub income: f64,
    /// The sum of the amounts of expense transactions.
    pub expense: f64,
    /// Income minus expense.
    pub net: f64,
}

/// The query parameters accepted by the summary endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SummaryQuery {
    /// Restrict totals to this calendar month (1-12). Only applied when
    /// `year` is also given.
    pub month: Option<u8>,
    /// Restrict totals to this calendar year.
    pub year: Option<i32>,
}

/// Compute the income/expense totals of `user_id`'s transactions, optionally
/// restricted to the month described by `query`.
///
/// # Errors
/// This function will return an [Error::InvalidDateWindow] if the query's
/// month/year pair is invalid, or an [Error::SqlError] if there is an SQL
/// error.
pub fn get_summary_for_user(
    user_id: UserID,
    query: &SummaryQuery,
    connection: &Connection,
) -> Result<Summary, Error> {
    let window = date_window(query.month, query.year)?;
    let (start, end) = match window {
        Some((start, end)) => (Some(start), Some(end)),
        None => (None, None),
    };

    let (income, expense) = connection
        .prepare(
            "SELECT COALESCE(SUM(CASE WHEN kind = 'INCOME' THEN amount ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN kind = 'EXPENSE' THEN amount ELSE 0 END), 0)
             FROM \"transaction\"
             WHERE user_id = :user_id
               AND (:start IS NULL OR date >= :start)
               AND (:end IS NULL OR date <= :end)",
        )?
        .query_row(
            rusqlite::named_params! {
                ":user_id": user_id.as_i64(),
                ":start": start,
                ":end": end,
            },
            |row| Ok((row.get::<_, f64>(0)?, row.get::<_, f64>(1)?)),
        )?;

    Ok(Summary {
        income,
        expense,
        net: income - expense,
    })
}

/// The state needed to compute a summary.
#[derive(Debug, Clone)]
pub struct SummaryState {
    /// The database connection for managing transactions.
    db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SummaryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for the requesting user's income/expense totals.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_summary_endpoint(
    State(state): State<SummaryState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<SummaryQuery>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().unwrap();

    let summary = get_summary_for_user(user_id, &query, &connection)?;

    Ok(Json(summary).into_response())
}

#[cfg(test)]
mod summary_endpoint_tests {
    use serde_json::json;

    use crate::{endpoints, test_utils::get_test_server_with_user};

    async fn post_transaction(
        server: &axum_test::TestServer,
        amount: f64,
        kind: &str,
        date: &str,
    ) {
        server
            .post(endpoints::TRANSACTIONS)
            .json(&json!({
                "title": "Test",
                "amount": amount,
                "type": kind,
                "category": "misc",
                "date": date,
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);
    }

    #[tokio::test]
    async fn summary_totals_income_and_expense() {
        let (server, _user_id) = get_test_server_with_user().await;
        post_transaction(&server, 1000.0, "INCOME", "2025-10-01").await;
        post_transaction(&server, 250.0, "EXPENSE", "2025-10-05").await;
        post_transaction(&server, 50.0, "EXPENSE", "2025-10-20").await;

        let response = server.get(endpoints::SUMMARY).await;

        response.assert_status_ok();
        let summary = response.json::<serde_json::Value>();
        assert_eq!(summary["income"], 1000.0);
        assert_eq!(summary["expense"], 300.0);
        assert_eq!(summary["net"], 700.0);
    }

    #[tokio::test]
    async fn summary_honors_the_month_window() {
        let (server, _user_id) = get_test_server_with_user().await;
        post_transaction(&server, 1000.0, "INCOME", "2025-10-01").await;
        post_transaction(&server, 500.0, "INCOME", "2025-11-01").await;

        let response = server
            .get(endpoints::SUMMARY)
            .add_query_param("month", 10)
            .add_query_param("year", 2025)
            .await;

        response.assert_status_ok();
        let summary = response.json::<serde_json::Value>();
        assert_eq!(summary["income"], 1000.0);
        assert_eq!(summary["net"], 1000.0);
    }

    #[tokio::test]
    async fn summary_is_zero_for_a_new_user() {
        let (server, _user_id) = get_test_server_with_user().await;

        let summary = server.get(endpoints::SUMMARY).await.json::<serde_json::Value>();

        assert_eq!(summary["income"], 0.0);
        assert_eq!(summary["expense"], 0.0);
        assert_eq!(summary["net"], 0.0);
    }
}
