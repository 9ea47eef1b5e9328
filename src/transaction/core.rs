//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{Date, Month, util::days_in_year_month};

use crate::{
    Error,
    account::{Account, get_account, map_account_row_at},
    database_id::{AccountId, TransactionId},
    document::{Document, get_documents_for_transaction},
    user::UserID,
};

/// Whether a transaction adds money to or removes money from an account.
///
/// Amounts are always stored as positive numbers; the direction of the money
/// flow is carried by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Money earned, adds to the linked account's balance.
    Income,
    /// Money spent, subtracts from the linked account's balance.
    Expense,
}

impl TransactionKind {
    /// The string stored in the database for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "INCOME",
            TransactionKind::Expense => "EXPENSE",
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INCOME" => Ok(TransactionKind::Income),
            "EXPENSE" => Ok(TransactionKind::Expense),
            _ => Err(Error::InvalidTransactionKind(s.to_string())),
        }
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()
            .and_then(|s| s.parse().map_err(|_| FromSqlError::InvalidType))
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// A short human-readable title.
    pub title: String,
    /// A longer free-form description.
    pub description: Option<String>,
    /// The amount of money spent or earned, always positive.
    pub amount: f64,
    /// Whether the transaction is income or an expense.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// The category of the transaction, e.g. "groceries".
    pub category: String,
    /// When the transaction happened.
    pub date: Date,
    /// The bank account the transaction is linked to, if any.
    #[serde(rename = "bankAccountId")]
    pub account_id: Option<AccountId>,
    /// The user that owns the transaction.
    pub user_id: UserID,
}

/// The fields needed to create a [Transaction].
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// A short human-readable title.
    pub title: String,
    /// A longer free-form description.
    pub description: Option<String>,
    /// The amount of money spent or earned, always positive.
    pub amount: f64,
    /// Whether the transaction is income or an expense.
    pub kind: TransactionKind,
    /// The category of the transaction.
    pub category: String,
    /// When the transaction happened.
    pub date: Date,
    /// The bank account the transaction is linked to, if any.
    pub account_id: Option<AccountId>,
    /// The user that owns the transaction.
    pub user_id: UserID,
}

/// A [Transaction] together with a snapshot of its linked account and its
/// attached documents, as returned by the list and update endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionWithDetails {
    /// The transaction.
    #[serde(flatten)]
    pub transaction: Transaction,
    /// A snapshot of the linked account, if the transaction is linked.
    pub bank_account: Option<Account>,
    /// The documents attached to the transaction.
    pub documents: Vec<Document>,
}

/// Check that `amount` can be stored as a transaction amount.
///
/// # Errors
/// Returns an [Error::InvalidAmount] if `amount` is zero, negative, or not a
/// finite number.
pub fn validate_amount(amount: f64) -> Result<(), Error> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidAmount(amount))
    }
}

/// Check that `account_id` refers to an account owned by `user_id` so that a
/// transaction may be linked to it.
///
/// Accounts owned by other users are reported with [Error::AccountNotFound]
/// rather than [Error::Forbidden] so that the response does not reveal which
/// account IDs exist.
///
/// # Errors
/// This function will return an [Error::AccountNotFound] if the account does
/// not exist or belongs to another user, or an [Error::SqlError] if there is
/// some other SQL error.
pub fn ensure_linkable_account(
    account_id: AccountId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let account = get_account(account_id, connection).map_err(|error| match error {
        Error::NotFound => Error::AccountNotFound(account_id),
        error => error,
    })?;

    if account.user_id != user_id {
        return Err(Error::AccountNotFound(account_id));
    }

    Ok(())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                amount REAL NOT NULL,
                kind TEXT NOT NULL,
                category TEXT NOT NULL,
                date TEXT NOT NULL,
                account_id INTEGER,
                user_id INTEGER NOT NULL,
                FOREIGN KEY(account_id) REFERENCES account(id),
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    // Composite index used by the month-window list query and the summary.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date
         ON \"transaction\"(user_id, date);",
        (),
    )?;

    Ok(())
}

/// Create a new transaction in the database.
///
/// This only inserts the row, it does not touch account balances. Callers
/// that link the transaction to an account must apply the ledger delta inside
/// the same SQL transaction.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn insert_transaction(
    transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection.execute(
        "INSERT INTO \"transaction\" (title, description, amount, kind, category, date, account_id, user_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        (
            &transaction.title,
            &transaction.description,
            transaction.amount,
            transaction.kind,
            &transaction.category,
            transaction.date,
            transaction.account_id,
            transaction.user_id.as_i64(),
        ),
    )?;

    let id = connection.last_insert_rowid();

    Ok(Transaction {
        id,
        title: transaction.title,
        description: transaction.description,
        amount: transaction.amount,
        kind: transaction.kind,
        category: transaction.category,
        date: transaction.date,
        account_id: transaction.account_id,
        user_id: transaction.user_id,
    })
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return an [Error::NotFound] if `id` does not refer to a
/// valid transaction, or an [Error::SqlError] if there is some other SQL error.
pub fn get_transaction(
    id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, title, description, amount, kind, category, date, account_id, user_id
             FROM \"transaction\" WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Write all the mutable fields of `transaction` back to its database row.
///
/// This only updates the row, it does not touch account balances. Callers
/// must route balance changes through the ledger inside the same SQL
/// transaction.
///
/// # Errors
/// This function will return an [Error::NotFound] if the transaction is not
/// in the database, or an [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(transaction: &Transaction, connection: &Connection) -> Result<(), Error> {
    let rows_updated = connection.execute(
        "UPDATE \"transaction\"
         SET title = ?1, description = ?2, amount = ?3, kind = ?4, category = ?5, date = ?6, account_id = ?7
         WHERE id = ?8",
        (
            &transaction.title,
            &transaction.description,
            transaction.amount,
            transaction.kind,
            &transaction.category,
            transaction.date,
            transaction.account_id,
            transaction.id,
        ),
    )?;

    if rows_updated == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Delete the transaction with `id` from the database.
///
/// Returns the number of rows deleted: zero means the transaction was not in
/// the database.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<usize, Error> {
    connection
        .execute("DELETE FROM \"transaction\" WHERE id = :id", &[(":id", &id)])
        .map_err(|error| error.into())
}

/// The query parameters accepted by the transaction list, export and summary
/// endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TransactionQuery {
    /// Restrict results to this calendar month (1-12). Only applied when
    /// `year` is also given.
    pub month: Option<u8>,
    /// Restrict results to this calendar year.
    pub year: Option<i32>,
    /// Restrict results to transactions linked to this account.
    #[serde(rename = "bankAccountId")]
    pub account_id: Option<AccountId>,
}

/// Compute the first and last day of the month described by `month` and
/// `year`, or `None` when either is missing.
///
/// # Errors
/// Returns an [Error::InvalidDateWindow] if `month` is outside 1-12 or the
/// pair does not form a valid calendar date.
pub fn date_window(month: Option<u8>, year: Option<i32>) -> Result<Option<(Date, Date)>, Error> {
    let (month, year) = match (month, year) {
        (Some(month), Some(year)) => (month, year),
        _ => return Ok(None),
    };

    let month = Month::try_from(month)
        .map_err(|error| Error::InvalidDateWindow(error.to_string()))?;
    let start = Date::from_calendar_date(year, month, 1)
        .map_err(|error| Error::InvalidDateWindow(error.to_string()))?;
    let end = Date::from_calendar_date(year, month, days_in_year_month(year, month))
        .map_err(|error| Error::InvalidDateWindow(error.to_string()))?;

    Ok(Some((start, end)))
}

/// Retrieve the transactions owned by `user_id` that match `query`, newest
/// first, each with its linked account snapshot and attached documents.
///
/// # Errors
/// This function will return an [Error::InvalidDateWindow] if the query's
/// month/year pair is invalid, or an [Error::SqlError] if there is an SQL
/// error.
pub fn get_transactions_for_user(
    user_id: UserID,
    query: &TransactionQuery,
    connection: &Connection,
) -> Result<Vec<TransactionWithDetails>, Error> {
    let window = date_window(query.month, query.year)?;
    let (start, end) = match window {
        Some((start, end)) => (Some(start), Some(end)),
        None => (None, None),
    };

    let transactions: Vec<(Transaction, Option<Account>)> = connection
        .prepare(
            "SELECT t.id, t.title, t.description, t.amount, t.kind, t.category, t.date,
                    t.account_id, t.user_id,
                    a.id, a.name, a.institution, a.kind, a.balance, a.currency, a.color, a.user_id
             FROM \"transaction\" t
             LEFT JOIN account a ON a.id = t.account_id
             WHERE t.user_id = :user_id
               AND (:start IS NULL OR t.date >= :start)
               AND (:end IS NULL OR t.date <= :end)
               AND (:account_id IS NULL OR t.account_id = :account_id)
             ORDER BY t.date DESC, t.id DESC",
        )?
        .query_map(
            rusqlite::named_params! {
                ":user_id": user_id.as_i64(),
                ":start": start,
                ":end": end,
                ":account_id": query.account_id,
            },
            |row| {
                let transaction = map_transaction_row(row)?;
                let account = match row.get::<_, Option<AccountId>>(9)? {
                    Some(_) => Some(map_account_row_at(row, 9)?),
                    None => None,
                };

                Ok((transaction, account))
            },
        )?
        .collect::<Result<_, _>>()?;

    transactions
        .into_iter()
        .map(|(transaction, bank_account)| {
            let documents = get_documents_for_transaction(transaction.id, connection)?;

            Ok(TransactionWithDetails {
                transaction,
                bank_account,
                documents,
            })
        })
        .collect()
}

/// Retrieve a single transaction with its linked account snapshot and
/// attached documents.
///
/// # Errors
/// This function will return an [Error::NotFound] if `id` does not refer to a
/// valid transaction, or an [Error::SqlError] if there is some other SQL error.
pub fn get_transaction_with_details(
    id: TransactionId,
    connection: &Connection,
) -> Result<TransactionWithDetails, Error> {
    let transaction = get_transaction(id, connection)?;

    let bank_account = match transaction.account_id {
        Some(account_id) => Some(crate::account::get_account(account_id, connection)?),
        None => None,
    };

    let documents = get_documents_for_transaction(id, connection)?;

    Ok(TransactionWithDetails {
        transaction,
        bank_account,
        documents,
    })
}

/// Map a database row to a [Transaction].
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        amount: row.get(3)?,
        kind: row.get(4)?,
        category: row.get(5)?,
        date: row.get(6)?,
        account_id: row.get(7)?,
        user_id: UserID::new(row.get(8)?),
    })
}
