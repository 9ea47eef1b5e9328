//! Defines the core data model and database queries for bank accounts.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, database_id::AccountId, user::UserID};

/// A bank account or credit card that transactions can be linked to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// The ID of the account.
    pub id: AccountId,
    /// The display name of the account.
    pub name: String,
    /// The bank or institution holding the account.
    pub institution: Option<String>,
    /// The account type, e.g. "CHECKING" or "SAVINGS".
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// The cached balance.
    ///
    /// This must equal the opening balance plus the signed sum of the
    /// amounts of the transactions linked to this account. Only the ledger
    /// reconciler may change it after creation.
    pub balance: f64,
    /// The ISO currency code of the balance, e.g. "USD".
    pub currency: String,
    /// The display color used by clients.
    pub color: Option<String>,
    /// The user that owns the account.
    pub user_id: UserID,
}

/// The fields needed to create an [Account].
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    /// The display name of the account.
    pub name: String,
    /// The bank or institution holding the account.
    pub institution: Option<String>,
    /// The account type, e.g. "CHECKING" or "SAVINGS".
    pub kind: Option<String>,
    /// The opening balance.
    pub balance: f64,
    /// The ISO currency code of the balance, e.g. "USD".
    pub currency: String,
    /// The display color used by clients.
    pub color: Option<String>,
    /// The user that owns the account.
    pub user_id: UserID,
}

/// An [Account] together with the number of transactions linked to it, as
/// returned by the account list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    /// The account.
    #[serde(flatten)]
    pub account: Account,
    /// The number of transactions currently linked to the account.
    pub transaction_count: u32,
}

/// Create the account table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                institution TEXT,
                kind TEXT,
                balance REAL NOT NULL,
                currency TEXT NOT NULL,
                color TEXT,
                user_id INTEGER NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Create a new account in the database.
///
/// # Errors
/// This function will return an error if `user_id` does not refer to a valid
/// user, or if there is some other SQL error.
pub fn insert_account(account: NewAccount, connection: &Connection) -> Result<Account, Error> {
    connection.execute(
        "INSERT INTO account (name, institution, kind, balance, currency, color, user_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            &account.name,
            &account.institution,
            &account.kind,
            account.balance,
            &account.currency,
            &account.color,
            account.user_id.as_i64(),
        ),
    )?;

    let id = connection.last_insert_rowid();

    Ok(Account {
        id,
        name: account.name,
        institution: account.institution,
        kind: account.kind,
        balance: account.balance,
        currency: account.currency,
        color: account.color,
        user_id: account.user_id,
    })
}

/// Retrieve an account from the database by its `id`.
///
/// # Errors
/// This function will return an [Error::NotFound] if `id` does not refer to a
/// valid account, or an [Error::SqlError] if there is some other SQL error.
pub fn get_account(id: AccountId, connection: &Connection) -> Result<Account, Error> {
    let account = connection
        .prepare(
            "SELECT id, name, institution, kind, balance, currency, color, user_id
             FROM account WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_account_row)?;

    Ok(account)
}

/// Retrieve the accounts owned by `user_id` along with the number of
/// transactions linked to each.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error.
pub fn get_accounts_for_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<AccountSummary>, Error> {
    connection
        .prepare(
            "SELECT a.id, a.name, a.institution, a.kind, a.balance, a.currency, a.color, a.user_id,
                    COUNT(t.id)
             FROM account a
             LEFT JOIN \"transaction\" t ON t.account_id = a.id
             WHERE a.user_id = :user_id
             GROUP BY a.id
             ORDER BY a.id",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], |row| {
            let account = map_account_row(row)?;
            let transaction_count = row.get(8)?;

            Ok(AccountSummary {
                account,
                transaction_count,
            })
        })?
        .map(|maybe_account| maybe_account.map_err(Error::SqlError))
        .collect()
}

/// Map a database row to an [Account].
pub fn map_account_row(row: &Row) -> Result<Account, rusqlite::Error> {
    map_account_row_at(row, 0)
}

/// Map a database row to an [Account], reading columns starting at `offset`.
///
/// This is useful in cases where tables have been joined and you want to
/// construct two different types from the one query.
pub fn map_account_row_at(row: &Row, offset: usize) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        institution: row.get(offset + 2)?,
        kind: row.get(offset + 3)?,
        balance: row.get(offset + 4)?,
        currency: row.get(offset + 5)?,
        color: row.get(offset + 6)?,
        user_id: UserID::new(row.get(offset + 7)?),
    })
}
