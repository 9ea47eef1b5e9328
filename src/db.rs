//! Database initialization for the application's SQLite schema.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error, account::create_account_table, category::create_category_table,
    document::create_document_table, transaction::create_transaction_table, user::create_user_table,
};

/// Create the tables for the application's domain models.
///
/// The tables are created inside a single SQL transaction so that a partially
/// initialized schema is never left behind.
///
/// # Errors
/// Returns an error if a table cannot be created or if there is some other
/// SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_account_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_document_table(&transaction)?;
    create_category_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
