//! The ledger reconciler.
//!
//! A bank account carries a cached `balance` column that must always equal
//! the account's opening balance plus the signed sum of the amounts of the
//! transactions linked to it. Every endpoint that mutates a transaction goes
//! through this module: it describes the mutation as an old posting and a new
//! posting, turns the pair into balance deltas, and applies the deltas to the
//! account rows. Keeping the arithmetic in one place means the invariant is
//! testable in one place instead of being re-implemented by each endpoint.
//!
//! The deltas must be applied inside the same SQL transaction as the
//! transaction row mutation, otherwise a failure can leave the cached balance
//! out of sync with the rows it summarizes.

use rusqlite::Connection;

use crate::{Error, database_id::AccountId, transaction::TransactionKind};

/// A transaction's contribution to a bank account balance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Posting {
    /// The account the transaction is linked to.
    pub account_id: AccountId,
    /// Whether the transaction adds to or subtracts from the balance.
    pub kind: TransactionKind,
    /// The transaction amount, always positive.
    pub amount: f64,
}

/// The signed contribution of a transaction to its account balance:
/// positive for income, negative for expenses.
pub fn signed_amount(kind: TransactionKind, amount: f64) -> f64 {
    match kind {
        TransactionKind::Income => amount,
        TransactionKind::Expense => -amount,
    }
}

/// Compute the balance deltas needed to move an account (or two) from the
/// state where `old` was posted to the state where `new` is posted.
///
/// The rule is reverse-old-then-apply-new: the old posting is subtracted from
/// its account and the new posting is added to its account. Deltas that touch
/// the same account are merged, so an update that changes nothing produces no
/// deltas, and flipping a transaction's type on the same account produces a
/// single delta of twice the signed amount. Reassigning a transaction between
/// accounts produces one delta per account.
///
/// Pass `None` for `old` when creating a transaction or when the transaction
/// was not linked to an account, and `None` for `new` when deleting or
/// unlinking.
pub fn balance_deltas(old: Option<&Posting>, new: Option<&Posting>) -> Vec<(AccountId, f64)> {
    let mut deltas: Vec<(AccountId, f64)> = Vec::new();

    let mut push = |account_id: AccountId, delta: f64| {
        match deltas.iter_mut().find(|(id, _)| *id == account_id) {
            Some((_, existing)) => *existing += delta,
            None => deltas.push((account_id, delta)),
        }
    };

    if let Some(posting) = old {
        push(posting.account_id, -signed_amount(posting.kind, posting.amount));
    }

    if let Some(posting) = new {
        push(posting.account_id, signed_amount(posting.kind, posting.amount));
    }

    deltas.retain(|(_, delta)| *delta != 0.0);

    deltas
}

/// Apply `deltas` to the cached balances of the referenced accounts.
///
/// Must be called inside the same SQL transaction as the transaction row
/// mutation that produced the deltas.
///
/// # Errors
/// Returns an [Error::AccountNotFound] if a delta references an account that
/// does not exist, or an [Error::SqlError] if there is some other SQL error.
pub fn apply_balance_deltas(
    deltas: &[(AccountId, f64)],
    connection: &Connection,
) -> Result<(), Error> {
    for (account_id, delta) in deltas {
        let rows_updated = connection.execute(
            "UPDATE account SET balance = balance + :delta WHERE id = :id",
            rusqlite::named_params! {":delta": delta, ":id": account_id},
        )?;

        if rows_updated == 0 {
            return Err(Error::AccountNotFound(*account_id));
        }
    }

    Ok(())
}
