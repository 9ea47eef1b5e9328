//! Bank accounts and their endpoints.
//!
//! An account carries a cached balance that is kept consistent with the
//! transactions linked to it by the [crate::ledger] module.

mod core;
mod create_endpoint;
mod list_endpoint;

pub use core::{
    Account, AccountSummary, NewAccount, create_account_table, get_account,
    get_accounts_for_user, insert_account, map_account_row, map_account_row_at,
};
pub use create_endpoint::create_account_endpoint;
pub use list_endpoint::get_accounts_endpoint;
