//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;
/// The ID of a bank account.
pub type AccountId = DatabaseId;
/// The ID of a transaction.
pub type TransactionId = DatabaseId;
/// The ID of a document attached to a transaction.
pub type DocumentId = DatabaseId;
/// The ID of a custom category.
pub type CategoryId = DatabaseId;
