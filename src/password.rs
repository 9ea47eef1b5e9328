//! This file defines the type that handles password hashing and verification.

use std::fmt::Display;

use bcrypt::{hash, verify};
use serde::{Deserialize, Serialize};

use crate::Error;

/// A salted and hashed password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// The computational cost for the bcrypt hashing algorithm.
    pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

    /// Hash and salt `raw_password`.
    ///
    /// # Errors
    ///
    /// Returns an [Error::MissingField] if `raw_password` is empty, or an
    /// [Error::HashingError] if an error occurred in the underlying hashing
    /// library.
    pub fn new(raw_password: &str, cost: u32) -> Result<Self, Error> {
        if raw_password.is_empty() {
            return Err(Error::MissingField("password"));
        }

        hash(raw_password, cost)
            .map(Self)
            .map_err(|error| Error::HashingError(error.to_string()))
    }

    /// Create a `PasswordHash` from a string that is already hashed, e.g. a
    /// hash read back from the database.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`,
    /// because if an invalid hash is provided it may cause incorrect
    /// behaviour but will not affect memory safety.
    pub fn new_unchecked(hash_string: &str) -> Self {
        Self(hash_string.to_string())
    }

    /// Check whether `raw_password` matches this password hash.
    ///
    /// # Errors
    ///
    /// Returns an [Error::HashingError] if an error occurred in the
    /// underlying hashing library, e.g. the stored hash is malformed.
    pub fn verify(&self, raw_password: &str) -> Result<bool, Error> {
        verify(raw_password, &self.0).map_err(|error| Error::HashingError(error.to_string()))
    }
}

impl AsRef<str> for PasswordHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", str::repeat("*", 8))
    }
}
