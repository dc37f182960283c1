//! Sync error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Why the server could not apply one pushed entity. The rest of the batch still
/// applies.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateErrorKind {
    #[error("Identifier is empty")]
    IdentifierEmpty,

    #[error("Updated is below the minimum persisted date")]
    UpdatedBelowMinSqlDate,

    #[error("Updated is above the maximum persisted date")]
    UpdatedAboveMaxSqlDate,

    #[error("DateCreated is below the minimum persisted date")]
    DateCreatedBelowMinSqlDate,

    #[error("DateCreated is above the maximum persisted date")]
    DateCreatedAboveMaxSqlDate,

    /// Storage failure, passed through as reported.
    #[error("Storage error {number}: {message}")]
    SqlError { number: i32, message: String },

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Invalid parent change: {0}")]
    InvalidParentChange(String),
}

/// Per-entity error reported in a sync response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateError {
    pub identifier: Uuid,
    pub error: UpdateErrorKind,
}

impl UpdateError {
    pub fn new(identifier: Uuid, error: UpdateErrorKind) -> Self {
        Self { identifier, error }
    }
}

impl std::fmt::Display for UpdateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (identifier {})", self.error, self.identifier)
    }
}

/// Account and credential failures. Each variant has a stable [`code`](Self::code)
/// so callers can localize without matching on message text.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountError {
    #[error("No account under that username exists. Check your username.")]
    NoAccount,

    #[error("Your username doesn't match your account. Maybe you've changed your username?")]
    UsernameChanged,

    #[error("Incorrect password.")]
    IncorrectPassword,

    #[error("Couldn't find your device. Maybe it was deleted?")]
    DeviceNotFound,

    #[error("No device is set.")]
    NoDevice,

    #[error("No password was inputted.")]
    NoPassword,

    #[error("No username was inputted.")]
    NoUsername,

    #[error("Incorrect credentials.")]
    IncorrectCredentials,

    #[error("That username already exists. Try a different username.")]
    UsernameAlreadyExists,
}

impl AccountError {
    pub fn code(self) -> &'static str {
        match self {
            AccountError::NoAccount => "no_account",
            AccountError::UsernameChanged => "username_changed",
            AccountError::IncorrectPassword => "incorrect_password",
            AccountError::DeviceNotFound => "device_not_found",
            AccountError::NoDevice => "no_device",
            AccountError::NoPassword => "no_password",
            AccountError::NoUsername => "no_username",
            AccountError::IncorrectCredentials => "incorrect_credentials",
            AccountError::UsernameAlreadyExists => "username_already_exists",
        }
    }
}

/// Malformed envelope. Always rejects the whole batch.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("Malformed envelope: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Field diff for {item_type} {identifier} does not fit the item: {source}")]
    FieldDiff {
        item_type: crate::models::ItemType,
        identifier: Uuid,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure reported by an [`ItemStore`](super::feed::ItemStore).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Storage error {code}: {message}")]
pub struct StoreError {
    pub code: i32,
    pub message: String,
}

impl StoreError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<StoreError> for UpdateErrorKind {
    fn from(err: StoreError) -> Self {
        UpdateErrorKind::SqlError {
            number: err.code,
            message: err.message,
        }
    }
}

/// Errors that abort a whole sync call.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid page token '{0}'")]
    InvalidPageToken(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ALL_ACCOUNT_ERRORS: [AccountError; 9] = [
        AccountError::NoAccount,
        AccountError::UsernameChanged,
        AccountError::IncorrectPassword,
        AccountError::DeviceNotFound,
        AccountError::NoDevice,
        AccountError::NoPassword,
        AccountError::NoUsername,
        AccountError::IncorrectCredentials,
        AccountError::UsernameAlreadyExists,
    ];

    #[test]
    fn test_account_errors_are_distinct() {
        let codes: HashSet<_> = ALL_ACCOUNT_ERRORS.iter().map(|e| e.code()).collect();
        let messages: HashSet<_> = ALL_ACCOUNT_ERRORS.iter().map(|e| e.to_string()).collect();
        assert_eq!(codes.len(), ALL_ACCOUNT_ERRORS.len());
        assert_eq!(messages.len(), ALL_ACCOUNT_ERRORS.len());
    }

    #[test]
    fn test_account_error_messages() {
        assert_eq!(AccountError::IncorrectPassword.to_string(), "Incorrect password.");
        assert_eq!(
            AccountError::DeviceNotFound.to_string(),
            "Couldn't find your device. Maybe it was deleted?"
        );
    }

    #[test]
    fn test_store_error_becomes_sql_error() {
        let kind: UpdateErrorKind = StoreError::new(2627, "Violation of PRIMARY KEY").into();
        assert_eq!(
            kind,
            UpdateErrorKind::SqlError {
                number: 2627,
                message: "Violation of PRIMARY KEY".to_string()
            }
        );
        assert_eq!(kind.to_string(), "Storage error 2627: Violation of PRIMARY KEY");
    }

    #[test]
    fn test_update_error_json() {
        let id = Uuid::new_v4();
        let error = UpdateError::new(id, UpdateErrorKind::DateCreatedBelowMinSqlDate);
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["Error"], "DateCreatedBelowMinSqlDate");
        assert_eq!(json["Identifier"], id.to_string());

        let parsed: UpdateError = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, error);
    }
}
