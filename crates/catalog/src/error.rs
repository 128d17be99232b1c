//! Outcome taxonomy for catalog operations.
//!
//! Every failure path is one of four kinds; callers map kinds to their own
//! responses and decide on retries.

use thiserror::Error;

use crate::record::{CatalogRecord, RecordId};
use crate::status::Status;
use crate::store::StoreError;

/// Coarse classification of a [`CatalogError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input cannot succeed as given.
    Validation,
    /// The record does not exist (any more).
    NotFound,
    /// Another writer got there first; reload and decide.
    Conflict,
    /// Storage failed transiently; the whole call may be retried.
    Infrastructure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    NeverExisted,
    DeletedConcurrently,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid status change from {current} to {requested}")]
    InvalidTransition { current: Status, requested: Status },

    #[error("{field} must be at least 1, got {value}")]
    InvalidPage { field: &'static str, value: i64 },

    #[error("catalog number '{0}' is already in use")]
    DuplicateCatalogNumber(String),

    #[error("{}", not_found_message(.id, .reason))]
    NotFound { id: RecordId, reason: NotFoundReason },

    #[error("{}", conflict_message(.current))]
    Conflict { current: Box<CatalogRecord> },

    #[error("storage failure: {0}")]
    Storage(StoreError),
}

fn not_found_message(id: &RecordId, reason: &NotFoundReason) -> String {
    match reason {
        NotFoundReason::NeverExisted => format!("record {id} does not exist"),
        NotFoundReason::DeletedConcurrently => {
            format!("record {id} no longer exists; it was deleted by another actor")
        }
    }
}

fn conflict_message(current: &CatalogRecord) -> String {
    format!(
        "record {} was modified by another writer after it was read",
        current.id
    )
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::InvalidTransition { .. }
            | CatalogError::InvalidPage { .. }
            | CatalogError::DuplicateCatalogNumber(_) => ErrorKind::Validation,
            CatalogError::NotFound { .. } => ErrorKind::NotFound,
            CatalogError::Conflict { .. } => ErrorKind::Conflict,
            CatalogError::Storage(_) => ErrorKind::Infrastructure,
        }
    }

    pub(crate) fn never_existed(id: RecordId) -> Self {
        CatalogError::NotFound {
            id,
            reason: NotFoundReason::NeverExisted,
        }
    }

    pub(crate) fn conflict(current: CatalogRecord) -> Self {
        CatalogError::Conflict {
            current: Box::new(current),
        }
    }
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateCatalogNumber(number) => {
                CatalogError::DuplicateCatalogNumber(number)
            }
            other => CatalogError::Storage(other),
        }
    }
}
