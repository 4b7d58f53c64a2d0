use rusqlite::ErrorCode;
use thiserror::Error;

/// Write failures callers need to tell apart from plain infrastructure errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A UNIQUE constraint rejected the row (user email, client email per shop).
    #[error("record already exists")]
    Duplicate,

    /// Another non-cancelled appointment already holds part of the slot.
    #[error("time slot is already booked")]
    SlotTaken,

    #[error(transparent)]
    Other(anyhow::Error),
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<StoreError>() {
            Ok(store) => store,
            Err(err) if is_unique_violation(&err) => Self::Duplicate,
            Err(err) => Self::Other(err),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::from(anyhow::Error::from(err))
    }
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<rusqlite::Error>() {
        Some(rusqlite::Error::SqliteFailure(e, _)) => {
            e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}
