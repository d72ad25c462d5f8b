use crate::schedule::ScheduleConflict;
use diesel::ConnectionError;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// Everything that can go wrong while reading or writing the roster.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    #[error("a {entity} with {field} `{value}` already exists")]
    Uniqueness {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("cannot delete {entity} `{name}`: {count} {dependents} still reference it")]
    ReferentialBlock {
        entity: &'static str,
        name: String,
        dependents: &'static str,
        count: i64,
    },

    #[error(transparent)]
    ScheduleConflict(#[from] ScheduleConflict),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("could not open database `{url}`: {source}")]
    Connection {
        url: String,
        #[source]
        source: ConnectionError,
    },

    #[error("database error: {0}")]
    Database(#[from] DieselError),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        StoreError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Turns a unique-constraint violation into [`StoreError::Uniqueness`], passing every other error
/// through unchanged.
pub(crate) fn on_unique_violation(
    entity: &'static str,
    field: &'static str,
    value: &str,
) -> impl FnOnce(DieselError) -> StoreError + use<> {
    let value = value.to_string();
    move |err| match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            StoreError::Uniqueness {
                entity,
                field,
                value,
            }
        }
        other => other.into(),
    }
}
