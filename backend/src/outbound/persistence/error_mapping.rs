//! Translation of pool and Diesel failures into port errors.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::{QueueError, UserStoreError};

use super::pool::PoolError;

fn log_diesel_error(error: &DieselError) {
    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(error = %error, "diesel operation failed"),
    }
}

pub(super) fn map_store_pool_error(error: PoolError) -> UserStoreError {
    UserStoreError::connection(error.into_message())
}

pub(super) fn map_store_diesel_error(error: DieselError) -> UserStoreError {
    log_diesel_error(&error);
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            UserStoreError::unique_violation(info.message().to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            UserStoreError::connection("database connection closed")
        }
        DieselError::NotFound => UserStoreError::not_found("record not found"),
        DieselError::QueryBuilderError(_) => UserStoreError::query("database query error"),
        _ => UserStoreError::query("database error"),
    }
}

pub(super) fn map_queue_pool_error(error: PoolError) -> QueueError {
    QueueError::unavailable(error.into_message())
}

pub(super) fn map_queue_diesel_error(error: DieselError) -> QueueError {
    log_diesel_error(&error);
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            QueueError::unavailable("database connection closed")
        }
        _ => QueueError::rejected("database error"),
    }
}
