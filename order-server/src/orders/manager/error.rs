use super::super::sequence::SequenceError;
use super::super::storage::StorageError;
use shared::error::{AppError, ErrorCode};
use shared::order::OrderStatus;
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Order not found: {0}")]
    NotFound(String),

    /// Lost a race, or the order is past this stage
    #[error("Order {order_id} is {actual}, {transition} expects one of {expected:?}")]
    Conflict {
        order_id: String,
        transition: &'static str,
        expected: Vec<OrderStatus>,
        actual: OrderStatus,
    },

    #[error(transparent)]
    SequenceUnavailable(#[from] SequenceError),

    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for ManagerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::OrderNotFound(id) => ManagerError::NotFound(id),
            other => ManagerError::Storage(other),
        }
    }
}

/// Map a storage error to an error code (clients localize the message)
pub(crate) fn classify_storage_error(e: &StorageError) -> ErrorCode {
    match e {
        StorageError::Serialization(_) => return ErrorCode::InternalError,
        StorageError::OrderNotFound(_) => return ErrorCode::OrderNotFound,
        StorageError::DuplicateOrderNumber(_) => return ErrorCode::OrderNumberTaken,
        StorageError::DuplicateOrderId(_) => return ErrorCode::AlreadyExists,
        _ => {}
    }

    // redb errors are classified by message
    let err_str = e.to_string().to_lowercase();

    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return ErrorCode::StorageFull;
    }

    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return ErrorCode::StorageCorrupted;
    }

    // Database/Transaction/Table/Storage/Commit errors
    ErrorCode::SystemBusy
}

impl From<ManagerError> for AppError {
    fn from(err: ManagerError) -> Self {
        match err {
            ManagerError::Validation(msg) => AppError::validation(msg),
            ManagerError::NotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, format!("Order not found: {}", id))
                    .with_detail("order_id", id)
            }
            ManagerError::Conflict {
                order_id,
                transition,
                expected,
                actual,
            } => {
                let code = if actual == OrderStatus::Paid {
                    ErrorCode::OrderAlreadyPaid
                } else {
                    ErrorCode::OrderStatusConflict
                };
                let expected: Vec<&str> = expected.iter().map(|s| s.as_str()).collect();
                AppError::with_message(
                    code,
                    format!("Order {} is {}, cannot {}", order_id, actual, transition),
                )
                .with_detail("order_id", order_id)
                .with_detail("transition", transition)
                .with_detail("expected_status", expected)
                .with_detail("actual_status", actual.as_str())
            }
            ManagerError::SequenceUnavailable(e) => {
                AppError::with_message(ErrorCode::SequenceUnavailable, e.to_string())
            }
            ManagerError::Storage(e) => {
                let code = classify_storage_error(&e);
                tracing::error!(error = %e, error_code = %code, "Storage error occurred");
                AppError::with_message(code, e.to_string())
            }
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_conflict_maps_to_409_with_details() {
        let err: AppError = ManagerError::Conflict {
            order_id: "o-1".into(),
            transition: "kitchenComplete",
            expected: vec![OrderStatus::Pending, OrderStatus::Preparing],
            actual: OrderStatus::ReadyForWaiter,
        }
        .into();
        assert_eq!(err.code, ErrorCode::OrderStatusConflict);
        assert_eq!(err.http_status(), StatusCode::CONFLICT);
        let details = err.details.unwrap();
        assert_eq!(details["actual_status"], "readyForWaiter");
        assert_eq!(
            details["expected_status"],
            serde_json::json!(["pending", "preparing"])
        );
    }

    #[test]
    fn test_not_found_and_validation_codes() {
        let nf: AppError = ManagerError::from(StorageError::OrderNotFound("x".into())).into();
        assert_eq!(nf.http_status(), StatusCode::NOT_FOUND);

        let v: AppError = ManagerError::Validation("items must not be empty".into()).into();
        assert_eq!(v.http_status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_duplicate_number_classified() {
        let code = classify_storage_error(&StorageError::DuplicateOrderNumber("n".into()));
        assert_eq!(code, ErrorCode::OrderNumberTaken);
    }
}
