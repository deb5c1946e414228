//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            Self::NotFound | Self::OrderNotFound | Self::BillNotFound => StatusCode::NOT_FOUND,

            Self::AlreadyExists
            | Self::OrderAlreadyPaid
            | Self::OrderStatusConflict
            | Self::OrderNumberTaken
            | Self::PartialSettlementFailure => StatusCode::CONFLICT,

            Self::PaymentInsufficientAmount => StatusCode::PAYMENT_REQUIRED,

            Self::PaymentFailed => StatusCode::BAD_GATEWAY,

            // 503: transient, the caller may retry
            Self::NetworkError
            | Self::TimeoutError
            | Self::SystemBusy
            | Self::SequenceUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            Self::InternalError
            | Self::DatabaseError
            | Self::ConfigError
            | Self::ClientDisconnected
            | Self::StorageFull
            | Self::StorageCorrupted
            | Self::SequenceExhaustionFallback
            | Self::Unknown => StatusCode::INTERNAL_SERVER_ERROR,

            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::RequiredField
            | Self::ValueOutOfRange
            | Self::OrderEmpty
            | Self::PaymentInvalidMethod => StatusCode::BAD_REQUEST,
        }
    }
}
