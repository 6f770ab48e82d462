use thiserror::Error;

use crate::checkout::CheckoutState;

#[derive(Debug, Error)]
pub enum Error {
    #[error("missing required field(s): {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("price must be a non-negative number (got {0:?})")]
    InvalidPrice(String),

    #[error("unsupported image: {0}")]
    UnsupportedImage(String),

    #[error("listing id already present: {0}")]
    DuplicateId(String),

    #[error("listing not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("an active session is required")]
    AuthRequired,

    #[error("unknown payment method: {0}")]
    UnknownPaymentMethod(String),

    #[error("cannot {action} while checkout is {state:?}")]
    Transition {
        state: CheckoutState,
        action: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
