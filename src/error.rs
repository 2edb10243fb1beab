//! Error taxonomy for the embedded checkout
//!
//! Every concern gets its own enum; `CheckoutError` composes them and
//! carries the blocking, human-readable message shown to the payer.

/// Failure reading the payment detail endpoint
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Payment not found")]
    NotFound,

    #[error("network error: {0}")]
    Network(String),

    #[error("{message}")]
    Server { code: i64, message: String },

    #[error("invalid response body: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::InvalidResponse(e.to_string())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// Failure deriving gateway presentation data from a payment record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),

    #[error("Unsupported cryptocurrency: {0}")]
    UnsupportedCurrency(String),
}

/// Failure reading the page's own URL
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Payment ID is required")]
    MissingPaymentId,

    #[error("no checkout view is mounted at {0}")]
    UnknownRoute(String),

    #[error("invalid page url: {0}")]
    InvalidPageUrl(String),
}

/// Failure loading or driving an external gateway SDK
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SdkError {
    #[error("failed to load {src}: {reason}")]
    LoadFailed { src: String, reason: String },

    #[error("widget error: {0}")]
    Widget(String),
}

/// Failure talking to the embedding page (parent frame, clipboard)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("host error: {0}")]
pub struct HostError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Sdk(#[from] SdkError),
}

impl CheckoutError {
    /// Message rendered on the blocking error screen
    pub fn user_message(&self) -> String {
        match self {
            CheckoutError::Fetch(FetchError::Server { message, .. }) if !message.is_empty() => {
                message.clone()
            }
            CheckoutError::Fetch(FetchError::Server { code, .. }) => {
                format!("Request failed with code {}", code)
            }
            CheckoutError::Fetch(FetchError::Network(_))
            | CheckoutError::Fetch(FetchError::InvalidResponse(_)) => {
                "Unable to reach the payment service. Please try again.".to_string()
            }
            CheckoutError::Sdk(SdkError::LoadFailed { .. }) => {
                "Failed to load payment provider. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type CheckoutResult<T> = Result<T, CheckoutError>;
