use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use pointboard_engine::OrderFlowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request conflicts with the current state of the resource. {0}")]
    Conflict(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::ValidationError(_) |
            OrderFlowError::MalformedOrderNumber(_) |
            OrderFlowError::AmountMismatch { .. } => Self::InvalidRequestBody(e.to_string()),
            OrderFlowError::OrderNotFound(_) |
            OrderFlowError::TransactionNotFound(_) |
            OrderFlowError::NoMatchingTransaction(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::InvalidTransition { .. } |
            OrderFlowError::OrderModificationNoOp |
            OrderFlowError::ConcurrentModification(_) |
            OrderFlowError::OrderNumberExists(_) |
            OrderFlowError::TransactionModificationForbidden(..) => Self::Conflict(e.to_string()),
            OrderFlowError::GenerationExhausted(_) => Self::BackendError(e.to_string()),
            OrderFlowError::DatabaseError(_) => {
                error!("💻️ Database error while handling request. {e}");
                Self::BackendError(e.to_string())
            },
        }
    }
}
