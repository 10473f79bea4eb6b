use thiserror::Error;
use tonic::{Code, Status};

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Required fields are empty")]
    EmptyFields,

    #[error("User already exists")]
    AlreadyExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Agent backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Stream transport failure: {0}")]
    TransportFailure(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Convert to gRPC Status for wire protocol
    pub fn to_status(&self) -> Status {
        match self {
            GatewayError::EmptyFields => {
                Status::new(Code::InvalidArgument, "Required fields are empty")
            }
            GatewayError::AlreadyExists => Status::new(Code::AlreadyExists, "User already exists"),
            GatewayError::InvalidCredentials => {
                Status::new(Code::Unauthenticated, "Invalid credentials")
            }
            GatewayError::Unauthenticated => {
                Status::new(Code::Unauthenticated, "Missing or invalid access token")
            }
            GatewayError::BackendUnavailable(_) => {
                Status::new(Code::Unavailable, "Agent backend unavailable")
            }
            GatewayError::TransportFailure(msg) => {
                Status::new(Code::Internal, format!("Stream transport failure: {}", msg))
            }
            GatewayError::Database(_) | GatewayError::Token(_) | GatewayError::Internal(_) => {
                // Don't leak internal details on the wire
                Status::new(Code::Internal, "Internal server error")
            }
        }
    }
}

// Conversions from external error types
impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {}", err);
        GatewayError::Database(err.to_string())
    }
}

impl From<auth_tokens::TokenError> for GatewayError {
    fn from(err: auth_tokens::TokenError) -> Self {
        GatewayError::Token(err.to_string())
    }
}

// gRPC Status conversion
impl From<GatewayError> for Status {
    fn from(err: GatewayError) -> Self {
        err.to_status()
    }
}
