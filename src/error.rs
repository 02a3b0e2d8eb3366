//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Every handler returns `Result<_, AppError>`, and `AppError` implements
//! `actix_web::error::ResponseError` so each failure is translated into a fixed status
//! code and JSON body at the handler boundary.
//!
//! Authentication failures always produce the same body regardless of cause, and
//! "not found" is used for both absent and foreign resources so that ownership is
//! never observable from the outside.

use actix_web::{
    error::{BlockingError, JsonPayloadError, ResponseError},
    http::StatusCode,
    HttpResponse,
};
use serde_json::{json, Value};
use std::fmt;
use validator::ValidationErrors;

use crate::store::StoreError;

/// Body message shared by every 401 response.
pub const AUTH_REQUIRED_MESSAGE: &str = "Please authenticate.";

/// Body message shared by every failed login.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Unable to login";

/// Stable code reported when a unique constraint rejects a write.
pub const DUPLICATE_KEY_CODE: &str = "duplicate_key";

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Missing, malformed, forged or revoked bearer token (HTTP 401).
    Unauthorized,
    /// Login failed. Unknown e-mail and wrong password are indistinguishable (HTTP 400).
    InvalidCredentials,
    /// A field value is out of policy or the body could not be parsed (HTTP 400).
    ValidationError { message: String, errors: Value },
    /// An update payload named a field outside the allow-list (HTTP 400).
    UnknownField(String),
    /// A unique constraint was violated; carries the offending field (HTTP 400).
    DuplicateKey(String),
    /// The resource does not exist or is not owned by the caller (HTTP 404).
    NotFound(String),
    /// Avatar upload with a missing file, wrong extension or undecodable image (HTTP 400).
    UnsupportedMediaType(String),
    /// Avatar upload exceeding the configured byte limit (HTTP 400).
    PayloadTooLarge(usize),
    /// Represents an unexpected server-side error (HTTP 500).
    InternalServerError(String),
    /// Represents an error originating from the persistence layer (HTTP 500).
    DatabaseError(String),
}

impl AppError {
    /// Builds a `ValidationError` for a single field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        AppError::ValidationError {
            errors: json!({ field: [message.clone()] }),
            message,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized => write!(f, "Unauthorized: {}", AUTH_REQUIRED_MESSAGE),
            AppError::InvalidCredentials => {
                write!(f, "Invalid Credentials: {}", INVALID_CREDENTIALS_MESSAGE)
            }
            AppError::ValidationError { message, .. } => write!(f, "Validation Error: {}", message),
            AppError::UnknownField(field) => write!(f, "Unknown Field: {}", field),
            AppError::DuplicateKey(field) => write!(f, "Duplicate Key: {}", field),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::UnsupportedMediaType(msg) => write!(f, "Unsupported Media Type: {}", msg),
            AppError::PayloadTooLarge(limit) => {
                write!(f, "Payload Too Large: limit is {} bytes", limit)
            }
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
        }
    }
}

/// Converts `AppError` variants into `HttpResponse` objects.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::InvalidCredentials
            | AppError::ValidationError { .. }
            | AppError::UnknownField(_)
            | AppError::DuplicateKey(_)
            | AppError::UnsupportedMediaType(_)
            | AppError::PayloadTooLarge(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Unauthorized => json!({ "error": AUTH_REQUIRED_MESSAGE }),
            AppError::InvalidCredentials => json!({ "error": INVALID_CREDENTIALS_MESSAGE }),
            AppError::ValidationError { message, errors } => json!({
                "message": message,
                "errors": errors,
            }),
            AppError::UnknownField(field) => json!({
                "message": "Invalid updates!",
                "errors": { field: ["field cannot be updated"] },
            }),
            AppError::DuplicateKey(field) => json!({
                "message": format!("{} is already in use", field),
                "code": DUPLICATE_KEY_CODE,
                "field": field,
            }),
            AppError::NotFound(msg) | AppError::UnsupportedMediaType(msg) => json!({
                "error": msg
            }),
            AppError::PayloadTooLarge(limit) => json!({
                "error": format!("File must be at most {} bytes", limit)
            }),
            // Internal details stay in the log.
            AppError::InternalServerError(msg) | AppError::DatabaseError(msg) => {
                log::error!("{}", msg);
                json!({ "error": "Internal server error" })
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Converts `validator::ValidationErrors` into `AppError::ValidationError`.
///
/// The per-field error list is kept as the `errors` member of the response body.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        let errors = serde_json::to_value(&error).unwrap_or(Value::Null);
        AppError::ValidationError {
            message: error.to_string(),
            errors,
        }
    }
}

/// Converts store failures. A unique-constraint violation stays distinguishable.
impl From<StoreError> for AppError {
    fn from(error: StoreError) -> AppError {
        match error {
            StoreError::DuplicateKey(field) => AppError::DuplicateKey(field),
            StoreError::Backend(msg) => AppError::DatabaseError(msg),
        }
    }
}

/// JWT processing failures are authentication failures.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        log::debug!("rejected bearer token: {}", error);
        AppError::Unauthorized
    }
}

/// Converts `bcrypt::BcryptError` into `AppError::InternalServerError`.
impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(format!("password hashing failed: {}", error))
    }
}

/// Body extraction failures. Serde reports disallowed keys as "unknown field `x`".
impl From<JsonPayloadError> for AppError {
    fn from(error: JsonPayloadError) -> AppError {
        match error {
            JsonPayloadError::Deserialize(err) => match unknown_field_name(&err.to_string()) {
                Some(field) => AppError::UnknownField(field),
                None => AppError::invalid_field("body", err.to_string()),
            },
            other => AppError::invalid_field("body", other.to_string()),
        }
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(error: actix_multipart::MultipartError) -> AppError {
        AppError::UnsupportedMediaType(format!("Malformed upload: {}", error))
    }
}

impl From<BlockingError> for AppError {
    fn from(error: BlockingError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

fn unknown_field_name(message: &str) -> Option<String> {
    let rest = message.strip_prefix("unknown field `")?;
    let end = rest.find('`')?;
    Some(rest[..end].to_string())
}
