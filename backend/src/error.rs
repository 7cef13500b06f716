use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing required parameter in the JSON body or the query string")]
    MissingField(&'static str),

    #[error("Invalid value for parameter")]
    InvalidField(&'static str),

    #[error("The request body is not valid JSON")]
    MalformedBody,

    #[error("The requested resource was not found")]
    NotFound,

    // answered with 404, like a missing device
    #[error("The identifier in the body does not match the one in the URL")]
    IdentifierMismatch,

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingField(_) | ApiError::InvalidField(_) | ApiError::MalformedBody => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound | ApiError::IdentifierMismatch => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::MissingField(field) | ApiError::InvalidField(field) => {
                let mut fields = serde_json::Map::new();
                fields.insert(field.to_string(), json!(self.to_string()));
                serde_json::Value::Object(fields)
            }
            ApiError::Database(err) => {
                log::error!("{err}");
                json!("Internal server error")
            }
            ApiError::Storage(err) => {
                log::error!("{err:#}");
                json!("Internal server error")
            }
            _ => json!(self.to_string()),
        };

        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}
