use spin_sdk::http::Response;
use http::StatusCode;
use thiserror::Error;
use crate::core::helpers::html_response;
use crate::templates;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Forbidden")]
    Forbidden,
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal Error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) | ApiError::Conflict(msg) => {
                msg.clone()
            }
            ApiError::Forbidden => "You are not allowed to do that.".to_string(),
            ApiError::MethodNotAllowed => "Method not allowed.".to_string(),
            // Storage details stay in the log.
            ApiError::Internal(_) => "Something went wrong on our side.".to_string(),
        }
    }
}

impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        let status = err.status();
        html_response(status, templates::error_page(status, &err.public_message()))
    }
}

pub type ViewResult = Result<Response, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_renders_html_page() {
        let resp: Response = ApiError::NotFound("Post not found".to_string()).into();
        assert_eq!(*resp.status(), 404);
        let body = String::from_utf8_lossy(resp.body());
        assert!(body.contains("Post not found"));
    }

    #[test]
    fn internal_error_hides_details() {
        let resp: Response = ApiError::from(anyhow::anyhow!("disk on fire")).into();
        assert_eq!(*resp.status(), 500);
        let body = String::from_utf8_lossy(resp.body());
        assert!(!body.contains("disk on fire"));
    }
}
