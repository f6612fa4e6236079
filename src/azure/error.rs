//! Error types for Azure API calls

use crate::retry::RetryableError;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when talking to Azure Resource Manager
#[derive(Debug, Error)]
pub enum AzureApiError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error ({status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse the API response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// No usable access token
    #[error("Not authenticated - run `az login` or set AZURE_ACCESS_TOKEN")]
    Unauthorized,

    /// The credential helper itself failed
    #[error("Could not obtain an access token: {0}")]
    Credentials(String),

    /// Requested resource was not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller lacks RBAC permission for the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Provider throttled the request (HTTP 429)
    #[error("Rate limit exceeded (429 TooManyRequests): {0}")]
    RateLimited(String),

    /// Server error
    #[error("Server error ({status}): {message}")]
    ServerError {
        /// HTTP status code (5xx)
        status: u16,
        /// Error message
        message: String,
    },
}

impl AzureApiError {
    /// Map a non-success status and response body onto an error variant
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ArmErrorResponse>(body)
            .map(|e| e.message())
            .unwrap_or_else(|_| body.trim().to_string());

        match status {
            401 => AzureApiError::Unauthorized,
            403 => AzureApiError::PermissionDenied(message),
            404 => AzureApiError::NotFound(message),
            429 => AzureApiError::RateLimited(message),
            500..=599 => AzureApiError::ServerError { status, message },
            _ => AzureApiError::ApiError { status, message },
        }
    }
}

impl RetryableError for AzureApiError {
    fn status_code(&self) -> Option<u16> {
        match self {
            AzureApiError::HttpError(e) => e.status().map(|s| s.as_u16()),
            AzureApiError::ApiError { status, .. } | AzureApiError::ServerError { status, .. } => {
                Some(*status)
            }
            AzureApiError::Unauthorized => Some(401),
            AzureApiError::PermissionDenied(_) => Some(403),
            AzureApiError::NotFound(_) => Some(404),
            AzureApiError::RateLimited(_) => Some(429),
            AzureApiError::ParseError(_) | AzureApiError::Credentials(_) => None,
        }
    }
}

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
struct ArmErrorResponse {
    error: ArmErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ArmErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl ArmErrorResponse {
    fn message(&self) -> String {
        match (self.error.code.is_empty(), self.error.message.is_empty()) {
            (false, false) => format!("{}: {}", self.error.code, self.error.message),
            (false, true) => self.error.code.clone(),
            _ => self.error.message.clone(),
        }
    }
}

/// Result type alias for Azure API operations
pub type Result<T> = std::result::Result<T, AzureApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(AzureApiError::from_status(401, ""), AzureApiError::Unauthorized));
        assert!(matches!(
            AzureApiError::from_status(403, "no"),
            AzureApiError::PermissionDenied(_)
        ));
        assert!(matches!(AzureApiError::from_status(404, ""), AzureApiError::NotFound(_)));
        assert!(matches!(AzureApiError::from_status(429, ""), AzureApiError::RateLimited(_)));
        assert!(matches!(
            AzureApiError::from_status(503, ""),
            AzureApiError::ServerError { status: 503, .. }
        ));
        assert!(matches!(
            AzureApiError::from_status(400, ""),
            AzureApiError::ApiError { status: 400, .. }
        ));
    }

    #[test]
    fn test_arm_error_body_is_unwrapped() {
        let body = r#"{"error":{"code":"InvalidQuery","message":"Query is invalid."}}"#;
        match AzureApiError::from_status(400, body) {
            AzureApiError::ApiError { message, .. } => {
                assert_eq!(message, "InvalidQuery: Query is invalid.");
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_status_codes_exposed_for_classification() {
        assert_eq!(AzureApiError::RateLimited(String::new()).status_code(), Some(429));
        assert_eq!(
            AzureApiError::ServerError { status: 503, message: String::new() }.status_code(),
            Some(503)
        );
        assert_eq!(AzureApiError::ParseError("x".to_string()).status_code(), None);
    }

    #[test]
    fn test_error_display() {
        let err = AzureApiError::RateLimited("SubscriptionRequestsThrottled".to_string());
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("TooManyRequests"));

        let err = AzureApiError::ServerError {
            status: 503,
            message: "ServiceUnavailable".to_string(),
        };
        assert!(err.to_string().contains("503"));
    }
}
