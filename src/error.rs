// src/error.rs
use thiserror::Error;

/// Failures of a bulk upload flow that stop it before or during submission.
#[derive(Debug, Error)]
pub enum BulkError {
    #[error("CSV has no valid rows.")]
    NoValidRows { errors: Vec<String> },

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API base URL is not configured")]
    MissingBaseUrl,

    #[error("API key is not configured")]
    MissingCredential,

    #[error("invalid API URL {0}")]
    InvalidUrl(String),

    /// Non-success response; the message is the body text, or a status line
    /// when the body is empty.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = if body.is_empty() {
            format!("Request failed: {status}")
        } else {
            body.to_string()
        };
        ApiError::Status { status, message }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unknown auth method {0:?} (expected api_key or jwt)")]
    UnknownAuth(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_falls_back_to_status_line() {
        assert_eq!(ApiError::from_status(502, "").to_string(), "Request failed: 502");
        assert_eq!(
            ApiError::from_status(400, "fleet_id unknown").to_string(),
            "fleet_id unknown"
        );
    }

    #[test]
    fn no_valid_rows_message_is_stable() {
        let err = BulkError::NoValidRows {
            errors: vec!["Row 2: missing name or role".into()],
        };
        assert_eq!(err.to_string(), "CSV has no valid rows.");
    }
}
