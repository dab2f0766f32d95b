use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Errors talking to the synchronizer admin API.
#[derive(Error, Debug)]
pub enum ClientError {
    RequestError(#[from] reqwest::Error),
    // All non-2xx status codes
    ApiError(u16, Box<Url>, String),
    InvalidUrl(String),
    ParseError(Box<Url>, #[source] serde_json::Error),
}

impl Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::RequestError(err) => write!(f, "Request error: {err}"),
            ClientError::InvalidUrl(msg) => write!(f, "Failed to build URL: {msg}"),
            ClientError::ParseError(url, _) => {
                write!(f, "Failed to parse response from url='{url}'")
            }
            ClientError::ApiError(status, url, body) => {
                // The admin API answers with {code, message} most of the time, but not always
                match serde_json::from_str::<ApiErrorResponse>(body) {
                    Ok(api_error) => write!(f, "API error: {api_error} url='{url}'"),
                    Err(_) => write!(
                        f,
                        "API error: status='{status}' url='{url}' message='{body}'",
                    ),
                }
            }
        }
    }
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::ApiError(status, _, _) => Some(*status),
            ClientError::RequestError(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ApiErrorResponse {
    code: u16,
    message: String,
}

impl Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "code='{}' message='{}'", self.code, self.message)
    }
}

/// Rejected operator edits, caught before anything is sent.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EditError {
    #[error("'{treatment}' is not a treatment of feature flag '{flag}' (expected one of: {available})")]
    UnknownTreatment {
        flag: String,
        treatment: String,
        available: String,
    },
    #[error("feature flag '{0}' not found")]
    FlagNotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Box<Url> {
        Box::new(Url::parse("http://localhost:3010/admin/overrides/ff/flag").unwrap())
    }

    #[test]
    fn test_api_error_with_structured_body() {
        let err = ClientError::ApiError(
            404,
            url(),
            r#"{"code":404,"message":"feature flag not found"}"#.to_string(),
        );

        assert_eq!(
            err.to_string(),
            "API error: code='404' message='feature flag not found' url='http://localhost:3010/admin/overrides/ff/flag'"
        );
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_api_error_with_raw_body() {
        let err = ClientError::ApiError(502, url(), "bad gateway".to_string());

        assert_eq!(
            err.to_string(),
            "API error: status='502' url='http://localhost:3010/admin/overrides/ff/flag' message='bad gateway'"
        );
    }

    #[test]
    fn test_unknown_treatment_message() {
        let err = EditError::UnknownTreatment {
            flag: "checkout".to_string(),
            treatment: "blue".to_string(),
            available: "on, off".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "'blue' is not a treatment of feature flag 'checkout' (expected one of: on, off)"
        );
    }
}
