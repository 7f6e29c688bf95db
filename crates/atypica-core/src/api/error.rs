use eventsource_stream::EventStreamError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SseParseError {
    #[error("UTF-8 error: {details}")]
    Utf8 { details: String },
    #[error("Parse error: {details}")]
    Parser { details: String },
    #[error("Transport error: {details}")]
    Transport { details: String },
}

impl<E> From<EventStreamError<E>> for SseParseError
where
    E: std::error::Error,
{
    fn from(err: EventStreamError<E>) -> Self {
        match err {
            EventStreamError::Utf8(err) => Self::Utf8 {
                details: err.to_string(),
            },
            EventStreamError::Parser(err) => Self::Parser {
                details: err.to_string(),
            },
            EventStreamError::Transport(err) => Self::Transport {
                details: err.to_string(),
            },
        }
    }
}

/// Terminal failure of a completion stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("Request cancelled")]
    Cancelled,

    #[error("SSE parse error: {0}")]
    SseParse(SseParseError),

    #[error("{provider} error: {message}")]
    Provider { provider: String, message: String },

    #[error("Stream from {provider} ended before the message completed")]
    Incomplete { provider: String },
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Authentication failed: {details}")]
    AuthenticationFailed { provider: String, details: String },

    #[error("Rate limited by {provider}: {details}")]
    RateLimited { provider: String, details: String },

    #[error("Invalid request to {provider}: {details}")]
    InvalidRequest { provider: String, details: String },

    #[error("{provider} server error (Status: {status_code}): {details}")]
    ServerError {
        provider: String,
        status_code: u16,
        details: String,
    },

    #[error("Request cancelled for {provider}")]
    Cancelled { provider: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Stream error from {provider}: {details}")]
    StreamError { provider: String, details: String },
}

impl ApiError {
    /// Map a non-success HTTP status to the matching error.
    pub fn from_status(provider: &str, status: u16, details: String) -> Self {
        let provider = provider.to_string();
        match status {
            401 | 403 => ApiError::AuthenticationFailed { provider, details },
            429 => ApiError::RateLimited { provider, details },
            400..=499 => ApiError::InvalidRequest { provider, details },
            _ => ApiError::ServerError {
                provider,
                status_code: status,
                details,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(401, "AuthenticationFailed")]
    #[case(403, "AuthenticationFailed")]
    #[case(429, "RateLimited")]
    #[case(404, "InvalidRequest")]
    #[case(500, "ServerError")]
    #[case(503, "ServerError")]
    fn status_codes_map_to_errors(#[case] status: u16, #[case] expected: &str) {
        let err = ApiError::from_status("openai", status, "body".to_string());
        let actual = match err {
            ApiError::AuthenticationFailed { .. } => "AuthenticationFailed",
            ApiError::RateLimited { .. } => "RateLimited",
            ApiError::InvalidRequest { .. } => "InvalidRequest",
            ApiError::ServerError { .. } => "ServerError",
            _ => "other",
        };
        assert_eq!(actual, expected);
    }
}
