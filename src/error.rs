//! Top-level error type for the monitor client

use std::borrow::Cow;

use reqwest::StatusCode;
use url::Url;

/// Errors occurring while building requests for the monitor API or while
/// interpreting its responses.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The monitor API reported a failure through the `meta` object of an
    /// otherwise successful response.
    #[error("monitor API error {code}: {message}")]
    Api {
        /// The non-zero `error_code` reported in the response meta.
        code: i64,
        /// The `error_message` accompanying the error code.
        message: String,
    },

    /// The monitor API rejected one or more request parameters. The payload
    /// is the `validation_errors` object echoed in the response meta.
    #[error("monitor API rejected the request parameters: {0}")]
    ApiValidation(serde_json::Value),

    /// The request was rejected with a non-success HTTP status code. The
    /// second field holds the response body, which usually describes the
    /// rejection.
    #[error("HTTP request failed with status code {0}: {1}")]
    HttpRequest(StatusCode, String),

    /// A transfer filter could not be rendered into the wire format.
    #[error("could not encode the transfer filter: {0}")]
    InvalidFilter(String),

    /// A parameter was given a value outside its allowed set.
    #[error("invalid value \"{value}\" for \"{param}\", allowed values are: {}", .allowed.join(", "))]
    InvalidParameter {
        /// The name of the rejected parameter.
        param: &'static str,
        /// The rejected value.
        value: String,
        /// The values that the parameter accepts.
        allowed: &'static [&'static str],
    },

    /// Could not send a request to the monitor API.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// A numeric parameter was given a value outside its allowed range.
    #[error("\"{param}\" must be between {min} and {max}, got {value}")]
    ParameterOutOfRange {
        /// The name of the rejected parameter.
        param: &'static str,
        /// The rejected value.
        value: u64,
        /// The smallest accepted value.
        min: u64,
        /// The largest accepted value.
        max: u64,
    },

    /// Could not join the endpoint path onto the configured base URL.
    #[error("failed to construct a valid URL from {1} and {2}: {0}")]
    PathJoin(#[source] url::ParseError, Url, Cow<'static, str>),

    /// The response body could not be decoded as a monitor API envelope.
    #[error("could not decode the monitor API response: {0}")]
    UnexpectedResponse(#[source] reqwest::Error),
}
