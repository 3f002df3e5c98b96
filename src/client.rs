//! A client for interacting with the transfer monitoring API.
//!
//! The client owns the HTTP plumbing shared by every endpoint method: it
//! joins paths onto the configured base URL, attaches the API key header,
//! sends requests and decodes the response envelope that the monitor API
//! wraps around every payload.

use std::borrow::Cow;
use std::time::Duration;

use reqwest::Method;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::config::MonitorApiConfig;
use crate::config::Settings;
use crate::error::Error;

/// The request timeout for requests to the monitor API.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The header carrying the API key on every request.
const API_KEY_HEADER: &str = "X-Auth-Apikey";

/// A client for the monitor API.
#[derive(Debug, Clone)]
pub struct MonitorClient {
    /// The base URL to use when making requests to the monitor API.
    pub(crate) endpoint: Url,
    /// The API key sent with every request.
    pub(crate) api_key: String,
    /// The token identifier to attach when recording transfers, if the
    /// deployment tracks transfers of a specific token.
    pub(crate) token_id: Option<u16>,
    /// The client used to make the requests.
    pub(crate) client: reqwest::Client,
}

impl MonitorClient {
    /// Create a new instance of the monitor client using the given
    /// API configuration.
    pub fn new(config: &MonitorApiConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(Error::Network)?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            token_id: config.token_id,
            client,
        })
    }

    /// Build a request for the given API path with the authentication
    /// header attached.
    pub(crate) fn request(
        &self,
        method: Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, Error> {
        let url = self.endpoint.join(path).map_err(|err| {
            Error::PathJoin(err, self.endpoint.clone(), Cow::Owned(path.to_string()))
        })?;

        let request = self
            .client
            .request(method, url)
            .header(API_KEY_HEADER, &self.api_key);

        Ok(request)
    }

    /// Send the request and decode the response, converting transport,
    /// HTTP and enveloped failures into [`Error`]s.
    pub(crate) async fn send(&self, request: reqwest::RequestBuilder) -> Result<Envelope, Error> {
        let response = request.send().await.map_err(Error::Network)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::HttpRequest(status, body));
        }

        let envelope: Envelope = response.json().await.map_err(Error::UnexpectedResponse)?;
        envelope.error_for_meta()
    }

    /// Issue a GET request against the given API path.
    pub(crate) async fn get(&self, path: &str) -> Result<Envelope, Error> {
        let request = self.request(Method::GET, path)?;
        self.send(request).await
    }

    /// Issue a POST request carrying the given parameters in the query
    /// string, which is where the monitor API expects them.
    pub(crate) async fn post<P>(&self, path: &str, params: &P) -> Result<Envelope, Error>
    where
        P: Serialize + ?Sized,
    {
        let request = self.request(Method::POST, path)?.query(params);
        self.send(request).await
    }
}

impl TryFrom<&Settings> for MonitorClient {
    type Error = Error;

    fn try_from(settings: &Settings) -> Result<Self, Error> {
        Self::new(&settings.monitor)
    }
}

/// The response wrapper that the monitor API puts around every payload.
///
/// The payload under `data` is operation specific and is handed to the
/// caller as it arrived, without further interpretation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    /// The operation specific payload. Some operations respond with meta
    /// information only and carry no payload at all.
    #[serde(default)]
    pub data: Option<Value>,
    /// Quota, error and validation information attached to every
    /// response.
    pub meta: ResponseMeta,
}

impl Envelope {
    /// Convert failures reported in the response meta into errors,
    /// mirroring what [`reqwest::Response::error_for_status`] does for
    /// HTTP status codes.
    fn error_for_meta(self) -> Result<Self, Error> {
        if self.meta.error_code != 0 {
            return Err(Error::Api {
                code: self.meta.error_code,
                message: self.meta.error_message.unwrap_or_default(),
            });
        }

        match &self.meta.validation_errors {
            Some(errors) if !is_empty_container(errors) => {
                Err(Error::ApiValidation(errors.clone()))
            }
            _ => Ok(self),
        }
    }
}

/// The `meta` object attached to every monitor API response.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ResponseMeta {
    /// The number of API calls left in the current quota period.
    pub calls_left: Option<u64>,
    /// The number of API calls used in the current quota period.
    pub calls_used: Option<u64>,
    /// The error code reported by the server, where zero means success.
    pub error_code: i64,
    /// The error message accompanying a non-zero error code.
    pub error_message: Option<String>,
    /// The fiat currency code used for fiat denominated payload fields.
    pub fiat_code: Option<String>,
    /// The riskscore profile that the server applied to the request.
    pub riskscore_profile: Option<RiskscoreProfile>,
    /// The server clock at response time, as a unix timestamp.
    pub server_time: Option<u64>,
    /// Per-parameter validation failures echoed by the server. An empty
    /// object means that all parameters were accepted.
    pub validation_errors: Option<Value>,
}

/// Identification of a riskscore profile in the response meta.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RiskscoreProfile {
    /// The numeric profile id.
    pub id: u64,
    /// The human readable profile name.
    pub name: String,
    /// The id of the scoring history entry, present on transfer payloads.
    #[serde(default)]
    pub history_id: Option<u64>,
}

/// Whether a `validation_errors` value reports no failures. The monitor
/// API sends an empty object when all parameters were accepted.
fn is_empty_container(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(fields) => fields.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
