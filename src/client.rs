use std::time::Duration;

use bytes::Bytes;
use headers::authorization::Bearer;
use headers::{Authorization, HeaderMapExt};
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use serde::Deserialize;
use thiserror::Error;
use tokio::time::error::Elapsed;
use tracing::{debug, warn};

use crate::http::{HttpClient, HttpError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum Error {
    #[error("API token is not a valid bearer token")]
    InvalidToken,
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("unexpected status code {0}")]
    UnexpectedStatus(StatusCode),
    #[error("decode response failed, {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("request timed out")]
    Timeout(#[from] Elapsed),
}

/// A node as the inventory reports it. Anything beyond the fields the
/// generators care about is ignored.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub name: String,
    /// Hostname or IP, optionally with a `:port` suffix.
    pub address: String,
    #[serde(default)]
    pub is_disabled: bool,
}

#[derive(Deserialize)]
struct Envelope {
    response: Vec<serde_json::Value>,
}

/// Client for the Remnawave nodes API.
pub struct Client {
    http: HttpClient,
    endpoint: String,
    auth: Authorization<Bearer>,
}

impl Client {
    pub fn new(http: HttpClient, endpoint: String, token: &str) -> Result<Self, Error> {
        let auth = Authorization::bearer(token).map_err(|_err| Error::InvalidToken)?;

        Ok(Client {
            http,
            endpoint,
            auth,
        })
    }

    /// Fetch the current node list. Records that do not deserialize are
    /// skipped with a warning instead of failing the whole fetch.
    pub async fn nodes(&self) -> Result<Vec<Node>, Error> {
        let mut req = Request::builder()
            .method(Method::GET)
            .uri(format!("{}/nodes", self.endpoint))
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Full::<Bytes>::default())
            .map_err(HttpError::from)?;
        req.headers_mut().typed_insert(self.auth.clone());

        let resp = tokio::time::timeout(REQUEST_TIMEOUT, self.http.send(req)).await??;
        let (parts, incoming) = resp.into_parts();
        if !parts.status.is_success() {
            return Err(Error::UnexpectedStatus(parts.status));
        }

        let body = incoming
            .collect()
            .await
            .map_err(HttpError::from)?
            .to_bytes();
        let envelope = serde_json::from_slice::<Envelope>(&body)?;

        let mut nodes = Vec::with_capacity(envelope.response.len());
        for record in envelope.response {
            match serde_json::from_value::<Node>(record) {
                Ok(node) => nodes.push(node),
                Err(err) => warn!(message = "skipping malformed node record", %err),
            }
        }

        debug!(message = "fetched nodes", count = nodes.len());

        Ok(nodes)
    }
}
