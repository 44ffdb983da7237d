//! HTTP transport for the organization directory.
//!
//! Posts `{query, variables}` with a bearer credential and unwraps the
//! `data` object of the response.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{ClientFactory, QueryClient};
use crate::error::{RemoteError, Result};
use crate::queries::Query;

/// The public GraphQL endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.github.com/graphql";

#[derive(Serialize)]
struct Request<'a> {
    query: &'a str,
    variables: &'a Value,
}

#[derive(Deserialize)]
struct Response {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<ResponseError>,
}

#[derive(Deserialize)]
struct ResponseError {
    message: String,
}

/// A query client speaking GraphQL over HTTPS.
pub struct HttpClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
}

impl HttpClient {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("teamgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            token: token.into(),
        })
    }
}

#[async_trait]
impl QueryClient for HttpClient {
    async fn fetch_one(&self, query: &Query, variables: Value) -> Result<Value> {
        debug!(query = query.name, "sending query");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&Request {
                query: query.document,
                variables: &variables,
            })
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            let message = response.text().await.unwrap_or_default();
            return Err(RemoteError::Unauthorized(message));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(query = query.name, status = status.as_u16(), "query rejected");
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: Response = response
            .json()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        if !body.errors.is_empty() {
            return Err(RemoteError::Query {
                query: query.name.to_string(),
                messages: body.errors.into_iter().map(|e| e.message).collect(),
            });
        }

        body.data
            .ok_or_else(|| RemoteError::schema(query.name, "response has no data"))
    }
}

/// Builds [`HttpClient`]s bound to one endpoint.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    endpoint: String,
}

impl HttpClientFactory {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl Default for HttpClientFactory {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

impl ClientFactory for HttpClientFactory {
    fn client_for_token(&self, token: &str) -> Result<Arc<dyn QueryClient>> {
        Ok(Arc::new(HttpClient::new(self.endpoint.clone(), token)?))
    }
}
