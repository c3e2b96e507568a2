//! Execution of generated queries against the GraphQL endpoint.

use serde_json::json;
use serde_json::Value;
use url::Url;

pub use crate::error::ExecutionError;

/// Sends queries to the GraphQL endpoint.
#[derive(Clone, Debug)]
pub struct QueryExecutor {
    http_client: reqwest::Client,
    endpoint: Option<Url>,
}

impl QueryExecutor {
    pub fn new(http_client: reqwest::Client, endpoint: Option<Url>) -> Self {
        Self {
            http_client,
            endpoint,
        }
    }

    /// Execute `query` and return the response body verbatim.
    ///
    /// This never fails: a failed execution is returned as `{"error": "Failed to execute query: <reason>"}`
    /// so that it can be summarized like any other result. GraphQL `errors` in a successful
    /// response are not inspected.
    pub async fn execute_query(&self, query: &str) -> Value {
        match self.try_execute(query).await {
            Ok(data) => data,
            Err(err) => {
                tracing::error!(reason = %err, "failed to execute GraphQL query");
                json!({ "error": format!("Failed to execute query: {err}") })
            }
        }
    }

    async fn try_execute(&self, query: &str) -> Result<Value, ExecutionError> {
        let endpoint = self
            .endpoint
            .clone()
            .ok_or(ExecutionError::MissingEndpoint)?;
        let response = self
            .http_client
            .post(endpoint)
            .header(http::header::CONTENT_TYPE, "application/json")
            .json(&json!({ "query": query }))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}
