//! Fetching the GraphQL schema document.

use url::Url;

/// Fetch the schema document (SDL text) from `url`.
///
/// Failures are logged and reported as `None`: the agent starts without a schema rather than
/// refusing to start.
pub async fn fetch_schema(http_client: &reqwest::Client, url: &Url) -> Option<String> {
    match http_client.get(url.clone()).send().await {
        Ok(res) if res.status().is_success() => match res.text().await {
            Ok(schema) => {
                tracing::debug!(url.full = %url, bytes = schema.len(), "fetched GraphQL schema");
                Some(schema)
            }
            Err(err) => {
                tracing::error!(
                    url.full = %url,
                    reason = %err,
                    "failed to fetch GraphQL schema"
                );
                None
            }
        },
        Ok(res) => {
            tracing::error!(
                http.response.status_code = res.status().as_u16(),
                url.full = %url,
                "failed to fetch GraphQL schema"
            );
            None
        }
        Err(err) => {
            tracing::error!(
                url.full = %url,
                reason = %err,
                "failed to fetch GraphQL schema"
            );
            None
        }
    }
}
