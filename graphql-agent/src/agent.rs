//! The question answering pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tower::BoxError;

use crate::configuration::Configuration;
use crate::configuration::MissingSchemaPolicy;
use crate::error::AgentError;
use crate::executor::QueryExecutor;
use crate::model::AzureChatModel;
use crate::model::ChatModel;
use crate::prompts;
use crate::render::render;
use crate::render::RenderStyle;
use crate::schema::fetch_schema;

/// Both model invocations prefer deterministic output.
const TEMPERATURE: f32 = 0.0;

const APOLOGY: &str = "Sorry, Error Encountered:";

/// A natural-language question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub q: String,
}

/// The answer to a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
}

/// Answers questions on behalf of the HTTP layer.
#[async_trait]
pub trait QueryProcessor: Send + Sync + 'static {
    /// Answer `question`.
    ///
    /// An error is reported to the HTTP client as a server error.
    async fn process(&self, question: &str) -> Result<QueryResponse, BoxError>;
}

/// Translates questions into GraphQL, executes them and summarizes the results.
///
/// The schema is fetched once when the agent is created and is read-only afterwards, so a
/// single agent can serve any number of concurrent requests.
pub struct Agent {
    model: Arc<dyn ChatModel>,
    executor: QueryExecutor,
    schema: Option<String>,
    missing_schema: MissingSchemaPolicy,
    rendering: RenderStyle,
}

#[buildstructor::buildstructor]
impl Agent {
    #[builder]
    pub fn new(
        model: Arc<dyn ChatModel>,
        executor: QueryExecutor,
        schema: Option<String>,
        missing_schema: Option<MissingSchemaPolicy>,
        rendering: Option<RenderStyle>,
    ) -> Self {
        Self {
            model,
            executor,
            schema,
            missing_schema: missing_schema.unwrap_or_default(),
            rendering: rendering.unwrap_or_default(),
        }
    }
}

impl Agent {
    /// Create an agent talking to the configured endpoints, fetching the schema document first.
    ///
    /// A schema that cannot be fetched does not prevent the agent from being created.
    pub async fn from_configuration(configuration: &Configuration) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder().build()?;
        let schema = fetch_schema(&http_client, &configuration.graphql.schema_url).await;
        if schema.is_none() {
            tracing::warn!(
                policy = ?configuration.graphql.missing_schema,
                "starting without a GraphQL schema"
            );
        }
        let model: Arc<dyn ChatModel> =
            Arc::new(AzureChatModel::new(http_client.clone(), &configuration.model));
        let executor = QueryExecutor::new(http_client, configuration.graphql.endpoint.clone());

        Ok(Self::builder()
            .model(model)
            .executor(executor)
            .and_schema(schema)
            .missing_schema(configuration.graphql.missing_schema)
            .rendering(configuration.rendering)
            .build())
    }

    /// The schema document, if it was fetched.
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Ask the model to translate `question` into a GraphQL query.
    ///
    /// The model output is returned as is; it is not checked to be valid GraphQL.
    pub async fn generate_query(&self, question: &str) -> Result<String, AgentError> {
        let schema = self.schema.as_deref();
        if schema.is_none() && self.missing_schema == MissingSchemaPolicy::Fail {
            return Err(AgentError::SchemaUnavailable);
        }

        let query = self
            .model
            .complete(&prompts::query_generation(question, schema), TEMPERATURE)
            .await
            .map_err(AgentError::Generation)?;
        tracing::info!(graphql.query = %query, "generated GraphQL query");
        Ok(query)
    }

    /// Execute a generated query. Failures come back as an `{"error": ...}` value.
    pub async fn execute_query(&self, query: &str) -> Value {
        self.executor.execute_query(query).await
    }

    /// Ask the model to answer `question` from `data`.
    pub async fn format_response(&self, data: &Value, question: &str) -> Result<String, AgentError> {
        let data = render(data, self.rendering);
        self.model
            .complete(&prompts::response_formatting(question, &data), TEMPERATURE)
            .await
            .map_err(AgentError::Formatting)
    }

    /// Answer `question`. Errors become an apology in the answer text.
    pub async fn process(&self, question: &str) -> QueryResponse {
        match self.answer(question).await {
            Ok(answer) => QueryResponse { answer },
            Err(err) => {
                tracing::error!(reason = %err, "error processing query");
                QueryResponse {
                    answer: format!("{APOLOGY} {err}"),
                }
            }
        }
    }

    async fn answer(&self, question: &str) -> Result<String, AgentError> {
        let query = self.generate_query(question).await?;
        // Execution errors are summarized like any other result.
        let result = self.execute_query(&query).await;
        self.format_response(&result, question).await
    }
}

#[async_trait]
impl QueryProcessor for Agent {
    async fn process(&self, question: &str) -> Result<QueryResponse, BoxError> {
        Ok(Agent::process(self, question).await)
    }
}
