//! Language model access.
//!
//! The agent only needs one capability from a language model: given a list of role-tagged
//! messages, return the generated text. [`ChatModel`] is that capability and
//! [`AzureChatModel`] implements it against an Azure OpenAI chat completion deployment.

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use url::Url;

use crate::configuration;
pub use crate::error::ModelError;

/// The author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model.
    System,
    /// The end user.
    User,
}

/// A role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A language model that completes a conversation.
#[async_trait]
pub trait ChatModel: Send + Sync + 'static {
    /// Return the model's reply to `messages`, unmodified.
    async fn complete(&self, messages: &[Message], temperature: f32) -> Result<String, ModelError>;
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: &'a [Message],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat completions served by an Azure OpenAI deployment.
#[derive(Clone)]
pub struct AzureChatModel {
    http_client: reqwest::Client,
    endpoint: Option<Url>,
    api_key: String,
    api_version: Option<String>,
    name: Option<String>,
}

impl AzureChatModel {
    pub fn new(http_client: reqwest::Client, configuration: &configuration::Model) -> Self {
        Self {
            http_client,
            endpoint: configuration.endpoint.clone(),
            api_key: configuration.api_key.clone(),
            api_version: configuration.api_version.clone(),
            name: configuration.name.clone(),
        }
    }

    fn completions_url(&self) -> Result<Url, ModelError> {
        let endpoint = self.endpoint.as_ref().ok_or(ModelError::MissingEndpoint)?;
        let base = endpoint.path().trim_end_matches('/');
        let deployment = match &self.name {
            // A resource endpoint: the deployment is addressed by model name.
            Some(name) if !base.contains("/openai/deployments/") => {
                format!("{base}/openai/deployments/{name}")
            }
            _ => base.to_string(),
        };
        let mut url = endpoint.clone();
        url.set_path(&format!("{deployment}/chat/completions"));
        if let Some(api_version) = &self.api_version {
            url.query_pairs_mut().append_pair("api-version", api_version);
        }
        Ok(url)
    }
}

#[async_trait]
impl ChatModel for AzureChatModel {
    async fn complete(&self, messages: &[Message], temperature: f32) -> Result<String, ModelError> {
        let url = self.completions_url()?;
        tracing::debug!(url.full = %url, messages = messages.len(), "requesting chat completion");

        let response = self
            .http_client
            .post(url)
            .header("api-key", &self.api_key)
            .json(&ChatCompletionRequest {
                model: self.name.as_deref(),
                messages,
                temperature,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletion = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ModelError::EmptyCompletion)
    }
}
