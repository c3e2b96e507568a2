//! Logic for loading configuration.
//!
//! Configuration comes from an optional YAML file. The executable then applies command line
//! flags and environment variables on top of it.

use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::path::Path;

use schemars::gen::SchemaSettings;
use schemars::schema::RootSchema;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use url::Url;

pub use crate::error::ConfigurationError;
use crate::render::RenderStyle;

/// The schema document of the jobs API.
pub const DEFAULT_SCHEMA_URL: &str = "https://jluatgraphqlapi-atc2asbnb5gxbehw.westeurope-01.azurewebsites.net/graphql-v2/schema.graphql";

const DEFAULT_API_KEY: &str = "api-key";

fn default_listen() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8000)
}

fn default_schema_url() -> Url {
    Url::parse(DEFAULT_SCHEMA_URL).expect("default schema url must be valid")
}

fn default_api_key() -> String {
    DEFAULT_API_KEY.to_string()
}

/// The configuration for the agent.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Configuration {
    /// Configuration of the HTTP server.
    pub server: Server,

    /// Configuration of the language model.
    pub model: Model,

    /// Configuration of the GraphQL API.
    pub graphql: Graphql,

    /// How execution results are rendered into the formatting prompt.
    pub rendering: RenderStyle,
}

#[buildstructor::buildstructor]
impl Configuration {
    #[builder]
    pub fn new(
        server: Option<Server>,
        model: Option<Model>,
        graphql: Option<Graphql>,
        rendering: Option<RenderStyle>,
    ) -> Self {
        Self {
            server: server.unwrap_or_default(),
            model: model.unwrap_or_default(),
            graphql: graphql.unwrap_or_default(),
            rendering: rendering.unwrap_or_default(),
        }
    }
}

impl Configuration {
    /// Parse a YAML configuration document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigurationError> {
        // An empty document is a valid configuration with every default.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let yaml = std::fs::read_to_string(path).map_err(|error| ConfigurationError::Read {
            path: path.display().to_string(),
            error,
        })?;
        Self::from_yaml(&yaml)
    }
}

/// Configuration of the HTTP server.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Server {
    /// The socket address to listen on; defaults to 0.0.0.0:8000
    #[schemars(with = "String")]
    pub listen: SocketAddr,
}

#[buildstructor::buildstructor]
impl Server {
    #[builder]
    pub fn new(listen: Option<SocketAddr>) -> Self {
        Self {
            listen: listen.unwrap_or_else(default_listen),
        }
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Configuration of the chat completion endpoint.
#[derive(Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Model {
    /// Base URL of the deployment, e.g. `https://<resource>.openai.azure.com/openai/deployments/<name>`,
    /// or of the resource when `name` selects the deployment.
    pub endpoint: Option<Url>,

    /// The API key sent in the `api-key` header.
    pub api_key: String,

    /// The API version sent as the `api-version` query parameter.
    pub api_version: Option<String>,

    /// Model name. Also names the deployment when `endpoint` is a resource URL.
    pub name: Option<String>,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("name", &self.name)
            .finish()
    }
}

#[buildstructor::buildstructor]
impl Model {
    #[builder]
    pub fn new(
        endpoint: Option<Url>,
        api_key: Option<String>,
        api_version: Option<String>,
        name: Option<String>,
    ) -> Self {
        Self {
            endpoint,
            api_key: api_key.unwrap_or_else(default_api_key),
            api_version,
            name,
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// What to do when the schema document could not be fetched at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MissingSchemaPolicy {
    /// Generate queries with an empty schema in the prompt.
    #[default]
    Degrade,
    /// Answer every question with an error.
    Fail,
}

/// Configuration of the GraphQL API.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Graphql {
    /// The GraphQL endpoint queries are sent to.
    pub endpoint: Option<Url>,

    /// Where the schema document is fetched from at startup.
    #[serde(default = "default_schema_url")]
    pub schema_url: Url,

    /// Behaviour when the schema document is unavailable.
    pub missing_schema: MissingSchemaPolicy,
}

#[buildstructor::buildstructor]
impl Graphql {
    #[builder]
    pub fn new(
        endpoint: Option<Url>,
        schema_url: Option<Url>,
        missing_schema: Option<MissingSchemaPolicy>,
    ) -> Self {
        Self {
            endpoint,
            schema_url: schema_url.unwrap_or_else(default_schema_url),
            missing_schema: missing_schema.unwrap_or_default(),
        }
    }
}

impl Default for Graphql {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Generate a JSON schema for the configuration file.
pub fn generate_config_schema() -> RootSchema {
    let settings = SchemaSettings::draft2019_09().with(|s| {
        s.option_nullable = true;
        s.option_add_null_type = false;
    });
    let gen = settings.into_generator();
    gen.into_root_schema_for::<Configuration>()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn it_builds_default_configuration() {
        let configuration = Configuration::builder().build();
        assert_eq!(configuration.server.listen, SocketAddr::from(([0, 0, 0, 0], 8000)));
        assert_eq!(configuration.model.api_key, "api-key");
        assert_eq!(configuration.model.endpoint, None);
        assert_eq!(configuration.model.api_version, None);
        assert_eq!(configuration.graphql.endpoint, None);
        assert_eq!(configuration.graphql.schema_url.as_str(), DEFAULT_SCHEMA_URL);
        assert_eq!(
            configuration.graphql.missing_schema,
            MissingSchemaPolicy::Degrade
        );
        assert_eq!(configuration.rendering, RenderStyle::Compact);
    }

    #[test]
    fn it_parses_empty_yaml_as_defaults() {
        let configuration = Configuration::from_yaml("").unwrap();
        assert_eq!(configuration.server.listen, SocketAddr::from(([0, 0, 0, 0], 8000)));
        assert_eq!(configuration.graphql.schema_url.as_str(), DEFAULT_SCHEMA_URL);
    }

    #[test]
    fn it_parses_full_yaml() {
        let configuration = Configuration::from_yaml(
            r#"
server:
  listen: "127.0.0.1:4000"
model:
  endpoint: https://example.openai.azure.com/openai/deployments/gpt
  api_key: secret
  api_version: "2024-02-01"
graphql:
  endpoint: http://localhost:4001/graphql
  schema_url: http://localhost:4001/schema.graphql
  missing_schema: fail
rendering: pretty
"#,
        )
        .unwrap();

        assert_eq!(configuration.server.listen, SocketAddr::from(([127, 0, 0, 1], 4000)));
        assert_eq!(
            configuration.model.endpoint.unwrap().as_str(),
            "https://example.openai.azure.com/openai/deployments/gpt"
        );
        assert_eq!(configuration.model.api_key, "secret");
        assert_eq!(configuration.model.api_version.as_deref(), Some("2024-02-01"));
        assert_eq!(
            configuration.graphql.endpoint.unwrap().as_str(),
            "http://localhost:4001/graphql"
        );
        assert_eq!(
            configuration.graphql.schema_url.as_str(),
            "http://localhost:4001/schema.graphql"
        );
        assert_eq!(configuration.graphql.missing_schema, MissingSchemaPolicy::Fail);
        assert_eq!(configuration.rendering, RenderStyle::Pretty);
    }

    #[test]
    fn it_keeps_defaults_for_omitted_sections() {
        let configuration = Configuration::from_yaml(
            r#"
graphql:
  endpoint: http://localhost:4001/graphql
"#,
        )
        .unwrap();
        assert_eq!(configuration.graphql.schema_url.as_str(), DEFAULT_SCHEMA_URL);
        assert_eq!(configuration.model.api_key, "api-key");
    }

    #[test]
    fn it_rejects_unknown_fields() {
        let error = Configuration::from_yaml(
            r#"
graphql:
  endpont: http://localhost:4001/graphql
"#,
        )
        .unwrap_err();
        assert!(error.to_string().contains("endpont"), "{error}");
    }

    #[test]
    fn it_reads_configuration_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rendering: pretty").unwrap();
        file.flush().unwrap();

        let configuration = Configuration::from_file(file.path()).unwrap();
        assert_eq!(configuration.rendering, RenderStyle::Pretty);
    }

    #[test]
    fn it_reports_missing_configuration_file() {
        let error = Configuration::from_file(Path::new("/does/not/exist.yaml")).unwrap_err();
        assert!(matches!(error, ConfigurationError::Read { .. }));
    }

    #[test]
    fn it_redacts_the_api_key() {
        let model = Model::builder().api_key("secret".to_string()).build();
        assert!(!format!("{model:?}").contains("secret"));
    }

    #[test]
    fn it_generates_a_config_schema() {
        let schema = serde_json::to_value(generate_config_schema()).unwrap();
        assert!(schema["properties"]["graphql"].is_object());
        assert!(schema["properties"]["model"].is_object());
    }
}
