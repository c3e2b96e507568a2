//! Main entry point for CLI command to start server.

use std::io::IsTerminal;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::agent::Agent;
use crate::agent::QueryProcessor;
use crate::configuration::generate_config_schema;
use crate::configuration::Configuration;
use crate::http_server::HttpServerHandle;

/// Options for the agent
#[derive(Parser, Debug)]
#[command(
    name = "graphql-agent",
    about = "Answers natural-language questions with a GraphQL API"
)]
pub(crate) struct Opt {
    /// Log level (off|error|warn|info|debug|trace).
    #[arg(
        long = "log",
        default_value = "info",
        alias = "log-level",
        env = "GRAPHQL_AGENT_LOG"
    )]
    log_level: String,

    /// Configuration file location.
    #[arg(short, long = "config", env = "GRAPHQL_AGENT_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// Address the HTTP server listens on.
    #[arg(long, env = "GRAPHQL_AGENT_LISTEN")]
    listen: Option<SocketAddr>,

    /// API key of the language model endpoint.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// API version of the language model endpoint.
    #[arg(long, env = "OPENAI_API_VERSION")]
    api_version: Option<String>,

    /// URL of the language model deployment.
    #[arg(long, env = "OPENAI_API_ENDPOINT")]
    model_endpoint: Option<Url>,

    /// Name of the language model, for endpoints serving several models.
    #[arg(long, env = "OPENAI_MODEL")]
    model_name: Option<String>,

    /// URL of the GraphQL endpoint.
    #[arg(long, env = "GRAPHQL_API_URL")]
    graphql_endpoint: Option<Url>,

    /// URL of the GraphQL schema document.
    #[arg(long, env = "GRAPHQL_SCHEMA_URL")]
    schema_url: Option<Url>,

    /// Answer a single question, print the answer and exit.
    #[arg(long, value_name = "QUESTION")]
    ask: Option<String>,

    /// Prints the configuration schema.
    #[arg(long)]
    config_schema: bool,

    /// Display version and exit.
    #[arg(long, short = 'V')]
    version: bool,
}

impl Opt {
    /// Load the configuration file, if any, and apply options on top of it.
    fn configuration(&self) -> Result<Configuration> {
        let mut configuration = match &self.config_path {
            Some(path) => {
                let path = if path.is_relative() {
                    std::env::current_dir()?.join(path)
                } else {
                    path.clone()
                };
                Configuration::from_file(&path)?
            }
            None => Configuration::default(),
        };

        if let Some(listen) = self.listen {
            configuration.server.listen = listen;
        }
        if let Some(api_key) = &self.api_key {
            configuration.model.api_key = api_key.clone();
        }
        if let Some(api_version) = &self.api_version {
            configuration.model.api_version = Some(api_version.clone());
        }
        if let Some(endpoint) = &self.model_endpoint {
            configuration.model.endpoint = Some(endpoint.clone());
        }
        if let Some(name) = &self.model_name {
            configuration.model.name = Some(name.clone());
        }
        if let Some(endpoint) = &self.graphql_endpoint {
            configuration.graphql.endpoint = Some(endpoint.clone());
        }
        if let Some(schema_url) = &self.schema_url {
            configuration.graphql.schema_url = schema_url.clone();
        }
        Ok(configuration)
    }
}

/// This is the main agent entrypoint.
pub fn main() -> Result<()> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(nb) = std::env::var("GRAPHQL_AGENT_NUM_CORES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
    {
        builder.worker_threads(nb);
    }
    let runtime = builder.build()?;
    runtime.block_on(Executable::builder().start())
}

/// Entry point into creating an agent executable.
pub struct Executable {}

#[buildstructor::buildstructor]
impl Executable {
    /// Build an executable that will parse commandline options, set up logging and serve
    /// questions over HTTP.
    ///
    /// A `processor` may be supplied to serve something other than the configured agent.
    /// Note that if you do not specify a runtime you must be in the context of an existing tokio runtime.
    #[builder(entry = "builder", exit = "start")]
    pub async fn start(processor: Option<Arc<dyn QueryProcessor>>) -> Result<()> {
        // Environment variables may come from a .env file in the working directory.
        dotenv::dotenv().ok();

        let opt = Opt::parse();

        if opt.version {
            println!("{}", std::env!("CARGO_PKG_VERSION"));
            return Ok(());
        }

        if opt.config_schema {
            let schema = generate_config_schema();
            println!("{}", serde_json::to_string_pretty(&schema)?);
            return Ok(());
        }

        let env_filter = std::env::var("RUST_LOG")
            .ok()
            .unwrap_or_else(|| opt.log_level.clone());
        let builder = tracing_subscriber::fmt::fmt().with_env_filter(
            EnvFilter::try_new(&env_filter).context("could not parse log configuration")?,
        );
        let installed = if std::io::stdout().is_terminal() {
            builder.try_init()
        } else {
            builder.json().try_init()
        };
        installed.map_err(|err| anyhow!("could not install the log subscriber: {err}"))?;

        let configuration = opt.configuration()?;

        if let Some(question) = &opt.ask {
            let agent = Agent::from_configuration(&configuration).await?;
            println!("{}", agent.process(question).await.answer);
            return Ok(());
        }

        let processor: Arc<dyn QueryProcessor> = match processor {
            Some(processor) => processor,
            None => Arc::new(Agent::from_configuration(&configuration).await?),
        };

        let handle = HttpServerHandle::serve(processor, configuration.server.listen).await?;
        shutdown_signal().await;
        tracing::info!("Shutting down");
        handle.shutdown().await?;
        tracing::info!("Stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(err) => {
                    tracing::error!(reason = %err, "failed to install SIGTERM signal handler");
                    std::future::pending::<()>().await;
                }
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate => {},
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(reason = %err, "failed to install CTRL+C signal handler");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::configuration::MissingSchemaPolicy;
    use crate::render::RenderStyle;

    fn parse(args: &[&str]) -> Opt {
        Opt::try_parse_from(std::iter::once("graphql-agent").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn it_applies_options_over_defaults() {
        let opt = parse(&[
            "--listen",
            "127.0.0.1:9000",
            "--api-key",
            "secret",
            "--api-version",
            "2024-02-01",
            "--model-endpoint",
            "https://example.openai.azure.com/openai/deployments/gpt",
            "--graphql-endpoint",
            "http://localhost:4001/graphql",
            "--schema-url",
            "http://localhost:4001/schema.graphql",
        ]);
        let configuration = opt.configuration().unwrap();

        assert_eq!(
            configuration.server.listen,
            SocketAddr::from(([127, 0, 0, 1], 9000))
        );
        assert_eq!(configuration.model.api_key, "secret");
        assert_eq!(configuration.model.api_version.as_deref(), Some("2024-02-01"));
        assert_eq!(
            configuration.model.endpoint.unwrap().as_str(),
            "https://example.openai.azure.com/openai/deployments/gpt"
        );
        assert_eq!(
            configuration.graphql.endpoint.unwrap().as_str(),
            "http://localhost:4001/graphql"
        );
        assert_eq!(
            configuration.graphql.schema_url.as_str(),
            "http://localhost:4001/schema.graphql"
        );
    }

    #[test]
    fn it_applies_options_over_the_configuration_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
graphql:
  endpoint: http://from-file/graphql
  missing_schema: fail
rendering: pretty
"#
        )
        .unwrap();
        file.flush().unwrap();

        let path = file.path().to_str().unwrap();
        let opt = parse(&[
            "--config",
            path,
            "--graphql-endpoint",
            "http://from-flag/graphql",
        ]);
        let configuration = opt.configuration().unwrap();

        assert_eq!(
            configuration.graphql.endpoint.unwrap().as_str(),
            "http://from-flag/graphql"
        );
        assert_eq!(configuration.graphql.missing_schema, MissingSchemaPolicy::Fail);
        assert_eq!(configuration.rendering, RenderStyle::Pretty);
    }

    #[test]
    fn it_rejects_invalid_urls() {
        let result = Opt::try_parse_from(["graphql-agent", "--graphql-endpoint", "not a url"]);
        assert!(result.is_err());
    }
}
