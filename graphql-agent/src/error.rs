//! Agent errors.
use std::net::SocketAddr;

use displaydoc::Display;
use thiserror::Error;

/// Errors raised while invoking the language model.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum ModelError {
    /// the model endpoint is not configured
    MissingEndpoint,

    /// model request failed: {0}
    Request(#[from] reqwest::Error),

    /// model endpoint returned {status}: {body}
    Status {
        /// The HTTP status code.
        status: u16,
        /// The response body, as text.
        body: String,
    },

    /// model response did not contain any completion text
    EmptyCompletion,
}

/// Errors raised while executing a generated query.
///
/// These never leave the executor: they are turned into an `{"error": ...}` value.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum ExecutionError {
    /// the GraphQL endpoint is not configured
    MissingEndpoint,

    /// {0}
    Request(#[from] reqwest::Error),
}

/// Errors raised by the query pipeline.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum AgentError {
    /// the GraphQL schema is unavailable
    SchemaUnavailable,

    /// could not generate a GraphQL query: {0}
    Generation(#[source] ModelError),

    /// could not format the response: {0}
    Formatting(#[source] ModelError),
}

/// Errors related to the configuration file.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not read configuration file '{path}': {error}
    Read {
        /// The configuration path.
        path: String,
        /// The underlying error.
        error: std::io::Error,
    },

    /// could not parse configuration: {0}
    Parse(#[from] serde_yaml::Error),
}

/// Errors raised by the HTTP server.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum ServerError {
    /// could not bind to {address}: {error}
    Bind {
        /// The requested listen address.
        address: SocketAddr,
        /// The underlying error.
        error: std::io::Error,
    },

    /// HTTP server failed: {0}
    Serve(std::io::Error),

    /// HTTP server task failed: {0}
    Join(#[from] tokio::task::JoinError),
}
