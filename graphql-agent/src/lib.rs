//! Answers natural-language questions against a GraphQL API.
//!
//! A question goes through three steps: a language model translates it into a
//! GraphQL query using the API schema, the query is executed against the
//! GraphQL endpoint, and the language model turns the JSON result into a
//! conversational answer.

#![warn(unreachable_pub)]

mod agent;
pub mod configuration;
pub mod error;
mod executable;
pub mod executor;
mod http_server;
pub mod model;
mod prompts;
pub mod render;
pub mod schema;

pub use agent::Agent;
pub use agent::QueryProcessor;
pub use agent::QueryRequest;
pub use agent::QueryResponse;
pub use configuration::Configuration;
pub use executable::main;
pub use executable::Executable;
pub use http_server::router;
pub use http_server::HttpServerHandle;
