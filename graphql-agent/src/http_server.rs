//! The HTTP surface of the agent: `POST /query` and `GET /health`.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::agent::QueryProcessor;
use crate::agent::QueryRequest;
use crate::error::ServerError;

/// Build the HTTP routes around `processor`.
pub fn router(processor: Arc<dyn QueryProcessor>) -> Router {
    Router::new()
        .route("/query", post(handle_query))
        .route("/health", get(health_check))
        .with_state(processor)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn handle_query(
    State(processor): State<Arc<dyn QueryProcessor>>,
    request: Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    let request = match request {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!(reason = %rejection.body_text(), "invalid query request");
            return error_response(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text());
        }
    };
    tracing::info!(question = %request.q, "received query");
    match processor.process(&request.q).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => {
            tracing::error!(reason = %err, "error processing request");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = err.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = err.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(reason = %detail, "panic while processing request");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, detail)
}

fn error_response(status: StatusCode, detail: String) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

/// A handle on a running HTTP server, used to shut it down gracefully.
#[derive(Debug)]
pub struct HttpServerHandle {
    /// Sender to use to notify of shutdown
    shutdown_sender: oneshot::Sender<()>,

    server_task: JoinHandle<Result<(), ServerError>>,

    /// The address the server is actually listening on.
    /// If the requested address had port zero the OS assigned a free port.
    listen_address: SocketAddr,
}

impl HttpServerHandle {
    /// Bind `listen` and serve `processor` in a background task.
    pub async fn serve(
        processor: Arc<dyn QueryProcessor>,
        listen: SocketAddr,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(listen)
            .await
            .map_err(|error| ServerError::Bind {
                address: listen,
                error,
            })?;
        let listen_address = listener.local_addr().map_err(ServerError::Serve)?;

        let (shutdown_sender, shutdown_receiver) = oneshot::channel::<()>();
        let app = router(processor);
        let server_task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_receiver.await;
                })
                .await
                .map_err(ServerError::Serve)
        });

        tracing::info!("Listening on http://{} 🚀", listen_address);
        Ok(Self {
            shutdown_sender,
            server_task,
            listen_address,
        })
    }

    pub fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Stop accepting connections and wait for in-flight requests to complete.
    pub async fn shutdown(self) -> Result<(), ServerError> {
        if self.shutdown_sender.send(()).is_err() {
            tracing::error!("Failed to notify http thread of shutdown")
        }
        self.server_task.await?
    }
}
