use std::future::Future;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::{ConfigError, ServerConfig};
use crate::core::activity::{ActivityListing, ActivityName, Email};
use crate::core::error::RegistryError;
use crate::inmemory_db::Db;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("could not bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct Server {
    state: ServerState,
}

/// Handler state. The registry is injected here rather than living in a global.
#[derive(Clone)]
pub struct ServerState {
    db: Db,
}

impl ServerState {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }
}

#[derive(Deserialize)]
pub struct EmailQuery {
    email: Email,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub detail: String,
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            detail: self.to_string(),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

pub enum ApiError {
    Registry(RegistryError),
    Query(QueryRejection),
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        ApiError::Registry(err)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Query(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Registry(err) => err.into_response(),
            ApiError::Query(rejection) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse {
                    detail: rejection.body_text(),
                }),
            )
                .into_response(),
        }
    }
}

async fn handle_list_activities(State(state): State<ServerState>) -> Json<ActivityListing> {
    Json(state.db.list().await)
}

async fn handle_signup(
    State(state): State<ServerState>,
    Path(activity_name): Path<ActivityName>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Query(EmailQuery { email }) = query?;
    let logged_email = email.clone();

    match state.db.signup(&activity_name, email).await {
        Ok(message) => {
            info!(activity = %activity_name, email = %logged_email, "signed up");
            Ok(Json(MessageResponse { message }))
        }
        Err(err) => {
            warn!(activity = %activity_name, email = %logged_email, error = %err, "signup rejected");
            Err(err.into())
        }
    }
}

async fn handle_unregister(
    State(state): State<ServerState>,
    Path(activity_name): Path<ActivityName>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Query(EmailQuery { email }) = query?;
    let logged_email = email.clone();

    match state.db.unregister(&activity_name, email).await {
        Ok(message) => {
            info!(activity = %activity_name, email = %logged_email, "unregistered");
            Ok(Json(MessageResponse { message }))
        }
        Err(err) => {
            warn!(activity = %activity_name, email = %logged_email, error = %err, "unregister rejected");
            Err(err.into())
        }
    }
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/activities", get(handle_list_activities))
        .route("/activities/{activity_name}/signup", post(handle_signup))
        .route(
            "/activities/{activity_name}/unregister",
            post(handle_unregister),
        )
        .with_state(state)
}

/// Resolves once `signal` fires. A signal that cannot be installed never resolves,
/// so the server keeps running instead of stopping at startup.
async fn shutdown_signal<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("shutting down"),
        Err(err) => {
            warn!(error = %err, "could not install shutdown signal handler");
            std::future::pending::<()>().await
        }
    }
}

impl Server {
    pub fn new(db: Db) -> Self {
        Self {
            state: ServerState::new(db),
        }
    }

    pub async fn seeded() -> Result<Self, ServerError> {
        Ok(Self::new(Db::seeded().await?))
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    pub async fn run(self, config: &ServerConfig) -> Result<(), ServerError> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        info!(addr = %listener.local_addr()?, "starting activity service");
        self.serve(listener).await
    }

    /// Serves on an already bound listener until ctrl-c.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal(tokio::signal::ctrl_c()))
            .await?;
        Ok(())
    }
}
