//! The file-sharing application: concepts and rules wired into one engine

use crate::config::AppConfig;
use crate::{syncs, FileUploading, Requesting, Sessioning, Sharing, UserAuthentication};
use concord_engine::{record, ActionOccurrence, EngineError, FlowId, Record, SyncEngine, SyncRule, Value};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("unknown user `{0}`")]
    UnknownUser(String),

    /// The action ran but reported an error output
    #[error("{action} rejected: {error}")]
    Rejected { action: String, error: String },
}

pub type AppResult<T> = std::result::Result<T, AppError>;

/// What came back for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub request: Value,
    pub flow: FlowId,
    /// Responses in the order they were produced; empty when no rule answered
    pub responses: Vec<Record>,
}

/// Façade over the engine running the file-sharing rules
///
/// Users and sessions are set up directly through their concepts; everything
/// else goes through `request`, exactly as an outside caller would.
pub struct App {
    engine: SyncEngine,
    requesting: Arc<Requesting>,
    auth: Arc<UserAuthentication>,
}

impl App {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let requesting = Arc::new(Requesting::new());
        let auth = Arc::new(UserAuthentication::new());
        let engine = SyncEngine::builder()
            .concept(requesting.clone())
            .concept(Arc::new(Sessioning::new()))
            .concept(Arc::new(FileUploading::new(config.storage.base_url)))
            .concept(Arc::new(Sharing::new()))
            .concept(auth.clone())
            .syncs(syncs::all()?)
            .config(config.engine)
            .build()?;
        Ok(Self {
            engine,
            requesting,
            auth,
        })
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn syncs(&self) -> &[SyncRule] {
        self.engine.syncs()
    }

    /// Register `username`, returning the new user id
    pub async fn register(&self, username: &str) -> AppResult<Value> {
        let occurrence = self
            .engine
            .invoke("UserAuthentication", "register", record! { "username" => username })
            .await?;
        Self::expect_field(&occurrence, "register", "user")
    }

    /// Open a session for a registered user
    pub async fn login(&self, username: &str) -> AppResult<Value> {
        let user = self
            .auth
            .user_by_username(username)
            .ok_or_else(|| AppError::UnknownUser(username.to_string()))?;
        let occurrence = self
            .engine
            .invoke("Sessioning", "create", record! { "user" => user })
            .await?;
        Self::expect_field(&occurrence, "login", "session")
    }

    /// Submit a request and collect what the rules answered
    pub async fn request(&self, fields: Record) -> AppResult<Response> {
        let path = fields.get("path").cloned().unwrap_or_default();
        let occurrence = self.engine.invoke("Requesting", "request", fields).await?;
        let request = Self::expect_field(&occurrence, "request", "request")?;
        let responses = self.requesting.responses(&request);
        tracing::debug!(%path, %request, responses = responses.len(), "request answered");
        Ok(Response {
            request,
            flow: occurrence.flow,
            responses,
        })
    }

    fn expect_field(occurrence: &ActionOccurrence, action: &str, field: &str) -> AppResult<Value> {
        let output = &occurrence.output;
        if occurrence.is_error() {
            return Err(AppError::Rejected {
                action: action.to_string(),
                error: output.get("error").map(ToString::to_string).unwrap_or_default(),
            });
        }
        output.get(field).cloned().ok_or_else(|| AppError::Rejected {
            action: action.to_string(),
            error: format!("no `{field}` in output"),
        })
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App").field("engine", &self.engine).finish_non_exhaustive()
    }
}
