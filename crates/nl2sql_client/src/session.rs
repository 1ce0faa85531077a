//! Per-session context and action dispatch.
//!
//! A [`Session`] owns everything that must survive between user interactions:
//! the endpoint, connection state, last catalog, selected database and the
//! conversation. Frontends feed it [`Action`]s and render the returned
//! [`Notice`]s; streamed answer text goes through the `on_chunk` callback.

use std::time::Duration;

use futures_util::StreamExt;

use crate::answer::FinalAnswer;
use crate::catalog::DatabaseCatalog;
use crate::client::EngineClient;
use crate::config::Config;
use crate::conversation::Conversation;
use crate::error::{ChatError, ClientError};

pub const GATE_MESSAGE: &str =
    "Could not connect to engine. Please connect to the engine with /connect or /endpoint <url>.";
pub const CATALOG_UNAVAILABLE_MESSAGE: &str = "Database connections are unavailable.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingAnswer,
}

/// Discrete user actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetEndpoint(String),
    Connect,
    SelectDatabase(String),
    Submit(String),
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// User-facing message produced by an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }
}

/// A completed answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub raw: String,
    pub final_answer: FinalAnswer,
}

/// Marks the session as awaiting an answer until dropped, including when the
/// submitting future is dropped mid-stream.
struct AwaitingAnswer<'a> {
    phase: &'a mut Phase,
}

impl<'a> AwaitingAnswer<'a> {
    fn enter(phase: &'a mut Phase) -> Self {
        *phase = Phase::AwaitingAnswer;
        Self { phase }
    }
}

impl Drop for AwaitingAnswer<'_> {
    fn drop(&mut self) {
        *self.phase = Phase::Idle;
    }
}

pub struct Session {
    client: EngineClient,
    endpoint: String,
    default_database: String,
    chunk_delay: Duration,
    connection: ConnectionState,
    phase: Phase,
    catalog: DatabaseCatalog,
    selected_database_id: Option<String>,
    conversation: Conversation,
}

impl Session {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        Ok(Self {
            client: EngineClient::new(config.engine_options())?,
            endpoint: config.base_url().to_string(),
            default_database: config.default_database().to_string(),
            chunk_delay: config.chunk_delay(),
            connection: ConnectionState::Disconnected,
            phase: Phase::Idle,
            catalog: DatabaseCatalog::new(),
            selected_database_id: None,
            conversation: Conversation::new(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Point the session at another engine. The session drops back to
    /// disconnected until the next successful [`Session::connect`].
    pub fn set_endpoint(&mut self, endpoint: impl Into<String>) {
        let endpoint = endpoint.into();
        if endpoint != self.endpoint {
            tracing::info!(from = %self.endpoint, to = %endpoint, "engine endpoint changed");
            self.endpoint = endpoint;
            self.connection = ConnectionState::Disconnected;
            self.catalog = DatabaseCatalog::new();
        }
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn catalog(&self) -> &DatabaseCatalog {
        &self.catalog
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn selected_database_id(&self) -> Option<&str> {
        self.selected_database_id.as_deref()
    }

    pub fn selected_database_alias(&self) -> Option<&str> {
        self.selected_database_id
            .as_deref()
            .and_then(|id| self.catalog.alias_for(id))
    }

    /// Probe the engine; on success load the catalog and resolve the default database.
    pub async fn connect(&mut self) -> bool {
        let health = self.client.check_health(&self.endpoint).await;
        if !health.healthy {
            self.connection = ConnectionState::Disconnected;
            self.catalog = DatabaseCatalog::new();
            return false;
        }
        tracing::info!(endpoint = %self.endpoint, latency_ms = health.latency_ms, "connected to engine");
        self.connection = ConnectionState::Connected;
        self.refresh_catalog().await;
        true
    }

    /// Re-fetch the catalog. Returns `false` when the listing was unavailable
    /// (the catalog is then empty).
    pub async fn refresh_catalog(&mut self) -> bool {
        let fetch = self.client.fetch_catalog(&self.endpoint).await;
        let available = fetch.is_available();
        self.catalog = fetch.into_catalog();
        if self.selected_database_id.is_none() {
            self.selected_database_id = self
                .catalog
                .id_for(&self.default_database)
                .map(str::to_string);
            if self.selected_database_id.is_none() {
                tracing::warn!(alias = %self.default_database, "default database not in catalog");
            }
        }
        available
    }

    /// Select a database by alias from the current catalog. `dispatch`
    /// re-fetches the catalog first.
    pub fn select_database(&mut self, alias: &str) -> Result<&str, ChatError> {
        let id = self
            .catalog
            .id_for(alias)
            .ok_or_else(|| ChatError::UnknownDatabase(alias.to_string()))?
            .to_string();
        tracing::info!(alias, %id, "database selected");
        Ok(self.selected_database_id.insert(id).as_str())
    }

    /// Ask a question and relay the answer increments to `on_chunk` as they
    /// arrive. The exchange is recorded only once the stream has been fully
    /// drained; a failure or a dropped future records nothing. The `&mut self`
    /// borrow keeps a second submission out while one is streaming.
    pub async fn submit<F>(&mut self, question: &str, mut on_chunk: F) -> Result<Reply, ChatError>
    where
        F: FnMut(&str),
    {
        if question.trim().is_empty() {
            return Err(ChatError::EmptyQuestion);
        }
        if !self.is_connected() {
            return Err(ChatError::NotConnected);
        }

        let context = self.conversation.render_context();
        let _awaiting = AwaitingAnswer::enter(&mut self.phase);
        let mut stream = self
            .client
            .stream_answer(
                &self.endpoint,
                self.selected_database_id.as_deref(),
                question,
                &context,
            )
            .await?;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            on_chunk(&chunk);
            if !self.chunk_delay.is_zero() {
                tokio::time::sleep(self.chunk_delay).await;
            }
        }

        // Drained without error: the accumulated text is the whole response.
        let raw = stream.text_so_far().to_owned();
        let final_answer = self.conversation.record_exchange(question, raw.clone());
        if final_answer.is_missing() {
            tracing::warn!("engine response had no final answer marker");
        }
        Ok(Reply { raw, final_answer })
    }

    /// Clear the conversation. Connection, endpoint and selection are untouched.
    pub fn reset(&mut self) {
        self.conversation.reset();
    }

    /// Which database questions will run against.
    pub fn database_notice(&self) -> Notice {
        match (self.selected_database_alias(), self.selected_database_id()) {
            (Some(alias), _) => Notice::warning(format!("Connected to {} database.", alias)),
            (None, Some(id)) => Notice::warning(format!("Connected to database {}.", id)),
            (None, None) => Notice::warning("No database selected."),
        }
    }

    pub async fn dispatch<F>(&mut self, action: Action, on_chunk: F) -> Option<Notice>
    where
        F: FnMut(&str),
    {
        match action {
            Action::SetEndpoint(endpoint) => {
                self.set_endpoint(endpoint);
                Some(Notice::info(format!("Engine endpoint set to {}.", self.endpoint)))
            }
            Action::Connect => {
                if self.connect().await {
                    Some(Notice::success("Connected to engine."))
                } else {
                    Some(Notice::error("Connection failed."))
                }
            }
            Action::SelectDatabase(alias) => {
                if !self.refresh_catalog().await {
                    return Some(Notice::error(CATALOG_UNAVAILABLE_MESSAGE));
                }
                match self.select_database(&alias) {
                    Ok(_) => Some(self.database_notice()),
                    Err(e) => Some(Notice::error(e.to_string())),
                }
            }
            Action::Submit(question) => match self.submit(&question, on_chunk).await {
                Ok(reply) if reply.final_answer.is_missing() => Some(Notice::warning(
                    "The engine response contained no final answer.",
                )),
                Ok(_) => None,
                Err(ChatError::NotConnected) => Some(Notice::error(GATE_MESSAGE)),
                Err(ChatError::Client(e)) => {
                    Some(Notice::error(format!("Connection failed due to {}.", e)))
                }
                Err(e) => Some(Notice::error(e.to_string())),
            },
            Action::Reset => {
                self.reset();
                Some(Notice::info("Chat history cleared."))
            }
        }
    }
}
