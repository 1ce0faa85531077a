//! Streaming chat client for a natural-language-to-SQL engine
//! (config, HTTP protocol, answer streaming, conversation state, session).
//! Used by the `nl2sql-chat` terminal frontend.

pub mod answer;
pub mod catalog;
pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod messages;
pub mod session;
pub mod stream;

pub use answer::{extract_final_answer, FinalAnswer, FINAL_ANSWER_MARKER};
pub use catalog::{CatalogFetch, DatabaseCatalog, DatabaseConnection};
pub use client::{EngineClient, HealthStatus};
pub use config::{default_config_path, Config, EngineOptions, EngineSection, StreamSection};
pub use conversation::{Conversation, Speaker, Turn};
pub use error::{ChatError, ClientError, ConfigError};
pub use session::{Action, ConnectionState, Notice, NoticeLevel, Phase, Reply, Session};
pub use stream::{AnswerStream, Utf8ChunkDecoder};
