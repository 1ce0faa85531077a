//! HTTP payloads exchanged with the engine, and the prompt template.

use serde::Serialize;

pub const HEARTBEAT_PATH: &str = "/api/v1/heartbeat";
pub const DATABASE_CONNECTIONS_PATH: &str = "/api/v1/database-connections";
pub const STREAM_SQL_GENERATION_PATH: &str = "/api/v1/stream-sql-generation";

/// Line prefixed to the prompt when there is conversation history.
pub const HISTORY_INSTRUCTION: &str = "Please consider the following conversation history to provide a detailed and relevant answer to the user's question:";

/// Join `base` and an API path without doubling the slash.
pub fn api_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Full prompt text for a question, with the rendered history when non-empty.
pub fn build_prompt(question: &str, context: &str) -> String {
    if context.is_empty() {
        format!("User: {}\nAssistant:", question)
    } else {
        format!(
            "{}\n\n{}\n\nUser: {}\nAssistant:",
            HISTORY_INSTRUCTION, context, question
        )
    }
}

/// Client → engine: body of `POST /api/v1/stream-sql-generation`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest<'a> {
    pub llm_config: LlmConfig<'a>,
    pub prompt: PromptPayload<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LlmConfig<'a> {
    pub llm_name: &'a str,
}

/// `db_connection_id` is sent as `null` when no database is selected.
#[derive(Debug, Clone, Serialize)]
pub struct PromptPayload<'a> {
    pub text: String,
    pub db_connection_id: Option<&'a str>,
}

impl<'a> GenerationRequest<'a> {
    pub fn new(llm_name: &'a str, text: String, db_connection_id: Option<&'a str>) -> Self {
        Self {
            llm_config: LlmConfig { llm_name },
            prompt: PromptPayload {
                text,
                db_connection_id,
            },
        }
    }
}
