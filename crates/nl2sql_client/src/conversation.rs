//! Per-session conversation log.
//!
//! Two parallel sequences are kept: `detailed` holds every turn as it was
//! shown (raw streamed assistant text), `condensed` replaces assistant turns
//! with their extracted final answer and is what the engine sees as context.
//! Both always hold the same user turns in the same order.

use std::fmt;

use crate::answer::FinalAnswer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::User => f.write_str("User"),
            Speaker::Assistant => f.write_str("Assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    detailed: Vec<Turn>,
    condensed: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_user_turn(&mut self, text: impl Into<String>) {
        let turn = Turn::new(Speaker::User, text);
        self.detailed.push(turn.clone());
        self.condensed.push(turn);
    }

    /// Record a raw assistant response; the condensed log gets only its final answer.
    pub fn append_assistant_turn(&mut self, raw_text: impl Into<String>) -> FinalAnswer {
        let raw_text = raw_text.into();
        let answer = FinalAnswer::parse(&raw_text);
        self.condensed
            .push(Turn::new(Speaker::Assistant, answer.as_str()));
        self.detailed.push(Turn::new(Speaker::Assistant, raw_text));
        answer
    }

    /// Record a completed question/answer pair.
    pub fn record_exchange(&mut self, question: &str, raw_answer: String) -> FinalAnswer {
        self.append_user_turn(question);
        self.append_assistant_turn(raw_answer)
    }

    /// The condensed log as `Speaker: text` lines joined with `\n`.
    pub fn render_context(&self) -> String {
        self.condensed
            .iter()
            .map(|turn| format!("{}: {}", turn.speaker, turn.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn reset(&mut self) {
        self.detailed.clear();
        self.condensed.clear();
    }

    pub fn detailed(&self) -> &[Turn] {
        &self.detailed
    }

    pub fn condensed(&self) -> &[Turn] {
        &self.condensed
    }

    pub fn is_empty(&self) -> bool {
        self.detailed.is_empty()
    }
}
