//! Conversation collaborator: opaque text generation for apostle chat.
//!
//! The progression core never depends on this; it exists behind a trait so
//! a real model client can be swapped in without touching the engines.

use crate::types::Apostle;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A chat message in an apostle conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Apostle,
}

/// Text generation collaborator: given an apostle and message history,
/// produce the apostle's reply.
#[async_trait]
pub trait Conversation: Send + Sync {
    async fn reply(&self, apostle: &Apostle, history: &[Message], message: &str) -> Result<String>;
}

/// Deterministic fallback implementation. Answers in the apostle's configured
/// tone without calling any model; used in tests and as the default wiring.
pub struct ScriptedConversation;

#[async_trait]
impl Conversation for ScriptedConversation {
    async fn reply(&self, apostle: &Apostle, history: &[Message], message: &str) -> Result<String> {
        let tone = apostle.tone.as_deref().unwrap_or("encouraging");
        Ok(format!(
            "[{} | {}] You said: \"{}\". ({} earlier messages)",
            apostle.name,
            tone,
            message.trim(),
            history.len()
        ))
    }
}
