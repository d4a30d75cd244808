//! Deterministic agent stub for tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::{AgentReply, ChatAgent, FALLBACK_REPLY};

/// A chat agent with pre-scripted replies.
///
/// Looks up the trimmed, lowercased input in a reply table and falls back to
/// a fixed default. An optional artificial delay models agent latency so
/// coordinator tests can observe the Processing phase.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAgent {
    replies: HashMap<String, String>,
    default_reply: Option<String>,
    delay: Duration,
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// An agent answering every input with the same reply.
    pub fn always(reply: &str) -> Self {
        Self {
            default_reply: Some(reply.to_string()),
            ..Self::default()
        }
    }

    /// An agent that violates its contract by replying with empty text.
    /// Exists so the coordinator's defense can be exercised.
    pub fn broken() -> Self {
        Self::always("")
    }

    /// Add a reply for a specific input.
    pub fn with_reply(mut self, input: &str, reply: &str) -> Self {
        self.replies
            .insert(input.trim().to_lowercase(), reply.to_string());
        self
    }

    /// Add an artificial response delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl ChatAgent for ScriptedAgent {
    async fn generate_response(&self, input: &str) -> AgentReply {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let key = input.trim().to_lowercase();
        let message = self
            .replies
            .get(&key)
            .or(self.default_reply.as_ref())
            .cloned()
            .unwrap_or_else(|| FALLBACK_REPLY.to_string());
        AgentReply::new(message)
    }
}
