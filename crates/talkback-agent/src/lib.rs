//! Talkback agent crate - the chat agent collaborator contract.
//!
//! The session coordinator hands each final transcript to a `ChatAgent` and
//! speaks whatever comes back. The contract is deliberately trivial: text in,
//! reply out, no failure mode. Agents that can fail internally must map the
//! failure to a fallback message themselves; the coordinator has no
//! domain-specific recovery for a missing reply.

pub mod rules;
pub mod scripted;

use async_trait::async_trait;

pub use rules::RuleAgent;
pub use scripted::ScriptedAgent;

/// Apology used when an agent, despite its contract, produces nothing usable.
pub const FALLBACK_REPLY: &str =
    "Sorry, I couldn't come up with a response to that. Could you try rephrasing?";

/// A reply from the chat agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReply {
    pub message: String,
}

impl AgentReply {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Maps user input text to a reply.
///
/// Implementations never fail: on any internal miss they return a fallback
/// message instead. They may consult local rule tables or remote services;
/// the coordinator does not care which.
#[async_trait]
pub trait ChatAgent: Send + Sync {
    async fn generate_response(&self, input: &str) -> AgentReply;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_new() {
        let reply = AgentReply::new("hello back");
        assert_eq!(reply.message, "hello back");
    }

    #[test]
    fn test_fallback_reply_is_speakable() {
        assert!(!FALLBACK_REPLY.trim().is_empty());
    }
}
