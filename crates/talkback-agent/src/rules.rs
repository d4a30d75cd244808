//! Rule-based chat agent.
//!
//! Categorizes input with a compiled-once regex table and answers from local
//! knowledge: clock time and date, small arithmetic, and a handful of canned
//! conversational replies. Anything unmatched falls through to a generic
//! response, so `generate_response` always produces something speakable.

use async_trait::async_trait;
use chrono::Local;
use regex::Regex;
use tracing::debug;

use crate::{AgentReply, ChatAgent};

const GREETINGS: [&str; 3] = [
    "Hello! I'm your voice assistant. How can I help you today?",
    "Hi there! What would you like to talk about?",
    "Hey! I'm here and ready to chat. What's on your mind?",
];

/// A chat agent backed by local rule tables. Cheap to query, fully offline.
pub struct RuleAgent {
    math_symbol: Regex,
    math_words: Vec<(Regex, MathOp)>,
    greeting: Regex,
    identity: Regex,
    capability: Regex,
    question: Regex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl MathOp {
    fn apply(self, a: f64, b: f64) -> Option<f64> {
        match self {
            MathOp::Add => Some(a + b),
            MathOp::Subtract => Some(a - b),
            MathOp::Multiply => Some(a * b),
            MathOp::Divide => (b != 0.0).then(|| a / b),
        }
    }

    fn word(self) -> &'static str {
        match self {
            MathOp::Add => "plus",
            MathOp::Subtract => "minus",
            MathOp::Multiply => "times",
            MathOp::Divide => "divided by",
        }
    }

    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(MathOp::Add),
            "-" => Some(MathOp::Subtract),
            "*" | "x" | "×" => Some(MathOp::Multiply),
            "/" | "÷" => Some(MathOp::Divide),
            _ => None,
        }
    }
}

impl Default for RuleAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleAgent {
    /// Create a new agent with all patterns compiled.
    pub fn new() -> Self {
        let number = r"(\d+(?:\.\d+)?)";
        let word_ops: [(&str, MathOp); 4] = [
            (r"(?:plus|add)", MathOp::Add),
            (r"(?:minus|subtract)", MathOp::Subtract),
            (r"(?:times|multiplied\s+by|multiply)", MathOp::Multiply),
            (r"(?:divided\s+by|divide)", MathOp::Divide),
        ];

        Self {
            math_symbol: Regex::new(&format!(r"(?i){number}\s*([-+*/x×÷])\s*{number}"))
                .expect("Invalid math symbol regex"),
            math_words: word_ops
                .iter()
                .map(|(pat, op)| {
                    (
                        Regex::new(&format!(r"(?i){number}\s*{pat}\s*{number}"))
                            .expect("Invalid math word regex"),
                        *op,
                    )
                })
                .collect(),
            greeting: Regex::new(r"(?i)\b(hello|hi|hey|good morning|good afternoon)\b")
                .expect("Invalid greeting regex"),
            identity: Regex::new(r"(?i)\b(your name|who are you|what are you)\b")
                .expect("Invalid identity regex"),
            capability: Regex::new(r"(?i)\b(can you|what can|help)\b")
                .expect("Invalid capability regex"),
            question: Regex::new(r"(?i)\b(what|how|why|when|where|who)\b")
                .expect("Invalid question regex"),
        }
    }

    fn time_or_date(&self, input: &str) -> Option<String> {
        let lower = input.to_lowercase();
        if lower.contains("time") {
            let time = Local::now().format("%-I:%M %p");
            return Some(format!("It's currently {}.", time));
        }
        if lower.contains("date") || lower.contains("today") || lower.contains("day") {
            let date = Local::now().format("%A, %B %-d, %Y");
            return Some(format!("Today is {}.", date));
        }
        None
    }

    fn evaluate_math(&self, input: &str) -> Option<String> {
        let (a, op, b) = if let Some(caps) = self.math_symbol.captures(input) {
            let op = MathOp::from_symbol(&caps[2].to_lowercase())?;
            (caps[1].parse::<f64>().ok()?, op, caps[3].parse::<f64>().ok()?)
        } else {
            let (caps, op) = self
                .math_words
                .iter()
                .find_map(|(re, op)| re.captures(input).map(|c| (c, *op)))?;
            (caps[1].parse::<f64>().ok()?, op, caps[2].parse::<f64>().ok()?)
        };

        let result = op.apply(a, b)?;
        Some(format!("{} {} {} equals {}", a, op.word(), b, result))
    }
}

#[async_trait]
impl ChatAgent for RuleAgent {
    async fn generate_response(&self, input: &str) -> AgentReply {
        if let Some(answer) = self.time_or_date(input) {
            debug!(category = "time_date", "Rule matched");
            return AgentReply::new(answer);
        }

        if let Some(answer) = self.evaluate_math(input) {
            debug!(category = "math", "Rule matched");
            return AgentReply::new(answer);
        }

        if self.greeting.is_match(input) {
            debug!(category = "greeting", "Rule matched");
            return AgentReply::new(GREETINGS[input.len() % GREETINGS.len()]);
        }

        if self.identity.is_match(input) {
            debug!(category = "identity", "Rule matched");
            return AgentReply::new(
                "I'm your voice assistant! I'm here to answer questions and chat with you.",
            );
        }

        if self.capability.is_match(input) {
            debug!(category = "capability", "Rule matched");
            return AgentReply::new(
                "I can do quick math, tell you the time and date, and chat about whatever \
                 is on your mind.",
            );
        }

        if self.question.is_match(input) || input.contains('?') {
            debug!(category = "question", "Rule matched");
            return AgentReply::new(format!(
                "That's a good question about \"{}\". I don't have specifics on that, but \
                 I'm happy to help with something else!",
                input.trim()
            ));
        }

        debug!(category = "fallback", "No rule matched");
        AgentReply::new(format!(
            "I heard you say \"{}\". What would you like to know more about?",
            input.trim()
        ))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_time_question() {
        let agent = RuleAgent::new();
        let reply = agent.generate_response("what time is it").await;
        assert!(reply.message.starts_with("It's currently"));
    }

    #[tokio::test]
    async fn test_date_question() {
        let agent = RuleAgent::new();
        let reply = agent.generate_response("what's the date today").await;
        assert!(reply.message.starts_with("Today is"));
    }

    #[tokio::test]
    async fn test_math_words() {
        let agent = RuleAgent::new();
        let reply = agent.generate_response("what is 3 plus 4").await;
        assert_eq!(reply.message, "3 plus 4 equals 7");
    }

    #[tokio::test]
    async fn test_math_symbols() {
        let agent = RuleAgent::new();
        let reply = agent.generate_response("calculate 12 * 3").await;
        assert_eq!(reply.message, "12 times 3 equals 36");
    }

    #[tokio::test]
    async fn test_math_division() {
        let agent = RuleAgent::new();
        let reply = agent.generate_response("100 divided by 4").await;
        assert_eq!(reply.message, "100 divided by 4 equals 25");
    }

    #[tokio::test]
    async fn test_math_decimal() {
        let agent = RuleAgent::new();
        let reply = agent.generate_response("2.5 plus 1.5").await;
        assert_eq!(reply.message, "2.5 plus 1.5 equals 4");
    }

    #[tokio::test]
    async fn test_division_by_zero_falls_through() {
        let agent = RuleAgent::new();
        let reply = agent.generate_response("10 divided by 0").await;
        assert!(!reply.message.contains("equals"));
    }

    #[tokio::test]
    async fn test_greeting() {
        let agent = RuleAgent::new();
        let reply = agent.generate_response("hello there").await;
        assert!(GREETINGS.contains(&reply.message.as_str()));
    }

    #[tokio::test]
    async fn test_greeting_is_deterministic() {
        let agent = RuleAgent::new();
        let first = agent.generate_response("hey").await;
        let second = agent.generate_response("hey").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_identity() {
        let agent = RuleAgent::new();
        let reply = agent.generate_response("who are you").await;
        assert!(reply.message.contains("voice assistant"));
    }

    #[tokio::test]
    async fn test_capability() {
        let agent = RuleAgent::new();
        let reply = agent.generate_response("can you help me").await;
        assert!(reply.message.contains("math"));
    }

    #[tokio::test]
    async fn test_question_fallback_echoes_input() {
        let agent = RuleAgent::new();
        let reply = agent.generate_response("why is the sky blue").await;
        assert!(reply.message.contains("why is the sky blue"));
    }

    #[tokio::test]
    async fn test_default_fallback_never_empty() {
        let agent = RuleAgent::new();
        let reply = agent.generate_response("mumble grumble").await;
        assert!(!reply.message.trim().is_empty());
        assert!(reply.message.contains("mumble grumble"));
    }
}
