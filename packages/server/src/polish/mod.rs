mod openai;

use std::time::Duration;

use async_trait::async_trait;

pub use openai::OpenAiPolisher;

/// Instruction sent ahead of every entry.
pub const POLISH_PROMPT: &str = "You edit personal journal entries. \
Rewrite the entry you are given as clear, warm first-person prose. \
Keep every fact, name and feeling the author wrote and never invent events. \
Answer with an HTML fragment only, using <p>, <em> and <strong> elements, \
without <html> or <body> wrappers and without commentary.";

#[derive(Debug, thiserror::Error)]
pub enum PolishError {
    #[error("polish request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("polish request failed: {0}")]
    Request(String),
    #[error("polish service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to parse polish response: {0}")]
    Parse(String),
    #[error("polish service returned no content")]
    EmptyResponse,
}

/// Text-polishing service: raw entry text in, formatted markup out.
///
/// Implementations make a single attempt; no retries, no streaming.
#[async_trait]
pub trait Polisher: Send + Sync {
    async fn polish(&self, raw_text: &str) -> Result<String, PolishError>;
}

/// Strip a Markdown code fence the model sometimes wraps markup in.
///
/// Returns `None` when nothing but whitespace remains.
pub fn clean_markup(content: &str) -> Option<String> {
    let mut text = content.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let rest = rest.strip_prefix("html").unwrap_or(rest);
        text = rest.strip_suffix("```").unwrap_or(rest).trim();
    }
    (!text.is_empty()).then(|| text.to_string())
}
