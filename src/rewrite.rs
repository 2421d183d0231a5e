use crate::config::GenerationConfig;
use crate::error::TransformError;
use crate::llm::types::GenerationRequest;
use crate::llm::TextGenerator;
use crate::table::CellValue;
use std::sync::Arc;

/// Placeholder written when a row has no description to rewrite.
pub const SENTINEL: &str = "No description provided.";

/// Outcome of rewriting one description.
#[derive(Debug)]
pub enum Rewrite {
    Generated(String),
    /// The service call failed; `text` is the original description.
    Fallback { text: String, error: TransformError },
    Sentinel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteKind {
    Generated,
    Fallback,
    Sentinel,
}

impl Rewrite {
    pub fn text(&self) -> &str {
        match self {
            Rewrite::Generated(t) => t,
            Rewrite::Fallback { text, .. } => text,
            Rewrite::Sentinel => SENTINEL,
        }
    }

    pub fn kind(&self) -> RewriteKind {
        match self {
            Rewrite::Generated(_) => RewriteKind::Generated,
            Rewrite::Fallback { .. } => RewriteKind::Fallback,
            Rewrite::Sentinel => RewriteKind::Sentinel,
        }
    }
}

/// Rewrites single descriptions through a [`TextGenerator`].
pub struct RowTransformer {
    generator: Arc<dyn TextGenerator>,
    system_prompt: String,
    max_tokens: u32,
    temperature: f32,
}

impl RowTransformer {
    pub fn new(generator: Arc<dyn TextGenerator>, config: &GenerationConfig) -> Self {
        Self {
            generator,
            system_prompt: config.system_prompt.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    pub fn prompt(instruction: &str, text: &str) -> String {
        format!("{}: '{}'", instruction, text)
    }

    /// Rewrite one description. Never fails: blank or non-text input yields
    /// the sentinel without calling the service, and a failed call yields the
    /// original text.
    pub async fn transform(&self, value: &CellValue, instruction: &str) -> Rewrite {
        let Some(text) = value.as_text() else {
            return Rewrite::Sentinel;
        };

        let request = GenerationRequest {
            system: self.system_prompt.clone(),
            prompt: Self::prompt(instruction, text),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        match self.generator.generate(&request).await {
            Ok(generated) => Rewrite::Generated(capitalize_first(generated.trim())),
            Err(error) => {
                tracing::warn!(error = %error, "text generation failed, keeping original description");
                Rewrite::Fallback {
                    text: capitalize_first(text),
                    error,
                }
            }
        }
    }
}

/// Upper-case the first character, leaving the rest untouched.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
