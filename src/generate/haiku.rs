// src/generate/haiku.rs
//! Excerpt -> validated 5-7-5 haiku.

use metrics::counter;

use crate::generate::ai_adapter::DynGenerator;
use crate::generate::syllables::count_line;

pub const DEFAULT_MAX_EXCERPT_CHARS: usize = 500;
pub const HAIKU_PATTERN: [usize; 3] = [5, 7, 5];
const HAIKU_MAX_TOKENS: u32 = 60;

/// Why a generated text was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    LineCount(usize),
    Syllables(Vec<usize>),
}

impl std::fmt::Display for ShapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeError::LineCount(n) => write!(f, "expected 3 lines, got {n}"),
            ShapeError::Syllables(counts) => {
                let joined = counts
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join("-");
                write!(f, "expected 5-7-5, got {joined}")
            }
        }
    }
}

/// Check the 5-7-5 shape. Returns the three trimmed lines on success.
pub fn validate_haiku(text: &str) -> Result<Vec<String>, ShapeError> {
    let lines: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if lines.len() != HAIKU_PATTERN.len() {
        return Err(ShapeError::LineCount(lines.len()));
    }
    let counts: Vec<usize> = lines.iter().map(|l| count_line(l)).collect();
    if counts != HAIKU_PATTERN {
        return Err(ShapeError::Syllables(counts));
    }
    Ok(lines)
}

/// Cut to `max_chars` characters and mark the cut with `...`.
pub fn truncate_excerpt(excerpt: &str, max_chars: usize) -> String {
    if excerpt.chars().count() > max_chars {
        let mut out: String = excerpt.chars().take(max_chars).collect();
        out.push_str("...");
        out
    } else {
        excerpt.to_string()
    }
}

pub fn build_prompt(excerpt: &str) -> String {
    format!(
        "Create a deeply evocative and poetic, strict 5-7-5 syllable haiku from this news excerpt.\n\
         Focus on:\n\
         1. Emotional resonance\n\
         2. Vivid imagery or figurative language\n\
         3. Key essence (not just dry facts)\n\
         4. Natural, flowing rhythm\n\
         Return ONLY the haiku with no commentary:\n\
         {excerpt}"
    )
}

#[derive(Clone)]
pub struct HaikuGenerator {
    client: DynGenerator,
    max_excerpt_chars: usize,
}

impl HaikuGenerator {
    pub fn new(client: DynGenerator, max_excerpt_chars: usize) -> Self {
        Self {
            client,
            max_excerpt_chars,
        }
    }

    /// `None` is the normal "nothing usable this time" outcome, not an error.
    pub async fn generate(&self, excerpt: &str) -> Option<String> {
        if excerpt.trim().is_empty() {
            tracing::warn!(target: "haiku", "generate called with empty excerpt");
            return None;
        }

        let prompt = build_prompt(&truncate_excerpt(excerpt, self.max_excerpt_chars));
        let raw = self.client.complete(&prompt, HAIKU_MAX_TOKENS).await?;
        tracing::debug!(target: "haiku", provider = self.client.provider_name(), raw = %raw, "model response");

        match validate_haiku(&raw) {
            Ok(lines) => Some(lines.join("\n")),
            Err(e) => {
                tracing::warn!(target: "haiku", reason = %e, "generated text rejected");
                counter!("haiku_rejected_total").increment(1);
                None
            }
        }
    }
}
