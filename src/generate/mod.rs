// src/generate/mod.rs
//! Haiku generation: the text-generation collaborator, syllable checks, and call pacing.

pub mod ai_adapter;
pub mod haiku;
pub mod rate_limit;
pub mod syllables;

pub use ai_adapter::{DynGenerator, MockProvider, OpenAiProvider, TextGenerator};
pub use haiku::{validate_haiku, HaikuGenerator, ShapeError};
pub use rate_limit::RateLimiter;
