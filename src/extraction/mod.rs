//! Summaries and action items: generators, prompts, rules and the two stages.

pub mod action_items;
pub mod candle_t5;
pub mod generator;
pub mod prompt;
pub mod rules;
pub mod summarize;

pub use action_items::ActionItemStage;
pub use generator::{GenerationParams, TextGenerator};
pub use rules::ExtractionRules;
pub use summarize::SummarizationStage;
