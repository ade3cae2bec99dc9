//! Answer generation: prompt assembly

pub mod prompt;

pub use prompt::PromptBuilder;
