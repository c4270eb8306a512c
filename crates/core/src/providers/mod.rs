pub mod traits;

// Advisory provider implementations
pub mod gemini;
pub mod prompts;
