//! LLM backends for direct mode.

pub mod gemini;

pub use gemini::{FunctionDeclaration, FunctionExecutor, GeminiClient};
