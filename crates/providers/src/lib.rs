//! LLM Provider implementations for FitCoach.
//!
//! All providers implement the `fitcoach_core::Provider` trait. Every
//! supported backend speaks the OpenAI chat-completions protocol, so one
//! implementation covers Groq, OpenAI, OpenRouter, and Ollama.

pub mod factory;
pub mod openai_compat;

pub use factory::{build_provider, default_base_url};
pub use openai_compat::OpenAiCompatProvider;
