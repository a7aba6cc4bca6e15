//! Command-line client for generative AI models hosted on Google Cloud Vertex AI
//!
//! Routes a prompt to the Gemini, PaLM, Anthropic Claude or Meta Llama model
//! families, building the request shape each family expects and rendering
//! the response as plain text or raw JSON.

pub mod ai;
pub mod app;
pub mod catalog;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod prompt;
pub mod settings;

pub use error::{Error, Result};
