//! Configuration module for Peon.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnswerPrompts, Prompts};
pub use settings::{
    ChatSettings, CompletionSettings, EmbeddingSettings, GeneralSettings, HistorySettings,
    IdentitySettings, KnowledgeBaseSettings, PresentationSettings, PromptSettings, Settings,
    StoreProvider,
};
