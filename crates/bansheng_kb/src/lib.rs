//! Bansheng KB - knowledge-base retrieval for the expectant-father assistant
//!
//! Curated facts (food safety, symptom decision trees, emotional scripts,
//! emergency procedures) in an FTS5-indexed SQLite store, with intent
//! detection, decision-tree evaluation and prompt assembly on top.

pub mod assistant;
pub mod config;
pub mod decision;
pub mod error;
pub mod facts;
pub mod intent;
pub mod pregnancy;
pub mod prompt;
pub mod search;
pub mod seed;
pub mod store;
pub mod types;

pub use assistant::{
    AssistantReply, ChatMessage, ChatRole, DisabledModel, KbAssistant, LanguageModel, LlmError,
};
pub use config::KbConfig;
pub use decision::{evaluate, DecisionOutcome};
pub use error::{KbError, Result};
pub use intent::{detect_intent, Confidence, Intent, IntentDetector, IntentResult};
pub use pregnancy::{calculate_progress, PregnancyContext, PregnancyProgress};
pub use prompt::{build_kb_augmented_prompt, build_system_prompt, KbPayload};
pub use search::SearchService;
pub use seed::{initialize_knowledge_base, FactBundle, InitReport, SeedOutcome, Seeder, KB_VERSION};
pub use store::{FactStore, StoreLocation};
pub use types::*;
