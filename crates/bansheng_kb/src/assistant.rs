//! Knowledge-augmented assistant
//!
//! Wires one chat turn together: intent detection, the intent-specific
//! search, prompt assembly and the call to the language model. The model
//! itself is an opaque collaborator behind `LanguageModel`; no network
//! client lives in this crate.
//!
//! Retrieval problems never fail a turn. The prompt just loses its
//! reference-data section.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::intent::{Intent, IntentDetector, IntentResult};
use crate::pregnancy::PregnancyContext;
use crate::prompt::{build_kb_augmented_prompt, KbPayload};
use crate::search::SearchService;

/// Messages of prior conversation sent along with each turn
pub const HISTORY_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Language model errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("language model is disabled")]
    Disabled,

    #[error("message is empty")]
    EmptyMessage,

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("language model returned empty response")]
    EmptyResponse,

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

/// Chat-completion backend
pub trait LanguageModel: Send + Sync {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
}

/// Backend that always reports disabled
pub struct DisabledModel;

impl LanguageModel for DisabledModel {
    fn complete(&self, _messages: &[ChatMessage]) -> Result<String, LlmError> {
        Err(LlmError::Disabled)
    }
}

/// One answered turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub intent: IntentResult,
    /// System prompt actually sent
    pub prompt: String,
    pub content: String,
}

/// Chat turn orchestration over a search service and a model
pub struct KbAssistant {
    search: SearchService,
    detector: IntentDetector,
    model: Arc<dyn LanguageModel>,
}

impl KbAssistant {
    pub fn new(search: SearchService, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            search,
            detector: IntentDetector::new(),
            model,
        }
    }

    pub fn search(&self) -> &SearchService {
        &self.search
    }

    /// Classify a message and fetch the facts for its intent
    pub async fn retrieve(&self, message: &str) -> (IntentResult, KbPayload) {
        let intent = self.detector.detect(message);
        let mut payload = KbPayload::default();
        let limits = self.search.limits().clone();

        let Some(kind) = intent.intent else {
            return (intent, payload);
        };
        if !self.search.is_available() {
            debug!("Knowledge base unavailable, answering without reference data");
            return (intent, payload);
        }

        for term in search_terms(message, &intent) {
            match kind {
                Intent::Emergency => {
                    payload.emergency = self.search.search_emergency(&term).await;
                }
                Intent::Food => {
                    payload.foods = self
                        .search
                        .search_food(&term, limits.effective_food_limit())
                        .await
                        .items;
                }
                Intent::Symptom => {
                    payload.symptoms = self
                        .search
                        .search_symptom(&term, limits.effective_symptom_limit())
                        .await
                        .items;
                }
                Intent::Emotional => {
                    payload.emotional = self
                        .search
                        .search_emotional(&term, limits.effective_emotional_limit())
                        .await
                        .items;
                }
            }
            if !payload.is_empty() {
                debug!("Retrieved {} facts with {:?}", kind, term);
                break;
            }
        }

        (intent, payload)
    }

    /// Answer one user message
    pub async fn respond(
        &self,
        context: &PregnancyContext,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<AssistantReply, LlmError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(LlmError::EmptyMessage);
        }

        let (intent, payload) = self.retrieve(message).await;
        info!(
            "Chat turn: intent={} facts={}",
            intent.intent.map(|i| i.as_str()).unwrap_or("none"),
            !payload.is_empty()
        );

        let prompt = build_kb_augmented_prompt(context, &payload);
        let messages = build_messages(&prompt, history, message);

        let model = Arc::clone(&self.model);
        let content = tokio::task::spawn_blocking(move || model.complete(&messages))
            .await
            .map_err(|e| LlmError::Unexpected(e.to_string()))??;

        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        Ok(AssistantReply {
            intent,
            prompt,
            content,
        })
    }
}

/// System prompt, the last `HISTORY_WINDOW` prior messages, then the new one
pub fn build_messages(prompt: &str, history: &[ChatMessage], message: &str) -> Vec<ChatMessage> {
    let prior: Vec<&ChatMessage> = history
        .iter()
        .filter(|m| m.role != ChatRole::System)
        .collect();
    let start = prior.len().saturating_sub(HISTORY_WINDOW);

    let mut messages = Vec::with_capacity(HISTORY_WINDOW + 2);
    messages.push(ChatMessage::system(prompt));
    messages.extend(prior[start..].iter().map(|m| (*m).clone()));
    messages.push(ChatMessage::user(message));
    messages
}

const FILLER_CHARS: &[char] = &[
    '吗', '呢', '吧', '啊', '么', '了', '？', '?', '！', '!', '。', '，', ',', '、', '.',
];

/// Queries to try, in order: the whole message, then (except for food,
/// whose keywords are phrasing) the matched keywords, then the fragments
/// left after cutting out keywords and filler.
pub fn search_terms(message: &str, intent: &IntentResult) -> Vec<String> {
    let mut terms = vec![message.trim().to_string()];

    if intent.intent != Some(Intent::Food) {
        terms.extend(intent.keywords.iter().cloned());
    }

    let mut keywords: Vec<&str> = intent.keywords.iter().map(String::as_str).collect();
    keywords.sort_by_key(|k| std::cmp::Reverse(k.chars().count()));
    let mut remainder = message.to_string();
    for keyword in keywords {
        remainder = remainder.replace(keyword, " ");
    }
    terms.extend(
        remainder
            .split(|c: char| c.is_whitespace() || FILLER_CHARS.contains(&c))
            .filter(|f| !f.is_empty())
            .map(str::to_string),
    );

    let mut seen = std::collections::HashSet::new();
    terms.retain(|t| !t.is_empty() && seen.insert(t.clone()));
    terms
}
