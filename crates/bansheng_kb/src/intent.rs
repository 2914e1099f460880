//! Intent Detector
//!
//! Rule-based classification of one user message into a single topic,
//! so retrieval knows which fact kind to search. No model, no scoring
//! across categories: checks run in a fixed priority order and the first
//! hit wins.
//!
//! Order: emergency > symptom > food > emotional. Acute-danger wording
//! always overrides topic wording ("破水后还能吃螃蟹吗" is an emergency).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use tracing::warn;

// ============================================================================
// Result types
// ============================================================================

/// Topic of a user message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Emergency,
    Symptom,
    Food,
    Emotional,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::Symptom => "symptom",
            Self::Food => "food",
            Self::Emotional => "emotional",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// High when more than one distinct match, else medium
    fn from_matches(count: usize) -> Self {
        if count > 1 {
            Self::High
        } else {
            Self::Medium
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentResult {
    /// `None` when nothing matched
    pub intent: Option<Intent>,
    /// Literal keywords and pattern labels that matched
    pub keywords: Vec<String>,
    pub confidence: Confidence,
}

impl IntentResult {
    fn none() -> Self {
        Self {
            intent: None,
            keywords: Vec::new(),
            confidence: Confidence::Low,
        }
    }

    fn matched(intent: Intent, keywords: Vec<String>, confidence: Confidence) -> Self {
        Self {
            intent: Some(intent),
            keywords,
            confidence,
        }
    }
}

// ============================================================================
// Detector
// ============================================================================

/// Keyword and pattern tables, compiled once
pub struct IntentDetector {
    // Acute danger; always checked first
    emergency_keywords: Vec<&'static str>,
    // Bodily symptoms
    symptom_keywords: Vec<&'static str>,
    // "Can I eat / is it safe" phrasing
    food_keywords: Vec<&'static str>,
    // Same phrasing, looser; (regex, label)
    food_patterns: Vec<(Regex, &'static str)>,
    // Mood and relationship
    emotional_keywords: Vec<&'static str>,
}

const FOOD_PATTERNS: &[(&str, &str)] = &[
    (r"能吃.+吗", "能吃X吗"),
    (r"可以吃.+吗", "可以吃X吗"),
    (r"吃.+安全", "X安全"),
    (r"能喝.+吗", "能喝X吗"),
    (r"孕妇.*吃", "孕妇吃"),
    (r"孕妇.*喝", "孕妇喝"),
];

impl IntentDetector {
    pub fn new() -> Self {
        let food_patterns = FOOD_PATTERNS
            .iter()
            .filter_map(|(pattern, label)| match Regex::new(pattern) {
                Ok(re) => Some((re, *label)),
                Err(e) => {
                    warn!("Invalid food pattern {}: {}", pattern, e);
                    None
                }
            })
            .collect();

        Self {
            emergency_keywords: vec![
                "破水", "大出血", "昏倒", "昏迷", "120", "急救", "抽搐",
                "胎动消失", "剧烈腹痛", "晕厥", "失去意识", "高烧不退",
            ],
            symptom_keywords: vec![
                "疼", "痛", "出血", "发烧", "恶心", "呕吐", "宫缩", "胎动",
                "头晕", "水肿", "便秘", "腹泻", "失眠", "瘙痒",
            ],
            food_keywords: vec![
                "能吃", "可以吃", "安全吗", "能喝", "孕妇吃", "孕妇能吃", "孕妇能喝",
            ],
            food_patterns,
            emotional_keywords: vec![
                "烦躁", "哭", "心情", "情绪", "吵架", "焦虑", "抑郁", "害怕",
                "担心", "压力", "崩溃", "委屈", "生气", "发脾气",
            ],
        }
    }

    /// Classify one message
    pub fn detect(&self, message: &str) -> IntentResult {
        let text = message.trim().to_lowercase();
        if text.is_empty() {
            return IntentResult::none();
        }

        let emergency = matching(&self.emergency_keywords, &text);
        if !emergency.is_empty() {
            return IntentResult::matched(Intent::Emergency, emergency, Confidence::High);
        }

        let symptom = matching(&self.symptom_keywords, &text);
        if !symptom.is_empty() {
            let confidence = Confidence::from_matches(symptom.len());
            return IntentResult::matched(Intent::Symptom, symptom, confidence);
        }

        let mut food = matching(&self.food_keywords, &text);
        for (re, label) in &self.food_patterns {
            if re.is_match(&text) && !food.iter().any(|k| k == label) {
                food.push(label.to_string());
            }
        }
        if !food.is_empty() {
            let confidence = Confidence::from_matches(food.len());
            return IntentResult::matched(Intent::Food, food, confidence);
        }

        let emotional = matching(&self.emotional_keywords, &text);
        if !emotional.is_empty() {
            let confidence = Confidence::from_matches(emotional.len());
            return IntentResult::matched(Intent::Emotional, emotional, confidence);
        }

        IntentResult::none()
    }
}

impl Default for IntentDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn matching(keywords: &[&'static str], text: &str) -> Vec<String> {
    keywords
        .iter()
        .filter(|k| text.contains(*k))
        .map(|k| k.to_string())
        .collect()
}

static SHARED_DETECTOR: LazyLock<IntentDetector> = LazyLock::new(IntentDetector::new);

impl IntentDetector {
    /// Process-wide detector; patterns are compiled on first use
    pub fn shared() -> &'static IntentDetector {
        &SHARED_DETECTOR
    }
}

/// Classify with the shared detector
pub fn detect_intent(message: &str) -> IntentResult {
    IntentDetector::shared().detect(message)
}
