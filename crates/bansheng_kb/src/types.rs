//! Knowledge base entities
//!
//! Four independent fact kinds (food, symptom, emotional, emergency), the
//! decision rules carried by symptom facts, and the search result envelope.
//! Facts are immutable at runtime; only the seeder replaces them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Enumerations
// =============================================================================

/// The four fact kinds held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    Food,
    Symptom,
    Emotional,
    Emergency,
}

impl FactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactKind::Food => "food",
            FactKind::Symptom => "symptom",
            FactKind::Emotional => "emotional",
            FactKind::Emergency => "emergency",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FactKind::Food => "Food Safety",
            FactKind::Symptom => "Symptom Trees",
            FactKind::Emotional => "Emotional Scenarios",
            FactKind::Emergency => "Emergency Procedures",
        }
    }
}

impl fmt::Display for FactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "food" | "foods" => Ok(FactKind::Food),
            "symptom" | "symptoms" => Ok(FactKind::Symptom),
            "emotional" | "emotion" => Ok(FactKind::Emotional),
            "emergency" | "emergencies" => Ok(FactKind::Emergency),
            other => Err(format!("unknown fact kind: {}", other)),
        }
    }
}

/// Food safety classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyLevel {
    Safe,
    Caution,
    Avoid,
}

impl SafetyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyLevel::Safe => "SAFE",
            SafetyLevel::Caution => "CAUTION",
            SafetyLevel::Avoid => "AVOID",
        }
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SafetyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "SAFE" => Ok(SafetyLevel::Safe),
            "CAUTION" => Ok(SafetyLevel::Caution),
            "AVOID" => Ok(SafetyLevel::Avoid),
            other => Err(format!("unknown safety level: {}", other)),
        }
    }
}

/// Severity attached to a decision rule, ordered NORMAL < MONITOR < CALL_DOCTOR < EMERGENCY
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Normal,
    Monitor,
    CallDoctor,
    Emergency,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Normal => "NORMAL",
            Urgency::Monitor => "MONITOR",
            Urgency::CallDoctor => "CALL_DOCTOR",
            Urgency::Emergency => "EMERGENCY",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "NORMAL" => Ok(Urgency::Normal),
            "MONITOR" => Ok(Urgency::Monitor),
            "CALL_DOCTOR" => Ok(Urgency::CallDoctor),
            "EMERGENCY" => Ok(Urgency::Emergency),
            other => Err(format!("unknown urgency: {}", other)),
        }
    }
}

// =============================================================================
// Decision rules
// =============================================================================

/// Structured trigger for a decision rule, evaluated against yes/no answers.
///
/// Indices refer to positions in the symptom's question list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleTrigger {
    /// At least one answer is yes
    AnyYes,
    /// The answer at `index` is yes
    IndexTrue { index: usize },
    /// Any of the answers at `indices` is yes
    AnyIndexTrue { indices: Vec<usize> },
    /// At least `count` answers are yes
    CountTrueGte { count: usize },
    /// Every answer is no (and there is at least one answer)
    AllFalse,
}

impl RuleTrigger {
    pub fn matches(&self, answers: &[bool]) -> bool {
        match self {
            RuleTrigger::AnyYes => answers.iter().any(|a| *a),
            RuleTrigger::IndexTrue { index } => answers.get(*index).copied().unwrap_or(false),
            RuleTrigger::AnyIndexTrue { indices } => indices
                .iter()
                .any(|i| answers.get(*i).copied().unwrap_or(false)),
            RuleTrigger::CountTrueGte { count } => {
                answers.iter().filter(|a| **a).count() >= *count
            }
            RuleTrigger::AllFalse => !answers.is_empty() && answers.iter().all(|a| !*a),
        }
    }
}

/// One branch of a symptom decision tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRule {
    /// Human-authored condition text
    pub condition: String,
    /// What the caregiver should do
    pub action: String,
    pub urgency: Urgency,
    /// Triggers; the rule's own predicate holds when any of them matches
    #[serde(default)]
    pub triggers: Vec<RuleTrigger>,
}

impl DecisionRule {
    pub fn triggered_by(&self, answers: &[bool]) -> bool {
        self.triggers.iter().any(|t| t.matches(answers))
    }
}

// =============================================================================
// Facts
// =============================================================================

/// Food safety fact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodFact {
    pub id: String,
    pub name: String,
    pub name_en: String,
    pub category: String,
    pub safety_level: SafetyLevel,
    pub reason: String,
    /// Short actionable tip for the partner (empty when absent)
    pub dad_tip: String,
    pub trimester_notes: Option<String>,
}

/// Symptom with its clarifying questions and decision rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomFact {
    pub id: String,
    pub name: String,
    pub name_en: String,
    pub questions: Vec<String>,
    pub decision_rules: Vec<DecisionRule>,
    pub dad_actions: Vec<String>,
}

/// Emotional-response script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalFact {
    pub id: String,
    pub scenario_name: String,
    pub scenario_name_en: String,
    pub trigger: String,
    pub wife_feeling: String,
    pub wrong_response: String,
    pub right_response: String,
    pub follow_up_actions: String,
}

/// Emergency procedure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyFact {
    pub id: String,
    pub name: String,
    pub name_en: String,
    pub recognition_signs: Vec<String>,
    pub immediate_actions: Vec<String>,
    pub what_not_to_do: Vec<String>,
    pub when_to_call_ambulance: Vec<String>,
    pub hospital_bag_items: Vec<String>,
    pub reassurance_script: String,
}

// =============================================================================
// Results
// =============================================================================

/// Search result envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbSearchResult<T> {
    pub items: Vec<T>,
    /// The normalized query actually used
    pub query: String,
    pub total_matches: usize,
}

impl<T> KbSearchResult<T> {
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            query: query.into(),
            total_matches: 0,
        }
    }

    pub fn from_items(items: Vec<T>, query: impl Into<String>) -> Self {
        let total_matches = items.len();
        Self {
            items,
            query: query.into(),
            total_matches,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Row counts per fact kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KbStats {
    pub foods: usize,
    pub symptoms: usize,
    pub emotional: usize,
    pub emergencies: usize,
}

impl KbStats {
    pub fn total(&self) -> usize {
        self.foods + self.symptoms + self.emotional + self.emergencies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urgency_ordering() {
        assert!(Urgency::Normal < Urgency::Monitor);
        assert!(Urgency::Monitor < Urgency::CallDoctor);
        assert!(Urgency::CallDoctor < Urgency::Emergency);
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("AVOID".parse::<SafetyLevel>(), Ok(SafetyLevel::Avoid));
        assert!("avoid".parse::<SafetyLevel>().is_err());
        assert_eq!("CALL_DOCTOR".parse::<Urgency>(), Ok(Urgency::CallDoctor));
        assert_eq!("Emergencies".parse::<FactKind>(), Ok(FactKind::Emergency));
    }

    #[test]
    fn test_trigger_matching() {
        let answers = [false, true, false];
        assert!(RuleTrigger::AnyYes.matches(&answers));
        assert!(RuleTrigger::IndexTrue { index: 1 }.matches(&answers));
        assert!(!RuleTrigger::IndexTrue { index: 7 }.matches(&answers));
        assert!(!RuleTrigger::AnyIndexTrue { indices: vec![0, 2] }.matches(&answers));
        assert!(!RuleTrigger::CountTrueGte { count: 2 }.matches(&answers));
        assert!(!RuleTrigger::AllFalse.matches(&answers));
        assert!(RuleTrigger::AllFalse.matches(&[false, false]));
        assert!(!RuleTrigger::AllFalse.matches(&[]));
    }

    #[test]
    fn test_trigger_serde_shape() {
        let json = serde_json::to_string(&RuleTrigger::IndexTrue { index: 1 }).unwrap();
        assert_eq!(json, r#"{"type":"INDEX_TRUE","index":1}"#);

        let parsed: RuleTrigger = serde_json::from_str(r#"{"type":"ANY_YES"}"#).unwrap();
        assert_eq!(parsed, RuleTrigger::AnyYes);
    }

    #[test]
    fn test_search_result_counts_items() {
        let result = KbSearchResult::from_items(vec![1, 2, 3], "q");
        assert_eq!(result.total_matches, 3);
        assert!(KbSearchResult::<u8>::empty("q").is_empty());
    }
}
