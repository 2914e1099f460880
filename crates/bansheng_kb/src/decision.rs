//! Decision Path Evaluator
//!
//! Picks exactly one decision rule for a completed yes/no questionnaire.
//! Rules carry typed `RuleTrigger`s; the evaluator never looks at the
//! condition prose. Content that predates explicit triggers gets them
//! derived once, at seed time, by `derive_triggers`.
//!
//! Tiers, in order:
//! 1. EMERGENCY rules: own trigger matches, or at least two answers are yes
//! 2. CALL_DOCTOR rules: own trigger matches, or any answer is yes
//! 3. All answers no: first MONITOR rule, else first NORMAL rule
//! 4. Otherwise the last rule in the list

use serde::{Deserialize, Serialize};

use crate::types::{DecisionRule, RuleTrigger, SymptomFact, Urgency};

/// Suggestion reported when a symptom has no rules at all
pub const DEFAULT_SUGGESTION: &str = "观察情况";

/// Result of one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    /// Selected rule; `None` only when the symptom has no rules
    pub rule: Option<DecisionRule>,
    pub urgency: Urgency,
    /// Action text of the selected rule
    pub suggestion: String,
}

impl DecisionOutcome {
    fn from_rule(rule: &DecisionRule) -> Self {
        Self {
            rule: Some(rule.clone()),
            urgency: rule.urgency,
            suggestion: rule.action.clone(),
        }
    }

    fn observe() -> Self {
        Self {
            rule: None,
            urgency: Urgency::Normal,
            suggestion: DEFAULT_SUGGESTION.to_string(),
        }
    }
}

/// Evaluate a symptom's rules against the caller's answers
pub fn evaluate(symptom: &SymptomFact, answers: &[bool]) -> DecisionOutcome {
    let answers = normalize_answers(answers, symptom.questions.len());
    evaluate_rules(&symptom.decision_rules, &answers)
}

/// Pad missing answers with `false` and drop extras.
///
/// With no questions the answers are taken as given.
pub fn normalize_answers(answers: &[bool], question_count: usize) -> Vec<bool> {
    if question_count == 0 {
        return answers.to_vec();
    }
    (0..question_count)
        .map(|i| answers.get(i).copied().unwrap_or(false))
        .collect()
}

/// Tiered evaluation over already-normalized answers
pub fn evaluate_rules(rules: &[DecisionRule], answers: &[bool]) -> DecisionOutcome {
    let Some(last) = rules.last() else {
        return DecisionOutcome::observe();
    };

    let yes_count = answers.iter().filter(|a| **a).count();
    let any_yes = yes_count > 0;
    let all_no = !answers.is_empty() && !any_yes;

    if let Some(rule) = rules
        .iter()
        .filter(|r| r.urgency == Urgency::Emergency)
        .find(|r| r.triggered_by(answers) || yes_count >= 2)
    {
        return DecisionOutcome::from_rule(rule);
    }

    if let Some(rule) = rules
        .iter()
        .filter(|r| r.urgency == Urgency::CallDoctor)
        .find(|r| r.triggered_by(answers) || any_yes)
    {
        return DecisionOutcome::from_rule(rule);
    }

    if all_no {
        let preferred = rules
            .iter()
            .find(|r| r.urgency == Urgency::Monitor)
            .or_else(|| rules.iter().find(|r| r.urgency == Urgency::Normal));
        if let Some(rule) = preferred {
            return DecisionOutcome::from_rule(rule);
        }
    }

    DecisionOutcome::from_rule(last)
}

/// Derive triggers from legacy condition wording.
///
/// Positional markers refer to the symptom's question order: the cord/visual
/// question is second, colour and gestational-age questions are first and
/// third, and the CALL_DOCTOR "under 37 weeks" flag is the fourth question
/// (third when only three exist).
pub fn derive_triggers(condition: &str, urgency: Urgency, question_count: usize) -> Vec<RuleTrigger> {
    let cond = condition.to_lowercase();
    let mut triggers = Vec::new();

    match urgency {
        Urgency::Emergency => {
            if cond.contains("任一为是") || cond.contains("any yes") {
                triggers.push(RuleTrigger::AnyYes);
            }
            if cond.contains("看到") || cond.contains("脐带") {
                triggers.push(RuleTrigger::IndexTrue { index: 1 });
            }
            if cond.contains("绿色") || cond.contains("棕色") || cond.contains("不足37周") {
                triggers.push(RuleTrigger::AnyIndexTrue {
                    indices: vec![0, 2],
                });
            }
        }
        Urgency::CallDoctor => {
            if cond.contains("不足37周") && question_count > 2 {
                let index = if question_count > 3 { 3 } else { 2 };
                triggers.push(RuleTrigger::IndexTrue { index });
            }
        }
        Urgency::Monitor | Urgency::Normal => {}
    }

    triggers
}
