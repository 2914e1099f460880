//! Output formatting - terminal rendering of facts and outcomes

use bansheng_kb::{
    Confidence, DecisionOutcome, EmergencyFact, EmotionalFact, FoodFact, InitReport,
    IntentResult, KbStats, SafetyLevel, SymptomFact, Urgency,
};
use owo_colors::OwoColorize;
use serde::Serialize;

pub const SEPARATOR: &str = "────────────────────────────────────────";

/// Pretty JSON to stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn safety_badge(level: SafetyLevel) -> String {
    match level {
        SafetyLevel::Safe => format!("[{}]", level).bright_green().to_string(),
        SafetyLevel::Caution => format!("[{}]", level).yellow().to_string(),
        SafetyLevel::Avoid => format!("[{}]", level).bright_red().to_string(),
    }
}

fn urgency_badge(urgency: Urgency) -> String {
    match urgency {
        Urgency::Normal => format!("[{}]", urgency).bright_green().to_string(),
        Urgency::Monitor => format!("[{}]", urgency).cyan().to_string(),
        Urgency::CallDoctor => format!("[{}]", urgency).yellow().to_string(),
        Urgency::Emergency => format!("[{}]", urgency).bright_red().bold().to_string(),
    }
}

fn print_kv(key: &str, value: &str) {
    if !value.is_empty() {
        println!("  {:<12} {}", key.dimmed(), value);
    }
}

fn print_list(key: &str, values: &[String]) {
    if values.is_empty() {
        return;
    }
    println!("  {}", key.dimmed());
    for value in values {
        println!("    - {}", value);
    }
}

pub fn print_report(report: &InitReport) {
    if report.success {
        println!(
            "{} knowledge base ready (version {})",
            "[OK]".bright_green(),
            report.version
        );
    } else {
        println!("{} knowledge base initialization failed", "[FAIL]".bright_red());
    }
    print_stats(&report.stats);
}

pub fn print_stats(stats: &KbStats) {
    println!("{}", SEPARATOR.dimmed());
    println!("  {:<12} {}", "foods", stats.foods);
    println!("  {:<12} {}", "symptoms", stats.symptoms);
    println!("  {:<12} {}", "emotional", stats.emotional);
    println!("  {:<12} {}", "emergencies", stats.emergencies);
    println!("{}", SEPARATOR.dimmed());
    println!("  {:<12} {}", "total".bold(), stats.total());
}

pub fn print_food(food: &FoodFact) {
    println!("{} {} {}", food.name.bold(), food.name_en.dimmed(), safety_badge(food.safety_level));
    print_kv("category", &food.category);
    print_kv("reason", &food.reason);
    print_kv("dad tip", &food.dad_tip);
    if let Some(notes) = &food.trimester_notes {
        print_kv("trimester", notes);
    }
}

pub fn print_symptom(symptom: &SymptomFact) {
    println!("{} {} ({})", symptom.name.bold(), symptom.name_en.dimmed(), symptom.id);
    println!("  {}", "questions".dimmed());
    for (i, question) in symptom.questions.iter().enumerate() {
        println!("    {}. {}", i + 1, question);
    }
    println!("  {}", "decision paths".dimmed());
    for rule in &symptom.decision_rules {
        println!("    {} {} -> {}", urgency_badge(rule.urgency), rule.condition, rule.action);
    }
    print_list("dad actions", &symptom.dad_actions);
}

pub fn print_emotional(scenario: &EmotionalFact) {
    println!(
        "{} {} ({})",
        scenario.scenario_name.bold(),
        scenario.scenario_name_en.dimmed(),
        scenario.id
    );
    print_kv("trigger", &scenario.trigger);
    print_kv("she feels", &scenario.wife_feeling);
    print_kv("don't say", &scenario.wrong_response);
    print_kv("do", &scenario.right_response);
    print_kv("follow up", &scenario.follow_up_actions);
}

pub fn print_emergency(emergency: &EmergencyFact) {
    println!(
        "{} {} {}",
        "[EMERGENCY]".bright_red().bold(),
        emergency.name.bold(),
        emergency.name_en.dimmed()
    );
    print_list("signs", &emergency.recognition_signs);
    print_list("do now", &emergency.immediate_actions);
    print_list("don't", &emergency.what_not_to_do);
    print_list("call 120 if", &emergency.when_to_call_ambulance);
    print_list("bring", &emergency.hospital_bag_items);
    print_kv("say", &emergency.reassurance_script);
}

pub fn print_intent(result: &IntentResult) {
    let intent = result.intent.map(|i| i.as_str()).unwrap_or("none");
    let confidence = match result.confidence {
        Confidence::High => result.confidence.as_str().bright_green().to_string(),
        Confidence::Medium => result.confidence.as_str().yellow().to_string(),
        Confidence::Low => result.confidence.as_str().dimmed().to_string(),
    };
    println!("  {:<12} {}", "intent", intent.bold());
    println!("  {:<12} {}", "confidence", confidence);
    if !result.keywords.is_empty() {
        println!("  {:<12} {}", "matched", result.keywords.join(", "));
    }
}

pub fn print_outcome(symptom: &SymptomFact, answers: &[bool], outcome: &DecisionOutcome) {
    println!("{}", symptom.name.bold());
    for (i, question) in symptom.questions.iter().enumerate() {
        let answer = match answers.get(i) {
            Some(true) => "yes".bright_green().to_string(),
            _ => "no".dimmed().to_string(),
        };
        println!("  {} {}", answer, question);
    }
    println!("{}", SEPARATOR.dimmed());
    println!("{} {}", urgency_badge(outcome.urgency), outcome.suggestion);
}
