//! Command handlers for banshengctl.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bansheng_kb::pregnancy::{format_week_display, progress_today, trimester_name};
use bansheng_kb::{
    build_kb_augmented_prompt, detect_intent, evaluate, initialize_knowledge_base, DisabledModel,
    EmergencyFact, EmotionalFact, FactKind, FactStore, FoodFact, InitReport, KbAssistant,
    KbConfig, PregnancyContext, SearchService, StoreLocation, SymptomFact,
};
use chrono::{Days, Local};
use owo_colors::OwoColorize;
use tracing::debug;

use crate::output::{self, print_json, SEPARATOR};

/// Days before the due date assumed when `prompt` gets no due date (week 20)
const DEFAULT_DAYS_UNTIL_DUE: u64 = 140;

/// Load config from `--config` or the default location
pub fn load_config(path: Option<&PathBuf>) -> Result<KbConfig> {
    match path {
        Some(path) => KbConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(KbConfig::load()),
    }
}

/// An initialized knowledge base ready for queries
pub struct Session {
    pub report: InitReport,
    pub store: Arc<FactStore>,
    pub search: SearchService,
}

impl Session {
    pub async fn open(config: &KbConfig, db: Option<PathBuf>) -> Result<Self> {
        let location = match db.or_else(|| config.store.path.clone()) {
            Some(path) => StoreLocation::Custom(path),
            None => StoreLocation::Default,
        };
        let (store, report) = initialize_knowledge_base(location, config).await;
        let Some(store) = store else {
            bail!("Knowledge base could not be opened");
        };
        debug!("Knowledge base at {:?}", store.location().path());

        let search = SearchService::new(Arc::clone(&store)).with_limits(config.search.clone());
        Ok(Self {
            report,
            store,
            search,
        })
    }
}

pub async fn handle_init(session: &Session, json: bool) -> Result<()> {
    if json {
        return print_json(&session.report);
    }
    output::print_report(&session.report);
    if !session.report.success {
        bail!("Knowledge base initialization failed");
    }
    Ok(())
}

/// Live row counts; a failed reseed leaves the previous release in place
pub async fn handle_stats(session: &Session, json: bool) -> Result<()> {
    let stats = session
        .store
        .stats()
        .await
        .context("Failed to count knowledge base rows")?;
    if json {
        return print_json(&stats);
    }
    output::print_stats(&stats);
    Ok(())
}

pub async fn handle_search(
    session: &Session,
    kind: FactKind,
    query: &str,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let limits = session.search.limits();
    let search = &session.search;

    match kind {
        FactKind::Food => {
            let limit = limit.unwrap_or_else(|| limits.effective_food_limit());
            let result = search.search::<FoodFact>(query, limit).await;
            if json {
                return print_json(&result);
            }
            print_results(kind, &result.items, output::print_food);
        }
        FactKind::Symptom => {
            let limit = limit.unwrap_or_else(|| limits.effective_symptom_limit());
            let result = search.search::<SymptomFact>(query, limit).await;
            if json {
                return print_json(&result);
            }
            print_results(kind, &result.items, output::print_symptom);
        }
        FactKind::Emotional => {
            let limit = limit.unwrap_or_else(|| limits.effective_emotional_limit());
            let result = search.search::<EmotionalFact>(query, limit).await;
            if json {
                return print_json(&result);
            }
            print_results(kind, &result.items, output::print_emotional);
        }
        FactKind::Emergency => {
            let limit = limit.unwrap_or_else(|| limits.effective_emergency_limit());
            let result = search.search::<EmergencyFact>(query, limit).await;
            if json {
                return print_json(&result);
            }
            print_results(kind, &result.items, output::print_emergency);
        }
    }
    Ok(())
}

fn print_results<T>(kind: FactKind, items: &[T], print: fn(&T)) {
    if items.is_empty() {
        println!("{} no {} matches", "[--]".dimmed(), kind);
        return;
    }
    println!("{} ({})", kind.display_name().bold(), items.len());
    for item in items {
        println!("{}", SEPARATOR.dimmed());
        print(item);
    }
}

pub async fn handle_food(session: &Session, name: &str, json: bool) -> Result<()> {
    let Some(food) = session.search.food_by_name(name).await else {
        bail!("No food named '{}'", name);
    };
    if json {
        return print_json(&food);
    }
    output::print_food(&food);
    Ok(())
}

pub async fn handle_category(session: &Session, name: &str, json: bool) -> Result<()> {
    let foods = session.search.foods_by_category(name).await;
    if json {
        return print_json(&foods);
    }
    if foods.is_empty() {
        println!("{} no foods in category '{}'", "[--]".dimmed(), name);
        return Ok(());
    }
    for food in &foods {
        println!("{}", SEPARATOR.dimmed());
        output::print_food(food);
    }
    Ok(())
}

pub fn handle_intent(text: &str, json: bool) -> Result<()> {
    let result = detect_intent(text);
    if json {
        return print_json(&result);
    }
    output::print_intent(&result);
    Ok(())
}

pub async fn handle_evaluate(
    session: &Session,
    symptom_id: &str,
    answers: &[bool],
    json: bool,
) -> Result<()> {
    let Some(symptom) = session.search.symptom_by_id(symptom_id).await else {
        bail!("No symptom with id '{}'", symptom_id);
    };
    if answers.len() != symptom.questions.len() {
        debug!(
            "{} answers for {} questions; missing answers count as no",
            answers.len(),
            symptom.questions.len()
        );
    }

    let outcome = evaluate(&symptom, answers);
    if json {
        return print_json(&outcome);
    }
    output::print_outcome(&symptom, answers, &outcome);
    Ok(())
}

pub async fn handle_prompt(
    session: Session,
    message: &str,
    due_date: Option<chrono::NaiveDate>,
    warning_signs: Vec<String>,
) -> Result<()> {
    let today = Local::now().date_naive();
    let due_date = due_date
        .or_else(|| today.checked_add_days(Days::new(DEFAULT_DAYS_UNTIL_DUE)))
        .unwrap_or(today);

    let progress = progress_today(due_date);
    let context = PregnancyContext::from_progress(&progress).with_warning_signs(warning_signs);

    let assistant = KbAssistant::new(session.search, Arc::new(DisabledModel));
    let (intent, payload) = assistant.retrieve(message).await;

    println!(
        "{} {} ({})",
        "week".dimmed(),
        format_week_display(progress.current_week, progress.current_day),
        trimester_name(progress.trimester)
    );
    output::print_intent(&intent);
    println!("{}", SEPARATOR.dimmed());
    println!("{}", build_kb_augmented_prompt(&context, &payload));
    Ok(())
}

pub fn handle_config(config: &KbConfig) -> Result<()> {
    print!("{}", config.to_toml());
    Ok(())
}
