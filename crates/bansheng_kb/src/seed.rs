//! Seeder - versioned bulk loading of the knowledge base
//!
//! A content release is four JSON arrays (foods, symptoms, emotional,
//! emergencies). Each record is validated on its own; a bad record is
//! logged and skipped, and the rest of the batch is still loaded.
//!
//! Seeding runs only when the stored version tag differs from the release
//! version. Kinds are replaced one at a time, each in its own transaction.
//! The version tag is written last, so a failed seed retries in full on the
//! next start.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::KbConfig;
use crate::decision::derive_triggers;
use crate::error::{KbError, Result};
use crate::facts::KbFact;
use crate::store::{FactStore, StoreLocation};
use crate::types::{
    DecisionRule, EmergencyFact, EmotionalFact, FactKind, FoodFact, KbStats, RuleTrigger,
    SafetyLevel, SymptomFact, Urgency,
};

/// Content version of the bundled release; bump to force a reseed
pub const KB_VERSION: &str = "1.1.0";

const BUNDLED_FOODS: &str = include_str!("../data/foods.json");
const BUNDLED_SYMPTOMS: &str = include_str!("../data/symptoms.json");
const BUNDLED_EMOTIONAL: &str = include_str!("../data/emotional.json");
const BUNDLED_EMERGENCIES: &str = include_str!("../data/emergencies.json");

pub const FOODS_FILE: &str = "foods.json";
pub const SYMPTOMS_FILE: &str = "symptoms.json";
pub const EMOTIONAL_FILE: &str = "emotional.json";
pub const EMERGENCIES_FILE: &str = "emergencies.json";

// =============================================================================
// Seed records (external field names)
// =============================================================================

#[derive(Debug, Deserialize)]
struct FoodRecord {
    name: String,
    #[serde(default)]
    name_en: String,
    #[serde(default)]
    category: String,
    safety_level: SafetyLevel,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    dad_tip: Option<String>,
    #[serde(default)]
    trimester_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RuleRecord {
    condition: String,
    action: String,
    urgency: Urgency,
    #[serde(default)]
    triggers: Option<Vec<RuleTrigger>>,
}

#[derive(Debug, Deserialize)]
struct SymptomRecord {
    id: String,
    symptom_name: String,
    #[serde(default)]
    symptom_name_en: String,
    #[serde(default)]
    questions: Vec<String>,
    #[serde(default)]
    decision_paths: Vec<serde_json::Value>,
    #[serde(default)]
    dad_actions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmotionalRecord {
    id: String,
    scenario_name: String,
    #[serde(default)]
    scenario_name_en: String,
    trigger: String,
    #[serde(default)]
    wife_feeling: String,
    #[serde(default)]
    wrong_response: String,
    right_response: String,
    #[serde(default)]
    follow_up_actions: String,
}

#[derive(Debug, Deserialize)]
struct EmergencyRecord {
    id: String,
    emergency_name: String,
    #[serde(default)]
    emergency_name_en: String,
    recognition_signs: Vec<String>,
    immediate_actions: Vec<String>,
    #[serde(default)]
    what_not_to_do: Vec<String>,
    #[serde(default)]
    when_to_call_ambulance: Vec<String>,
    #[serde(default)]
    hospital_bag_items: Vec<String>,
    #[serde(default)]
    reassurance_script: String,
}

/// Stable food identity derived from its name.
///
/// Anything other than ASCII letters, digits and CJK ideographs becomes `_`.
pub fn food_id(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || ('\u{4e00}'..='\u{9fa5}').contains(&c) {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("food_{}", slug)
}

fn invalid(kind: FactKind, reason: impl Into<String>) -> KbError {
    KbError::InvalidRecord {
        kind,
        reason: reason.into(),
    }
}

fn require(kind: FactKind, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(invalid(kind, format!("blank {}", field)))
    } else {
        Ok(())
    }
}

impl FoodRecord {
    fn into_fact(self) -> Result<FoodFact> {
        require(FactKind::Food, "name", &self.name)?;
        Ok(FoodFact {
            id: food_id(&self.name),
            name: self.name,
            name_en: self.name_en,
            category: self.category,
            safety_level: self.safety_level,
            reason: self.reason,
            dad_tip: self.dad_tip.unwrap_or_default(),
            trimester_notes: self.trimester_notes.filter(|n| !n.trim().is_empty()),
        })
    }
}

impl SymptomRecord {
    fn into_fact(self) -> Result<SymptomFact> {
        require(FactKind::Symptom, "id", &self.id)?;
        require(FactKind::Symptom, "symptom_name", &self.symptom_name)?;

        let question_count = self.questions.len();
        let mut rules = Vec::with_capacity(self.decision_paths.len());
        for (i, value) in self.decision_paths.into_iter().enumerate() {
            match serde_json::from_value::<RuleRecord>(value) {
                Ok(rule) => {
                    let triggers = rule.triggers.unwrap_or_else(|| {
                        derive_triggers(&rule.condition, rule.urgency, question_count)
                    });
                    rules.push(DecisionRule {
                        condition: rule.condition,
                        action: rule.action,
                        urgency: rule.urgency,
                        triggers,
                    });
                }
                Err(e) => warn!("Skipping decision path {} of symptom {}: {}", i, self.id, e),
            }
        }

        if rules.is_empty() {
            return Err(invalid(
                FactKind::Symptom,
                format!("{} has no usable decision paths", self.id),
            ));
        }

        Ok(SymptomFact {
            id: self.id,
            name: self.symptom_name,
            name_en: self.symptom_name_en,
            questions: self.questions,
            decision_rules: rules,
            dad_actions: self.dad_actions,
        })
    }
}

impl EmotionalRecord {
    fn into_fact(self) -> Result<EmotionalFact> {
        require(FactKind::Emotional, "id", &self.id)?;
        require(FactKind::Emotional, "scenario_name", &self.scenario_name)?;
        require(FactKind::Emotional, "right_response", &self.right_response)?;
        Ok(EmotionalFact {
            id: self.id,
            scenario_name: self.scenario_name,
            scenario_name_en: self.scenario_name_en,
            trigger: self.trigger,
            wife_feeling: self.wife_feeling,
            wrong_response: self.wrong_response,
            right_response: self.right_response,
            follow_up_actions: self.follow_up_actions,
        })
    }
}

impl EmergencyRecord {
    fn into_fact(self) -> Result<EmergencyFact> {
        require(FactKind::Emergency, "id", &self.id)?;
        require(FactKind::Emergency, "emergency_name", &self.emergency_name)?;
        Ok(EmergencyFact {
            id: self.id,
            name: self.emergency_name,
            name_en: self.emergency_name_en,
            recognition_signs: self.recognition_signs,
            immediate_actions: self.immediate_actions,
            what_not_to_do: self.what_not_to_do,
            when_to_call_ambulance: self.when_to_call_ambulance,
            hospital_bag_items: self.hospital_bag_items,
            reassurance_script: self.reassurance_script,
        })
    }
}

/// Parse one JSON array record by record, skipping rejects and duplicate ids
fn parse_records<R, F>(
    kind: FactKind,
    raw: &str,
    convert: impl Fn(R) -> Result<F>,
) -> Result<Vec<F>>
where
    R: DeserializeOwned,
    F: KbFact,
{
    let values: Vec<serde_json::Value> = serde_json::from_str(raw)?;
    let mut seen = HashSet::new();
    let mut facts = Vec::with_capacity(values.len());

    for (i, value) in values.into_iter().enumerate() {
        let fact = match serde_json::from_value::<R>(value)
            .map_err(KbError::from)
            .and_then(&convert)
        {
            Ok(fact) => fact,
            Err(e) => {
                warn!("Skipping {} record #{}: {}", kind, i, e);
                continue;
            }
        };
        if !seen.insert(fact.id().to_string()) {
            warn!("Skipping {} record #{}: duplicate id {}", kind, i, fact.id());
            continue;
        }
        facts.push(fact);
    }

    Ok(facts)
}

// =============================================================================
// Fact bundle
// =============================================================================

/// One validated content release
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactBundle {
    pub foods: Vec<FoodFact>,
    pub symptoms: Vec<SymptomFact>,
    pub emotional: Vec<EmotionalFact>,
    pub emergencies: Vec<EmergencyFact>,
}

impl FactBundle {
    /// The release embedded in the library
    pub fn bundled() -> Result<Self> {
        Self::from_json(
            BUNDLED_FOODS,
            BUNDLED_SYMPTOMS,
            BUNDLED_EMOTIONAL,
            BUNDLED_EMERGENCIES,
        )
    }

    /// Load a release from a directory holding the four JSON files
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let read = |file: &str| std::fs::read_to_string(dir.join(file));
        Self::from_json(
            &read(FOODS_FILE)?,
            &read(SYMPTOMS_FILE)?,
            &read(EMOTIONAL_FILE)?,
            &read(EMERGENCIES_FILE)?,
        )
    }

    /// Parse the four arrays. A file that is not a JSON array is an error;
    /// individual bad records are skipped.
    pub fn from_json(foods: &str, symptoms: &str, emotional: &str, emergencies: &str) -> Result<Self> {
        Ok(Self {
            foods: parse_records(FactKind::Food, foods, FoodRecord::into_fact)?,
            symptoms: parse_records(FactKind::Symptom, symptoms, SymptomRecord::into_fact)?,
            emotional: parse_records(FactKind::Emotional, emotional, EmotionalRecord::into_fact)?,
            emergencies: parse_records(
                FactKind::Emergency,
                emergencies,
                EmergencyRecord::into_fact,
            )?,
        })
    }

    /// Bundle selected by configuration: `[seed] data_dir` or the embedded release
    pub fn from_config(config: &KbConfig) -> Result<Self> {
        match &config.seed.data_dir {
            Some(dir) => {
                info!("Loading knowledge content from {}", dir.display());
                Self::from_dir(dir)
            }
            None => Self::bundled(),
        }
    }

    pub fn stats(&self) -> KbStats {
        KbStats {
            foods: self.foods.len(),
            symptoms: self.symptoms.len(),
            emotional: self.emotional.len(),
            emergencies: self.emergencies.len(),
        }
    }
}

// =============================================================================
// Seeder
// =============================================================================

/// What a seed run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// All four kinds replaced and the version tag written
    Seeded(KbStats),
    /// Stored version already current; nothing written
    UpToDate,
}

/// Brings a store to a content version
pub struct Seeder<'a> {
    store: &'a FactStore,
    version: String,
}

impl<'a> Seeder<'a> {
    pub fn new(store: &'a FactStore) -> Self {
        Self {
            store,
            version: KB_VERSION.to_string(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Seed unless the stored version already matches
    pub async fn seed(&self, bundle: FactBundle) -> Result<SeedOutcome> {
        let current = self.store.get_version().await?;
        if current.as_deref() == Some(self.version.as_str()) {
            info!("Knowledge base already at version {}, skipping seed", self.version);
            return Ok(SeedOutcome::UpToDate);
        }

        info!("Seeding knowledge base (version {})...", self.version);
        let stats = self.replace_all(bundle).await?;
        self.store.set_version(&self.version).await?;
        info!("Knowledge base version set to {}", self.version);

        Ok(SeedOutcome::Seeded(stats))
    }

    /// Replace every kind regardless of the stored version; leaves the tag alone
    pub async fn replace_all(&self, bundle: FactBundle) -> Result<KbStats> {
        let foods = self.store.replace_facts(bundle.foods).await?;
        info!("Seeded {} food items", foods);
        let symptoms = self.store.replace_facts(bundle.symptoms).await?;
        info!("Seeded {} symptom trees", symptoms);
        let emotional = self.store.replace_facts(bundle.emotional).await?;
        info!("Seeded {} emotional scenarios", emotional);
        let emergencies = self.store.replace_facts(bundle.emergencies).await?;
        info!("Seeded {} emergency procedures", emergencies);

        Ok(KbStats {
            foods,
            symptoms,
            emotional,
            emergencies,
        })
    }
}

// =============================================================================
// Start-up
// =============================================================================

/// Result of start-up initialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitReport {
    pub success: bool,
    pub stats: KbStats,
    /// Content version now in the store; empty on failure
    pub version: String,
}

impl InitReport {
    fn failed() -> Self {
        Self {
            success: false,
            stats: KbStats::default(),
            version: String::new(),
        }
    }
}

/// Open the configured store and seed it if needed.
///
/// Never fails: the store is `None` when it cannot be opened, and the
/// report says whether the knowledge base is usable.
pub async fn initialize_knowledge_base(
    location: StoreLocation,
    config: &KbConfig,
) -> (Option<Arc<FactStore>>, InitReport) {
    let store = match FactStore::open(location).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Knowledge base initialization failed: {}", e);
            return (None, InitReport::failed());
        }
    };

    let report = match seed_store(&store, config).await {
        Ok(stats) => InitReport {
            success: true,
            stats,
            version: KB_VERSION.to_string(),
        },
        Err(e) => {
            error!("Knowledge base initialization failed: {}", e);
            InitReport::failed()
        }
    };

    (Some(store), report)
}

async fn seed_store(store: &FactStore, config: &KbConfig) -> Result<KbStats> {
    let bundle = FactBundle::from_config(config)?;
    Seeder::new(store).seed(bundle).await?;
    store.stats().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_food_id() {
        assert_eq!(food_id("螃蟹"), "food_螃蟹");
        assert_eq!(food_id("Raw egg"), "food_Raw_egg");
        assert_eq!(food_id("奶酪（软）"), "food_奶酪_软_");
    }

    #[test]
    fn test_bundled_release_is_valid() {
        let bundle = FactBundle::bundled().unwrap();
        assert!(bundle.foods.iter().any(|f| f.name == "螃蟹"));
        assert!(!bundle.symptoms.is_empty());
        assert!(bundle.symptoms.iter().all(|s| !s.decision_rules.is_empty()));
        assert!(!bundle.emotional.is_empty());
        assert!(!bundle.emergencies.is_empty());
    }

    #[test]
    fn test_bundled_rules_get_triggers() {
        let bundle = FactBundle::bundled().unwrap();
        let water = bundle
            .symptoms
            .iter()
            .find(|s| s.id == "symptom_water_break")
            .unwrap();
        assert_eq!(
            water.decision_rules[0].triggers,
            vec![RuleTrigger::IndexTrue { index: 1 }]
        );

        let contraction = bundle
            .symptoms
            .iter()
            .find(|s| s.id == "symptom_contraction")
            .unwrap();
        assert_eq!(
            contraction.decision_rules[0].triggers,
            vec![RuleTrigger::CountTrueGte { count: 2 }]
        );
    }

    #[test]
    fn test_bad_records_are_skipped() {
        let foods = r#"[
            {"name": "苹果", "safety_level": "SAFE", "reason": "好"},
            {"name": "无等级"},
            {"name": "", "safety_level": "SAFE"},
            {"name": "坏等级", "safety_level": "MAYBE"},
            {"name": "苹果", "safety_level": "AVOID"}
        ]"#;
        let symptoms = r#"[
            {"id": "s1", "symptom_name": "无规则", "questions": ["?"], "decision_paths": []},
            {"id": "s2", "symptom_name": "有规则", "decision_paths": [
                {"condition": "x", "action": "y", "urgency": "LATER"},
                {"condition": "x", "action": "y", "urgency": "MONITOR"}
            ]}
        ]"#;
        let bundle = FactBundle::from_json(foods, symptoms, "[]", "[]").unwrap();

        assert_eq!(bundle.foods.len(), 1);
        assert_eq!(bundle.foods[0].safety_level, SafetyLevel::Safe);
        assert_eq!(bundle.symptoms.len(), 1);
        assert_eq!(bundle.symptoms[0].decision_rules.len(), 1);
    }

    #[test]
    fn test_non_array_file_is_error() {
        assert!(FactBundle::from_json("{}", "[]", "[]", "[]").is_err());
    }

    #[test]
    fn test_from_dir() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(FOODS_FILE),
            r#"[{"name": "螃蟹", "safety_level": "CAUTION", "reason": "易致敏"}]"#,
        )
        .unwrap();
        for file in [SYMPTOMS_FILE, EMOTIONAL_FILE, EMERGENCIES_FILE] {
            std::fs::write(temp_dir.path().join(file), "[]").unwrap();
        }

        let bundle = FactBundle::from_dir(temp_dir.path()).unwrap();
        assert_eq!(bundle.stats().total(), 1);
        assert_eq!(bundle.foods[0].id, "food_螃蟹");
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = FactStore::open_in_memory().await.unwrap();
        let bundle = FactBundle::bundled().unwrap();
        let expected = bundle.stats();

        let seeder = Seeder::new(&store);
        assert_eq!(
            seeder.seed(bundle.clone()).await.unwrap(),
            SeedOutcome::Seeded(expected)
        );
        assert_eq!(seeder.seed(bundle).await.unwrap(), SeedOutcome::UpToDate);
        assert_eq!(store.stats().await.unwrap(), expected);
        assert_eq!(store.get_version().await.unwrap().as_deref(), Some(KB_VERSION));
    }

    #[tokio::test]
    async fn test_version_bump_replaces_content() {
        let store = FactStore::open_in_memory().await.unwrap();
        Seeder::new(&store)
            .seed(FactBundle::bundled().unwrap())
            .await
            .unwrap();

        let smaller = FactBundle::from_json(
            r#"[{"name": "螃蟹", "safety_level": "CAUTION", "reason": "易致敏"}]"#,
            "[]",
            "[]",
            "[]",
        )
        .unwrap();
        let outcome = Seeder::new(&store)
            .with_version("9.9.9")
            .seed(smaller)
            .await
            .unwrap();

        let stats = KbStats {
            foods: 1,
            ..KbStats::default()
        };
        assert_eq!(outcome, SeedOutcome::Seeded(stats));
        assert_eq!(store.stats().await.unwrap(), stats);
    }

    #[tokio::test]
    async fn test_failed_seed_keeps_version() {
        let store = FactStore::open_in_memory().await.unwrap();
        store.set_version("1.0.0").await.unwrap();
        store
            .execute(|conn| {
                conn.execute_batch("DROP TABLE kb_symptom_fts")?;
                Ok(())
            })
            .await
            .unwrap();

        let result = Seeder::new(&store).seed(FactBundle::bundled().unwrap()).await;
        assert!(result.is_err());
        assert_eq!(store.get_version().await.unwrap().as_deref(), Some("1.0.0"));
    }

    #[tokio::test]
    async fn test_initialize_knowledge_base() {
        let temp_dir = TempDir::new().unwrap();
        let location = StoreLocation::Custom(temp_dir.path().join("kb").join("knowledge.db"));

        let (store, report) = initialize_knowledge_base(location, &KbConfig::default()).await;
        assert!(store.is_some());
        assert!(report.success);
        assert_eq!(report.version, KB_VERSION);
        assert_eq!(report.stats, FactBundle::bundled().unwrap().stats());
    }

    #[tokio::test]
    async fn test_initialize_reports_bad_content_dir() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = KbConfig::default();
        config.seed.data_dir = Some(temp_dir.path().join("missing"));

        let (store, report) = initialize_knowledge_base(StoreLocation::Memory, &config).await;
        assert!(store.is_some());
        assert!(!report.success);
        assert_eq!(report.stats.total(), 0);
    }
}
