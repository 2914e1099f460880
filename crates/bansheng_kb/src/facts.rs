//! Table mapping for the four fact kinds
//!
//! Each kind owns a content table, an FTS5 shadow index over its salient
//! text fields, and a materialized `search_text` column used by the
//! substring fallback. `KbFact` ties an entity type to all three so the
//! store and the search service stay generic over kinds.

use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

use crate::types::{
    DecisionRule, EmergencyFact, EmotionalFact, FactKind, FoodFact, SafetyLevel, SymptomFact,
};

/// A fact kind persisted in its own table with an FTS5 shadow index
pub trait KbFact: Sized + Send + 'static {
    const KIND: FactKind;
    /// Content table
    const TABLE: &'static str;
    /// FTS5 table (external content = `TABLE`)
    const FTS_TABLE: &'static str;
    /// Columns read back by `from_row`, in order
    const COLUMNS: &'static [&'static str];
    /// Raw columns scanned by the substring fallback
    const FALLBACK_COLUMNS: &'static [&'static str];

    fn id(&self) -> &str;

    /// Concatenation of the salient text fields
    fn search_text(&self) -> String;

    fn insert(&self, conn: &Connection) -> rusqlite::Result<usize>;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// `alias.col, alias.col, ...` for a kind's read columns
pub fn select_list<F: KbFact>(alias: &str) -> String {
    F::COLUMNS
        .iter()
        .map(|c| format!("{}.{}", alias, c))
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Column helpers
// =============================================================================

fn non_empty(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn list_to_json(values: &[String]) -> rusqlite::Result<String> {
    serde_json::to_string(values).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn optional_list_to_json(values: &[String]) -> rusqlite::Result<Option<String>> {
    if values.is_empty() {
        Ok(None)
    } else {
        list_to_json(values).map(Some)
    }
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_list_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        None => Ok(Vec::new()),
    }
}

fn text_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
}

// =============================================================================
// Food
// =============================================================================

impl KbFact for FoodFact {
    const KIND: FactKind = FactKind::Food;
    const TABLE: &'static str = "kb_food";
    const FTS_TABLE: &'static str = "kb_food_fts";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "name_en",
        "category",
        "safety_level",
        "reason",
        "dad_tip",
        "trimester_notes",
    ];
    const FALLBACK_COLUMNS: &'static [&'static str] = &["name", "name_en", "category"];

    fn id(&self) -> &str {
        &self.id
    }

    fn search_text(&self) -> String {
        format!("{} {} {} {}", self.name, self.name_en, self.category, self.reason)
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            r#"
            INSERT OR REPLACE INTO kb_food
            (id, name, name_en, category, safety_level, reason, dad_tip, trimester_notes, search_text)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                self.id,
                self.name,
                non_empty(&self.name_en),
                self.category,
                self.safety_level.as_str(),
                self.reason,
                non_empty(&self.dad_tip),
                self.trimester_notes.as_deref().and_then(non_empty),
                self.search_text(),
            ],
        )
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let level: String = row.get(4)?;
        let safety_level = level.parse::<SafetyLevel>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, Type::Text, e.into())
        })?;

        Ok(FoodFact {
            id: row.get(0)?,
            name: row.get(1)?,
            name_en: text_column(row, 2)?,
            category: row.get(3)?,
            safety_level,
            reason: row.get(5)?,
            dad_tip: text_column(row, 6)?,
            trimester_notes: row.get(7)?,
        })
    }
}

// =============================================================================
// Symptom
// =============================================================================

impl KbFact for SymptomFact {
    const KIND: FactKind = FactKind::Symptom;
    const TABLE: &'static str = "kb_symptom";
    const FTS_TABLE: &'static str = "kb_symptom_fts";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "symptom_name",
        "symptom_name_en",
        "questions",
        "decision_paths",
        "dad_actions",
    ];
    const FALLBACK_COLUMNS: &'static [&'static str] =
        &["symptom_name", "symptom_name_en", "search_text"];

    fn id(&self) -> &str {
        &self.id
    }

    fn search_text(&self) -> String {
        format!("{} {}", self.name, self.name_en)
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<usize> {
        let rules = serde_json::to_string(&self.decision_rules)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO kb_symptom
            (id, symptom_name, symptom_name_en, questions, decision_paths, dad_actions, search_text)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                self.id,
                self.name,
                non_empty(&self.name_en),
                list_to_json(&self.questions)?,
                rules,
                optional_list_to_json(&self.dad_actions)?,
                self.search_text(),
            ],
        )
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(SymptomFact {
            id: row.get(0)?,
            name: row.get(1)?,
            name_en: text_column(row, 2)?,
            questions: json_column(row, 3)?,
            decision_rules: json_column::<Vec<DecisionRule>>(row, 4)?,
            dad_actions: optional_list_column(row, 5)?,
        })
    }
}

// =============================================================================
// Emotional
// =============================================================================

impl KbFact for EmotionalFact {
    const KIND: FactKind = FactKind::Emotional;
    const TABLE: &'static str = "kb_emotional";
    const FTS_TABLE: &'static str = "kb_emotional_fts";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "scenario_name",
        "scenario_name_en",
        "scenario_trigger",
        "wife_feeling",
        "wrong_response",
        "right_response",
        "follow_up_actions",
    ];
    const FALLBACK_COLUMNS: &'static [&'static str] =
        &["scenario_name", "scenario_trigger", "wife_feeling"];

    fn id(&self) -> &str {
        &self.id
    }

    fn search_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.scenario_name, self.scenario_name_en, self.trigger, self.wife_feeling
        )
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            r#"
            INSERT OR REPLACE INTO kb_emotional
            (id, scenario_name, scenario_name_en, scenario_trigger, wife_feeling,
             wrong_response, right_response, follow_up_actions, search_text)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                self.id,
                self.scenario_name,
                non_empty(&self.scenario_name_en),
                self.trigger,
                non_empty(&self.wife_feeling),
                non_empty(&self.wrong_response),
                self.right_response,
                non_empty(&self.follow_up_actions),
                self.search_text(),
            ],
        )
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(EmotionalFact {
            id: row.get(0)?,
            scenario_name: row.get(1)?,
            scenario_name_en: text_column(row, 2)?,
            trigger: row.get(3)?,
            wife_feeling: text_column(row, 4)?,
            wrong_response: text_column(row, 5)?,
            right_response: row.get(6)?,
            follow_up_actions: text_column(row, 7)?,
        })
    }
}

// =============================================================================
// Emergency
// =============================================================================

impl KbFact for EmergencyFact {
    const KIND: FactKind = FactKind::Emergency;
    const TABLE: &'static str = "kb_emergency";
    const FTS_TABLE: &'static str = "kb_emergency_fts";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "emergency_name",
        "emergency_name_en",
        "recognition_signs",
        "immediate_actions",
        "what_not_to_do",
        "when_to_call_ambulance",
        "hospital_bag_items",
        "reassurance_script",
    ];
    const FALLBACK_COLUMNS: &'static [&'static str] = &["emergency_name", "search_text"];

    fn id(&self) -> &str {
        &self.id
    }

    fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.name,
            self.name_en,
            self.recognition_signs.join(" ")
        )
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            r#"
            INSERT OR REPLACE INTO kb_emergency
            (id, emergency_name, emergency_name_en, recognition_signs, immediate_actions,
             what_not_to_do, when_to_call_ambulance, hospital_bag_items, reassurance_script,
             search_text)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                self.id,
                self.name,
                non_empty(&self.name_en),
                list_to_json(&self.recognition_signs)?,
                list_to_json(&self.immediate_actions)?,
                optional_list_to_json(&self.what_not_to_do)?,
                optional_list_to_json(&self.when_to_call_ambulance)?,
                optional_list_to_json(&self.hospital_bag_items)?,
                non_empty(&self.reassurance_script),
                self.search_text(),
            ],
        )
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(EmergencyFact {
            id: row.get(0)?,
            name: row.get(1)?,
            name_en: text_column(row, 2)?,
            recognition_signs: optional_list_column(row, 3)?,
            immediate_actions: optional_list_column(row, 4)?,
            what_not_to_do: optional_list_column(row, 5)?,
            when_to_call_ambulance: optional_list_column(row, 6)?,
            hospital_bag_items: optional_list_column(row, 7)?,
            reassurance_script: text_column(row, 8)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_list_prefixes_alias() {
        let list = select_list::<SymptomFact>("t");
        assert!(list.starts_with("t.id, t.symptom_name"));
        assert!(!list.contains("search_text"));
    }

    #[test]
    fn test_search_text_fields() {
        let food = FoodFact {
            id: "food_螃蟹".to_string(),
            name: "螃蟹".to_string(),
            name_en: "Crab".to_string(),
            category: "海鲜".to_string(),
            safety_level: SafetyLevel::Caution,
            reason: "易致敏".to_string(),
            dad_tip: String::new(),
            trimester_notes: None,
        };
        assert_eq!(food.search_text(), "螃蟹 Crab 海鲜 易致敏");

        let emergency = EmergencyFact {
            id: "e1".to_string(),
            name: "破水".to_string(),
            name_en: "Water breaking".to_string(),
            recognition_signs: vec!["阴道流液".to_string(), "内裤湿透".to_string()],
            immediate_actions: vec![],
            what_not_to_do: vec![],
            when_to_call_ambulance: vec![],
            hospital_bag_items: vec![],
            reassurance_script: String::new(),
        };
        assert_eq!(emergency.search_text(), "破水 Water breaking 阴道流液 内裤湿透");
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty("  "), None);
        assert_eq!(non_empty("x"), Some("x"));
    }
}
