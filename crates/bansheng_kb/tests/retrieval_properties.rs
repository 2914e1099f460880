//! Retrieval properties - end-to-end checks through the public API
//!
//! Every test opens its own SQLite file under a temp dir, seeds it and
//! queries it the way the assistant does.

use std::sync::Arc;

use bansheng_kb::{
    detect_intent, evaluate, FactBundle, FactStore, Intent, SafetyLevel, SearchService,
    SeedOutcome, Seeder, StoreLocation, SymptomFact, Urgency,
};
use tempfile::TempDir;

const CRAB_ONLY: &str = r#"[{"name": "螃蟹", "safety_level": "CAUTION", "reason": "易致敏"}]"#;

async fn open_store(dir: &TempDir) -> FactStore {
    FactStore::open(StoreLocation::Custom(dir.path().join("knowledge.db")))
        .await
        .unwrap()
}

async fn seeded(dir: &TempDir, bundle: FactBundle) -> SearchService {
    let store = open_store(dir).await;
    Seeder::new(&store).seed(bundle).await.unwrap();
    SearchService::new(Arc::new(store))
}

#[tokio::test]
async fn results_never_exceed_limit() {
    let dir = TempDir::new().unwrap();
    let service = seeded(&dir, FactBundle::bundled().unwrap()).await;

    for query in ["海鲜", "饮品", "a", "e", "螃蟹", "水果", "safe"] {
        for limit in 0..4 {
            let result = service.search_food(query, limit).await;
            assert!(result.items.len() <= limit, "{} with limit {}", query, limit);
            assert_eq!(result.total_matches, result.items.len());
        }
    }
}

#[tokio::test]
async fn empty_query_yields_nothing_for_every_kind() {
    let dir = TempDir::new().unwrap();
    let service = seeded(&dir, FactBundle::bundled().unwrap()).await;

    for query in ["", "   ", "\n\t"] {
        assert!(service.search_food(query, 5).await.is_empty());
        assert!(service.search_symptom(query, 3).await.is_empty());
        assert!(service.search_emotional(query, 3).await.is_empty());
        assert!(service.search_emergency(query).await.is_none());
    }
}

#[tokio::test]
async fn substring_fallback_finds_partial_names() {
    let dir = TempDir::new().unwrap();
    let service = seeded(&dir, FactBundle::bundled().unwrap()).await;

    // Inside a single CJK token, so only the substring scan can see it
    let result = service.search_food("鸡", 5).await;
    let names: Vec<&str> = result.items.iter().map(|f| f.name.as_str()).collect();
    assert!(names.contains(&"鸡蛋"));
    assert!(names.contains(&"生鸡蛋"));

    // Case-insensitive on English names
    let result = service.search_food("SASHIMI", 5).await;
    assert_eq!(result.items[0].name, "三文鱼刺身");
}

#[tokio::test]
async fn seeding_twice_writes_nothing_and_replace_leaves_exactly_n() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let bundle = FactBundle::bundled().unwrap();
    let expected = bundle.stats();

    let seeder = Seeder::new(&store);
    assert_eq!(
        seeder.seed(bundle.clone()).await.unwrap(),
        SeedOutcome::Seeded(expected)
    );
    assert_eq!(seeder.seed(bundle.clone()).await.unwrap(), SeedOutcome::UpToDate);
    assert_eq!(store.stats().await.unwrap(), expected);

    // Replacing again with the same list never duplicates rows
    let again = store.replace_facts(bundle.foods.clone()).await.unwrap();
    assert_eq!(again, bundle.foods.len());
    let fewer = store.replace_facts(bundle.foods[..3].to_vec()).await.unwrap();
    assert_eq!(fewer, 3);
}

#[test]
fn emergency_wording_beats_food_wording() {
    let result = detect_intent("破水后还能吃螃蟹吗");
    assert_eq!(result.intent, Some(Intent::Emergency));
}

#[tokio::test]
async fn any_yes_and_all_no_decisions() {
    let dir = TempDir::new().unwrap();
    let service = seeded(&dir, FactBundle::bundled().unwrap()).await;
    let bleeding: SymptomFact = service.symptom_by_id("symptom_bleeding").await.unwrap();

    let outcome = evaluate(&bleeding, &[true, false, false]);
    assert_eq!(outcome.urgency, Urgency::Emergency);
    assert_eq!(outcome.rule.as_ref(), bleeding.decision_rules.first());

    let outcome = evaluate(&bleeding, &[false, false, false]);
    assert_eq!(outcome.urgency, Urgency::Monitor);

    // Headache has no MONITOR rule; all-no settles on NORMAL
    let headache = service.symptom_by_id("symptom_headache").await.unwrap();
    let outcome = evaluate(&headache, &[false, false, false]);
    assert_eq!(outcome.urgency, Urgency::Normal);
    let outcome = evaluate(&headache, &[true, true, false]);
    assert_eq!(outcome.urgency, Urgency::Emergency);
}

#[tokio::test]
async fn water_break_tree_uses_positional_triggers() {
    let dir = TempDir::new().unwrap();
    let service = seeded(&dir, FactBundle::bundled().unwrap()).await;
    let tree = service.symptom_by_id("symptom_water_break").await.unwrap();

    assert_eq!(evaluate(&tree, &[false, true, false]).suggestion, tree.decision_rules[0].action);
    assert_eq!(evaluate(&tree, &[false, false, true]).suggestion, tree.decision_rules[1].action);
    assert_eq!(evaluate(&tree, &[false, false, false]).urgency, Urgency::CallDoctor);
}

#[tokio::test]
async fn avoid_level_survives_round_trip() {
    let dir = TempDir::new().unwrap();
    let service = seeded(&dir, FactBundle::bundled().unwrap()).await;

    let by_search = service.search_food("酒", 5).await;
    assert_eq!(by_search.items[0].safety_level, SafetyLevel::Avoid);

    let by_name = service.food_by_name("酒").await.unwrap();
    assert_eq!(by_name.safety_level, SafetyLevel::Avoid);
    assert_eq!(by_name.safety_level.as_str(), "AVOID");
}

#[tokio::test]
async fn crab_scenario_end_to_end() {
    let dir = TempDir::new().unwrap();
    let bundle = FactBundle::from_json(CRAB_ONLY, "[]", "[]", "[]").unwrap();
    let service = seeded(&dir, bundle).await;

    assert_eq!(detect_intent("螃蟹能吃吗").intent, Some(Intent::Food));

    let result = service.search_food("螃蟹", 5).await;
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].name, "螃蟹");
    assert_eq!(result.items[0].safety_level, SafetyLevel::Caution);
    assert_eq!(result.items[0].reason, "易致敏");
}

#[tokio::test]
async fn store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = open_store(&dir).await;
        Seeder::new(&store)
            .seed(FactBundle::bundled().unwrap())
            .await
            .unwrap();
        store.close().await.unwrap();
    }

    let store = open_store(&dir).await;
    assert_eq!(
        Seeder::new(&store)
            .seed(FactBundle::bundled().unwrap())
            .await
            .unwrap(),
        SeedOutcome::UpToDate
    );
    let service = SearchService::new(Arc::new(store));
    assert_eq!(service.search_food("螃蟹", 5).await.items.len(), 1);
}
