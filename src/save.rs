//! Save document codec. Encoding is typed; decoding is deliberately
//! defensive: every field of the parsed document is type-checked before
//! use and falls back to its new-game default on absence or mismatch.
//! Only a document that is not a JSON object at all fails the load.
//!
//! Resources, districts, and skills reconcile by stable key against a fresh
//! default state, so documents written under older or newer catalogs merge
//! instead of erroring: unknown incoming keys are dropped, catalog entries
//! missing from the document keep their defaults.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::content::{Content, ResourceKind, SkillKind, ToolKind};
use crate::ledger::round_tenth;
use crate::state::{GameState, Language, SAVE_VERSION};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("save document is not parseable JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("save document root is not an object")]
    NotAnObject,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourceEntry {
    key: &'static str,
    amount: f64,
    rate: f64,
    capacity: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DistrictEntry<'a> {
    id: &'a str,
    building_count: u32,
    stability: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SkillEntry {
    key: &'static str,
    level: u32,
    experience: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveDocument<'a> {
    version: u32,
    saved_at: String,
    tick: u64,
    resources: Vec<ResourceEntry>,
    manual_cooldowns: BTreeMap<&'static str, u32>,
    manual_harvest_active: BTreeMap<&'static str, bool>,
    resource_workers: BTreeMap<&'static str, u32>,
    manually_unlocked_resources: Vec<&'static str>,
    skills: Vec<SkillEntry>,
    districts: Vec<DistrictEntry<'a>>,
    facility_counts: &'a BTreeMap<String, u32>,
    selected_facility_id: Option<&'a str>,
    stage_index: usize,
    show_tutorial: bool,
    show_intro_dialogue: bool,
    intro_index: usize,
    unlocked_chapters: &'a [String],
    active_chapter_id: &'a str,
    milestones: Vec<&'a str>,
    completed_purchases: Vec<&'a str>,
    purchase_counts: &'a BTreeMap<String, u32>,
    civilization_level: u32,
    crafting_recipe: Option<&'a str>,
    crafting_progress: u32,
    equipped_tools: BTreeMap<&'static str, &'a str>,
    tenant_recruit_cooldown: u32,
    pending_tenants: u32,
    tenant_timeout: u32,
    assigned_tenants: u32,
    tenant_morale: &'a [u8],
    auto_pay_wages: bool,
    last_pay_day: u64,
    log: Vec<&'a str>,
    language: Language,
}

impl<'a> SaveDocument<'a> {
    fn from_state(state: &'a GameState) -> Self {
        Self {
            version: SAVE_VERSION,
            saved_at: Utc::now().to_rfc3339(),
            tick: state.tick,
            resources: state
                .resources
                .iter()
                .map(|(kind, resource)| ResourceEntry {
                    key: kind.key(),
                    amount: resource.amount,
                    rate: resource.rate,
                    capacity: resource.capacity,
                })
                .collect(),
            manual_cooldowns: state
                .manual_cooldowns
                .iter()
                .map(|(kind, secs)| (kind.key(), *secs))
                .collect(),
            manual_harvest_active: state
                .manual_harvest_active
                .iter()
                .map(|(kind, active)| (kind.key(), *active))
                .collect(),
            resource_workers: state
                .resource_workers
                .iter()
                .map(|(kind, count)| (kind.key(), *count))
                .collect(),
            manually_unlocked_resources: state
                .manually_unlocked_resources
                .iter()
                .map(|kind| kind.key())
                .collect(),
            skills: state
                .skills
                .iter()
                .map(|(kind, skill)| SkillEntry {
                    key: kind.key(),
                    level: skill.level,
                    experience: skill.experience,
                })
                .collect(),
            districts: state
                .districts
                .iter()
                .map(|district| DistrictEntry {
                    id: &district.id,
                    building_count: district.building_count,
                    stability: district.stability,
                })
                .collect(),
            facility_counts: &state.facility_counts,
            selected_facility_id: state.selected_facility_id.as_deref(),
            stage_index: state.stage_index,
            show_tutorial: state.show_tutorial,
            show_intro_dialogue: state.show_intro_dialogue,
            intro_index: state.intro_index,
            unlocked_chapters: &state.unlocked_chapters,
            active_chapter_id: state.active_chapter_id.as_deref().unwrap_or(""),
            milestones: state.milestones.iter().map(String::as_str).collect(),
            completed_purchases: state
                .completed_purchases
                .iter()
                .map(String::as_str)
                .collect(),
            purchase_counts: &state.purchase_counts,
            civilization_level: state.civilization_level,
            crafting_recipe: state.crafting_recipe.as_deref(),
            crafting_progress: state.crafting_progress,
            equipped_tools: state
                .equipped_tools
                .iter()
                .map(|(slot, id)| (slot.key(), id.as_str()))
                .collect(),
            tenant_recruit_cooldown: state.tenant_recruit_cooldown,
            pending_tenants: state.pending_tenants,
            tenant_timeout: state.tenant_timeout,
            assigned_tenants: state.assigned_tenants,
            tenant_morale: &state.tenant_morale,
            auto_pay_wages: state.auto_pay_wages,
            last_pay_day: state.last_pay_day,
            log: state.log.iter().map(String::as_str).collect(),
            language: state.language,
        }
    }
}

pub fn encode(state: &GameState) -> Result<String, CodecError> {
    Ok(serde_json::to_string(&SaveDocument::from_state(state))?)
}

// Typed field readers over the parsed document. `None` means absent or
// wrong-typed, which callers treat as "keep the default".

fn read_f64(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key)?.as_f64()
}

fn read_u32(obj: &Map<String, Value>, key: &str) -> Option<u32> {
    obj.get(key)?.as_u64()?.try_into().ok()
}

fn read_u64(obj: &Map<String, Value>, key: &str) -> Option<u64> {
    obj.get(key)?.as_u64()
}

fn read_bool(obj: &Map<String, Value>, key: &str) -> Option<bool> {
    obj.get(key)?.as_bool()
}

fn read_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)?.as_str()
}

fn read_array<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Vec<Value>> {
    obj.get(key)?.as_array()
}

fn read_object<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    obj.get(key)?.as_object()
}

fn read_string_set(obj: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    let values = read_array(obj, key)?;
    Some(
        values
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}

/// Rebuild a state from a save document, falling back field-by-field to the
/// new-game defaults of `content`.
pub fn decode(content: &Content, raw: &str) -> Result<GameState, CodecError> {
    let value: Value = serde_json::from_str(raw)?;
    let Some(doc) = value.as_object() else {
        return Err(CodecError::NotAnObject);
    };
    let mut state = GameState::new(content);

    if let Some(tick) = read_u64(doc, "tick") {
        state.tick = tick;
    }

    if let Some(entries) = read_array(doc, "resources") {
        for entry in entries.iter().filter_map(Value::as_object) {
            let Some(kind) = read_str(entry, "key").and_then(ResourceKind::from_key) else {
                continue;
            };
            let resource = state.resource_mut(kind);
            if let Some(capacity) = read_f64(entry, "capacity") {
                resource.capacity = capacity.max(0.0);
            }
            if let Some(rate) = read_f64(entry, "rate") {
                resource.rate = rate;
            }
            if let Some(amount) = read_f64(entry, "amount") {
                resource.amount = round_tenth(amount.clamp(0.0, resource.capacity));
            }
        }
    }

    if let Some(entries) = read_object(doc, "manualCooldowns") {
        for (key, value) in entries {
            if let (Some(kind), Some(secs)) = (
                ResourceKind::from_key(key),
                value.as_u64().and_then(|v| u32::try_from(v).ok()),
            ) {
                state.manual_cooldowns.insert(kind, secs);
            }
        }
    }
    if let Some(entries) = read_object(doc, "manualHarvestActive") {
        for (key, value) in entries {
            if let (Some(kind), Some(active)) = (ResourceKind::from_key(key), value.as_bool()) {
                state.manual_harvest_active.insert(kind, active);
            }
        }
    }
    if let Some(entries) = read_object(doc, "resourceWorkers") {
        for (key, value) in entries {
            if let (Some(kind), Some(count)) = (
                ResourceKind::from_key(key),
                value.as_u64().and_then(|v| u32::try_from(v).ok()),
            ) {
                state.resource_workers.insert(kind, count);
            }
        }
    }
    if let Some(keys) = read_string_set(doc, "manuallyUnlockedResources") {
        state.manually_unlocked_resources = keys
            .iter()
            .filter_map(|key| ResourceKind::from_key(key))
            .collect();
    }

    if let Some(entries) = read_array(doc, "skills") {
        for entry in entries.iter().filter_map(Value::as_object) {
            let Some(kind) = read_str(entry, "key").and_then(SkillKind::from_key) else {
                continue;
            };
            let skill = state
                .skills
                .get_mut(&kind)
                .expect("all skill kinds seeded at start");
            if let Some(level) = read_u32(entry, "level") {
                skill.level = level.clamp(1, 100);
            }
            if let Some(experience) = read_u32(entry, "experience") {
                skill.experience = experience;
            }
        }
    }

    if let Some(entries) = read_array(doc, "districts") {
        for entry in entries.iter().filter_map(Value::as_object) {
            let Some(district) = read_str(entry, "id")
                .and_then(|id| state.district_mut(id))
            else {
                continue;
            };
            if let Some(count) = read_u32(entry, "buildingCount") {
                district.building_count = count;
            }
            if let Some(stability) = read_u32(entry, "stability") {
                district.stability = stability.min(100);
            }
        }
    }

    if let Some(entries) = read_object(doc, "facilityCounts") {
        for (id, value) in entries {
            if content.facility(id).is_none() {
                continue;
            }
            if let Some(count) = value.as_u64().and_then(|v| u32::try_from(v).ok()) {
                state.facility_counts.insert(id.clone(), count);
            }
        }
    }
    state.selected_facility_id = read_str(doc, "selectedFacilityId")
        .filter(|id| content.facility(id).is_some())
        .map(str::to_string);

    if let Some(index) = read_u64(doc, "stageIndex") {
        state.stage_index = (index as usize).min(content.final_stage());
    }
    if let Some(show) = read_bool(doc, "showTutorial") {
        state.show_tutorial = show;
    }
    if let Some(show) = read_bool(doc, "showIntroDialogue") {
        state.show_intro_dialogue = show;
    }
    if let Some(index) = read_u64(doc, "introIndex") {
        state.intro_index = index as usize;
    }

    if let Some(ids) = read_string_set(doc, "unlockedChapters") {
        let mut seen = BTreeSet::new();
        state.unlocked_chapters = ids
            .into_iter()
            .filter(|id| content.chapters.iter().any(|chapter| chapter.id == id))
            .filter(|id| seen.insert(id.clone()))
            .collect();
    }
    state.active_chapter_id = read_str(doc, "activeChapterId")
        .filter(|id| !id.is_empty())
        .filter(|id| content.chapters.iter().any(|chapter| chapter.id == *id))
        .map(str::to_string);

    if let Some(labels) = read_string_set(doc, "milestones") {
        state.milestones = labels.into_iter().collect();
    }
    if let Some(ids) = read_string_set(doc, "completedPurchases") {
        state.completed_purchases = ids.into_iter().collect();
    }
    if let Some(entries) = read_object(doc, "purchaseCounts") {
        state.purchase_counts = entries
            .iter()
            .filter_map(|(id, value)| {
                let count = value.as_u64().and_then(|v| u32::try_from(v).ok())?;
                Some((id.clone(), count))
            })
            .collect();
    }
    if let Some(level) = read_u32(doc, "civilizationLevel") {
        state.civilization_level = level;
    }

    state.crafting_recipe = read_str(doc, "craftingRecipe")
        .filter(|id| content.craftable(id).is_some())
        .map(str::to_string);
    if state.crafting_recipe.is_some() {
        if let Some(progress) = read_u32(doc, "craftingProgress") {
            state.crafting_progress = progress;
        }
    }
    if let Some(entries) = read_object(doc, "equippedTools") {
        for (slot, value) in entries {
            let Some(slot) = ToolKind::from_key(slot) else {
                continue;
            };
            let Some(id) = value.as_str() else {
                continue;
            };
            if content.tool_recipe(id).map(|tool| tool.tool) == Some(slot) {
                state.equipped_tools.insert(slot, id.to_string());
            }
        }
    }

    if let Some(secs) = read_u32(doc, "tenantRecruitCooldown") {
        state.tenant_recruit_cooldown = secs;
    }
    if let Some(count) = read_u32(doc, "pendingTenants") {
        state.pending_tenants = count;
    }
    if let Some(secs) = read_u32(doc, "tenantTimeout") {
        state.tenant_timeout = secs;
    }
    if let Some(count) = read_u32(doc, "assignedTenants") {
        state.assigned_tenants = count;
    }
    if let Some(entries) = read_array(doc, "tenantMorale") {
        state.tenant_morale = entries
            .iter()
            .filter_map(Value::as_f64)
            .map(|morale| morale.clamp(0.0, 100.0) as u8)
            .collect();
    }
    if let Some(auto) = read_bool(doc, "autoPayWages") {
        state.auto_pay_wages = auto;
    }
    if let Some(day) = read_u64(doc, "lastPayDay") {
        state.last_pay_day = day;
    }

    if let Some(entries) = read_string_set(doc, "log") {
        state.log = entries.into_iter().collect();
        state.log.truncate(crate::state::LOG_CAP);
    }
    if let Some(language) = read_str(doc, "language") {
        match language {
            "en" => state.language = Language::En,
            "zh" => state.language = Language::Zh,
            _ => {}
        }
    }

    reconcile(&mut state, content);
    Ok(state)
}

/// Square up cross-field invariants a hand-edited or stale document can
/// break: tenants fit the housing stock, the morale roster tracks the
/// assigned count, and workers never outnumber tenants.
fn reconcile(state: &mut GameState, content: &Content) {
    state.assigned_tenants = state.assigned_tenants.min(state.total_housing(content));
    state
        .tenant_morale
        .resize(state.assigned_tenants as usize, crate::content::MORALE_START);
    let mut excess = state.busy_workers().saturating_sub(state.assigned_tenants);
    if excess > 0 {
        for kind in ResourceKind::ALL {
            if excess == 0 {
                break;
            }
            let workers = state.workers_on(kind);
            let cut = workers.min(excess);
            if cut > 0 {
                state.resource_workers.insert(kind, workers - cut);
                excess -= cut;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Content;
    use crate::state::GameState;
    use ResourceKind::*;

    fn fresh() -> (Content, GameState) {
        let content = Content::standard();
        let state = GameState::new(&content);
        (content, state)
    }

    #[test]
    fn round_trip_reproduces_the_observable_state() {
        let (content, mut state) = fresh();
        state.tick = 42;
        state.stage_index = 2;
        state.resource_mut(Sunleaf).amount = 12.3;
        state.resource_mut(Sunleaf).rate = 1.5;
        state.resource_mut(Timber).capacity = 90.0;
        state.manual_cooldowns.insert(Sunleaf, 12);
        state.manual_harvest_active.insert(Sunleaf, true);
        state.resource_workers.insert(Timber, 2);
        state.manually_unlocked_resources.insert(Crystal);
        state.skills.get_mut(&SkillKind::Farming).unwrap().level = 4;
        state.district_mut("verdant-gardens").unwrap().building_count = 3;
        state.facility_counts.insert("cottage".into(), 2);
        state.selected_facility_id = Some("cottage".into());
        state.show_tutorial = false;
        state.show_intro_dialogue = false;
        state.intro_index = 5;
        state.unlocked_chapters = vec!["awakening".into(), "first-harvest".into()];
        state.active_chapter_id = Some("first-harvest".into());
        state.milestones.insert("first-craft".into());
        state.completed_purchases.insert("traders-pact".into());
        state.purchase_counts.insert("traders-pact".into(), 1);
        state.civilization_level = 2;
        state.crafting_recipe = Some("woven-baskets".into());
        state.crafting_progress = 7;
        state.equipped_tools.insert(ToolKind::Saw, "iron-saw".into());
        state.tenant_recruit_cooldown = 120;
        state.pending_tenants = 2;
        state.tenant_timeout = 60;
        state.assigned_tenants = 3;
        state.tenant_morale = vec![100, 80, 40];
        state.auto_pay_wages = false;
        state.last_pay_day = 9;
        state.push_log("log.harvest.sunleaf");
        state.language = Language::Zh;

        let raw = encode(&state).expect("encode");
        let decoded = decode(&content, &raw).expect("decode");
        assert_eq!(decoded, state);
    }

    #[test]
    fn empty_object_decodes_to_the_default_state() {
        let (content, fresh_state) = fresh();
        let decoded = decode(&content, "{}").expect("decode");
        assert_eq!(decoded, fresh_state);
    }

    #[test]
    fn non_object_documents_fail_the_load() {
        let (content, _) = fresh();
        assert!(matches!(
            decode(&content, "[1, 2, 3]"),
            Err(CodecError::NotAnObject)
        ));
        assert!(matches!(
            decode(&content, "not json at all"),
            Err(CodecError::Parse(_))
        ));
    }

    #[test]
    fn mistyped_fields_fall_back_individually() {
        let (content, fresh_state) = fresh();
        let raw = r#"{
            "tick": "not-a-number",
            "stageIndex": 2,
            "showTutorial": "yes",
            "assignedTenants": 1,
            "facilityCounts": {"cottage": 1},
            "resources": [
                {"key": "sunleaf", "amount": "much", "capacity": 80.0},
                {"key": "molten-gold", "amount": 5.0}
            ]
        }"#;
        let decoded = decode(&content, raw).expect("decode");
        assert_eq!(decoded.tick, 0, "mistyped tick keeps default");
        assert_eq!(decoded.stage_index, 2, "well-typed neighbor applies");
        assert_eq!(decoded.show_tutorial, fresh_state.show_tutorial);
        assert_eq!(decoded.resource(Sunleaf).capacity, 80.0);
        assert_eq!(decoded.resource(Sunleaf).amount, 0.0, "mistyped amount");
        assert_eq!(decoded.assigned_tenants, 1);
        assert_eq!(decoded.tenant_morale.len(), 1, "roster padded to count");
    }

    #[test]
    fn unknown_keys_are_ignored_and_missing_entries_keep_defaults() {
        let (content, _) = fresh();
        let raw = r#"{
            "resources": [{"key": "timber", "amount": 10.0}],
            "skills": [{"key": "alchemy", "level": 50}],
            "districts": [{"id": "sky-fortress", "buildingCount": 9}],
            "facilityCounts": {"castle": 4, "cottage": 1},
            "equippedTools": {"saw": "iron-pickaxe", "pickaxe": "iron-pickaxe"}
        }"#;
        let decoded = decode(&content, raw).expect("decode");
        assert_eq!(decoded.resource(Timber).amount, 10.0);
        assert_eq!(decoded.resource(Sunleaf).capacity, 40.0, "default kept");
        assert!(decoded.skills.values().all(|skill| skill.level == 1));
        assert!(decoded.districts.iter().all(|d| d.building_count == 0));
        assert_eq!(decoded.facility_count("cottage"), 1);
        assert_eq!(decoded.facility_count("castle"), 0);
        assert!(
            !decoded.equipped_tools.contains_key(&ToolKind::Saw),
            "tool id must match its slot"
        );
        assert_eq!(
            decoded.equipped_tools.get(&ToolKind::Pickaxe).map(String::as_str),
            Some("iron-pickaxe")
        );
    }

    #[test]
    fn amounts_clamp_into_the_decoded_capacity() {
        let (content, _) = fresh();
        let raw = r#"{"resources": [{"key": "sunleaf", "amount": 500.0, "capacity": 60.0}]}"#;
        let decoded = decode(&content, raw).expect("decode");
        assert_eq!(decoded.resource(Sunleaf).amount, 60.0);
        assert_eq!(decoded.resource(Sunleaf).capacity, 60.0);
    }

    #[test]
    fn workers_beyond_the_tenant_count_are_trimmed_in_order() {
        let (content, _) = fresh();
        let raw = r#"{
            "assignedTenants": 2,
            "facilityCounts": {"village-hall": 1},
            "tenantMorale": [90, 90],
            "resourceWorkers": {"sunleaf": 2, "timber": 2}
        }"#;
        let decoded = decode(&content, raw).expect("decode");
        assert_eq!(decoded.busy_workers(), 2);
        assert_eq!(decoded.workers_on(Sunleaf), 0, "trimmed first");
        assert_eq!(decoded.workers_on(Timber), 2);
    }

    #[test]
    fn assigned_tenants_never_exceed_the_housing_stock() {
        let (content, _) = fresh();
        let raw = r#"{
            "assignedTenants": 4294967295,
            "facilityCounts": {"cottage": 1},
            "tenantMorale": [80, 80]
        }"#;
        let decoded = decode(&content, raw).expect("decode");
        assert_eq!(decoded.assigned_tenants, 3, "one cottage houses three");
        assert_eq!(decoded.tenant_morale, vec![80, 80, 100]);
    }

    #[test]
    fn stale_crafting_and_chapter_ids_are_dropped() {
        let (content, _) = fresh();
        let raw = r#"{
            "craftingRecipe": "clockwork-golem",
            "craftingProgress": 30,
            "activeChapterId": "",
            "unlockedChapters": ["awakening", "lost-chapter", "first-harvest", "awakening"]
        }"#;
        let decoded = decode(&content, raw).expect("decode");
        assert_eq!(decoded.crafting_recipe, None);
        assert_eq!(decoded.crafting_progress, 0, "progress ignored without a recipe");
        assert_eq!(decoded.active_chapter_id, None);
        assert_eq!(
            decoded.unlocked_chapters,
            vec!["awakening".to_string(), "first-harvest".to_string()],
            "stale ids and repeats both drop"
        );
    }

    #[test]
    fn transient_boosts_are_not_part_of_the_document() {
        let (content, mut state) = fresh();
        state.active_boosts.insert(
            "logging-drive".into(),
            crate::state::ActiveBoost {
                resource: Timber,
                rate_delta: 1.0,
                remaining_ticks: 4,
                total_ticks: 8,
            },
        );
        let raw = encode(&state).expect("encode");
        assert!(!raw.contains("logging-drive"));
        let decoded = decode(&content, &raw).expect("decode");
        assert!(decoded.active_boosts.is_empty());
    }
}
