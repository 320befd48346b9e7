//! The mutable session aggregate. Every subsystem reads and writes this one
//! struct; timers and action handlers are the only mutators.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::content::{
    Content, ResourceKind, SkillKind, ToolKind, SEASON_MULTIPLIERS, TICKS_PER_DAY,
};

/// Newest-first event log shown in the UI sidebar.
pub const LOG_CAP: usize = 6;

/// Save document schema version.
pub const SAVE_VERSION: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Zh,
}

impl Default for Language {
    fn default() -> Self {
        Language::En
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceState {
    pub amount: f64,
    /// Per-day baseline before worker scaling, district contributions,
    /// seasons, and boosts.
    pub rate: f64,
    pub capacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictState {
    pub id: String,
    pub building_count: u32,
    pub stability: u32,
}

impl DistrictState {
    /// Cosmetic build-out percentage derived from the count.
    pub fn progress(&self) -> u32 {
        (self.building_count * 10).min(100)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillProgress {
    pub level: u32,
    pub experience: u32,
}

impl Default for SkillProgress {
    fn default() -> Self {
        Self {
            level: 1,
            experience: 0,
        }
    }
}

/// Timed production modifier created by a council directive. One active
/// boost per directive id; transient, never saved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveBoost {
    pub resource: ResourceKind,
    pub rate_delta: f64,
    pub remaining_ticks: u32,
    pub total_ticks: u32,
}

/// Capacity grant from a finished item craft, waiting for the player to pick
/// a target resource. Transient, never saved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingBoost {
    pub recipe_id: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub tick: u64,

    pub resources: BTreeMap<ResourceKind, ResourceState>,
    pub manual_cooldowns: BTreeMap<ResourceKind, u32>,
    pub manual_harvest_active: BTreeMap<ResourceKind, bool>,
    pub resource_workers: BTreeMap<ResourceKind, u32>,
    pub manually_unlocked_resources: BTreeSet<ResourceKind>,

    pub skills: BTreeMap<SkillKind, SkillProgress>,
    pub districts: Vec<DistrictState>,
    pub facility_counts: BTreeMap<String, u32>,
    pub selected_facility_id: Option<String>,

    pub stage_index: usize,
    pub show_tutorial: bool,
    pub show_intro_dialogue: bool,
    pub intro_index: usize,

    pub unlocked_chapters: Vec<String>,
    pub active_chapter_id: Option<String>,
    pub milestones: BTreeSet<String>,
    pub completed_purchases: BTreeSet<String>,
    pub purchase_counts: BTreeMap<String, u32>,
    pub civilization_level: u32,

    pub crafting_recipe: Option<String>,
    pub crafting_progress: u32,
    pub equipped_tools: BTreeMap<ToolKind, String>,
    pub pending_boosts: VecDeque<PendingBoost>,

    pub assigned_tenants: u32,
    pub tenant_morale: Vec<u8>,
    pub pending_tenants: u32,
    pub tenant_timeout: u32,
    pub tenant_recruit_cooldown: u32,
    pub auto_pay_wages: bool,
    pub last_pay_day: u64,

    pub active_boosts: BTreeMap<String, ActiveBoost>,

    pub log: VecDeque<String>,
    pub language: Language,
}

impl GameState {
    pub fn new(content: &Content) -> Self {
        let resources = content
            .resources
            .iter()
            .map(|spec| {
                (
                    spec.kind,
                    ResourceState {
                        amount: 0.0,
                        rate: 0.0,
                        capacity: spec.initial_capacity,
                    },
                )
            })
            .collect();
        fn seeded<T: Copy>(value: T) -> BTreeMap<ResourceKind, T> {
            ResourceKind::ALL.iter().map(|kind| (*kind, value)).collect()
        }
        let districts = content
            .districts
            .iter()
            .map(|spec| DistrictState {
                id: spec.id.to_string(),
                building_count: 0,
                stability: 100,
            })
            .collect();
        let facility_counts = content
            .facilities
            .iter()
            .map(|spec| (spec.id.to_string(), 0))
            .collect();

        Self {
            tick: 0,
            resources,
            manual_cooldowns: seeded(0),
            manual_harvest_active: seeded(false),
            resource_workers: seeded(0),
            manually_unlocked_resources: BTreeSet::new(),
            skills: SkillKind::ALL
                .iter()
                .map(|kind| (*kind, SkillProgress::default()))
                .collect(),
            districts,
            facility_counts,
            selected_facility_id: None,
            stage_index: 0,
            show_tutorial: true,
            show_intro_dialogue: true,
            intro_index: 0,
            unlocked_chapters: Vec::new(),
            active_chapter_id: None,
            milestones: BTreeSet::new(),
            completed_purchases: BTreeSet::new(),
            purchase_counts: BTreeMap::new(),
            civilization_level: 1,
            crafting_recipe: None,
            crafting_progress: 0,
            equipped_tools: BTreeMap::new(),
            pending_boosts: VecDeque::new(),
            assigned_tenants: 0,
            tenant_morale: Vec::new(),
            pending_tenants: 0,
            tenant_timeout: 0,
            tenant_recruit_cooldown: 0,
            auto_pay_wages: true,
            last_pay_day: 0,
            active_boosts: BTreeMap::new(),
            log: VecDeque::new(),
            language: Language::En,
        }
    }

    pub fn resource(&self, kind: ResourceKind) -> &ResourceState {
        self.resources.get(&kind).expect("all resource kinds seeded at start")
    }

    pub fn resource_mut(&mut self, kind: ResourceKind) -> &mut ResourceState {
        self.resources
            .get_mut(&kind)
            .expect("all resource kinds seeded at start")
    }

    pub fn workers_on(&self, kind: ResourceKind) -> u32 {
        self.resource_workers.get(&kind).copied().unwrap_or(0)
    }

    pub fn district(&self, id: &str) -> Option<&DistrictState> {
        self.districts.iter().find(|district| district.id == id)
    }

    pub fn district_mut(&mut self, id: &str) -> Option<&mut DistrictState> {
        self.districts.iter_mut().find(|district| district.id == id)
    }

    pub fn facility_count(&self, id: &str) -> u32 {
        self.facility_counts.get(id).copied().unwrap_or(0)
    }

    // Derived time. The tick counter is the only clock.

    pub fn phase(&self) -> u64 {
        self.tick % TICKS_PER_DAY
    }

    pub fn day(&self) -> u64 {
        self.tick / TICKS_PER_DAY
    }

    pub fn season_index(&self) -> usize {
        (self.day() % SEASON_MULTIPLIERS.len() as u64) as usize
    }

    pub fn season_multiplier(&self) -> f64 {
        SEASON_MULTIPLIERS[self.season_index()]
    }

    // Derived population figures.

    pub fn total_housing(&self, content: &Content) -> u32 {
        content
            .facilities
            .iter()
            .map(|spec| self.facility_count(spec.id) * spec.capacity)
            .sum()
    }

    pub fn available_housing(&self, content: &Content) -> u32 {
        self.total_housing(content).saturating_sub(self.assigned_tenants)
    }

    pub fn busy_workers(&self) -> u32 {
        self.resource_workers.values().sum()
    }

    pub fn idle_workers(&self) -> u32 {
        self.assigned_tenants.saturating_sub(self.busy_workers())
    }

    /// Stage gate plus the manual unlock set from store effects.
    pub fn resource_visible(&self, content: &Content, kind: ResourceKind) -> bool {
        self.stage_index >= content.resource(kind).required_stage
            || self.manually_unlocked_resources.contains(&kind)
    }

    pub fn push_log(&mut self, entry: impl Into<String>) {
        self.log.push_front(entry.into());
        self.log.truncate(LOG_CAP);
    }

    /// Consistency report, run after phase ticks. Returns human-readable
    /// violation descriptions; empty means healthy.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        for (kind, resource) in &self.resources {
            if resource.amount < 0.0 || resource.amount > resource.capacity {
                violations.push(format!(
                    "{} amount {} outside [0, {}]",
                    kind.key(),
                    resource.amount,
                    resource.capacity
                ));
            }
        }
        if self.tenant_morale.len() != self.assigned_tenants as usize {
            violations.push(format!(
                "morale entries {} do not match {} assigned tenants",
                self.tenant_morale.len(),
                self.assigned_tenants
            ));
        }
        if self.busy_workers() > self.assigned_tenants {
            violations.push(format!(
                "{} workers busy with only {} tenants assigned",
                self.busy_workers(),
                self.assigned_tenants
            ));
        }
        violations
    }
}
