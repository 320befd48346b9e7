//! Static rule tables: resource/district/facility/recipe/store/chapter
//! catalogs and the timing constants shared by the tick pipelines.
//!
//! Everything here is fixed for the lifetime of a session. Mutable progress
//! lives in [`crate::state::GameState`]; this module only describes what the
//! valley can contain.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Seconds between production ticks.
pub const PHASE_TICK_SECS: u64 = 5;
/// Production ticks per in-game day; daily rates divide by this.
pub const TICKS_PER_DAY: u64 = 4;
/// Delay between detecting a completed tutorial stage and committing it.
pub const STAGE_COMMIT_DELAY_MS: u64 = 750;
/// Season multiplier table, indexed by `day % 4` (spring..winter).
pub const SEASON_MULTIPLIERS: [f64; 4] = [1.2, 1.0, 0.8, 0.6];

pub const MANUAL_COOLDOWN_SECS: u32 = 30;
pub const MANUAL_COOLDOWN_FLOOR_SECS: u32 = 5;
pub const HARVEST_EXPERIENCE: u32 = 10;
pub const SKILL_LEVEL_CAP: u32 = 100;

pub const RECRUIT_COOLDOWN_SECS: u32 = 300;
pub const RECRUIT_BATCH: u32 = 5;
pub const PENDING_TIMEOUT_SECS: u32 = 120;
pub const WAGE_PER_TENANT: f64 = 5.0;
pub const MORALE_START: u8 = 100;
pub const UNPAID_MORALE_PENALTY: u8 = 10;
pub const LOW_MORALE_THRESHOLD: u8 = 50;
pub const ATTRITION_CHANCE: f64 = 0.5;

pub const MILESTONE_FIRST_CRAFT: &str = "first-craft";
pub const MILESTONE_FIRST_TOOL: &str = "first-tool";
pub const MILESTONE_FIRST_TENANT: &str = "first-tenant";
pub const MILESTONE_FIRST_DISTRICT: &str = "first-district";

/// The six resources of the valley. Declaration order is the canonical
/// enumeration order used for wire maps and forced worker unassignment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Sunleaf,
    Timber,
    Stone,
    Fleece,
    Herbs,
    Crystal,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Sunleaf,
        ResourceKind::Timber,
        ResourceKind::Stone,
        ResourceKind::Fleece,
        ResourceKind::Herbs,
        ResourceKind::Crystal,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ResourceKind::Sunleaf => "sunleaf",
            ResourceKind::Timber => "timber",
            ResourceKind::Stone => "stone",
            ResourceKind::Fleece => "fleece",
            ResourceKind::Herbs => "herbs",
            ResourceKind::Crystal => "crystal",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }
}

/// Wages and the seasonal multiplier both attach to sunleaf.
pub const PRIMARY_RESOURCE: ResourceKind = ResourceKind::Sunleaf;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SkillKind {
    Farming,
    Forestry,
    Mining,
    Herding,
    Foraging,
}

impl SkillKind {
    pub const ALL: [SkillKind; 5] = [
        SkillKind::Farming,
        SkillKind::Forestry,
        SkillKind::Mining,
        SkillKind::Herding,
        SkillKind::Foraging,
    ];

    pub fn key(self) -> &'static str {
        match self {
            SkillKind::Farming => "farming",
            SkillKind::Forestry => "forestry",
            SkillKind::Mining => "mining",
            SkillKind::Herding => "herding",
            SkillKind::Foraging => "foraging",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Saw,
    Pickaxe,
    Shears,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [ToolKind::Saw, ToolKind::Pickaxe, ToolKind::Shears];

    pub fn key(self) -> &'static str {
        match self {
            ToolKind::Saw => "saw",
            ToolKind::Pickaxe => "pickaxe",
            ToolKind::Shears => "shears",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }
}

/// Signed per-resource amounts. Costs carry negative entries so they can be
/// fed straight into the ledger's delta application.
pub type ResourceDelta = BTreeMap<ResourceKind, f64>;

pub fn delta(entries: &[(ResourceKind, f64)]) -> ResourceDelta {
    entries.iter().copied().collect()
}

#[derive(Debug, Clone)]
pub struct ResourceSpec {
    pub kind: ResourceKind,
    pub name_key: &'static str,
    pub initial_capacity: f64,
    pub manual_reward: f64,
    pub required_stage: usize,
    pub skill: Option<SkillKind>,
    pub tool: Option<ToolKind>,
    pub seasonal: bool,
}

#[derive(Debug, Clone)]
pub struct DistrictSpec {
    pub id: &'static str,
    pub name_key: &'static str,
    pub required_stage: usize,
    pub cost: ResourceDelta,
    /// Passive rate contribution per constructed building.
    pub production_boost: Vec<(ResourceKind, f64)>,
}

#[derive(Debug, Clone)]
pub struct FacilitySpec {
    pub id: &'static str,
    pub name_key: &'static str,
    pub required_stage: usize,
    pub cost: ResourceDelta,
    /// Tenants housed per constructed unit.
    pub capacity: u32,
}

/// Facility id that gates tenant recruitment.
pub const CIVIC_FACILITY_ID: &str = "village-hall";

#[derive(Debug, Clone)]
pub struct Recipe {
    pub id: &'static str,
    pub name_key: &'static str,
    pub required_stage: usize,
    pub cost: ResourceDelta,
    pub craft_secs: u32,
    /// Capacity granted to a resource the player picks on completion.
    pub capacity_boost: f64,
}

#[derive(Debug, Clone)]
pub struct ToolRecipe {
    pub id: &'static str,
    pub name_key: &'static str,
    pub required_stage: usize,
    pub cost: ResourceDelta,
    pub craft_secs: u32,
    pub tool: ToolKind,
    /// Added to the manual harvest reward of matching resources.
    pub harvest_bonus: f64,
    /// Seconds removed from the manual cooldown of matching resources.
    pub cooldown_cut: u32,
}

/// Either half of the crafting catalog, resolved from a recipe id.
#[derive(Debug, Clone, Copy)]
pub enum Craftable<'a> {
    Item(&'a Recipe),
    Tool(&'a ToolRecipe),
}

impl Craftable<'_> {
    pub fn id(&self) -> &'static str {
        match self {
            Craftable::Item(recipe) => recipe.id,
            Craftable::Tool(recipe) => recipe.id,
        }
    }

    pub fn cost(&self) -> &ResourceDelta {
        match self {
            Craftable::Item(recipe) => &recipe.cost,
            Craftable::Tool(recipe) => &recipe.cost,
        }
    }

    pub fn craft_secs(&self) -> u32 {
        match self {
            Craftable::Item(recipe) => recipe.craft_secs,
            Craftable::Tool(recipe) => recipe.craft_secs,
        }
    }

    pub fn required_stage(&self) -> usize {
        match self {
            Craftable::Item(recipe) => recipe.required_stage,
            Craftable::Tool(recipe) => recipe.required_stage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalMetric {
    Amount,
    Capacity,
}

#[derive(Debug, Clone, Copy)]
pub struct StageGoal {
    pub resource: ResourceKind,
    pub target: f64,
    pub metric: GoalMetric,
}

#[derive(Debug, Clone)]
pub struct TutorialStage {
    pub title_key: &'static str,
    pub goals: Vec<StageGoal>,
    pub unlock_keys: Vec<&'static str>,
}

/// Condition union shared by story chapters and storefront gates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    Stage(usize),
    Resource(ResourceKind, f64),
    Milestone(&'static str),
    Purchase(&'static str),
}

#[derive(Debug, Clone)]
pub struct StoryChapter {
    pub id: &'static str,
    pub order: usize,
    pub trigger: Trigger,
    pub objective_key: &'static str,
    pub unlock_key: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoreEffect {
    CapacityBoost(ResourceKind, f64),
    RateBoost(ResourceKind, f64),
    UnlockResource(ResourceKind),
    Charter,
}

#[derive(Debug, Clone)]
pub struct StoreItem {
    pub id: &'static str,
    pub name_key: &'static str,
    pub required_stage: usize,
    pub trigger: Option<Trigger>,
    pub cost: ResourceDelta,
    pub purchase_limit: u32,
    pub effect: StoreEffect,
}

#[derive(Debug, Clone)]
pub struct DirectiveSpec {
    pub id: &'static str,
    pub name_key: &'static str,
    pub required_stage: usize,
    pub cost: ResourceDelta,
    pub resource: ResourceKind,
    pub rate_delta: f64,
    pub duration_ticks: u32,
}

/// The full rule catalog for a session.
#[derive(Debug, Clone)]
pub struct Content {
    pub resources: Vec<ResourceSpec>,
    pub districts: Vec<DistrictSpec>,
    pub facilities: Vec<FacilitySpec>,
    pub recipes: Vec<Recipe>,
    pub tool_recipes: Vec<ToolRecipe>,
    pub stages: Vec<TutorialStage>,
    pub chapters: Vec<StoryChapter>,
    pub store_items: Vec<StoreItem>,
    pub directives: Vec<DirectiveSpec>,
    pub intro_lines: Vec<&'static str>,
}

impl Content {
    pub fn standard() -> Self {
        use ResourceKind::*;

        let resources = vec![
            ResourceSpec {
                kind: Sunleaf,
                name_key: "resource.sunleaf",
                initial_capacity: 40.0,
                manual_reward: 3.0,
                required_stage: 0,
                skill: Some(SkillKind::Farming),
                tool: None,
                seasonal: true,
            },
            ResourceSpec {
                kind: Timber,
                name_key: "resource.timber",
                initial_capacity: 60.0,
                manual_reward: 2.0,
                required_stage: 1,
                skill: Some(SkillKind::Forestry),
                tool: Some(ToolKind::Saw),
                seasonal: false,
            },
            ResourceSpec {
                kind: Stone,
                name_key: "resource.stone",
                initial_capacity: 50.0,
                manual_reward: 2.0,
                required_stage: 2,
                skill: Some(SkillKind::Mining),
                tool: Some(ToolKind::Pickaxe),
                seasonal: false,
            },
            ResourceSpec {
                kind: Fleece,
                name_key: "resource.fleece",
                initial_capacity: 40.0,
                manual_reward: 2.0,
                required_stage: 2,
                skill: Some(SkillKind::Herding),
                tool: Some(ToolKind::Shears),
                seasonal: false,
            },
            ResourceSpec {
                kind: Herbs,
                name_key: "resource.herbs",
                initial_capacity: 30.0,
                manual_reward: 1.5,
                required_stage: 2,
                skill: Some(SkillKind::Foraging),
                tool: None,
                seasonal: false,
            },
            ResourceSpec {
                kind: Crystal,
                name_key: "resource.crystal",
                initial_capacity: 20.0,
                manual_reward: 0.5,
                required_stage: 3,
                skill: None,
                tool: None,
                seasonal: false,
            },
        ];

        let districts = vec![
            DistrictSpec {
                id: "verdant-gardens",
                name_key: "district.verdant-gardens",
                required_stage: 0,
                cost: delta(&[(Sunleaf, -15.0)]),
                production_boost: vec![(Sunleaf, 0.5)],
            },
            DistrictSpec {
                id: "timber-camps",
                name_key: "district.timber-camps",
                required_stage: 1,
                cost: delta(&[(Sunleaf, -20.0), (Timber, -10.0)]),
                production_boost: vec![(Timber, 0.4)],
            },
            DistrictSpec {
                id: "stone-works",
                name_key: "district.stone-works",
                required_stage: 2,
                cost: delta(&[(Timber, -25.0), (Stone, -10.0)]),
                production_boost: vec![(Stone, 0.3), (Timber, 0.1)],
            },
            DistrictSpec {
                id: "crystal-spire",
                name_key: "district.crystal-spire",
                required_stage: 3,
                cost: delta(&[(Stone, -40.0), (Herbs, -20.0)]),
                production_boost: vec![(Crystal, 0.2)],
            },
        ];

        let facilities = vec![
            FacilitySpec {
                id: CIVIC_FACILITY_ID,
                name_key: "facility.village-hall",
                required_stage: 1,
                cost: delta(&[(Timber, -30.0), (Stone, -15.0)]),
                capacity: 2,
            },
            FacilitySpec {
                id: "cottage",
                name_key: "facility.cottage",
                required_stage: 1,
                cost: delta(&[(Timber, -20.0)]),
                capacity: 3,
            },
            FacilitySpec {
                id: "longhouse",
                name_key: "facility.longhouse",
                required_stage: 2,
                cost: delta(&[(Timber, -35.0), (Stone, -20.0)]),
                capacity: 6,
            },
        ];

        let recipes = vec![
            Recipe {
                id: "woven-baskets",
                name_key: "recipe.woven-baskets",
                required_stage: 0,
                cost: delta(&[(Sunleaf, -10.0)]),
                craft_secs: 20,
                capacity_boost: 15.0,
            },
            Recipe {
                id: "storage-shed",
                name_key: "recipe.storage-shed",
                required_stage: 1,
                cost: delta(&[(Timber, -25.0)]),
                craft_secs: 45,
                capacity_boost: 30.0,
            },
            Recipe {
                id: "stone-granary",
                name_key: "recipe.stone-granary",
                required_stage: 2,
                cost: delta(&[(Stone, -30.0), (Timber, -15.0)]),
                craft_secs: 60,
                capacity_boost: 50.0,
            },
        ];

        let tool_recipes = vec![
            ToolRecipe {
                id: "iron-saw",
                name_key: "tool.iron-saw",
                required_stage: 1,
                cost: delta(&[(Stone, -20.0), (Timber, -10.0)]),
                craft_secs: 40,
                tool: ToolKind::Saw,
                harvest_bonus: 2.0,
                cooldown_cut: 10,
            },
            ToolRecipe {
                id: "iron-pickaxe",
                name_key: "tool.iron-pickaxe",
                required_stage: 1,
                cost: delta(&[(Timber, -25.0), (Sunleaf, -10.0)]),
                craft_secs: 40,
                tool: ToolKind::Pickaxe,
                harvest_bonus: 2.0,
                cooldown_cut: 10,
            },
            ToolRecipe {
                id: "steel-shears",
                name_key: "tool.steel-shears",
                required_stage: 2,
                cost: delta(&[(Stone, -25.0), (Timber, -15.0)]),
                craft_secs: 50,
                tool: ToolKind::Shears,
                harvest_bonus: 3.0,
                cooldown_cut: 15,
            },
            ToolRecipe {
                id: "master-saw",
                name_key: "tool.master-saw",
                required_stage: 3,
                cost: delta(&[(Stone, -50.0), (Crystal, -5.0)]),
                craft_secs: 80,
                tool: ToolKind::Saw,
                harvest_bonus: 4.0,
                cooldown_cut: 20,
            },
        ];

        let stages = vec![
            TutorialStage {
                title_key: "stage.gathering-roots",
                goals: vec![StageGoal {
                    resource: Sunleaf,
                    target: 20.0,
                    metric: GoalMetric::Amount,
                }],
                unlock_keys: vec!["unlock.timber", "unlock.districts", "unlock.crafting"],
            },
            TutorialStage {
                title_key: "stage.first-timbers",
                goals: vec![
                    StageGoal {
                        resource: Timber,
                        target: 30.0,
                        metric: GoalMetric::Amount,
                    },
                    StageGoal {
                        resource: Sunleaf,
                        target: 50.0,
                        metric: GoalMetric::Amount,
                    },
                ],
                unlock_keys: vec!["unlock.stone", "unlock.facilities", "unlock.tenants"],
            },
            TutorialStage {
                title_key: "stage.a-growing-valley",
                goals: vec![
                    StageGoal {
                        resource: Sunleaf,
                        target: 70.0,
                        metric: GoalMetric::Capacity,
                    },
                    StageGoal {
                        resource: Stone,
                        target: 40.0,
                        metric: GoalMetric::Amount,
                    },
                ],
                unlock_keys: vec!["unlock.fleece", "unlock.herbs", "unlock.directives"],
            },
            TutorialStage {
                title_key: "stage.the-open-valley",
                goals: Vec::new(),
                unlock_keys: vec!["unlock.crystal"],
            },
        ];

        let chapters = vec![
            StoryChapter {
                id: "awakening",
                order: 0,
                trigger: Trigger::Stage(0),
                objective_key: "chapter.awakening.objective",
                unlock_key: "chapter.awakening.unlock",
            },
            StoryChapter {
                id: "first-harvest",
                order: 1,
                trigger: Trigger::Resource(Sunleaf, 10.0),
                objective_key: "chapter.first-harvest.objective",
                unlock_key: "chapter.first-harvest.unlock",
            },
            StoryChapter {
                id: "the-council-calls",
                order: 2,
                trigger: Trigger::Stage(1),
                objective_key: "chapter.the-council-calls.objective",
                unlock_key: "chapter.the-council-calls.unlock",
            },
            StoryChapter {
                id: "hands-of-the-valley",
                order: 3,
                trigger: Trigger::Milestone(MILESTONE_FIRST_TENANT),
                objective_key: "chapter.hands-of-the-valley.objective",
                unlock_key: "chapter.hands-of-the-valley.unlock",
            },
            StoryChapter {
                id: "the-merchant-road",
                order: 4,
                trigger: Trigger::Purchase("traders-pact"),
                objective_key: "chapter.the-merchant-road.objective",
                unlock_key: "chapter.the-merchant-road.unlock",
            },
            StoryChapter {
                id: "veins-of-crystal",
                order: 5,
                trigger: Trigger::Stage(3),
                objective_key: "chapter.veins-of-crystal.objective",
                unlock_key: "chapter.veins-of-crystal.unlock",
            },
        ];

        let store_items = vec![
            StoreItem {
                id: "traders-pact",
                name_key: "store.traders-pact",
                required_stage: 1,
                trigger: None,
                cost: delta(&[(Sunleaf, -40.0)]),
                purchase_limit: 1,
                effect: StoreEffect::UnlockResource(Herbs),
            },
            StoreItem {
                id: "granary-writ",
                name_key: "store.granary-writ",
                required_stage: 1,
                trigger: None,
                cost: delta(&[(Timber, -20.0), (Sunleaf, -20.0)]),
                purchase_limit: 3,
                effect: StoreEffect::CapacityBoost(Sunleaf, 10.0),
            },
            StoreItem {
                id: "charter-of-the-valley",
                name_key: "store.charter-of-the-valley",
                required_stage: 2,
                trigger: Some(Trigger::Milestone(MILESTONE_FIRST_DISTRICT)),
                cost: delta(&[(Stone, -30.0), (Timber, -30.0)]),
                purchase_limit: 1,
                effect: StoreEffect::Charter,
            },
            StoreItem {
                id: "festival-banner",
                name_key: "store.festival-banner",
                required_stage: 2,
                trigger: None,
                cost: delta(&[(Fleece, -10.0)]),
                purchase_limit: 5,
                effect: StoreEffect::RateBoost(Sunleaf, 0.2),
            },
            StoreItem {
                id: "crystal-lens",
                name_key: "store.crystal-lens",
                required_stage: 3,
                trigger: Some(Trigger::Purchase("charter-of-the-valley")),
                cost: delta(&[(Crystal, -10.0)]),
                purchase_limit: 1,
                effect: StoreEffect::CapacityBoost(Crystal, 10.0),
            },
        ];

        let directives = vec![
            DirectiveSpec {
                id: "logging-drive",
                name_key: "directive.logging-drive",
                required_stage: 1,
                cost: delta(&[(Sunleaf, -10.0)]),
                resource: Timber,
                rate_delta: 1.0,
                duration_ticks: 8,
            },
            DirectiveSpec {
                id: "harvest-festival",
                name_key: "directive.harvest-festival",
                required_stage: 1,
                cost: delta(&[(Sunleaf, -15.0)]),
                resource: Sunleaf,
                rate_delta: 1.5,
                duration_ticks: 12,
            },
            DirectiveSpec {
                id: "quarry-surge",
                name_key: "directive.quarry-surge",
                required_stage: 2,
                cost: delta(&[(Sunleaf, -20.0)]),
                resource: Stone,
                rate_delta: 1.0,
                duration_ticks: 8,
            },
        ];

        Self {
            resources,
            districts,
            facilities,
            recipes,
            tool_recipes,
            stages,
            chapters,
            store_items,
            directives,
            intro_lines: vec!["intro.0", "intro.1", "intro.2", "intro.3", "intro.4"],
        }
    }

    pub fn resource(&self, kind: ResourceKind) -> &ResourceSpec {
        self.resources
            .iter()
            .find(|spec| spec.kind == kind)
            .expect("every resource kind has a catalog entry")
    }

    pub fn district(&self, id: &str) -> Option<&DistrictSpec> {
        self.districts.iter().find(|spec| spec.id == id)
    }

    pub fn facility(&self, id: &str) -> Option<&FacilitySpec> {
        self.facilities.iter().find(|spec| spec.id == id)
    }

    pub fn recipe(&self, id: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|recipe| recipe.id == id)
    }

    pub fn tool_recipe(&self, id: &str) -> Option<&ToolRecipe> {
        self.tool_recipes.iter().find(|recipe| recipe.id == id)
    }

    /// Resolve a crafting id against both halves of the catalog.
    pub fn craftable(&self, id: &str) -> Option<Craftable<'_>> {
        if let Some(recipe) = self.recipe(id) {
            return Some(Craftable::Item(recipe));
        }
        self.tool_recipe(id).map(Craftable::Tool)
    }

    pub fn stage(&self, index: usize) -> Option<&TutorialStage> {
        self.stages.get(index)
    }

    pub fn final_stage(&self) -> usize {
        self.stages.len().saturating_sub(1)
    }

    pub fn store_item(&self, id: &str) -> Option<&StoreItem> {
        self.store_items.iter().find(|item| item.id == id)
    }

    pub fn directive(&self, id: &str) -> Option<&DirectiveSpec> {
        self.directives.iter().find(|spec| spec.id == id)
    }
}
