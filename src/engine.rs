//! The engine owns the session: one state aggregate, the rule catalog, the
//! session RNG, and the deferred stage transition. Timer pipelines and user
//! actions all funnel through here, and each mutating entry point ends with
//! the same evaluation pass (tutorial goals, then story triggers).

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::content::{Content, ResourceKind};
use crate::save::{self, CodecError};
use crate::state::{GameState, Language};
use crate::tutorial::StageScheduler;
use crate::{crafting, directives, districts, ledger, store, story, tenants};

/// Everything a player can do. Precondition failures apply nothing, log
/// nothing, and report `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    Harvest { resource: ResourceKind },
    AssignWorker { resource: ResourceKind },
    UnassignWorker { resource: ResourceKind },
    StartCraft { recipe: String },
    AllocateBoost { resource: ResourceKind },
    ExpandDistrict { district: String },
    DemolishDistrict { district: String },
    BuildFacility { facility: String },
    SelectFacility { facility: Option<String> },
    RecruitTenants,
    AssignTenants,
    ToggleAutoPay,
    PayWages,
    ExecuteDirective { directive: String },
    Purchase { item: String },
    AdvanceIntro,
    DismissTutorial,
    SetLanguage { language: Language },
}

pub struct Engine {
    content: Content,
    state: GameState,
    scheduler: StageScheduler,
    rng: ChaCha8Rng,
}

impl Engine {
    pub fn new(content: Content) -> Self {
        let rng = ChaCha8Rng::from_entropy();
        Self::with_rng(content, rng)
    }

    /// Fixed-seed construction for reproducible sessions.
    pub fn with_seed(content: Content, seed: u64) -> Self {
        Self::with_rng(content, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(content: Content, rng: ChaCha8Rng) -> Self {
        let state = GameState::new(&content);
        let mut engine = Self {
            content,
            state,
            scheduler: StageScheduler::new(),
            rng,
        };
        engine.evaluate();
        engine
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Target of the scheduled-but-uncommitted stage transition, if any.
    /// The runtime arms the deferred commit timer off this.
    pub fn pending_stage(&self) -> Option<usize> {
        self.scheduler.pending()
    }

    /// The 5s production timer runs only while the intro dialogue is away.
    pub fn phase_timer_wanted(&self) -> bool {
        !self.state.show_intro_dialogue
    }

    /// The 1s timer runs only while something is actually counting down.
    pub fn second_timer_wanted(&self) -> bool {
        self.state.manual_cooldowns.values().any(|secs| *secs > 0)
            || self.state.tenant_recruit_cooldown > 0
            || self.state.tenant_timeout > 0
            || self.state.crafting_recipe.is_some()
    }

    pub fn apply(&mut self, action: Action) -> bool {
        let applied = match action {
            Action::Harvest { resource } => {
                ledger::manual_harvest(&mut self.state, &self.content, resource)
            }
            Action::AssignWorker { resource } => {
                tenants::assign_worker(&mut self.state, &self.content, resource)
            }
            Action::UnassignWorker { resource } => {
                tenants::unassign_worker(&mut self.state, resource)
            }
            Action::StartCraft { recipe } => {
                crafting::start(&mut self.state, &self.content, &recipe)
            }
            Action::AllocateBoost { resource } => {
                crafting::allocate_boost(&mut self.state, &self.content, resource)
            }
            Action::ExpandDistrict { district } => {
                districts::expand(&mut self.state, &self.content, &district)
            }
            Action::DemolishDistrict { district } => {
                districts::demolish(&mut self.state, &district)
            }
            Action::BuildFacility { facility } => {
                tenants::build_facility(&mut self.state, &self.content, &facility)
            }
            Action::SelectFacility { facility } => {
                tenants::select_facility(&mut self.state, &self.content, facility.as_deref())
            }
            Action::RecruitTenants => tenants::recruit(&mut self.state),
            Action::AssignTenants => tenants::assign_pending(&mut self.state, &self.content),
            Action::ToggleAutoPay => {
                self.state.auto_pay_wages = !self.state.auto_pay_wages;
                true
            }
            Action::PayWages => tenants::pay_wages(&mut self.state),
            Action::ExecuteDirective { directive } => {
                directives::execute(&mut self.state, &self.content, &directive)
            }
            Action::Purchase { item } => {
                store::purchase(&mut self.state, &self.content, &item)
            }
            Action::AdvanceIntro => self.advance_intro(),
            Action::DismissTutorial => {
                if self.state.show_tutorial {
                    self.state.show_tutorial = false;
                    true
                } else {
                    false
                }
            }
            Action::SetLanguage { language } => {
                self.state.language = language;
                true
            }
        };
        if applied {
            self.evaluate();
        }
        applied
    }

    fn advance_intro(&mut self) -> bool {
        if !self.state.show_intro_dialogue {
            return false;
        }
        self.state.intro_index += 1;
        if self.state.intro_index >= self.content.intro_lines.len() {
            self.state.show_intro_dialogue = false;
        }
        true
    }

    /// The 5s pipeline: advance the tick counter, produce (every tick after
    /// the first), expire boosts, settle the day when it rolls over.
    pub fn phase_tick(&mut self) {
        let previous_day = self.state.day();
        self.state.tick += 1;
        if self.state.tick > 1 {
            ledger::produce(&mut self.state, &self.content);
        }
        directives::tick_boosts(&mut self.state);
        if self.state.day() > previous_day {
            tenants::process_new_day(&mut self.state, &mut self.rng);
        }
        self.evaluate();
        for violation in self.state.invariant_violations() {
            warn!(%violation, tick = self.state.tick, "state invariant violated");
        }
    }

    /// The 1s pipeline: manual-harvest cooldowns, tenant countdowns, and
    /// crafting progress. Runs regardless of the intro dialogue, so crafts
    /// keep finishing while production is suspended.
    pub fn second_tick(&mut self) {
        for kind in ResourceKind::ALL {
            let Some(secs) = self.state.manual_cooldowns.get_mut(&kind) else {
                continue;
            };
            if *secs > 0 {
                *secs -= 1;
                if *secs == 0 {
                    self.state.manual_harvest_active.insert(kind, false);
                }
            }
        }
        tenants::tick_countdowns(&mut self.state);
        crafting::tick_progress(&mut self.state, &self.content);
        self.evaluate();
    }

    /// Deferred stage transition, fired by the runtime after the commit
    /// delay. Stale targets are ignored.
    pub fn commit_stage(&mut self, target: usize) -> bool {
        let committed = self.scheduler.commit(&mut self.state, target);
        if committed {
            self.evaluate();
        }
        committed
    }

    pub fn export(&self) -> Result<String, CodecError> {
        save::encode(&self.state)
    }

    /// Replace the whole session state from a save document. In-flight
    /// transitions are forgotten with the old state.
    pub fn import(&mut self, raw: &str) -> Result<(), CodecError> {
        let state = save::decode(&self.content, raw)?;
        self.state = state;
        self.scheduler.reset();
        self.evaluate();
        Ok(())
    }

    pub fn new_game(&mut self) {
        self.state = GameState::new(&self.content);
        self.scheduler.reset();
        self.evaluate();
    }

    fn evaluate(&mut self) {
        self.scheduler.evaluate(&mut self.state, &self.content);
        story::evaluate(&mut self.state, &self.content);
    }

    pub fn frame(&self) -> Frame<'_> {
        Frame {
            state: &self.state,
            day: self.state.day(),
            phase: self.state.phase(),
            season: self.state.season_index(),
            total_housing: self.state.total_housing(&self.content),
            available_housing: self.state.available_housing(&self.content),
            idle_workers: self.state.idle_workers(),
            pending_stage: self.scheduler.pending(),
        }
    }
}

/// Wire view of a session: the serialized state plus the derived values the
/// UI renders directly.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame<'a> {
    #[serde(flatten)]
    pub state: &'a GameState,
    pub day: u64,
    pub phase: u64,
    pub season: usize,
    pub total_housing: u32,
    pub available_housing: u32,
    pub idle_workers: u32,
    pub pending_stage: Option<usize>,
}
