//! Tutorial stage machine. Goal checks fire on every state change; an
//! advance is dispatched at most once per target stage and committed later
//! by a deferred, cancellable task rather than synchronously.

use crate::content::{Content, GoalMetric, StageGoal};
use crate::state::GameState;

pub fn goal_met(state: &GameState, goal: &StageGoal) -> bool {
    let resource = state.resource(goal.resource);
    match goal.metric {
        GoalMetric::Amount => resource.amount >= goal.target,
        GoalMetric::Capacity => resource.capacity >= goal.target,
    }
}

/// Tracks the dispatched-but-uncommitted stage transition. The
/// `last_dispatched` marker deduplicates re-fired goal checks; `pending` is
/// the target the deferred commit task will apply.
#[derive(Debug, Default)]
pub struct StageScheduler {
    last_dispatched: Option<usize>,
    pending: Option<usize>,
}

impl StageScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<usize> {
        self.pending
    }

    /// Check the active stage's goals. Returns the target stage when a new
    /// deferred commit should be scheduled; re-evaluations before the
    /// commit fires return `None`.
    pub fn evaluate(&mut self, state: &mut GameState, content: &Content) -> Option<usize> {
        if state.stage_index >= content.final_stage() {
            return None;
        }
        let stage = content.stage(state.stage_index)?;
        if stage.goals.is_empty() || !stage.goals.iter().all(|goal| goal_met(state, goal)) {
            return None;
        }
        let target = state.stage_index + 1;
        if self.last_dispatched == Some(target) {
            return None;
        }
        self.last_dispatched = Some(target);
        self.pending = Some(target);
        state.push_log(format!("log.stage-advance.{target}"));
        Some(target)
    }

    /// Apply a deferred transition. Stale targets (superseded by a load or
    /// an earlier commit) are ignored.
    pub fn commit(&mut self, state: &mut GameState, target: usize) -> bool {
        if self.pending != Some(target) {
            return false;
        }
        self.pending = None;
        if target <= state.stage_index {
            return false;
        }
        state.stage_index = target;
        state.show_tutorial = true;
        true
    }

    /// Forget any in-flight transition; used when the whole state is
    /// replaced by a load or a new game.
    pub fn reset(&mut self) {
        self.last_dispatched = None;
        self.pending = None;
    }
}
