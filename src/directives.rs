//! Council directives: paid, timed production boosts with tick-based expiry.

use crate::content::{Content, ResourceKind};
use crate::ledger;
use crate::state::{ActiveBoost, GameState};

/// Summed rate delta of every boost currently targeting a resource. Read by
/// the ledger at production time; boosts never touch the stored baseline.
pub fn boost_rate(state: &GameState, kind: ResourceKind) -> f64 {
    state
        .active_boosts
        .values()
        .filter(|boost| boost.resource == kind)
        .map(|boost| boost.rate_delta)
        .sum()
}

/// Issue a directive. Re-issuing one whose boost is still running charges
/// the full cost again and resets the remaining duration.
pub fn execute(state: &mut GameState, content: &Content, id: &str) -> bool {
    let Some(spec) = content.directive(id) else {
        return false;
    };
    if state.stage_index < spec.required_stage {
        return false;
    }
    if !ledger::can_afford(state, &spec.cost) {
        return false;
    }
    ledger::apply_delta(state, &spec.cost);
    state.active_boosts.insert(
        spec.id.to_string(),
        ActiveBoost {
            resource: spec.resource,
            rate_delta: spec.rate_delta,
            remaining_ticks: spec.duration_ticks,
            total_ticks: spec.duration_ticks,
        },
    );
    state.push_log(format!("log.directive.{id}"));
    true
}

/// Count one tick off every active boost, dropping the expired ones.
pub fn tick_boosts(state: &mut GameState) {
    let mut expired = Vec::new();
    for (id, boost) in state.active_boosts.iter_mut() {
        boost.remaining_ticks = boost.remaining_ticks.saturating_sub(1);
        if boost.remaining_ticks == 0 {
            expired.push(id.clone());
        }
    }
    for id in expired {
        state.active_boosts.remove(&id);
        state.push_log(format!("log.directive-expired.{id}"));
    }
}
