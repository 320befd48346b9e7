//! District expansion and the passive production they feed into the ledger.

use crate::content::{Content, ResourceKind, MILESTONE_FIRST_DISTRICT};
use crate::ledger;
use crate::state::GameState;

/// Per-day passive contribution for one resource: boost per building times
/// building count, summed across all districts.
pub fn passive_rate(state: &GameState, content: &Content, kind: ResourceKind) -> f64 {
    content
        .districts
        .iter()
        .map(|spec| {
            let count = state
                .district(spec.id)
                .map(|district| district.building_count)
                .unwrap_or(0);
            spec.production_boost
                .iter()
                .filter(|(boosted, _)| *boosted == kind)
                .map(|(_, rate)| rate * count as f64)
                .sum::<f64>()
        })
        .sum()
}

/// Build one more building in a district. Gated by stage and affordability.
pub fn expand(state: &mut GameState, content: &Content, id: &str) -> bool {
    let Some(spec) = content.district(id) else {
        return false;
    };
    if state.stage_index < spec.required_stage {
        return false;
    }
    if !ledger::can_afford(state, &spec.cost) {
        return false;
    }
    ledger::apply_delta(state, &spec.cost);
    if let Some(district) = state.district_mut(id) {
        district.building_count += 1;
    }
    state.milestones.insert(MILESTONE_FIRST_DISTRICT.to_string());
    state.push_log(format!("log.district-expand.{id}"));
    true
}

/// Tear one building down. The construction cost is never refunded.
pub fn demolish(state: &mut GameState, id: &str) -> bool {
    let Some(district) = state.district_mut(id) else {
        return false;
    };
    if district.building_count == 0 {
        return false;
    }
    district.building_count -= 1;
    state.push_log(format!("log.district-demolish.{id}"));
    true
}
