//! Resource ledger: clamped delta application, affordability checks, tick
//! production, and manual harvesting with skill experience.
//!
//! All mutations here are total. Callers gate affordability with
//! [`can_afford`] before applying a cost; the ledger itself never validates.

use crate::content::{
    Content, ResourceDelta, ResourceKind, ResourceSpec, SkillKind,
    HARVEST_EXPERIENCE, MANUAL_COOLDOWN_FLOOR_SECS, MANUAL_COOLDOWN_SECS,
    SKILL_LEVEL_CAP, TICKS_PER_DAY,
};
use crate::state::GameState;
use crate::{directives, districts};

/// Amounts are kept to one decimal after every mutation.
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Apply a signed per-resource delta. Each touched amount is clamped into
/// `[0, capacity]` and rounded; zero entries are skipped.
pub fn apply_delta(state: &mut GameState, delta: &ResourceDelta) {
    for (kind, change) in delta {
        if *change == 0.0 {
            continue;
        }
        let resource = state.resource_mut(*kind);
        let next = (resource.amount + change).clamp(0.0, resource.capacity);
        resource.amount = round_tenth(next);
    }
}

/// True when every negative entry of the delta is covered by the current
/// amount. Positive entries never block.
pub fn can_afford(state: &GameState, delta: &ResourceDelta) -> bool {
    delta.iter().all(|(kind, change)| {
        *change >= 0.0 || state.resource(*kind).amount + change >= 0.0
    })
}

pub fn apply_rate_delta(state: &mut GameState, kind: ResourceKind, delta: f64) {
    state.resource_mut(kind).rate += delta;
}

/// Capacity floors at zero; the amount is re-clamped into the new bound.
pub fn apply_capacity_delta(state: &mut GameState, kind: ResourceKind, delta: f64) {
    let resource = state.resource_mut(kind);
    resource.capacity = (resource.capacity + delta).max(0.0);
    if resource.amount > resource.capacity {
        resource.amount = resource.capacity;
    }
}

/// One production step. The total per-day rate of a resource is its baseline
/// scaled by assigned workers, plus district contributions, plus any active
/// directive boosts; the seasonal resource is further scaled by the current
/// season multiplier. The per-tick increment divides the day rate by
/// `TICKS_PER_DAY`.
pub fn produce(state: &mut GameState, content: &Content) {
    let mut delta = ResourceDelta::new();
    for spec in &content.resources {
        let resource = state.resource(spec.kind);
        let mut day_rate = resource.rate * state.workers_on(spec.kind) as f64
            + districts::passive_rate(state, content, spec.kind)
            + directives::boost_rate(state, spec.kind);
        if spec.seasonal {
            day_rate *= state.season_multiplier();
        }
        let increment = day_rate / TICKS_PER_DAY as f64;
        if increment != 0.0 {
            delta.insert(spec.kind, increment);
        }
    }
    apply_delta(state, &delta);
}

/// Harvest bonus and cooldown cut granted by the tool equipped in the slot a
/// resource responds to. Bare hands give (0, 0).
pub fn equipped_tool_effects(
    state: &GameState,
    content: &Content,
    spec: &ResourceSpec,
) -> (f64, u32) {
    let Some(slot) = spec.tool else {
        return (0.0, 0);
    };
    state
        .equipped_tools
        .get(&slot)
        .and_then(|id| content.tool_recipe(id))
        .map(|tool| (tool.harvest_bonus, tool.cooldown_cut))
        .unwrap_or((0.0, 0))
}

/// Manual harvest: rejected while the resource is hidden or cooling down;
/// otherwise grants the reward, starts one cooldown window, and awards skill
/// experience.
pub fn manual_harvest(state: &mut GameState, content: &Content, kind: ResourceKind) -> bool {
    let spec = content.resource(kind);
    if !state.resource_visible(content, kind) {
        return false;
    }
    if state.manual_cooldowns.get(&kind).copied().unwrap_or(0) > 0 {
        return false;
    }

    let (bonus, cut) = equipped_tool_effects(state, content, spec);
    let reward = spec.manual_reward + bonus;
    apply_delta(state, &ResourceDelta::from([(kind, reward)]));

    let cooldown = MANUAL_COOLDOWN_SECS
        .saturating_sub(cut)
        .max(MANUAL_COOLDOWN_FLOOR_SECS);
    state.manual_cooldowns.insert(kind, cooldown);
    state.manual_harvest_active.insert(kind, true);

    if let Some(skill) = spec.skill {
        award_experience(state, skill);
    }
    state.push_log(format!("log.harvest.{}", kind.key()));
    true
}

/// Add harvest experience, rolling overflow into the next level until the
/// threshold (`level * 100`) is no longer met or the level cap is reached.
pub fn award_experience(state: &mut GameState, kind: SkillKind) {
    let skill = state
        .skills
        .get_mut(&kind)
        .expect("all skill kinds seeded at start");
    skill.experience += HARVEST_EXPERIENCE;
    let mut leveled = false;
    while skill.level < SKILL_LEVEL_CAP && skill.experience >= skill.level * 100 {
        skill.experience -= skill.level * 100;
        skill.level += 1;
        leveled = true;
    }
    if leveled {
        let level = skill.level;
        state.push_log(format!("log.skill-up.{}.{}", kind.key(), level));
    }
}
