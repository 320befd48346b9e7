//! Single-slot crafting. Costs are charged at start; progress counts whole
//! seconds; finished items park a capacity grant until the player picks a
//! target resource, finished tools equip themselves.

use crate::content::{
    Content, Craftable, ResourceKind, MILESTONE_FIRST_CRAFT, MILESTONE_FIRST_TOOL,
};
use crate::ledger;
use crate::state::{GameState, PendingBoost};

/// Start a craft. The slot must be free, the recipe stage-unlocked, and the
/// cost affordable; the cost is deducted immediately.
pub fn start(state: &mut GameState, content: &Content, id: &str) -> bool {
    if state.crafting_recipe.is_some() {
        return false;
    }
    let Some(craftable) = content.craftable(id) else {
        return false;
    };
    if state.stage_index < craftable.required_stage() {
        return false;
    }
    if !ledger::can_afford(state, craftable.cost()) {
        return false;
    }
    ledger::apply_delta(state, craftable.cost());
    state.crafting_recipe = Some(craftable.id().to_string());
    state.crafting_progress = 0;
    state.push_log(format!("log.craft-start.{}", craftable.id()));
    true
}

/// Advance the active craft by one second, completing it when the recipe's
/// craft time is reached. No-op while the slot is empty.
pub fn tick_progress(state: &mut GameState, content: &Content) {
    let Some(id) = state.crafting_recipe.clone() else {
        return;
    };
    let Some(craftable) = content.craftable(&id) else {
        // Recipe vanished from the catalog (stale save); drop the craft.
        state.crafting_recipe = None;
        state.crafting_progress = 0;
        return;
    };
    state.crafting_progress += 1;
    if state.crafting_progress < craftable.craft_secs() {
        return;
    }

    match craftable {
        Craftable::Item(recipe) => {
            state.pending_boosts.push_back(PendingBoost {
                recipe_id: recipe.id.to_string(),
                amount: recipe.capacity_boost,
            });
        }
        Craftable::Tool(recipe) => {
            state.equipped_tools.insert(recipe.tool, recipe.id.to_string());
            state.milestones.insert(MILESTONE_FIRST_TOOL.to_string());
        }
    }
    state.milestones.insert(MILESTONE_FIRST_CRAFT.to_string());
    state.crafting_recipe = None;
    state.crafting_progress = 0;
    state.push_log(format!("log.craft-complete.{id}"));
}

/// Aim the oldest pending capacity grant at a resource the player picked.
pub fn allocate_boost(state: &mut GameState, content: &Content, kind: ResourceKind) -> bool {
    if !state.resource_visible(content, kind) {
        return false;
    }
    let Some(boost) = state.pending_boosts.pop_front() else {
        return false;
    };
    ledger::apply_capacity_delta(state, kind, boost.amount);
    state.push_log(format!("log.capacity-boost.{}", kind.key()));
    true
}
