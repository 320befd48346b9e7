//! Storefront: one-off and limited-count purchases of permanent effects,
//! gated by stage, an optional trigger, affordability, and a per-item limit.

use crate::content::{Content, StoreEffect};
use crate::ledger;
use crate::state::GameState;
use crate::story;

pub fn purchase(state: &mut GameState, content: &Content, id: &str) -> bool {
    let Some(item) = content.store_item(id) else {
        return false;
    };
    if state.stage_index < item.required_stage {
        return false;
    }
    if let Some(trigger) = &item.trigger {
        if !story::trigger_met(state, trigger) {
            return false;
        }
    }
    let bought = state.purchase_counts.get(item.id).copied().unwrap_or(0);
    if bought >= item.purchase_limit {
        return false;
    }
    if !ledger::can_afford(state, &item.cost) {
        return false;
    }

    ledger::apply_delta(state, &item.cost);
    *state.purchase_counts.entry(item.id.to_string()).or_insert(0) += 1;
    state.completed_purchases.insert(item.id.to_string());
    match item.effect {
        StoreEffect::CapacityBoost(kind, amount) => {
            ledger::apply_capacity_delta(state, kind, amount);
        }
        StoreEffect::RateBoost(kind, amount) => {
            ledger::apply_rate_delta(state, kind, amount);
        }
        StoreEffect::UnlockResource(kind) => {
            state.manually_unlocked_resources.insert(kind);
        }
        StoreEffect::Charter => {
            state.civilization_level += 1;
        }
    }
    state.push_log(format!("log.purchase.{id}"));
    true
}
