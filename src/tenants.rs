//! Tenant and housing lifecycle: facility construction, recruitment with an
//! acceptance timeout, housing-gated assignment, daily wages, morale, and
//! morale-driven attrition with forced worker unassignment.

use rand::Rng;

use crate::content::{
    delta, Content, ResourceKind, ATTRITION_CHANCE, CIVIC_FACILITY_ID,
    LOW_MORALE_THRESHOLD, MILESTONE_FIRST_TENANT, MORALE_START, PENDING_TIMEOUT_SECS,
    PRIMARY_RESOURCE, RECRUIT_BATCH, RECRUIT_COOLDOWN_SECS, UNPAID_MORALE_PENALTY,
    WAGE_PER_TENANT,
};
use crate::ledger;
use crate::state::GameState;

pub fn build_facility(state: &mut GameState, content: &Content, id: &str) -> bool {
    let Some(spec) = content.facility(id) else {
        return false;
    };
    if state.stage_index < spec.required_stage {
        return false;
    }
    if !ledger::can_afford(state, &spec.cost) {
        return false;
    }
    ledger::apply_delta(state, &spec.cost);
    *state.facility_counts.entry(spec.id.to_string()).or_insert(0) += 1;
    state.push_log(format!("log.facility-build.{id}"));
    true
}

pub fn select_facility(state: &mut GameState, content: &Content, id: Option<&str>) -> bool {
    match id {
        None => {
            state.selected_facility_id = None;
            true
        }
        Some(id) => {
            if content.facility(id).is_none() {
                return false;
            }
            state.selected_facility_id = Some(id.to_string());
            true
        }
    }
}

/// Call in another batch of settlers. Needs a built village hall and a
/// rested recruitment cooldown; the batch waits on an acceptance timeout.
pub fn recruit(state: &mut GameState) -> bool {
    if state.facility_count(CIVIC_FACILITY_ID) == 0 {
        return false;
    }
    if state.tenant_recruit_cooldown > 0 {
        return false;
    }
    state.pending_tenants += RECRUIT_BATCH;
    state.tenant_timeout = PENDING_TIMEOUT_SECS;
    state.tenant_recruit_cooldown = RECRUIT_COOLDOWN_SECS;
    state.push_log(format!("log.tenants-arrived.{RECRUIT_BATCH}"));
    true
}

/// Move as many pending settlers into housing as capacity allows. Any
/// assignment, even a partial one, zeroes the acceptance timeout; leftover
/// pending settlers simply stop counting down.
pub fn assign_pending(state: &mut GameState, content: &Content) -> bool {
    let moved = state.pending_tenants.min(state.available_housing(content));
    if moved == 0 {
        return false;
    }
    state.pending_tenants -= moved;
    state.assigned_tenants += moved;
    state
        .tenant_morale
        .extend(std::iter::repeat(MORALE_START).take(moved as usize));
    state.tenant_timeout = 0;
    state.milestones.insert(MILESTONE_FIRST_TENANT.to_string());
    state.push_log(format!("log.tenants-assigned.{moved}"));
    true
}

/// One second off the recruitment cooldown and the acceptance timeout.
/// Pending settlers still waiting when the timeout runs out are discarded.
pub fn tick_countdowns(state: &mut GameState) {
    if state.tenant_recruit_cooldown > 0 {
        state.tenant_recruit_cooldown -= 1;
    }
    if state.tenant_timeout > 0 {
        state.tenant_timeout -= 1;
        if state.tenant_timeout == 0 && state.pending_tenants > 0 {
            let lost = state.pending_tenants;
            state.pending_tenants = 0;
            state.push_log(format!("log.tenants-departed.{lost}"));
        }
    }
}

/// Put an idle tenant to work on a visible resource.
pub fn assign_worker(state: &mut GameState, content: &Content, kind: ResourceKind) -> bool {
    if state.idle_workers() == 0 {
        return false;
    }
    if !state.resource_visible(content, kind) {
        return false;
    }
    let workers = state.workers_on(kind);
    state.resource_workers.insert(kind, workers + 1);
    true
}

pub fn unassign_worker(state: &mut GameState, kind: ResourceKind) -> bool {
    let workers = state.workers_on(kind);
    if workers == 0 {
        return false;
    }
    state.resource_workers.insert(kind, workers - 1);
    true
}

/// Strip workers from resources in enumeration order until the excess over
/// the remaining tenant count is absorbed.
fn force_unassign(state: &mut GameState, mut excess: u32) {
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

/// Pay this day's wages by hand. Rejected when there is nothing to pay or
/// the primary resource cannot cover it.
pub fn pay_wages(state: &mut GameState) -> bool {
    if state.assigned_tenants == 0 {
        return false;
    }
    let bill = wage_bill(state);
    if !ledger::can_afford(state, &bill) {
        return false;
    }
    ledger::apply_delta(state, &bill);
    state.last_pay_day = state.day();
    state.push_log("log.wages-paid");
    true
}

fn wage_bill(state: &GameState) -> crate::content::ResourceDelta {
    delta(&[(
        PRIMARY_RESOURCE,
        -(state.assigned_tenants as f64 * WAGE_PER_TENANT),
    )])
}

/// Daily settlement, run when the tick counter crosses into a new day:
/// auto-pay wages if enabled and covered, punish a fully skipped day with a
/// morale drop, then roll attrition for every unhappy tenant.
pub fn process_new_day(state: &mut GameState, rng: &mut impl Rng) {
    let day = state.day();
    if state.assigned_tenants > 0 {
        if state.auto_pay_wages && day > state.last_pay_day {
            let bill = wage_bill(state);
            if ledger::can_afford(state, &bill) {
                ledger::apply_delta(state, &bill);
                state.last_pay_day = day;
                state.push_log("log.wages-paid");
            }
        }
        if day > state.last_pay_day + 1 {
            for morale in &mut state.tenant_morale {
                *morale = morale.saturating_sub(UNPAID_MORALE_PENALTY);
            }
            state.push_log("log.wages-missed");
        }
    }
    attrition(state, rng);
}

/// Each tenant below the morale threshold independently departs with a
/// fixed chance. Departures shrink the morale roster and may force workers
/// off resources.
fn attrition(state: &mut GameState, rng: &mut impl Rng) {
    let mut remaining = Vec::with_capacity(state.tenant_morale.len());
    let mut departed: u32 = 0;
    for &morale in &state.tenant_morale {
        if morale < LOW_MORALE_THRESHOLD && rng.gen_range(0.0..1.0) < ATTRITION_CHANCE {
            departed += 1;
        } else {
            remaining.push(morale);
        }
    }
    if departed == 0 {
        return;
    }
    state.tenant_morale = remaining;
    state.assigned_tenants = state.assigned_tenants.saturating_sub(departed);
    state.push_log(format!("log.tenants-left.{departed}"));

    let excess = state.busy_workers().saturating_sub(state.assigned_tenants);
    if excess > 0 {
        force_unassign(state, excess);
    }
}
