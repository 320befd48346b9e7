//! Story chapter unlocks, driven by declarative triggers scanned after
//! every state change.

use crate::content::{Content, Trigger};
use crate::state::GameState;

pub fn trigger_met(state: &GameState, trigger: &Trigger) -> bool {
    match trigger {
        Trigger::Stage(stage) => state.stage_index >= *stage,
        Trigger::Resource(kind, amount) => state.resource(*kind).amount >= *amount,
        Trigger::Milestone(label) => state.milestones.contains(*label),
        Trigger::Purchase(item) => state.completed_purchases.contains(*item),
    }
}

/// Scan every still-locked chapter and unlock all newly satisfied ones as a
/// batch, in catalog order. The last chapter of the batch becomes the active
/// one. Unlocks are append-only; a chapter is never re-evaluated.
pub fn evaluate(state: &mut GameState, content: &Content) -> usize {
    let mut unlocked = 0;
    for chapter in &content.chapters {
        if state.unlocked_chapters.iter().any(|id| id == chapter.id) {
            continue;
        }
        if !trigger_met(state, &chapter.trigger) {
            continue;
        }
        state.unlocked_chapters.push(chapter.id.to_string());
        state.active_chapter_id = Some(chapter.id.to_string());
        state.push_log(format!("log.chapter.{}", chapter.id));
        unlocked += 1;
    }
    unlocked
}
