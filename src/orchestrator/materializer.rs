//! Schedule Materializer
//!
//! Turns a plan into calendar entry candidates. Break blocks stay in the plan
//! for display but are never proposed for the calendar.

use crate::orchestrator::constants::ENTRY_ID_PREFIX;
use crate::orchestrator::plan_types::{
    block_time, Category, CognitiveLoad, EnergyLevel, Priority, ScheduleBlock,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A calendar entry the user can approve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedEntry {
    /// Stable id: `evt_<1-based index of the source block>`
    pub id: String,
    /// Title copied from the block
    pub title: String,
    /// Local start time
    #[serde(with = "block_time")]
    pub start: NaiveDateTime,
    /// Local end time
    #[serde(with = "block_time")]
    pub end: NaiveDateTime,
    /// Length in minutes
    pub duration_minutes: i64,
    /// Block category
    pub category: Category,
    /// Block priority
    pub priority: Priority,
    /// Energy the block demands
    pub energy_level: EnergyLevel,
    /// Cognitive load of the block
    pub cognitive_load: CognitiveLoad,
    /// Tags copied from the block
    pub tags: Vec<String>,
    /// Rationale copied from the block
    pub rationale: String,
    /// Calendar description carrying the planning metadata
    pub description: String,
}

/// Build the calendar description for a block
pub fn describe_block(block: &ScheduleBlock) -> String {
    let mut lines = vec![
        format!("Priority: {}", block.priority),
        format!("Category: {}", block.category),
        format!("Energy level: {}", block.energy_level),
        format!("Cognitive load: {}", block.cognitive_load),
    ];
    if !block.tags.is_empty() {
        lines.push(format!("Tags: {}", block.tags.join(", ")));
    }
    if !block.rationale.trim().is_empty() {
        lines.push(String::new());
        lines.push(format!("Rationale: {}", block.rationale.trim()));
    }
    lines.join("\n")
}

/// Derive proposed calendar entries from a plan
///
/// One entry per non-break block, in plan order. Ids use the block's position
/// in the full plan, so they do not shift when breaks are filtered out.
pub fn materialize(plan: &[ScheduleBlock]) -> Vec<ProposedEntry> {
    plan.iter()
        .enumerate()
        .filter(|(_, block)| !block.is_break())
        .map(|(idx, block)| ProposedEntry {
            id: format!("{}{}", ENTRY_ID_PREFIX, idx + 1),
            title: block.title.clone(),
            start: block.start,
            end: block.end,
            duration_minutes: block.duration_minutes(),
            category: block.category,
            priority: block.priority,
            energy_level: block.energy_level,
            cognitive_load: block.cognitive_load,
            tags: block.tags.clone(),
            rationale: block.rationale.clone(),
            description: describe_block(block),
        })
        .collect()
}
