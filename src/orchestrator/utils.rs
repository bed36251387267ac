//! Orchestrator utility functions
//!
//! Short hashes used to correlate log lines for one intent or one plan.

use crate::orchestrator::plan_types::ScheduleBlock;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

fn short_hex(hasher: DefaultHasher) -> String {
    format!("{:016x}", hasher.finish())[..8].to_string()
}

/// Compute a short hash for an intent string
///
/// Returns an 8-character hexadecimal hash suitable for logging and tracing.
///
/// # Arguments
/// * `intent` - The intent string to hash
///
/// # Returns
/// * `String` - 8-character hexadecimal hash
pub fn hash_intent(intent: &str) -> String {
    let mut hasher = DefaultHasher::new();
    intent.hash(&mut hasher);
    short_hex(hasher)
}

/// Compute a short hash for a plan
///
/// Based on the block count and each block's time range and title.
///
/// # Arguments
/// * `plan` - The plan to hash
///
/// # Returns
/// * `String` - 8-character hexadecimal hash
pub fn hash_plan(plan: &[ScheduleBlock]) -> String {
    let mut hasher = DefaultHasher::new();
    plan.len().hash(&mut hasher);
    for block in plan {
        block.start.hash(&mut hasher);
        block.end.hash(&mut hasher);
        block.title.hash(&mut hasher);
    }
    short_hex(hasher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_intent_is_stable_and_short() {
        let a = hash_intent("plan tomorrow");
        assert_eq!(a.len(), 8);
        assert_eq!(a, hash_intent("plan tomorrow"));
        assert_ne!(a, hash_intent("plan friday"));
    }

    #[test]
    fn test_hash_plan_of_empty_plan() {
        assert_eq!(hash_plan(&[]).len(), 8);
    }
}
