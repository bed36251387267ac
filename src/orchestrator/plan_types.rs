//! Schedule plan types
//!
//! Data structures for the plan produced by the reasoning oracle. Enumerated
//! fields are closed: an unknown priority, category or level fails
//! deserialization instead of being coerced.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire format for block times
pub const BLOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

const ACCEPTED_TIME_FORMATS: [&str; 4] = [
    BLOCK_TIME_FORMAT,
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parse a block time in `YYYY-MM-DD HH:MM` form (ISO `T` separator and
/// seconds are tolerated)
pub fn parse_block_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    ACCEPTED_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

pub(crate) mod block_time {
    use super::{parse_block_time, BLOCK_TIME_FORMAT};
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.format(BLOCK_TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse_block_time(&raw).ok_or_else(|| {
            de::Error::custom(format!(
                "invalid time '{}', expected YYYY-MM-DD HH:MM",
                raw
            ))
        })
    }
}

/// Task priority, P1 most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Must happen
    P1,
    /// Should happen
    P2,
    /// Could happen
    P3,
    /// Only if time and energy permit
    P4,
}

/// Block category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Focused work
    Work,
    /// Meeting with others
    Meeting,
    /// Rest or recovery; never proposed as a calendar entry
    Break,
    /// Personal errand or activity
    Personal,
}

/// Three-step scale used for energy level and cognitive load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// High
    High,
    /// Medium
    Medium,
    /// Low
    Low,
}

/// Energy a block demands
pub type EnergyLevel = Level;

/// Cognitive load a block imposes
pub type CognitiveLoad = Level;

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
            Priority::P4 => "P4",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Work => "work",
            Category::Meeting => "meeting",
            Category::Break => "break",
            Category::Personal => "personal",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::High => "high",
            Level::Medium => "medium",
            Level::Low => "low",
        };
        f.write_str(s)
    }
}

/// One atomic unit of a generated plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleBlock {
    /// Local start time
    #[serde(with = "block_time", alias = "start_time")]
    pub start: NaiveDateTime,
    /// Local end time
    #[serde(with = "block_time", alias = "end_time")]
    pub end: NaiveDateTime,
    /// What happens in this block
    pub title: String,
    /// Priority
    pub priority: Priority,
    /// Category (`type` is accepted on input)
    #[serde(alias = "type")]
    pub category: Category,
    /// Energy the block demands
    pub energy_level: EnergyLevel,
    /// Cognitive load of the block
    pub cognitive_load: CognitiveLoad,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Why the block is placed here
    #[serde(default)]
    pub rationale: String,
}

impl ScheduleBlock {
    /// Check structural constraints not expressible in the type
    ///
    /// # Returns
    /// * `Ok(())` - start ≤ end and the title is non-empty
    /// * `Err(String)` - Description of the violation
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("block title cannot be empty".to_string());
        }
        if self.start > self.end {
            return Err(format!(
                "block '{}' ends before it starts ({} > {})",
                self.title,
                self.start.format(BLOCK_TIME_FORMAT),
                self.end.format(BLOCK_TIME_FORMAT)
            ));
        }
        Ok(())
    }

    /// Block length in whole minutes
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Whether this block is rest rather than an actionable item
    pub fn is_break(&self) -> bool {
        self.category == Category::Break
    }
}

/// A plan as returned by the oracle
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanDraft {
    /// Ordered schedule blocks
    pub blocks: Vec<ScheduleBlock>,
    /// Overall scheduling rationale
    pub metadata: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block_json() -> serde_json::Value {
        json!({
            "start": "2026-10-19 09:00",
            "end": "2026-10-19 10:30",
            "title": "Draft proposal",
            "priority": "P1",
            "category": "work",
            "energy_level": "high",
            "cognitive_load": "high",
            "tags": ["writing"],
            "rationale": "Peak focus window"
        })
    }

    #[test]
    fn test_block_deserializes_and_measures_duration() {
        let block: ScheduleBlock = serde_json::from_value(block_json()).unwrap();
        assert_eq!(block.priority, Priority::P1);
        assert_eq!(block.category, Category::Work);
        assert_eq!(block.duration_minutes(), 90);
        assert!(block.validate().is_ok());
    }

    #[test]
    fn test_block_accepts_legacy_field_names() {
        let value = json!({
            "start_time": "2026-10-19T13:00:00",
            "end_time": "2026-10-19T13:15",
            "title": "Walk",
            "priority": "P3",
            "type": "break",
            "energy_level": "low",
            "cognitive_load": "low"
        });
        let block: ScheduleBlock = serde_json::from_value(value).unwrap();
        assert!(block.is_break());
        assert_eq!(block.duration_minutes(), 15);
        assert!(block.tags.is_empty());
    }

    #[test]
    fn test_unknown_enum_value_is_rejected() {
        let mut value = block_json();
        value["category"] = json!("focus");
        assert!(serde_json::from_value::<ScheduleBlock>(value).is_err());

        let mut value = block_json();
        value["priority"] = json!("P5");
        assert!(serde_json::from_value::<ScheduleBlock>(value).is_err());
    }

    #[test]
    fn test_bad_time_is_rejected() {
        let mut value = block_json();
        value["start"] = json!("9am tomorrow");
        assert!(serde_json::from_value::<ScheduleBlock>(value).is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_range_and_empty_title() {
        let mut block: ScheduleBlock = serde_json::from_value(block_json()).unwrap();
        std::mem::swap(&mut block.start, &mut block.end);
        assert!(block.validate().unwrap_err().contains("ends before it starts"));

        let mut block: ScheduleBlock = serde_json::from_value(block_json()).unwrap();
        block.title = "  ".to_string();
        assert!(block.validate().is_err());
    }

    #[test]
    fn test_times_serialize_in_wire_format() {
        let block: ScheduleBlock = serde_json::from_value(block_json()).unwrap();
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["start"], "2026-10-19 09:00");
        assert_eq!(value["category"], "work");
    }
}
