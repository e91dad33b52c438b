// Draft order entries, draft type/direction, and pre-draft order editing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One participant's slot in the draft order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftOrderEntry {
    pub participant_id: String,
    pub participant_name: String,
}

impl DraftOrderEntry {
    pub fn new(participant_id: impl Into<String>, participant_name: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            participant_name: participant_name.into(),
        }
    }
}

/// How the order is traversed from round to round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftType {
    /// Order reverses at each round boundary.
    #[default]
    Snake,
    /// Order is identical every round.
    Standard,
}

impl DraftType {
    /// Parse a draft type name, case-insensitively.
    pub fn from_str_type(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snake" => Some(DraftType::Snake),
            "standard" => Some(DraftType::Standard),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DraftType::Snake => "snake",
            DraftType::Standard => "standard",
        }
    }
}

impl fmt::Display for DraftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Traversal direction within a snake round. Always `Forward` for standard
/// drafts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    /// Arrow shown next to the drafter on the clock.
    pub fn arrow(&self) -> &'static str {
        match self {
            Direction::Forward => "↓",
            Direction::Backward => "↑",
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// Swap the entry at `index` with the one before it. Returns `false` when
/// there is nothing to swap with.
pub fn move_up(order: &mut [DraftOrderEntry], index: usize) -> bool {
    if index == 0 || index >= order.len() {
        return false;
    }
    order.swap(index - 1, index);
    true
}

/// Swap the entry at `index` with the one after it. Returns `false` when
/// `index` is the last entry or out of range.
pub fn move_down(order: &mut [DraftOrderEntry], index: usize) -> bool {
    if index + 1 >= order.len() {
        return false;
    }
    order.swap(index, index + 1);
    true
}
