// Rotation state: who is on the clock, which round, which way the order runs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::order::{Direction, DraftOrderEntry, DraftType};

/// The single source of truth for an in-progress draft rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationState {
    /// Whether a draft is currently running.
    pub active: bool,
    /// Current round, starting at 1.
    pub round: u32,
    /// Index into `draft_order` of the participant on the clock.
    pub drafter_index: usize,
    /// Traversal order, fixed at draft start.
    pub draft_order: Vec<DraftOrderEntry>,
    pub draft_type: DraftType,
    /// Only meaningful for snake drafts.
    pub direction: Direction,
    /// Participant id -> autodraft enabled.
    #[serde(default)]
    pub autodraft_flags: BTreeMap<String, bool>,
}

impl Default for RotationState {
    fn default() -> Self {
        Self {
            active: false,
            round: 1,
            drafter_index: 0,
            draft_order: Vec::new(),
            draft_type: DraftType::Snake,
            direction: Direction::Forward,
            autodraft_flags: BTreeMap::new(),
        }
    }
}

impl RotationState {
    /// A fresh, active rotation positioned at the first drafter of round 1.
    pub fn started(
        draft_order: Vec<DraftOrderEntry>,
        draft_type: DraftType,
        autodraft_flags: BTreeMap<String, bool>,
    ) -> Self {
        Self {
            active: true,
            round: 1,
            drafter_index: 0,
            draft_order,
            draft_type,
            direction: Direction::Forward,
            autodraft_flags,
        }
    }

    /// The participant currently on the clock, if the order is non-empty.
    pub fn current_drafter(&self) -> Option<&DraftOrderEntry> {
        self.draft_order.get(self.drafter_index)
    }

    pub fn autodraft_enabled(&self, participant_id: &str) -> bool {
        self.autodraft_flags
            .get(participant_id)
            .copied()
            .unwrap_or(false)
    }

    /// Move the clock to the next drafter.
    ///
    /// Standard drafts wrap around and bump the round when the index returns
    /// to 0. Snake drafts clamp at either end of the order, flip direction and
    /// bump the round, so the boundary participant picks twice in a row.
    pub fn advance(&mut self) {
        let len = self.draft_order.len();
        if len == 0 {
            return;
        }

        match self.draft_type {
            DraftType::Standard => {
                self.drafter_index = (self.drafter_index + 1) % len;
                if self.drafter_index == 0 {
                    self.round += 1;
                }
            }
            DraftType::Snake => match self.direction {
                Direction::Forward => {
                    self.drafter_index += 1;
                    if self.drafter_index >= len {
                        self.drafter_index = len - 1;
                        self.direction = self.direction.flipped();
                        self.round += 1;
                    }
                }
                Direction::Backward => {
                    if self.drafter_index == 0 {
                        self.direction = self.direction.flipped();
                        self.round += 1;
                    } else {
                        self.drafter_index -= 1;
                    }
                }
            },
        }
    }

    /// Check the structural invariants a persisted record must satisfy before
    /// it is trusted.
    pub fn is_consistent(&self) -> bool {
        if self.round == 0 || self.draft_order.is_empty() {
            return false;
        }
        if self.drafter_index >= self.draft_order.len() {
            return false;
        }
        !(self.draft_type == DraftType::Standard && self.direction == Direction::Backward)
    }

    /// Build the "on the clock" signal for the current drafter.
    pub fn turn_signal(&self) -> Option<TurnSignal> {
        let drafter = self.current_drafter()?;
        Some(TurnSignal {
            round: self.round,
            drafter_index: self.drafter_index,
            drafter: drafter.clone(),
            direction: self.direction,
            draft_type: self.draft_type,
            autodraft: self.autodraft_enabled(&drafter.participant_id),
        })
    }
}

/// A copy of the rotation taken when the draft was stopped. Kept in its own
/// storage slot so it survives the live state being cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PausedSnapshot {
    /// Rotation as it was when stopped; `active` is recorded as `true`.
    pub state: RotationState,
    pub paused_at: DateTime<Utc>,
}

impl PausedSnapshot {
    pub fn capture(state: &RotationState) -> Self {
        let mut state = state.clone();
        state.active = true;
        Self {
            state,
            paused_at: Utc::now(),
        }
    }
}

/// Emitted whenever a participant comes on the clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSignal {
    pub round: u32,
    pub drafter_index: usize,
    pub drafter: DraftOrderEntry,
    pub direction: Direction,
    pub draft_type: DraftType,
    /// The caller should perform an automatic pick for `drafter`.
    pub autodraft: bool,
}
