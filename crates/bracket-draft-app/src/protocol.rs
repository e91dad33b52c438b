// Messages exchanged between the front-end and the application loop.

use bracket_draft_core::{DraftOrderEntry, DraftType, TurnSignal};

use crate::players::{DraftPickRecord, PlayerPool};

/// Commands issued by the front-end.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// Start a draft with the pending order. `None` uses the configured
    /// default type.
    StartDraft { draft_type: Option<DraftType> },
    StopDraft,
    ResumeDraft,
    /// Delete all picks server-side, then clear local rotation state.
    ResetDraft,
    /// Draft a player. Without a participant the selected one is used.
    Pick {
        player_id: i64,
        participant_id: Option<String>,
    },
    RemovePick { pick_id: i64 },
    SetAutodraft { participant_id: String, enabled: bool },
    SelectParticipant { participant_id: String },
    /// Reorder the pending draft order (before the draft starts).
    MoveUp { index: usize },
    MoveDown { index: usize },
    Refresh,
    Quit,
}

/// Severity of a transient notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Danger,
}

impl NoticeLevel {
    pub fn label(&self) -> &'static str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Danger => "danger",
        }
    }
}

/// Updates pushed from the application loop to the front-end.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    Notice { level: NoticeLevel, message: String },
    /// A participant came on the clock.
    OnTheClock(TurnSignal),
    /// The rotation stopped (paused, reset, or never started).
    DraftIdle,
    /// The pending draft order changed.
    DraftOrder(Vec<DraftOrderEntry>),
    Players(PlayerPool),
    Board(Vec<DraftPickRecord>),
}

impl UiUpdate {
    pub fn notice(level: NoticeLevel, message: impl Into<String>) -> Self {
        UiUpdate::Notice {
            level,
            message: message.into(),
        }
    }
}
