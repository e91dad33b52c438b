// Draft rotation engine: owns the rotation state and mirrors every change
// into the state store.

use tracing::{debug, info, warn};

use super::order::{DraftOrderEntry, DraftType};
use super::state::{PausedSnapshot, RotationState, TurnSignal};
use crate::error::RotationError;
use crate::store::{KeyValueStore, RotationStateStore};

/// Minimum number of participants needed to start a draft.
pub const MIN_PARTICIPANTS: usize = 2;

/// Tracks who is on the clock across picks, pauses and reloads.
///
/// The engine never chooses players. When a participant with autodraft
/// enabled comes on the clock, [`TurnSignal::autodraft`] tells the caller to
/// pick on their behalf.
pub struct DraftRotationEngine<S> {
    state: RotationState,
    paused: Option<PausedSnapshot>,
    store: RotationStateStore<S>,
}

impl<S: KeyValueStore> DraftRotationEngine<S> {
    /// An idle engine. Nothing is read from `store`.
    pub fn new(store: RotationStateStore<S>) -> Self {
        Self {
            state: RotationState::default(),
            paused: None,
            store,
        }
    }

    /// Rebuild the engine from whatever the store holds, as after a page
    /// reload. Corrupt or missing records yield an idle engine.
    pub fn restore(store: RotationStateStore<S>) -> Self {
        let state = store.load().unwrap_or_default();
        let paused = store.load_paused();
        if state.active {
            info!(
                "Restored active draft: round {}, drafter index {}, {} participants",
                state.round,
                state.drafter_index,
                state.draft_order.len()
            );
        } else if paused.is_some() {
            info!("Found paused draft in storage");
        }
        Self {
            state,
            paused,
            store,
        }
    }

    pub fn state(&self) -> &RotationState {
        &self.state
    }

    pub fn paused(&self) -> Option<&PausedSnapshot> {
        self.paused.as_ref()
    }

    pub fn store(&self) -> &RotationStateStore<S> {
        &self.store
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    /// The participant on the clock while a draft is active.
    pub fn current_drafter(&self) -> Option<&DraftOrderEntry> {
        if !self.state.active {
            return None;
        }
        self.state.current_drafter()
    }

    /// Start a new draft with the caller's order, which is used verbatim.
    ///
    /// Autodraft flags set before the start carry over.
    pub fn start_draft(
        &mut self,
        order: Vec<DraftOrderEntry>,
        draft_type: DraftType,
    ) -> Result<TurnSignal, RotationError> {
        if order.len() < MIN_PARTICIPANTS {
            warn!(
                "Refusing to start draft with {} participant(s)",
                order.len()
            );
            return Err(RotationError::insufficient_participants());
        }

        let flags = std::mem::take(&mut self.state.autodraft_flags);
        self.state = RotationState::started(order, draft_type, flags);
        self.store.save(&self.state);
        info!(
            "Draft started: {} draft, {} participants",
            draft_type,
            self.state.draft_order.len()
        );
        self.signal().ok_or_else(RotationError::insufficient_participants)
    }

    /// Advance the clock after a pick. Returns `None` (and changes nothing)
    /// when no draft is active.
    pub fn record_pick(&mut self) -> Option<TurnSignal> {
        if !self.state.active || self.state.draft_order.is_empty() {
            debug!("Pick recorded outside draft mode; rotation not advanced");
            return None;
        }

        self.state.advance();
        self.store.save(&self.state);

        let signal = self.signal()?;
        info!(
            "Round {}: {} is on the clock {}",
            signal.round,
            signal.drafter.participant_name,
            signal.direction.arrow()
        );
        if signal.autodraft {
            info!("Autodraft enabled for {}", signal.drafter.participant_name);
        }
        Some(signal)
    }

    /// Pause the draft, keeping a snapshot for [`resume_draft`].
    ///
    /// When no draft is active any stale snapshot is discarded and `None` is
    /// returned.
    ///
    /// [`resume_draft`]: Self::resume_draft
    pub fn stop_draft(&mut self) -> Option<PausedSnapshot> {
        if !self.state.active {
            if self.paused.take().is_some() {
                debug!("Discarding stale paused snapshot");
            }
            self.store.clear_paused();
            return None;
        }

        let snapshot = PausedSnapshot::capture(&self.state);
        self.store.save_paused(&snapshot);
        self.state.active = false;
        self.store.save(&self.state);
        info!(
            "Draft paused at round {}, drafter index {}",
            self.state.round, self.state.drafter_index
        );
        self.paused = Some(snapshot.clone());
        Some(snapshot)
    }

    /// Restore the rotation from the paused snapshot and reactivate it.
    pub fn resume_draft(&mut self) -> Result<TurnSignal, RotationError> {
        let snapshot = self.paused.as_ref().ok_or_else(|| {
            warn!("Resume requested with no paused draft");
            RotationError::no_paused_draft()
        })?;

        let mut state = snapshot.state.clone();
        state.active = true;
        self.state = state;
        self.store.save(&self.state);
        info!("Draft resumed at round {}", self.state.round);
        self.signal().ok_or_else(RotationError::no_paused_draft)
    }

    /// Drop the live rotation, the paused snapshot and all autodraft flags.
    pub fn reset_draft(&mut self) {
        self.state = RotationState::default();
        self.paused = None;
        self.store.clear();
        info!("Draft rotation reset");
    }

    pub fn set_autodraft(&mut self, participant_id: &str, enabled: bool) {
        self.state
            .autodraft_flags
            .insert(participant_id.to_string(), enabled);
        self.store.save(&self.state);
        debug!("Autodraft for participant {participant_id} set to {enabled}");
    }

    pub fn autodraft_enabled(&self, participant_id: &str) -> bool {
        self.state.autodraft_enabled(participant_id)
    }

    fn signal(&self) -> Option<TurnSignal> {
        self.state.turn_signal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::order::Direction;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn order(n: usize) -> Vec<DraftOrderEntry> {
        (1..=n)
            .map(|i| DraftOrderEntry::new(format!("p{i}"), format!("Participant {i}")))
            .collect()
    }

    fn engine() -> DraftRotationEngine<Arc<MemoryStore>> {
        DraftRotationEngine::new(RotationStateStore::new(Arc::new(MemoryStore::new())))
    }

    #[test]
    fn start_draft_initializes_rotation() {
        let mut engine = engine();
        let signal = engine.start_draft(order(3), DraftType::Snake).unwrap();

        assert_eq!(signal.round, 1);
        assert_eq!(signal.drafter.participant_id, "p1");
        let state = engine.state();
        assert!(state.active);
        assert_eq!(state.drafter_index, 0);
        assert_eq!(state.direction, Direction::Forward);
        assert_eq!(state.draft_order, order(3));
        assert_eq!(engine.store().load().as_ref(), Some(state));
    }

    #[test]
    fn start_draft_rejects_single_participant() {
        let mut engine = engine();
        let err = engine.start_draft(order(1), DraftType::Snake).unwrap_err();

        assert_eq!(err, RotationError::Validation("insufficient participants".into()));
        assert!(!engine.is_active());
        assert_eq!(engine.state(), &RotationState::default());
        assert_eq!(engine.store().load(), None);
    }

    #[test]
    fn standard_rotation_returns_to_first_drafter_next_round() {
        let mut engine = engine();
        engine.start_draft(order(5), DraftType::Standard).unwrap();
        for _ in 0..5 {
            engine.record_pick().unwrap();
        }
        assert_eq!(engine.state().drafter_index, 0);
        assert_eq!(engine.state().round, 2);
    }

    #[test]
    fn snake_rotation_repeats_boundary_drafters() {
        let mut engine = engine();
        engine.start_draft(order(4), DraftType::Snake).unwrap();

        let indices: Vec<usize> = (0..8)
            .map(|_| engine.record_pick().unwrap().drafter_index)
            .collect();
        assert_eq!(indices, vec![1, 2, 3, 3, 2, 1, 0, 0]);
        assert_eq!(engine.state().round, 3);
        assert_eq!(engine.state().direction, Direction::Forward);
    }

    #[test]
    fn record_pick_outside_draft_is_noop() {
        let mut engine = engine();
        assert!(engine.record_pick().is_none());
        assert_eq!(engine.state(), &RotationState::default());
    }

    #[test]
    fn record_pick_persists_each_advance() {
        let mut engine = engine();
        engine.start_draft(order(3), DraftType::Snake).unwrap();
        engine.record_pick();
        engine.record_pick();
        assert_eq!(engine.store().load().unwrap().drafter_index, 2);
    }

    #[test]
    fn autodraft_signal_for_new_current_drafter() {
        let mut engine = engine();
        engine.set_autodraft("p2", true);
        engine.start_draft(order(3), DraftType::Standard).unwrap();

        let signal = engine.record_pick().unwrap();
        assert_eq!(signal.drafter.participant_id, "p2");
        assert!(signal.autodraft);

        let signal = engine.record_pick().unwrap();
        assert!(!signal.autodraft);
    }

    #[test]
    fn stop_and_resume_restore_rotation_exactly() {
        let mut engine = engine();
        engine.start_draft(order(4), DraftType::Snake).unwrap();
        engine.set_autodraft("p3", true);
        for _ in 0..5 {
            engine.record_pick();
        }
        let before = engine.state().clone();

        let snapshot = engine.stop_draft().unwrap();
        assert!(!engine.is_active());
        assert_eq!(engine.store().load(), None);
        assert_eq!(engine.store().load_paused(), Some(snapshot));

        let signal = engine.resume_draft().unwrap();
        assert_eq!(engine.state(), &before);
        assert_eq!(signal.drafter_index, before.drafter_index);
        assert_eq!(engine.store().load(), Some(before));
    }

    #[test]
    fn stop_when_inactive_clears_stale_snapshot() {
        let mut engine = engine();
        engine.start_draft(order(2), DraftType::Snake).unwrap();
        engine.stop_draft().unwrap();
        assert!(engine.paused().is_some());

        assert!(engine.stop_draft().is_none());
        assert!(engine.paused().is_none());
        assert_eq!(engine.store().load_paused(), None);
    }

    #[test]
    fn resume_without_snapshot_fails() {
        let mut engine = engine();
        let err = engine.resume_draft().unwrap_err();
        assert_eq!(err, RotationError::State("no paused draft".into()));
        assert!(!engine.is_active());
    }

    #[test]
    fn reset_clears_everything_and_allows_restart() {
        let mut engine = engine();
        engine.set_autodraft("p1", true);
        engine.start_draft(order(3), DraftType::Snake).unwrap();
        engine.record_pick();
        engine.stop_draft();

        engine.reset_draft();
        assert_eq!(engine.state(), &RotationState::default());
        assert!(engine.paused().is_none());
        assert!(!engine.autodraft_enabled("p1"));
        assert_eq!(engine.store().load(), None);
        assert_eq!(engine.store().load_paused(), None);

        engine.reset_draft();
        let signal = engine.start_draft(order(2), DraftType::Standard).unwrap();
        assert_eq!(signal.drafter.participant_id, "p1");
    }

    #[test]
    fn restore_picks_up_live_state() {
        let backend = Arc::new(MemoryStore::new());
        let mut first = DraftRotationEngine::new(RotationStateStore::new(Arc::clone(&backend)));
        first.start_draft(order(3), DraftType::Snake).unwrap();
        first.record_pick();
        first.set_autodraft("p3", true);

        let second = DraftRotationEngine::restore(RotationStateStore::new(backend));
        assert_eq!(second.state(), first.state());
        assert_eq!(second.current_drafter().unwrap().participant_id, "p2");
    }

    #[test]
    fn restore_picks_up_paused_snapshot() {
        let backend = Arc::new(MemoryStore::new());
        let mut first = DraftRotationEngine::new(RotationStateStore::new(Arc::clone(&backend)));
        first.start_draft(order(3), DraftType::Standard).unwrap();
        first.record_pick();
        let before = first.state().clone();
        first.stop_draft();

        let mut second = DraftRotationEngine::restore(RotationStateStore::new(backend));
        assert!(!second.is_active());
        assert!(second.paused().is_some());
        second.resume_draft().unwrap();
        assert_eq!(second.state(), &before);
    }

    #[test]
    fn set_autodraft_while_inactive_is_not_persisted_as_live_state() {
        let mut engine = engine();
        engine.set_autodraft("p1", true);
        assert!(engine.autodraft_enabled("p1"));
        assert_eq!(engine.store().load(), None);
    }
}
