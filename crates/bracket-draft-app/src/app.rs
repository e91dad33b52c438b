// Application state and orchestration logic.
//
// The central event loop that takes user commands from the front-end,
// submits picks to the server, and drives the draft rotation. Rotation
// advancement and autodraft picks are scheduled back into the same loop
// after short delays, so other commands (e.g. stop) can run between them.

use std::sync::Arc;
use std::time::Duration;

use bracket_draft_core::draft::order::{move_down, move_up};
use bracket_draft_core::{
    DraftOrderEntry, DraftRotationEngine, KeyValueStore, RotationError, TurnSignal,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::{ApiError, DraftApi};
use crate::autodraft::select_autodraft_pick;
use crate::config::Config;
use crate::players::{
    format_stat, next_draft_position, DraftPickRecord, PickRequest, PlayerPool,
};
use crate::protocol::{NoticeLevel, UiUpdate, UserCommand};

/// Rotation engine backed by whichever store the binary chose.
pub type RotationEngine = DraftRotationEngine<Box<dyn KeyValueStore>>;

// ---------------------------------------------------------------------------
// Scheduled events
// ---------------------------------------------------------------------------

/// Work the loop schedules for itself after a delay.
///
/// Each event carries the rotation epoch it was scheduled in and is dropped
/// if the draft has since been started, stopped, resumed or reset.
#[derive(Debug, Clone, PartialEq)]
pub enum Scheduled {
    /// A pick was acknowledged; move the clock on.
    AdvanceRotation { epoch: u64 },
    /// Make an automatic pick for this participant if they are still on the
    /// clock.
    Autodraft {
        participant: DraftOrderEntry,
        epoch: u64,
    },
}

impl Scheduled {
    pub fn epoch(&self) -> u64 {
        match self {
            Scheduled::AdvanceRotation { epoch } | Scheduled::Autodraft { epoch, .. } => *epoch,
        }
    }
}

/// Delivers [`Scheduled`] events back into the event loop after a delay.
#[derive(Clone)]
pub struct Scheduler {
    tx: mpsc::Sender<Scheduled>,
}

impl Scheduler {
    pub fn channel() -> (Self, mpsc::Receiver<Scheduled>) {
        let (tx, rx) = mpsc::channel(64);
        (Self { tx }, rx)
    }

    pub fn schedule(&self, delay: Duration, event: Scheduled) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(event).await.is_err() {
                debug!("Event loop gone; dropping scheduled event");
            }
        });
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete application state.
pub struct AppState {
    pub config: Config,
    pub engine: RotationEngine,
    pub api: Arc<dyn DraftApi>,
    /// Draft order used by the next start. Editable while no draft runs.
    pub pending_order: Vec<DraftOrderEntry>,
    /// Participant a pick is made for when none is given explicitly.
    pub selected: Option<DraftOrderEntry>,
    /// Position sent with the next submitted pick.
    pub next_draft_position: u32,
    /// Most recently fetched player pool.
    pub players: PlayerPool,
    /// Most recently fetched committed picks.
    pub board: Vec<DraftPickRecord>,
    /// Bumped on every start, stop, resume and reset.
    pub epoch: u64,
}

impl AppState {
    pub fn new(config: Config, engine: RotationEngine, api: Arc<dyn DraftApi>) -> Self {
        // A restored (or paused) rotation keeps the order it was started with.
        let pending_order = if engine.is_active() {
            engine.state().draft_order.clone()
        } else if let Some(paused) = engine.paused() {
            paused.state.draft_order.clone()
        } else {
            config.draft_order()
        };
        let selected = engine.current_drafter().cloned();

        Self {
            config,
            engine,
            api,
            pending_order,
            selected,
            next_draft_position: 1,
            players: PlayerPool::default(),
            board: Vec::new(),
            epoch: 0,
        }
    }

    /// Invalidate everything scheduled so far.
    fn next_epoch(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        debug!("Rotation epoch now {}", self.epoch);
    }

    /// Look a participant up in the running order, then the pending order.
    pub fn find_participant(&self, participant_id: &str) -> Option<DraftOrderEntry> {
        self.engine
            .state()
            .draft_order
            .iter()
            .chain(self.pending_order.iter())
            .find(|p| p.participant_id == participant_id)
            .cloned()
    }

    fn player_name(&self, player_id: i64) -> String {
        self.players
            .find(player_id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("Player #{player_id}"))
    }

    /// Submit a pick at the next draft position, advancing the position on
    /// success.
    async fn submit_pick(
        &mut self,
        participant: &DraftOrderEntry,
        player_id: i64,
    ) -> Result<(), ApiError> {
        let request = PickRequest {
            participant_id: participant.participant_id.clone(),
            player_id,
            draft_position: Some(self.next_draft_position),
        };
        debug!(
            "Submitting pick #{}: player {} for {}",
            self.next_draft_position, player_id, participant.participant_name
        );
        let api = Arc::clone(&self.api);
        api.submit_pick(&request).await?;
        self.next_draft_position = self.next_draft_position.saturating_add(1);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Main application event loop.
///
/// Runs startup (restored-rotation announcements and initial fetches), then
/// processes user commands and scheduled events until `Quit` arrives or the
/// command channel closes. Pushes UI updates through `ui_tx`.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    let (scheduler, mut sched_rx) = Scheduler::channel();
    startup(&mut state, &ui_tx).await;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_user_command(&mut state, cmd, &ui_tx, &scheduler).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            Some(event) = sched_rx.recv() => {
                handle_scheduled(&mut state, event, &ui_tx, &scheduler).await;
            }
        }
    }

    info!("Application event loop exiting");
    Ok(())
}

/// Announce whatever rotation was restored from storage and load the board.
pub async fn startup(state: &mut AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let restored = state
        .engine
        .is_active()
        .then(|| state.engine.state().turn_signal())
        .flatten();
    if let Some(signal) = restored {
        state.selected = Some(signal.drafter.clone());
        let message = format!("{} is on the clock!", signal.drafter.participant_name);
        let _ = ui_tx.send(UiUpdate::OnTheClock(signal)).await;
        notify(ui_tx, NoticeLevel::Info, message).await;
    } else {
        let _ = ui_tx.send(UiUpdate::DraftIdle).await;
        if let Some(paused) = state.engine.paused() {
            let when = paused
                .paused_at
                .with_timezone(&chrono::Local)
                .format("%b %-d %H:%M");
            let message =
                format!("A draft paused on {when} was found. Use \"resume\" to continue.");
            notify(ui_tx, NoticeLevel::Info, message).await;
        }
    }
    let _ = ui_tx.send(UiUpdate::DraftOrder(state.pending_order.clone())).await;

    match state.api.draft_picks().await {
        Ok(picks) => {
            state.next_draft_position = next_draft_position(&picks);
            info!(
                "Loaded {} existing picks; next draft position {}",
                picks.len(),
                state.next_draft_position
            );
            state.board = picks.clone();
            let _ = ui_tx.send(UiUpdate::Board(picks)).await;
        }
        Err(e) => warn!("Could not load existing picks: {e}"),
    }

    match state.api.available_players().await {
        Ok(pool) => {
            state.players = pool.clone();
            let _ = ui_tx.send(UiUpdate::Players(pool)).await;
        }
        Err(e) => warn!("Could not load players: {e}"),
    }
}

// ---------------------------------------------------------------------------
// User commands
// ---------------------------------------------------------------------------

/// Handle a user command from the front-end.
pub async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
    scheduler: &Scheduler,
) {
    match cmd {
        UserCommand::StartDraft { draft_type } => {
            if state.engine.is_active() {
                notify(ui_tx, NoticeLevel::Warning, "A draft is already in progress.").await;
                return;
            }
            let draft_type = draft_type.unwrap_or(state.config.draft.default_type);
            match state
                .engine
                .start_draft(state.pending_order.clone(), draft_type)
            {
                Ok(signal) => {
                    state.next_epoch();
                    let message = format!("{} is on the clock!", signal.drafter.participant_name);
                    state.selected = Some(signal.drafter.clone());
                    let _ = ui_tx.send(UiUpdate::OnTheClock(signal)).await;
                    notify(ui_tx, NoticeLevel::Info, message).await;
                }
                Err(RotationError::Validation(_)) => {
                    notify(
                        ui_tx,
                        NoticeLevel::Danger,
                        "Need at least 2 participants to start a draft!",
                    )
                    .await;
                }
                Err(e) => notify(ui_tx, NoticeLevel::Danger, format!("Error: {e}")).await,
            }
        }
        UserCommand::StopDraft => match state.engine.stop_draft() {
            Some(_) => {
                state.next_epoch();
                let _ = ui_tx.send(UiUpdate::DraftIdle).await;
                notify(
                    ui_tx,
                    NoticeLevel::Warning,
                    "Draft has been paused! Use \"resume\" to continue.",
                )
                .await;
            }
            None => notify(ui_tx, NoticeLevel::Info, "No draft is in progress.").await,
        },
        UserCommand::ResumeDraft => {
            if state.engine.is_active() {
                notify(ui_tx, NoticeLevel::Info, "The draft is already running.").await;
                return;
            }
            match state.engine.resume_draft() {
                Ok(signal) => {
                    state.next_epoch();
                    let message = format!(
                        "Draft resumed! Round {}: {} is on the clock! {}",
                        signal.round,
                        signal.drafter.participant_name,
                        signal.direction.arrow()
                    );
                    state.selected = Some(signal.drafter.clone());
                    let _ = ui_tx.send(UiUpdate::OnTheClock(signal)).await;
                    notify(ui_tx, NoticeLevel::Success, message).await;
                }
                Err(_) => {
                    notify(ui_tx, NoticeLevel::Warning, "No paused draft to resume.").await;
                }
            }
        }
        UserCommand::ResetDraft => {
            let api = Arc::clone(&state.api);
            match api.reset_picks().await {
                Ok(()) => {
                    state.engine.reset_draft();
                    state.next_epoch();
                    state.next_draft_position = 1;
                    state.selected = None;
                    state.pending_order = state.config.draft_order();
                    let _ = ui_tx.send(UiUpdate::DraftIdle).await;
                    let _ = ui_tx
                        .send(UiUpdate::DraftOrder(state.pending_order.clone()))
                        .await;
                    notify(
                        ui_tx,
                        NoticeLevel::Success,
                        "Draft has been reset! All players are now available again.",
                    )
                    .await;
                    refresh(state, ui_tx).await;
                }
                Err(e) => notify(ui_tx, NoticeLevel::Danger, format!("Error: {e}")).await,
            }
        }
        UserCommand::Pick {
            player_id,
            participant_id,
        } => {
            let participant = match participant_id {
                Some(id) => state.find_participant(&id),
                None => state.selected.clone(),
            };
            let Some(participant) = participant else {
                notify(
                    ui_tx,
                    NoticeLevel::Warning,
                    "Please select a participant before drafting a player.",
                )
                .await;
                return;
            };
            let player_name = state.player_name(player_id);

            match state.submit_pick(&participant, player_id).await {
                Ok(()) => {
                    info!("{} drafted by {}", player_name, participant.participant_name);
                    notify(
                        ui_tx,
                        NoticeLevel::Success,
                        format!("{} drafted by {}!", player_name, participant.participant_name),
                    )
                    .await;
                    if state.engine.is_active() {
                        scheduler.schedule(
                            state.config.draft.pick_ack_delay,
                            Scheduled::AdvanceRotation { epoch: state.epoch },
                        );
                    } else {
                        debug!("Draft mode is not active, not advancing");
                    }
                    refresh(state, ui_tx).await;
                }
                Err(e) => {
                    warn!("Pick submission failed: {e}");
                    notify(ui_tx, NoticeLevel::Danger, format!("Error: {e}")).await;
                }
            }
        }
        UserCommand::RemovePick { pick_id } => {
            let player_name = state
                .board
                .iter()
                .find(|p| p.id == pick_id)
                .map(|p| p.player_name.clone())
                .unwrap_or_else(|| format!("Pick #{pick_id}"));
            let api = Arc::clone(&state.api);
            match api.remove_pick(pick_id).await {
                Ok(()) => {
                    notify(
                        ui_tx,
                        NoticeLevel::Success,
                        format!("{player_name} removed from draft!"),
                    )
                    .await;
                    refresh(state, ui_tx).await;
                }
                Err(e) => notify(ui_tx, NoticeLevel::Danger, format!("Error: {e}")).await,
            }
        }
        UserCommand::SetAutodraft {
            participant_id,
            enabled,
        } => {
            let name = state
                .find_participant(&participant_id)
                .map(|p| p.participant_name)
                .unwrap_or_else(|| participant_id.clone());
            state.engine.set_autodraft(&participant_id, enabled);
            let verb = if enabled { "enabled" } else { "disabled" };
            notify(ui_tx, NoticeLevel::Info, format!("Autodraft {verb} for {name}")).await;
        }
        UserCommand::SelectParticipant { participant_id } => {
            match state.find_participant(&participant_id) {
                Some(p) => {
                    let autodraft = if state.engine.autodraft_enabled(&p.participant_id) {
                        " (autodraft on)"
                    } else {
                        ""
                    };
                    let message = format!("Selected {}{autodraft}", p.participant_name);
                    state.selected = Some(p);
                    notify(ui_tx, NoticeLevel::Info, message).await;
                }
                None => {
                    notify(
                        ui_tx,
                        NoticeLevel::Warning,
                        format!("Unknown participant: {participant_id}"),
                    )
                    .await;
                }
            }
        }
        UserCommand::MoveUp { index } => reorder(state, index, true, ui_tx).await,
        UserCommand::MoveDown { index } => reorder(state, index, false, ui_tx).await,
        UserCommand::Refresh => refresh(state, ui_tx).await,
        UserCommand::Quit => {
            // Handled in the main loop
        }
    }
}

/// Move a pending-order entry one slot up or down while no draft runs.
async fn reorder(state: &mut AppState, index: usize, up: bool, ui_tx: &mpsc::Sender<UiUpdate>) {
    if state.engine.is_active() {
        notify(
            ui_tx,
            NoticeLevel::Warning,
            "The draft order cannot change while a draft is running.",
        )
        .await;
        return;
    }
    let moved = if up {
        move_up(&mut state.pending_order, index)
    } else {
        move_down(&mut state.pending_order, index)
    };
    if moved {
        let _ = ui_tx
            .send(UiUpdate::DraftOrder(state.pending_order.clone()))
            .await;
    } else {
        debug!("Draft order move at index {index} had no effect");
    }
}

// ---------------------------------------------------------------------------
// Scheduled events
// ---------------------------------------------------------------------------

/// Handle an event the loop scheduled for itself.
pub async fn handle_scheduled(
    state: &mut AppState,
    event: Scheduled,
    ui_tx: &mpsc::Sender<UiUpdate>,
    scheduler: &Scheduler,
) {
    if event.epoch() != state.epoch {
        debug!(
            "Dropping {:?} from epoch {} (now {})",
            event,
            event.epoch(),
            state.epoch
        );
        return;
    }
    match event {
        Scheduled::AdvanceRotation { .. } => {
            let Some(signal) = state.engine.record_pick() else {
                debug!("Draft not active; skipping rotation advance");
                return;
            };
            let autodraft = signal.autodraft.then(|| signal.drafter.clone());
            announce_turn(state, signal, ui_tx).await;
            if let Some(participant) = autodraft {
                scheduler.schedule(
                    state.config.draft.autodraft_delay,
                    Scheduled::Autodraft {
                        participant,
                        epoch: state.epoch,
                    },
                );
            }
        }
        Scheduled::Autodraft { participant, .. } => {
            autodraft(state, participant, ui_tx, scheduler).await;
        }
    }
}

async fn announce_turn(state: &mut AppState, signal: TurnSignal, ui_tx: &mpsc::Sender<UiUpdate>) {
    let message = format!(
        "{} is on the clock! {}",
        signal.drafter.participant_name,
        signal.direction.arrow()
    );
    state.selected = Some(signal.drafter.clone());
    let _ = ui_tx.send(UiUpdate::OnTheClock(signal)).await;
    notify(ui_tx, NoticeLevel::Info, message).await;
}

/// Pick the best available player for `participant` and submit it.
async fn autodraft(
    state: &mut AppState,
    participant: DraftOrderEntry,
    ui_tx: &mpsc::Sender<UiUpdate>,
    scheduler: &Scheduler,
) {
    if !state.engine.is_active() {
        info!("Draft not active, cannot autodraft");
        return;
    }
    let on_clock = state
        .engine
        .current_drafter()
        .is_some_and(|d| d.participant_id == participant.participant_id);
    if !on_clock {
        info!(
            "{} is no longer on the clock; skipping autodraft",
            participant.participant_name
        );
        return;
    }

    info!("Autodrafting for {}", participant.participant_name);
    let api = Arc::clone(&state.api);
    let pool = match api.available_players().await {
        Ok(pool) => pool,
        Err(e) => {
            warn!("Autodraft player fetch failed: {e}");
            notify(ui_tx, NoticeLevel::Danger, format!("Autodraft Error: {e}")).await;
            return;
        }
    };

    let Some(top) = select_autodraft_pick(&pool.undrafted).cloned() else {
        state.players = pool;
        notify(ui_tx, NoticeLevel::Warning, "No players available for autodraft!").await;
        return;
    };
    state.players = pool;
    debug!("Top player for autodraft: {} ({:?} PPG)", top.name, top.ppg);

    match state.submit_pick(&participant, top.id).await {
        Ok(()) => {
            notify(
                ui_tx,
                NoticeLevel::Success,
                format!(
                    "AUTODRAFT: {} ({} PPG) drafted by {}!",
                    top.name,
                    format_stat(top.ppg),
                    participant.participant_name
                ),
            )
            .await;
            refresh(state, ui_tx).await;
            scheduler.schedule(
                state.config.draft.pick_ack_delay,
                Scheduled::AdvanceRotation { epoch: state.epoch },
            );
        }
        Err(e) => {
            warn!("Autodraft submission failed: {e}");
            notify(ui_tx, NoticeLevel::Danger, format!("Autodraft Error: {e}")).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reload the pick board and the player pool.
async fn refresh(state: &mut AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let api = Arc::clone(&state.api);

    match api.draft_picks().await {
        Ok(picks) => {
            state.board = picks.clone();
            let _ = ui_tx.send(UiUpdate::Board(picks)).await;
        }
        Err(e) => {
            warn!("Draft board refresh failed: {e}");
            notify(
                ui_tx,
                NoticeLevel::Danger,
                "An error occurred while updating the draft board.",
            )
            .await;
        }
    }

    match api.available_players().await {
        Ok(pool) => {
            state.players = pool.clone();
            let _ = ui_tx.send(UiUpdate::Players(pool)).await;
        }
        Err(e) => {
            warn!("Player refresh failed: {e}");
            notify(ui_tx, NoticeLevel::Danger, format!("Error: {e}")).await;
        }
    }
}

async fn notify(ui_tx: &mpsc::Sender<UiUpdate>, level: NoticeLevel, message: impl Into<String>) {
    let _ = ui_tx.send(UiUpdate::notice(level, message)).await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
