// Line-oriented console front-end.
//
// Reads commands from stdin, forwards them to the app loop as UserCommand
// messages, and prints every UiUpdate the loop pushes back.

use anyhow::Context;
use bracket_draft_core::{DraftOrderEntry, DraftType, TurnSignal};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::players::{format_stat, DraftPickRecord, PlayerPool};
use crate::protocol::{UiUpdate, UserCommand};

pub const HELP: &str = "\
Commands:
  start [snake|standard]     start a draft with the current order
  stop | resume | reset      pause, resume, or wipe the draft
  pick <player> [participant] draft a player (defaults to the selected participant)
  remove <pick>              remove a pick from the board
  autodraft <participant> on|off
  select <participant>       choose who manual picks are made for
  up <n> | down <n>          move draft order slot n (1-based)
  players | board | order    show the cached views
  refresh                    reload players and picks
  help | quit";

/// Number of players shown by the `players` view.
const PLAYER_LIST_LIMIT: usize = 25;

/// What a typed line asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleAction {
    Command(UserCommand),
    Show(View),
    Help,
}

/// Locally rendered views over the cached data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Players,
    Board,
    Order,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleAction>, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match head.to_ascii_lowercase().as_str() {
        "start" => {
            let draft_type = match args.first() {
                Some(t) => Some(
                    DraftType::from_str_type(t)
                        .ok_or_else(|| format!("Unknown draft type: {t}"))?,
                ),
                None => None,
            };
            UserCommand::StartDraft { draft_type }
        }
        "stop" | "pause" => UserCommand::StopDraft,
        "resume" => UserCommand::ResumeDraft,
        "reset" => UserCommand::ResetDraft,
        "pick" | "draft" => {
            let player_id = parse_id(args.first(), "pick <player> [participant]")?;
            UserCommand::Pick {
                player_id,
                participant_id: args.get(1).map(|s| s.to_string()),
            }
        }
        "remove" | "undo" => UserCommand::RemovePick {
            pick_id: parse_id(args.first(), "remove <pick>")?,
        },
        "autodraft" | "auto" => {
            let (Some(participant), Some(toggle)) = (args.first(), args.get(1)) else {
                return Err("Usage: autodraft <participant> on|off".into());
            };
            let enabled = match toggle.to_ascii_lowercase().as_str() {
                "on" | "true" | "yes" => true,
                "off" | "false" | "no" => false,
                other => return Err(format!("Expected on or off, got {other}")),
            };
            UserCommand::SetAutodraft {
                participant_id: participant.to_string(),
                enabled,
            }
        }
        "select" => {
            let participant = args
                .first()
                .ok_or_else(|| "Usage: select <participant>".to_string())?;
            UserCommand::SelectParticipant {
                participant_id: participant.to_string(),
            }
        }
        "up" => UserCommand::MoveUp {
            index: parse_slot(args.first(), "up <n>")?,
        },
        "down" => UserCommand::MoveDown {
            index: parse_slot(args.first(), "down <n>")?,
        },
        "refresh" | "r" => UserCommand::Refresh,
        "quit" | "q" | "exit" => UserCommand::Quit,
        "players" => return Ok(Some(ConsoleAction::Show(View::Players))),
        "board" => return Ok(Some(ConsoleAction::Show(View::Board))),
        "order" => return Ok(Some(ConsoleAction::Show(View::Order))),
        "help" | "?" => return Ok(Some(ConsoleAction::Help)),
        other => return Err(format!("Unknown command: {other} (try \"help\")")),
    };
    Ok(Some(ConsoleAction::Command(command)))
}

fn parse_id(arg: Option<&&str>, usage: &str) -> Result<i64, String> {
    let arg = arg.ok_or_else(|| format!("Usage: {usage}"))?;
    arg.parse().map_err(|_| format!("Not a valid id: {arg}"))
}

fn parse_slot(arg: Option<&&str>, usage: &str) -> Result<usize, String> {
    let arg = arg.ok_or_else(|| format!("Usage: {usage}"))?;
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(format!("Not a valid slot: {arg}")),
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Last known data, kept so views can be printed on demand.
#[derive(Debug, Default)]
pub struct ConsoleView {
    players: PlayerPool,
    board: Vec<DraftPickRecord>,
    order: Vec<DraftOrderEntry>,
    on_the_clock: Option<TurnSignal>,
}

impl ConsoleView {
    /// Absorb an update and return the lines to print for it.
    pub fn apply(&mut self, update: UiUpdate) -> Vec<String> {
        match update {
            UiUpdate::Notice { level, message } => vec![format!("[{}] {}", level.label(), message)],
            UiUpdate::OnTheClock(signal) => {
                let line = clock_line(&signal);
                self.on_the_clock = Some(signal);
                vec![line]
            }
            UiUpdate::DraftIdle => {
                self.on_the_clock = None;
                vec!["Draft mode: off".to_string()]
            }
            UiUpdate::DraftOrder(order) => {
                self.order = order;
                vec![order_line(&self.order)]
            }
            UiUpdate::Players(pool) => {
                self.players = pool;
                vec![format!(
                    "{} of {} players available",
                    self.players.undrafted.len(),
                    self.players.all.len()
                )]
            }
            UiUpdate::Board(board) => {
                self.board = board;
                vec![format!("{} picks on the board", self.board.len())]
            }
        }
    }

    pub fn show(&self, view: View) -> Vec<String> {
        match view {
            View::Players => {
                if self.players.undrafted.is_empty() {
                    return vec!["No players available.".to_string()];
                }
                self.players
                    .undrafted
                    .iter()
                    .take(PLAYER_LIST_LIMIT)
                    .map(|p| {
                        format!(
                            "{:>5}  {:<26} {:<22} {:>5} PPG",
                            p.id,
                            p.name,
                            p.school,
                            format_stat(p.ppg)
                        )
                    })
                    .collect()
            }
            View::Board => {
                if self.board.is_empty() {
                    return vec!["No picks yet.".to_string()];
                }
                let mut picks: Vec<&DraftPickRecord> = self.board.iter().collect();
                picks.sort_by_key(|p| p.draft_position.unwrap_or(u32::MAX));
                picks
                    .into_iter()
                    .map(|p| {
                        let position = p
                            .draft_position
                            .map_or_else(|| "-".to_string(), |n| n.to_string());
                        format!(
                            "#{:<3} [{}] {:<16} {} ({}) {}/{}/{}",
                            position,
                            p.id,
                            p.participant_name,
                            p.player_name,
                            p.player_school,
                            format_stat(p.player_ppg),
                            format_stat(p.player_rpg),
                            format_stat(p.player_apg)
                        )
                    })
                    .collect()
            }
            View::Order => {
                let mut lines = vec![order_line(&self.order)];
                if let Some(signal) = &self.on_the_clock {
                    lines.push(clock_line(signal));
                }
                lines
            }
        }
    }
}

fn clock_line(signal: &TurnSignal) -> String {
    let mut line = format!(
        "Round {} ({}): {} is on the clock {}",
        signal.round,
        signal.draft_type,
        signal.drafter.participant_name,
        signal.direction.arrow()
    );
    if signal.autodraft {
        line.push_str(" [autodraft]");
    }
    line
}

fn order_line(order: &[DraftOrderEntry]) -> String {
    let names: Vec<String> = order
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}. {} ({})", i + 1, p.participant_name, p.participant_id))
        .collect();
    format!("Draft order: {}", names.join(", "))
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// Run the console until the user quits or stdin closes.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut view = ConsoleView::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");

    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                let Some(update) = update else {
                    debug!("UI channel closed");
                    break;
                };
                for line in view.apply(update) {
                    println!("{line}");
                }
            }

            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    info!("stdin closed, quitting");
                    let _ = cmd_tx.send(UserCommand::Quit).await;
                    break;
                };
                match parse_line(&line) {
                    Ok(Some(ConsoleAction::Command(cmd))) => {
                        let quit = cmd == UserCommand::Quit;
                        if cmd_tx.send(cmd).await.is_err() || quit {
                            break;
                        }
                    }
                    Ok(Some(ConsoleAction::Show(v))) => {
                        for line in view.show(v) {
                            println!("{line}");
                        }
                    }
                    Ok(Some(ConsoleAction::Help)) => println!("{HELP}"),
                    Ok(None) => {}
                    Err(message) => println!("{message}"),
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::NoticeLevel;
    use bracket_draft_core::Direction;

    fn command(line: &str) -> UserCommand {
        match parse_line(line) {
            Ok(Some(ConsoleAction::Command(cmd))) => cmd,
            other => panic!("expected a command for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn parses_draft_lifecycle_commands() {
        assert_eq!(command("start"), UserCommand::StartDraft { draft_type: None });
        assert_eq!(
            command("start Standard"),
            UserCommand::StartDraft {
                draft_type: Some(DraftType::Standard)
            }
        );
        assert_eq!(command("stop"), UserCommand::StopDraft);
        assert_eq!(command("resume"), UserCommand::ResumeDraft);
        assert_eq!(command("reset"), UserCommand::ResetDraft);
        assert_eq!(command("q"), UserCommand::Quit);
    }

    #[test]
    fn parses_pick_with_and_without_participant() {
        assert_eq!(
            command("pick 42"),
            UserCommand::Pick {
                player_id: 42,
                participant_id: None
            }
        );
        assert_eq!(
            command("  pick 42   3 "),
            UserCommand::Pick {
                player_id: 42,
                participant_id: Some("3".into())
            }
        );
    }

    #[test]
    fn slots_are_one_based() {
        assert_eq!(command("up 2"), UserCommand::MoveUp { index: 1 });
        assert_eq!(command("down 1"), UserCommand::MoveDown { index: 0 });
        assert!(parse_line("up 0").is_err());
    }

    #[test]
    fn autodraft_toggle() {
        assert_eq!(
            command("autodraft 2 on"),
            UserCommand::SetAutodraft {
                participant_id: "2".into(),
                enabled: true
            }
        );
        assert!(parse_line("autodraft 2 maybe").is_err());
        assert!(parse_line("autodraft 2").is_err());
    }

    #[test]
    fn bad_input_reports_errors() {
        assert!(parse_line("pick abc").is_err());
        assert!(parse_line("start auction").is_err());
        assert!(parse_line("dance").is_err());
        assert_eq!(parse_line("   "), Ok(None));
        assert_eq!(parse_line("board"), Ok(Some(ConsoleAction::Show(View::Board))));
    }

    #[test]
    fn renders_notices_and_clock() {
        let mut view = ConsoleView::default();
        assert_eq!(
            view.apply(UiUpdate::notice(NoticeLevel::Danger, "Error: nope")),
            vec!["[danger] Error: nope".to_string()]
        );

        let signal = TurnSignal {
            round: 2,
            drafter_index: 3,
            drafter: DraftOrderEntry::new("4", "Dana"),
            direction: Direction::Backward,
            draft_type: DraftType::Snake,
            autodraft: true,
        };
        assert_eq!(
            view.apply(UiUpdate::OnTheClock(signal)),
            vec!["Round 2 (snake): Dana is on the clock ↑ [autodraft]".to_string()]
        );

        view.apply(UiUpdate::DraftOrder(vec![
            DraftOrderEntry::new("1", "Ann"),
            DraftOrderEntry::new("4", "Dana"),
        ]));
        assert_eq!(
            view.show(View::Order),
            vec![
                "Draft order: 1. Ann (1), 2. Dana (4)".to_string(),
                "Round 2 (snake): Dana is on the clock ↑ [autodraft]".to_string(),
            ]
        );

        view.apply(UiUpdate::DraftIdle);
        assert_eq!(view.show(View::Order).len(), 1);
    }

    #[test]
    fn board_view_sorts_by_position() {
        let pick = |id: i64, pos: Option<u32>, name: &str| DraftPickRecord {
            id,
            participant_id: "1".into(),
            participant_name: "Ann".into(),
            player_id: Some(id),
            player_name: name.into(),
            player_school: "1 Purdue".into(),
            player_ppg: Some(20.0),
            player_rpg: None,
            player_apg: Some(1.3),
            draft_position: pos,
        };
        let mut view = ConsoleView::default();
        assert_eq!(view.show(View::Board), vec!["No picks yet.".to_string()]);

        view.apply(UiUpdate::Board(vec![
            pick(7, Some(2), "Second"),
            pick(8, None, "Unplaced"),
            pick(6, Some(1), "First"),
        ]));
        let lines = view.show(View::Board);
        assert!(lines[0].contains("First"));
        assert!(lines[1].contains("Second"));
        assert!(lines[2].starts_with("#-"));
        assert!(lines[0].ends_with("20.0/0.0/1.3"));
    }
}
