//! Text rendering of server pushes for the terminal client.

use core::fmt::Write as _;

use crate::config::BOARD_SIZE;
use crate::protocol::{BoardsView, Envelope, SymbolGrid};
use crate::session::Phase;

const GAP: &str = "     ";

/// One grid as lines: a column header `1..=10`, then rows `A..=J`.
fn grid_lines(title: &str, grid: &SymbolGrid) -> Vec<String> {
    let mut lines = Vec::with_capacity(BOARD_SIZE + 2);
    lines.push(format!("{:<1$}", title, 3 + 3 * BOARD_SIZE));
    let mut header = String::from("  ");
    for c in 0..BOARD_SIZE {
        let _ = write!(header, " {:>2}", c + 1);
    }
    lines.push(header);
    for (r, row) in grid.iter().enumerate() {
        let mut line = format!("{} ", (b'A' + r as u8) as char);
        for &symbol in row {
            let _ = write!(line, "  {}", symbol);
        }
        lines.push(line);
    }
    lines
}

/// Own fleet and own shots, side by side.
pub fn render_boards(view: &BoardsView) -> String {
    let left = grid_lines("Your fleet", &view.ship_positions);
    let right = grid_lines("Your shots", &view.target_positions);
    let mut out = String::new();
    for (l, r) in left.iter().zip(right.iter()) {
        let _ = writeln!(out, "{:<width$}{}{}", l, GAP, r, width = 3 + 3 * BOARD_SIZE);
    }
    out
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::AwaitingPlayers => "waiting for players",
        Phase::Placement => "placing ships",
        Phase::InProgress => "in progress",
        Phase::Finished => "finished",
    }
}

/// Text for a server push, or `None` for client-bound message types that a
/// server never sends.
pub fn render_envelope(envelope: &Envelope) -> Option<String> {
    let text = match envelope {
        Envelope::JoinResponse { message, .. } => message.clone(),
        Envelope::PlaceResponse { message, boards, .. } => {
            format!("{}\n{}", render_boards(boards), message)
        }
        Envelope::TargetResponse {
            message, boards, ..
        } => format!("{}\n{}", render_boards(boards), message),
        Envelope::ChatResponse { player, message } => format!("[{}] {}", player, message),
        Envelope::GameState {
            player,
            phase,
            your_turn,
            boards,
        } => {
            let turn = if *phase == Phase::InProgress {
                if *your_turn {
                    " Your turn."
                } else {
                    " Opponent's turn."
                }
            } else {
                ""
            };
            format!(
                "{}\n{}: game {}.{}",
                render_boards(boards),
                player,
                phase_label(*phase),
                turn
            )
        }
        Envelope::QuitResponse { message, .. } => message.clone(),
        Envelope::InfoResponse { message } => message.clone(),
        Envelope::ErrorResponse { message } => format!("Error: {}", message),
        Envelope::ThirdClient { message } => message.clone(),
        Envelope::Join { .. }
        | Envelope::Place { .. }
        | Envelope::Target { .. }
        | Envelope::Chat { .. }
        | Envelope::Boards
        | Envelope::Quit
        | Envelope::Heartbeat => return None,
    };
    Some(text)
}

pub fn help_text() -> &'static str {
    "Commands:
  place <size> <H|V> <cell>   place a ship, e.g. 'place 5 H A1'
  place random                place the rest of your fleet at random
  fire <cell>                 fire at a cell, e.g. 'fire B7' (alias: target)
  chat <message>              talk to your opponent
  boards                      show both of your grids
  help                        show this list
  quit                        leave the game
Fleet: one 5, one 4, two 3 and one 2-cell ship. Rows A-J, columns 1-10."
}
