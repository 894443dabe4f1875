//! Wire messages exchanged between the server and its clients.
//!
//! Every message is one [`Envelope`]: a JSON object whose `type` field selects
//! the variant, sent as a single newline-terminated line.

use serde::{Deserialize, Serialize};

use crate::common::FireOutcome;
use crate::config::BOARD_SIZE;
use crate::session::{Phase, Slot};

/// One row-major grid of display symbols.
pub type SymbolGrid = [[char; BOARD_SIZE]; BOARD_SIZE];

/// A player's snapshot of both grids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardsView {
    /// Own ships with the opponent's hits and misses.
    pub ship_positions: SymbolGrid,
    /// Own shots at the opponent.
    pub target_positions: SymbolGrid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    // Client -> server.
    Join {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
    },
    Place {
        position: String,
    },
    Target {
        target: String,
    },
    Chat {
        message: String,
    },
    /// Request a [`Envelope::GameState`] snapshot.
    Boards,
    Quit,
    /// Keepalive from an idle client. Resets the server's idle timer and
    /// nothing else.
    Heartbeat,

    // Server -> client.
    JoinResponse {
        player: String,
        slot: Slot,
        message: String,
    },
    PlaceResponse {
        player: String,
        message: String,
        boards: BoardsView,
    },
    TargetResponse {
        player: String,
        target: String,
        outcome: FireOutcome,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        winner: Option<String>,
        boards: BoardsView,
        message: String,
    },
    ChatResponse {
        player: String,
        message: String,
    },
    GameState {
        player: String,
        phase: Phase,
        your_turn: bool,
        boards: BoardsView,
    },
    /// Terminal: the receiver should disconnect.
    QuitResponse {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player: Option<String>,
        message: String,
    },
    InfoResponse {
        message: String,
    },
    ErrorResponse {
        message: String,
    },
    /// Terminal: sent to a connection the server cannot seat.
    ThirdClient {
        message: String,
    },
}

/// Every `type` tag the codec accepts.
pub const KNOWN_TYPES: &[&str] = &[
    "join",
    "place",
    "target",
    "chat",
    "boards",
    "quit",
    "heartbeat",
    "join_response",
    "place_response",
    "target_response",
    "chat_response",
    "game_state",
    "quit_response",
    "info_response",
    "error_response",
    "third_client",
];

impl Envelope {
    /// The `type` tag this envelope serializes with.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Envelope::Join { .. } => "join",
            Envelope::Place { .. } => "place",
            Envelope::Target { .. } => "target",
            Envelope::Chat { .. } => "chat",
            Envelope::Boards => "boards",
            Envelope::Quit => "quit",
            Envelope::Heartbeat => "heartbeat",
            Envelope::JoinResponse { .. } => "join_response",
            Envelope::PlaceResponse { .. } => "place_response",
            Envelope::TargetResponse { .. } => "target_response",
            Envelope::ChatResponse { .. } => "chat_response",
            Envelope::GameState { .. } => "game_state",
            Envelope::QuitResponse { .. } => "quit_response",
            Envelope::InfoResponse { .. } => "info_response",
            Envelope::ErrorResponse { .. } => "error_response",
            Envelope::ThirdClient { .. } => "third_client",
        }
    }

    /// True for envelopes after which the connection is closed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Envelope::QuitResponse { .. } | Envelope::ThirdClient { .. })
    }

    pub fn info(message: impl Into<String>) -> Self {
        Envelope::InfoResponse {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Envelope::ErrorResponse {
            message: message.into(),
        }
    }
}
