//! Two-player session state machine.
//!
//! A [`Session`] owns the roster, both boards and the game phase. It is a plain
//! value: the server wraps it in one mutex and every command runs its
//! validate-and-mutate step under that lock. Methods never perform I/O; they
//! return [`Delivery`] lists that the caller sends after releasing the lock.

use core::fmt;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::board::{self, Board};
use crate::common::{FireError, FireOutcome, ParseError, PlacementError};
use crate::coord::Coordinate;
use crate::protocol::Envelope;
use crate::ship::Placement;

/// Outbound channel of one connection.
pub type Outbox = mpsc::Sender<Envelope>;

/// Server-assigned identifier of an accepted connection.
pub type ConnectionId = u64;

/// Which seat a player holds. Assigned once at join time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    First,
    Second,
}

impl Slot {
    pub fn index(self) -> usize {
        match self {
            Slot::First => 0,
            Slot::Second => 1,
        }
    }

    pub fn other(self) -> Slot {
        match self {
            Slot::First => Slot::Second,
            Slot::Second => Slot::First,
        }
    }

    pub fn default_name(self) -> &'static str {
        match self {
            Slot::First => "Player 1",
            Slot::Second => "Player 2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AwaitingPlayers,
    Placement,
    InProgress,
    Finished,
}

/// Rule violations. Reported to the requester only; the session is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No free seat, or the game is already under way.
    Capacity,
    AlreadyJoined,
    NotJoined,
    WaitingForOpponent,
    GameOver,
    /// The requester still has ships to place.
    OwnFleetIncomplete,
    /// The named opponent still has ships to place.
    OpponentFleetIncomplete(String),
    NotYourTurn,
    /// A server-to-client message arrived from a client.
    Unsupported(&'static str),
    Parse(ParseError),
    Placement(PlacementError),
    Fire(FireError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Capacity => write!(f, "The game is full. Try again later."),
            SessionError::AlreadyJoined => write!(f, "You have already joined"),
            SessionError::NotJoined => write!(f, "Join the game first"),
            SessionError::WaitingForOpponent => write!(f, "Waiting for an opponent to join"),
            SessionError::GameOver => write!(f, "The game is over"),
            SessionError::OwnFleetIncomplete => {
                write!(f, "You must place all ships before firing")
            }
            SessionError::OpponentFleetIncomplete(name) => {
                write!(f, "{} must place all ships before firing can start", name)
            }
            SessionError::NotYourTurn => write!(f, "It is not your turn"),
            SessionError::Unsupported(tag) => {
                write!(f, "'{}' messages cannot be sent to the server", tag)
            }
            SessionError::Parse(e) => write!(f, "{}", e),
            SessionError::Placement(e) => write!(f, "{}", e),
            SessionError::Fire(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<ParseError> for SessionError {
    fn from(err: ParseError) -> Self {
        SessionError::Parse(err)
    }
}

impl From<PlacementError> for SessionError {
    fn from(err: PlacementError) -> Self {
        SessionError::Placement(err)
    }
}

impl From<FireError> for SessionError {
    fn from(err: FireError) -> Self {
        SessionError::Fire(err)
    }
}

/// Who an outbound envelope goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// The connection that issued the command, seated or not.
    Requester,
    Player(Slot),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub to: Recipient,
    pub envelope: Envelope,
}

impl Delivery {
    fn requester(envelope: Envelope) -> Self {
        Self {
            to: Recipient::Requester,
            envelope,
        }
    }

    fn player(slot: Slot, envelope: Envelope) -> Self {
        Self {
            to: Recipient::Player(slot),
            envelope,
        }
    }
}

/// A seated player.
pub struct PlayerSlot {
    slot: Slot,
    username: String,
    connection: ConnectionId,
    outbox: Outbox,
    board: Board,
}

impl PlayerSlot {
    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn board(&self) -> &Board {
        &self.board
    }
}

pub struct Session {
    players: [Option<PlayerSlot>; 2],
    phase: Phase,
    rng: SmallRng,
}

impl Session {
    /// Empty session in [`Phase::AwaitingPlayers`].
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => SmallRng::seed_from_u64(s),
            None => SmallRng::from_rng(&mut rand::rng()),
        };
        Self {
            players: [None, None],
            phase: Phase::AwaitingPlayers,
            rng,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn player(&self, slot: Slot) -> Option<&PlayerSlot> {
        self.players[slot.index()].as_ref()
    }

    /// Number of occupied seats.
    pub fn occupied(&self) -> usize {
        self.players.iter().filter(|p| p.is_some()).count()
    }

    /// No seat is occupied.
    pub fn is_vacant(&self) -> bool {
        self.occupied() == 0
    }

    /// A new connection could still take a seat.
    pub fn can_admit(&self) -> bool {
        self.phase == Phase::AwaitingPlayers && self.occupied() < 2
    }

    /// Seat held by `conn`, if any.
    pub fn slot_of(&self, conn: ConnectionId) -> Option<Slot> {
        self.players
            .iter()
            .flatten()
            .find(|p| p.connection == conn)
            .map(|p| p.slot)
    }

    /// Seat allowed to fire next, once firing is open.
    ///
    /// Derived from shot counts, never arrival order: First fires while it has
    /// not fired more than Second, Second while it has fired fewer than First.
    pub fn turn(&self) -> Option<Slot> {
        if self.phase != Phase::InProgress {
            return None;
        }
        let [first, second] = &self.players;
        let first = first.as_ref()?.board.shots_fired_count();
        let second = second.as_ref()?.board.shots_fired_count();
        if first <= second {
            Some(Slot::First)
        } else {
            Some(Slot::Second)
        }
    }

    /// Outbound channel of a seated player.
    pub fn outbox(&self, slot: Slot) -> Option<&Outbox> {
        self.player(slot).map(PlayerSlot::outbox)
    }

    /// Run one inbound command from `conn`. Rule violations become envelopes
    /// for the requester.
    pub fn handle(&mut self, conn: ConnectionId, outbox: &Outbox, envelope: Envelope) -> Vec<Delivery> {
        let result = match envelope {
            Envelope::Join { username } => self.join(conn, outbox.clone(), username),
            Envelope::Place { position } => self.place(conn, &position),
            Envelope::Target { target } => self.fire(conn, &target),
            Envelope::Chat { message } => self.chat(conn, message),
            Envelope::Boards => self.snapshot(conn),
            Envelope::Quit => Ok(self.leave(conn, true)),
            Envelope::Heartbeat => Ok(Vec::new()),
            other => Err(SessionError::Unsupported(other.type_tag())),
        };
        match result {
            Ok(deliveries) => deliveries,
            Err(SessionError::Capacity) => vec![Delivery::requester(Envelope::ThirdClient {
                message: SessionError::Capacity.to_string(),
            })],
            Err(err) => vec![Delivery::requester(Envelope::error(err.to_string()))],
        }
    }

    /// Seat `conn` in the first free slot.
    pub fn join(
        &mut self,
        conn: ConnectionId,
        outbox: Outbox,
        username: Option<String>,
    ) -> Result<Vec<Delivery>, SessionError> {
        if self.slot_of(conn).is_some() {
            return Err(SessionError::AlreadyJoined);
        }
        if !self.can_admit() {
            return Err(SessionError::Capacity);
        }
        let slot = if self.players[0].is_none() {
            Slot::First
        } else {
            Slot::Second
        };
        let username = username
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| slot.default_name().to_string());
        self.players[slot.index()] = Some(PlayerSlot {
            slot,
            username: username.clone(),
            connection: conn,
            outbox,
            board: Board::new(),
        });

        let joined = Envelope::JoinResponse {
            player: username.clone(),
            slot,
            message: format!("{} joined as {}", username, slot.default_name()),
        };
        let mut out = self.broadcast(joined);
        if self.occupied() == 2 {
            self.phase = Phase::Placement;
            out.extend(self.broadcast(Envelope::info(
                "Both players are here. Place your fleet: one 5, one 4, two 3 and one 2-cell ship \
                 (e.g. 'place 3 H B4' or 'place random').",
            )));
        } else {
            out.push(Delivery::player(slot, Envelope::info("Waiting for an opponent to join...")));
        }
        Ok(out)
    }

    /// Place one ship (`"<size> <H|V> <cell>"`) or the rest of the fleet
    /// (`"random"`).
    pub fn place(&mut self, conn: ConnectionId, position: &str) -> Result<Vec<Delivery>, SessionError> {
        let slot = self.slot_of(conn).ok_or(SessionError::NotJoined)?;
        if self.phase == Phase::Finished {
            return Err(SessionError::GameOver);
        }
        if self.player(slot.other()).is_none() {
            return Err(SessionError::WaitingForOpponent);
        }

        let Session { players, rng, .. } = &mut *self;
        let player = players[slot.index()].as_mut().ok_or(SessionError::NotJoined)?;
        if player.board.fleet_complete() {
            return Err(PlacementError::FleetComplete.into());
        }
        let placed = if position.trim().eq_ignore_ascii_case("random") {
            let count = player.board.place_remaining_randomly(rng)?;
            format!("Placed {} ship(s) at random", count)
        } else {
            let p: Placement = position.parse()?;
            player.board.place_ship(p.size, p.orientation, p.anchor)?;
            format!("Placed {}-cell ship at {} ({})", p.size, p.anchor, p.orientation.letter())
        };

        let remaining = player.board.remaining_sizes();
        let progress = if remaining.is_empty() {
            "Fleet complete.".to_string()
        } else {
            let sizes: Vec<String> = remaining.iter().map(usize::to_string).collect();
            format!("Still to place: {}.", sizes.join(", "))
        };
        let mut out = vec![Delivery::player(
            slot,
            Envelope::PlaceResponse {
                player: player.username.clone(),
                message: format!("{}. {}", placed, progress),
                boards: player.board.view(),
            },
        )];

        if self.both_fleets_complete() {
            self.phase = Phase::InProgress;
            let first = self.name(Slot::First);
            out.extend(self.broadcast(Envelope::info(format!(
                "All ships placed. {} fires first.",
                first
            ))));
        } else if remaining.is_empty() {
            out.push(Delivery::player(
                slot,
                Envelope::info(format!(
                    "Waiting for {} to finish placing ships.",
                    self.name(slot.other())
                )),
            ));
        }
        Ok(out)
    }

    /// Fire at `target` on the opponent's board.
    pub fn fire(&mut self, conn: ConnectionId, target: &str) -> Result<Vec<Delivery>, SessionError> {
        let slot = self.slot_of(conn).ok_or(SessionError::NotJoined)?;
        if self.phase == Phase::Finished {
            return Err(SessionError::GameOver);
        }
        let (firer, victim) = self
            .pair_mut(slot)
            .ok_or(SessionError::WaitingForOpponent)?;
        if !firer.board.fleet_complete() {
            return Err(SessionError::OwnFleetIncomplete);
        }
        if !victim.board.fleet_complete() {
            return Err(SessionError::OpponentFleetIncomplete(victim.username.clone()));
        }
        let coord: Coordinate = target.parse()?;
        let (mine, theirs) = (firer.board.shots_fired_count(), victim.board.shots_fired_count());
        let may_fire = match slot {
            Slot::First => mine <= theirs,
            Slot::Second => mine < theirs,
        };
        if !may_fire {
            return Err(SessionError::NotYourTurn);
        }

        let outcome = board::fire(&mut firer.board, &mut victim.board, coord)?;
        let won = victim.board.all_ships_sunk();
        let shooter = firer.username.clone();
        let opponent = victim.username.clone();

        let mut message = match outcome {
            FireOutcome::Miss => format!("{} fired at {}: miss.", shooter, coord),
            FireOutcome::Hit => format!("{} fired at {}: hit!", shooter, coord),
            FireOutcome::HitAndSunk => {
                format!("{} fired at {}: hit and sunk one of {}'s ships!", shooter, coord, opponent)
            }
        };
        if won {
            message.push_str(&format!(" {} wins!", shooter));
            self.phase = Phase::Finished;
        } else {
            message.push_str(&format!(" {} to fire.", opponent));
        }

        let winner = won.then(|| shooter.clone());
        let mut out = Vec::with_capacity(4);
        for seat in [Slot::First, Slot::Second] {
            if let Some(p) = self.player(seat) {
                out.push(Delivery::player(
                    seat,
                    Envelope::TargetResponse {
                        player: shooter.clone(),
                        target: coord.to_string(),
                        outcome,
                        winner: winner.clone(),
                        boards: p.board.view(),
                        message: message.clone(),
                    },
                ));
            }
        }
        if won {
            out.extend(self.broadcast(Envelope::QuitResponse {
                player: Some(shooter.clone()),
                message: format!("Game over: {} sank every ship and wins.", shooter),
            }));
        }
        Ok(out)
    }

    pub fn chat(&mut self, conn: ConnectionId, message: String) -> Result<Vec<Delivery>, SessionError> {
        let slot = self.slot_of(conn).ok_or(SessionError::NotJoined)?;
        let player = self.name(slot);
        Ok(self.broadcast(Envelope::ChatResponse { player, message }))
    }

    /// Full snapshot for the requester.
    pub fn snapshot(&self, conn: ConnectionId) -> Result<Vec<Delivery>, SessionError> {
        let slot = self.slot_of(conn).ok_or(SessionError::NotJoined)?;
        let player = self.player(slot).ok_or(SessionError::NotJoined)?;
        Ok(vec![Delivery::requester(Envelope::GameState {
            player: player.username.clone(),
            phase: self.phase,
            your_turn: self.turn() == Some(slot),
            boards: player.board.view(),
        })])
    }

    /// Release the seat held by `conn`.
    ///
    /// An explicit quit is acknowledged to the requester. If an opponent is
    /// still seated and the game had not finished, they get a termination
    /// notice and the game ends.
    pub fn leave(&mut self, conn: ConnectionId, explicit: bool) -> Vec<Delivery> {
        let Some(slot) = self.slot_of(conn) else {
            return if explicit {
                vec![Delivery::requester(Envelope::QuitResponse {
                    player: None,
                    message: "Goodbye.".to_string(),
                })]
            } else {
                Vec::new()
            };
        };
        let name = self.name(slot);
        self.players[slot.index()] = None;

        let reason = if explicit { "quit" } else { "disconnected" };
        let message = format!("{} {}. Game over.", name, reason);
        let mut out = Vec::new();
        if explicit {
            out.push(Delivery::requester(Envelope::QuitResponse {
                player: Some(name.clone()),
                message: message.clone(),
            }));
        }
        if self.player(slot.other()).is_some() && self.phase != Phase::Finished {
            self.phase = Phase::Finished;
            out.push(Delivery::player(
                slot.other(),
                Envelope::QuitResponse {
                    player: Some(name),
                    message,
                },
            ));
        }
        out
    }

    fn both_fleets_complete(&self) -> bool {
        self.players
            .iter()
            .all(|p| p.as_ref().is_some_and(|p| p.board.fleet_complete()))
    }

    fn name(&self, slot: Slot) -> String {
        self.player(slot)
            .map(|p| p.username.clone())
            .unwrap_or_else(|| slot.default_name().to_string())
    }

    /// One copy of `envelope` per seated player.
    fn broadcast(&self, envelope: Envelope) -> Vec<Delivery> {
        self.players
            .iter()
            .flatten()
            .map(|p| Delivery::player(p.slot, envelope.clone()))
            .collect()
    }

    /// (`slot`'s player, opponent), when both seats are taken.
    fn pair_mut(&mut self, slot: Slot) -> Option<(&mut PlayerSlot, &mut PlayerSlot)> {
        let [first, second] = &mut self.players;
        let (first, second) = (first.as_mut()?, second.as_mut()?);
        match slot {
            Slot::First => Some((first, second)),
            Slot::Second => Some((second, first)),
        }
    }
}
