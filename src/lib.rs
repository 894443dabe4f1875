mod bitboard;
pub mod board;
pub mod client;
pub mod codec;
mod common;
mod config;
mod coord;
mod logging;
pub mod protocol;
pub mod server;
pub mod session;
mod ship;
pub mod transport;
pub mod ui;

pub use bitboard::{BitBoard, BitBoardError};
pub use board::{fire, Board};
pub use client::{run_client, Command, Dispatcher, Entry, RawCommand};
pub use codec::{decode, encode, DecodeError};
pub use common::*;
pub use config::*;
pub use coord::{Coordinate, Grid};
pub use logging::{init_logging, LOG_ENV};
pub use protocol::{BoardsView, Envelope, SymbolGrid};
pub use server::Server;
pub use session::{Phase, Session, SessionError, Slot};
pub use ship::{Orientation, Placement, Segment, Ship};
