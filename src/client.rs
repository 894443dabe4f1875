//! Terminal client: interleaves server pushes with typed commands.
//!
//! Two workers feed one bounded queue. The receive worker decodes frames from
//! the server; the input worker reads one line of user text each time the
//! consumer grants it a pacing token. The [`Dispatcher`] is the only writer of
//! terminal output, so a push arriving while the user is typing clears the
//! prompt line, prints, and redraws the prompt. While the user is quiet the
//! dispatcher sends heartbeats so the server keeps the seat.

use core::fmt;
use std::io::{BufRead, BufReader, Write};
use std::sync::mpsc as std_mpsc;
use std::thread;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};

use crate::codec;
use crate::common::ParseError;
use crate::config::{ClientConfig, HEARTBEAT_INTERVAL, QUEUE_CAPACITY};
use crate::coord::Coordinate;
use crate::protocol::Envelope;
use crate::ship::Placement;
use crate::transport::{self, FrameSink, FrameSource};
use crate::ui;

const PROMPT: &str = "> ";
const CLEAR_LINE: &str = "\r\x1b[2K";

/// One line of user input split into verb and argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommand {
    pub verb: String,
    pub arg: String,
}

impl RawCommand {
    /// The verb is lowercased; the argument keeps its case. A blank line
    /// yields an empty verb.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (verb, arg) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        RawCommand {
            verb: verb.to_ascii_lowercase(),
            arg: arg.trim().to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.verb.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    UnknownVerb(String),
    MissingArgument(&'static str),
    Parse(ParseError),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::UnknownVerb(v) => {
                write!(f, "Unknown command '{}'. Type 'help' for the list", v)
            }
            CommandError::MissingArgument(usage) => write!(f, "Usage: {}", usage),
            CommandError::Parse(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<ParseError> for CommandError {
    fn from(err: ParseError) -> Self {
        CommandError::Parse(err)
    }
}

/// A command whose shape has been checked locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Place(Placement),
    PlaceRandom,
    Target(Coordinate),
    Chat(String),
    Boards,
    Help,
    Quit,
}

impl TryFrom<&RawCommand> for Command {
    type Error = CommandError;

    fn try_from(raw: &RawCommand) -> Result<Self, Self::Error> {
        let arg = raw.arg.as_str();
        match raw.verb.as_str() {
            "place" => {
                if arg.is_empty() {
                    Err(CommandError::MissingArgument("place <size> <H|V> <cell> | place random"))
                } else if arg.eq_ignore_ascii_case("random") {
                    Ok(Command::PlaceRandom)
                } else {
                    Ok(Command::Place(arg.parse()?))
                }
            }
            "fire" | "target" => {
                if arg.is_empty() {
                    Err(CommandError::MissingArgument("fire <cell>"))
                } else {
                    Ok(Command::Target(arg.parse()?))
                }
            }
            "chat" => {
                if arg.is_empty() {
                    Err(CommandError::MissingArgument("chat <message>"))
                } else {
                    Ok(Command::Chat(arg.to_string()))
                }
            }
            "boards" => Ok(Command::Boards),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::UnknownVerb(other.to_string())),
        }
    }
}

impl Command {
    /// The wire request for this command; `None` for local-only commands.
    pub fn to_envelope(&self) -> Option<Envelope> {
        match self {
            Command::Place(p) => Some(Envelope::Place {
                position: p.to_string(),
            }),
            Command::PlaceRandom => Some(Envelope::Place {
                position: "random".to_string(),
            }),
            Command::Target(c) => Some(Envelope::Target {
                target: c.to_string(),
            }),
            Command::Chat(message) => Some(Envelope::Chat {
                message: message.clone(),
            }),
            Command::Boards => Some(Envelope::Boards),
            Command::Quit => Some(Envelope::Quit),
            Command::Help => None,
        }
    }
}

/// Item on the dispatch queue.
#[derive(Debug)]
pub enum Entry {
    Command(RawCommand),
    /// The user's input stream ended.
    InputClosed,
    Server(Envelope),
    /// The server connection ended without a terminal envelope.
    Disconnected(String),
}

/// Decode frames from the server onto `queue` until EOF, a terminal envelope
/// or cancellation.
pub fn spawn_receiver<S>(
    mut source: S,
    queue: mpsc::Sender<Entry>,
    mut cancel: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    S: FrameSource + 'static,
{
    tokio::spawn(async move {
        loop {
            if *cancel.borrow() {
                break;
            }
            let frame = tokio::select! {
                _ = cancel.changed() => break,
                frame = source.next_frame() => frame,
            };
            let line = match frame {
                Ok(Some(line)) => line,
                Ok(None) => {
                    let _ = queue
                        .send(Entry::Disconnected("Server closed the connection".to_string()))
                        .await;
                    break;
                }
                Err(e) => {
                    log::debug!("receive failed: {}", e);
                    let _ = queue.send(Entry::Disconnected(e.to_string())).await;
                    break;
                }
            };
            match codec::decode(&line) {
                Ok(envelope) => {
                    let terminal = envelope.is_terminal();
                    if queue.send(Entry::Server(envelope)).await.is_err() || terminal {
                        break;
                    }
                }
                Err(e) => log::debug!("ignoring undecodable message from server: {}", e),
            }
        }
    })
}

/// Read one line from `input` per pacing token and enqueue it.
///
/// Runs on its own thread because terminal reads block. The thread may stay
/// parked in a read after cancellation; it exits on the next line or EOF.
pub fn spawn_input<R>(
    mut input: R,
    queue: mpsc::Sender<Entry>,
    pacing: std_mpsc::Receiver<()>,
    cancel: watch::Receiver<bool>,
) -> thread::JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || loop {
        if pacing.recv().is_err() || *cancel.borrow() {
            break;
        }
        let mut line = String::new();
        let entry = match input.read_line(&mut line) {
            Ok(0) => Entry::InputClosed,
            Ok(_) => Entry::Command(RawCommand::parse(&line)),
            Err(e) => {
                log::debug!("reading input failed: {}", e);
                Entry::InputClosed
            }
        };
        let closed = matches!(entry, Entry::InputClosed);
        if *cancel.borrow() || queue.blocking_send(entry).is_err() || closed {
            break;
        }
    })
}

/// Single consumer of the dispatch queue and sole writer of terminal output.
pub struct Dispatcher<S, O> {
    sink: S,
    out: O,
    queue: mpsc::Receiver<Entry>,
    pacing: std_mpsc::SyncSender<()>,
    cancel: watch::Sender<bool>,
    username: Option<String>,
    prompt_shown: bool,
    heartbeat_interval: Duration,
}

/// Spawn both workers and return the dispatcher that drains them.
pub fn start<Src, S, R, O>(
    source: Src,
    sink: S,
    input: R,
    out: O,
    username: Option<String>,
) -> Dispatcher<S, O>
where
    Src: FrameSource + 'static,
    S: FrameSink,
    R: BufRead + Send + 'static,
    O: Write,
{
    let (queue_tx, queue_rx) = mpsc::channel(QUEUE_CAPACITY);
    let (pacing_tx, pacing_rx) = std_mpsc::sync_channel(1);
    let (cancel_tx, cancel_rx) = watch::channel(false);
    spawn_receiver(source, queue_tx.clone(), cancel_rx.clone());
    spawn_input(input, queue_tx, pacing_rx, cancel_rx);
    Dispatcher {
        sink,
        out,
        queue: queue_rx,
        pacing: pacing_tx,
        cancel: cancel_tx,
        username,
        prompt_shown: false,
        heartbeat_interval: HEARTBEAT_INTERVAL,
    }
}

impl<S: FrameSink, O: Write> Dispatcher<S, O> {
    /// How long the connection may go quiet before a heartbeat is sent.
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Join the game and process entries until the session ends.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let join = Envelope::Join {
            username: self.username.take(),
        };
        if let Err(e) = self.sink.send(&join).await {
            self.print(&format!("Could not join: {}", e))?;
            return self.finish().await;
        }
        self.grant_input()?;

        let period = self.heartbeat_interval;
        let mut heartbeat = time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let entry = tokio::select! {
                entry = self.queue.recv() => match entry {
                    Some(entry) => entry,
                    None => break,
                },
                _ = heartbeat.tick() => {
                    if let Err(e) = self.sink.send(&Envelope::Heartbeat).await {
                        log::debug!("heartbeat not delivered: {}", e);
                    }
                    continue;
                }
            };
            match entry {
                Entry::Server(envelope) => {
                    let terminal = envelope.is_terminal();
                    if let Some(text) = ui::render_envelope(&envelope) {
                        self.push(&text, !terminal)?;
                    }
                    if terminal {
                        break;
                    }
                }
                Entry::Command(raw) => {
                    self.prompt_shown = false;
                    if !self.dispatch(&raw).await? {
                        break;
                    }
                    heartbeat.reset();
                }
                Entry::InputClosed => {
                    self.prompt_shown = false;
                    log::debug!("input closed, leaving the game");
                    if let Err(e) = self.sink.send(&Envelope::Quit).await {
                        log::debug!("quit not delivered: {}", e);
                        break;
                    }
                }
                Entry::Disconnected(reason) => {
                    self.push(&format!("Disconnected: {}", reason), false)?;
                    break;
                }
            }
        }
        self.finish().await
    }

    /// Handle one typed line. Returns false once the connection is unusable.
    async fn dispatch(&mut self, raw: &RawCommand) -> anyhow::Result<bool> {
        if raw.is_blank() {
            self.grant_input()?;
            return Ok(true);
        }
        let command = match Command::try_from(raw) {
            Ok(command) => command,
            Err(e) => {
                self.print(&format!("Error: {}", e))?;
                self.grant_input()?;
                return Ok(true);
            }
        };
        let Some(envelope) = command.to_envelope() else {
            self.print(ui::help_text())?;
            self.grant_input()?;
            return Ok(true);
        };
        if let Err(e) = self.sink.send(&envelope).await {
            self.print(&format!("Connection lost: {}", e))?;
            return Ok(false);
        }
        if command != Command::Quit {
            self.grant_input()?;
        }
        Ok(true)
    }

    /// Let the input worker read its next line and show the prompt.
    fn grant_input(&mut self) -> anyhow::Result<()> {
        if self.pacing.try_send(()).is_err() {
            log::debug!("input token already pending");
        }
        write!(self.out, "{}", PROMPT)?;
        self.out.flush()?;
        self.prompt_shown = true;
        Ok(())
    }

    fn print(&mut self, text: &str) -> anyhow::Result<()> {
        writeln!(self.out, "{}", text)?;
        self.out.flush()?;
        Ok(())
    }

    /// Print an unsolicited message without tearing the prompt line.
    /// `redraw` puts the prompt back afterwards if it was showing.
    fn push(&mut self, text: &str, redraw: bool) -> anyhow::Result<()> {
        if self.prompt_shown {
            write!(self.out, "{}", CLEAR_LINE)?;
        }
        writeln!(self.out, "{}", text)?;
        if self.prompt_shown && redraw {
            write!(self.out, "{}", PROMPT)?;
        } else {
            self.prompt_shown = false;
        }
        self.out.flush()?;
        Ok(())
    }

    async fn finish(mut self) -> anyhow::Result<()> {
        let _ = self.cancel.send(true);
        if self.prompt_shown {
            writeln!(self.out)?;
            self.out.flush()?;
        }
        if let Err(e) = self.sink.shutdown().await {
            log::debug!("shutdown failed: {}", e);
        }
        Ok(())
    }
}

/// Connect to the server and play from the terminal.
pub async fn run_client(config: ClientConfig) -> anyhow::Result<()> {
    let (reader, writer) = transport::connect(&config.connect).await?;
    log::info!("connected to {}", config.connect);
    let input = BufReader::new(std::io::stdin());
    start(reader, writer, input, std::io::stdout(), config.username)
        .run()
        .await?;
    log::info!("disconnected from {}", config.connect);
    Ok(())
}
