//! Game constants and runtime configuration.

use std::time::Duration;

pub const BOARD_SIZE: usize = 10;

/// Required fleet, largest ship first.
pub const FLEET: [usize; 5] = [5, 4, 3, 3, 2];
pub const NUM_SHIPS: usize = FLEET.len();
pub const MIN_SHIP_SIZE: usize = 2;
pub const MAX_SHIP_SIZE: usize = 5;

/// Total number of ship segments in a complete fleet.
pub const TOTAL_SHIP_CELLS: usize = 5 + 4 + 3 + 3 + 2;

pub const DEFAULT_PORT: u16 = 12358;

/// Longest line accepted from a peer before the connection is dropped.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// How long a server connection may stay silent before it is treated as lost.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// How often an idle client tells the server it is still there. Well under
/// [`DEFAULT_IDLE_TIMEOUT`].
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Upper bound on a single socket write.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Capacity of each connection's outbound channel on the server.
pub const OUTBOX_CAPACITY: usize = 32;

/// Capacity of the client's dispatch queue.
pub const QUEUE_CAPACITY: usize = 64;

/// Attempts per ship before random placement gives up.
pub const RANDOM_PLACEMENT_ATTEMPTS: usize = 100;

/// How many ships of `size` a complete fleet holds.
pub fn allowed_count(size: usize) -> usize {
    FLEET.iter().filter(|&&s| s == size).count()
}

/// Server settings resolved from the command line.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub idle_timeout: Duration,
    /// Fixed RNG seed for reproducible random placements.
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: format!("0.0.0.0:{}", DEFAULT_PORT),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            seed: None,
        }
    }
}

/// Client settings resolved from the command line.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub connect: String,
    pub username: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect: format!("127.0.0.1:{}", DEFAULT_PORT),
            username: None,
        }
    }
}
