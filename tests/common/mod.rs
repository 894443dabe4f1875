#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use battleship_lan::server::Shared;
use battleship_lan::transport::{FrameReader, FrameSource};
use battleship_lan::{decode, encode, Envelope, Server, ServerConfig};
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};

pub const STEP: Duration = Duration::from_secs(5);

/// Ships in rows A, C, E, G and a vertical 2 at I10.
pub const FLEET_LAYOUT: [&str; 5] = ["5 H A1", "4 H C1", "3 H E1", "3 H G1", "2 V I10"];

/// Cells covered by [`FLEET_LAYOUT`], row-major.
pub fn fleet_cells() -> Vec<String> {
    let mut cells: Vec<String> = Vec::new();
    for (row, len) in [("A", 5), ("C", 4), ("E", 3), ("G", 3)] {
        cells.extend((1..=len).map(|c| format!("{}{}", row, c)));
    }
    cells.push("I10".to_string());
    cells.push("J10".to_string());
    cells
}

/// Cells never covered by [`FLEET_LAYOUT`].
pub fn open_water() -> Vec<String> {
    ["B", "D", "F", "H"]
        .iter()
        .flat_map(|r| (1..=10).map(move |c| format!("{}{}", r, c)))
        .collect()
}

pub async fn start_server(seed: u64) -> (SocketAddr, Arc<Shared>) {
    start_server_with(ServerConfig {
        bind: "127.0.0.1:0".to_string(),
        seed: Some(seed),
        ..ServerConfig::default()
    })
    .await
}

pub async fn start_server_with(config: ServerConfig) -> (SocketAddr, Arc<Shared>) {
    let server = Server::bind(config).await.expect("bind");
    let addr = server.local_addr().expect("addr");
    let shared = server.shared();
    tokio::spawn(server.run());
    (addr, shared)
}

/// Raw test client speaking line-delimited JSON.
pub struct Peer {
    reader: FrameReader<ReadHalf<TcpStream>>,
    writer: WriteHalf<TcpStream>,
}

impl Peer {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (read, writer) = tokio::io::split(stream);
        Peer {
            reader: FrameReader::new(read),
            writer,
        }
    }

    /// Connect, read the welcome notice and take a seat.
    pub async fn join(addr: SocketAddr, name: &str) -> Self {
        let mut peer = Peer::connect(addr).await;
        assert!(matches!(peer.recv().await, Envelope::InfoResponse { .. }));
        peer.send(Envelope::Join {
            username: Some(name.to_string()),
        })
        .await;
        let name = name.to_string();
        peer.recv_until(|e| matches!(e, Envelope::JoinResponse { player, .. } if *player == name))
            .await;
        peer
    }

    pub async fn send(&mut self, envelope: Envelope) {
        let bytes = encode(&envelope).expect("encode");
        self.send_raw(&bytes).await;
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.expect("write");
        self.writer.flush().await.expect("flush");
    }

    pub async fn recv(&mut self) -> Envelope {
        let line = timeout(STEP, self.reader.next_frame())
            .await
            .expect("timed out waiting for a message")
            .expect("read failed")
            .expect("connection closed");
        decode(&line).expect("decode")
    }

    /// Skip messages until one matches `pred`.
    pub async fn recv_until<F>(&mut self, pred: F) -> Envelope
    where
        F: Fn(&Envelope) -> bool,
    {
        loop {
            let envelope = self.recv().await;
            if pred(&envelope) {
                return envelope;
            }
        }
    }

    /// Like [`Peer::recv_until`], but sends a heartbeat whenever `every`
    /// passes without a message.
    pub async fn recv_until_with_heartbeats<F>(&mut self, every: Duration, pred: F) -> Envelope
    where
        F: Fn(&Envelope) -> bool,
    {
        let deadline = tokio::time::Instant::now() + STEP;
        loop {
            tokio::select! {
                frame = self.reader.next_frame() => {
                    let line = frame.expect("read failed").expect("connection closed");
                    let envelope = decode(&line).expect("decode");
                    if pred(&envelope) {
                        return envelope;
                    }
                }
                _ = tokio::time::sleep(every) => {
                    assert!(tokio::time::Instant::now() < deadline, "timed out waiting for a message");
                    self.send(Envelope::Heartbeat).await;
                }
            }
        }
    }

    /// The server closes the connection without sending anything else.
    pub async fn expect_closed(&mut self) {
        let next = timeout(STEP, self.reader.next_frame())
            .await
            .expect("timed out waiting for close");
        match next {
            Ok(None) | Err(_) => {}
            Ok(Some(line)) => panic!(
                "expected close, got {}",
                String::from_utf8_lossy(&line)
            ),
        }
    }

    /// Read and discard messages until the server closes the connection.
    pub async fn drain_until_closed(&mut self) {
        loop {
            let next = timeout(STEP, self.reader.next_frame())
                .await
                .expect("timed out waiting for close");
            if !matches!(next, Ok(Some(_))) {
                return;
            }
        }
    }

    pub async fn place_fleet(&mut self) {
        for position in FLEET_LAYOUT {
            self.send(Envelope::Place {
                position: position.to_string(),
            })
            .await;
            let reply = self
                .recv_until(|e| {
                    matches!(e, Envelope::PlaceResponse { .. } | Envelope::ErrorResponse { .. })
                })
                .await;
            assert!(
                matches!(reply, Envelope::PlaceResponse { .. }),
                "placement {} rejected: {:?}",
                position,
                reply
            );
        }
    }

    pub async fn fire(&mut self, cell: &str) {
        self.send(Envelope::Target {
            target: cell.to_string(),
        })
        .await;
    }
}

pub fn is_target_response(e: &Envelope) -> bool {
    matches!(e, Envelope::TargetResponse { .. })
}
