//! Headless game between two random-firing bots over loopback TCP.
//! Prints the result as one JSON object.

use battleship_lan::transport::{self, FrameSink, FrameSource};
use battleship_lan::{decode, Envelope, Phase, Server, ServerConfig, BOARD_SIZE};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

struct BotResult {
    name: String,
    shots: usize,
    winner: Option<String>,
}

/// Join, place at random once both seats are taken, then fire at random
/// untried cells whenever the server reports it is this bot's turn.
async fn play(addr: String, name: String, seed: u64) -> anyhow::Result<BotResult> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let (mut reader, mut writer) = transport::connect(&addr).await?;
    writer
        .send(&Envelope::Join {
            username: Some(name.clone()),
        })
        .await?;

    let mut placed = false;
    let mut shots = 0;
    let mut winner = None;
    while let Some(line) = reader.next_frame().await? {
        match decode(&line)? {
            Envelope::InfoResponse { .. } => writer.send(&Envelope::Boards).await?,
            Envelope::TargetResponse {
                player,
                winner: won_by,
                ..
            } => {
                if player == name {
                    shots += 1;
                }
                match won_by {
                    Some(w) => winner = Some(w),
                    None => writer.send(&Envelope::Boards).await?,
                }
            }
            Envelope::GameState {
                phase: Phase::Placement,
                ..
            } if !placed => {
                writer
                    .send(&Envelope::Place {
                        position: "random".to_string(),
                    })
                    .await?;
                placed = true;
            }
            Envelope::GameState {
                phase: Phase::InProgress,
                your_turn: true,
                boards,
                ..
            } => {
                let open: Vec<(usize, usize)> = (0..BOARD_SIZE)
                    .flat_map(|r| (0..BOARD_SIZE).map(move |c| (r, c)))
                    .filter(|&(r, c)| boards.target_positions[r][c] == '~')
                    .collect();
                if open.is_empty() {
                    continue;
                }
                let (r, c) = open[rng.random_range(0..open.len())];
                let target = format!("{}{}", (b'A' + r as u8) as char, c + 1);
                writer.send(&Envelope::Target { target }).await?;
            }
            Envelope::QuitResponse { .. } | Envelope::ThirdClient { .. } => break,
            Envelope::ErrorResponse { message } => log::debug!("{}: {}", name, message),
            _ => {}
        }
    }
    Ok(BotResult {
        name,
        shots,
        winner,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <seed>", args[0]);
        std::process::exit(1);
    }
    let seed: u64 = args[1].parse()?;

    let server = Server::bind(ServerConfig {
        bind: "127.0.0.1:0".to_string(),
        seed: Some(seed),
        ..ServerConfig::default()
    })
    .await?;
    let addr = server.local_addr()?.to_string();
    tokio::spawn(server.run());

    let first = tokio::spawn(play(addr.clone(), "bot1".to_string(), seed.wrapping_add(1)));
    let second = tokio::spawn(play(addr, "bot2".to_string(), seed.wrapping_add(2)));
    let (r1, r2) = (first.await??, second.await??);

    let winner = r1.winner.clone().or_else(|| r2.winner.clone());
    let result = json!({
        "seed": seed,
        "players": [
            {"name": r1.name, "shots": r1.shots},
            {"name": r2.name, "shots": r2.shots},
        ],
        "winner": winner,
    });
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}
