use std::io::{self, BufRead, Write};

use battleship_lan::{
    init_logging, run_client, ClientConfig, Server, ServerConfig, DEFAULT_IDLE_TIMEOUT,
    DEFAULT_PORT,
};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use tokio::time::Duration;

#[derive(Parser)]
#[command(author, version, about = "Two-player Battleship over TCP", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Host a game and wait for two players.
    Server {
        #[arg(long, default_value_t = format!("0.0.0.0:{}", DEFAULT_PORT))]
        bind: String,
        #[arg(long, help = "Seconds a silent connection is kept open", default_value_t = DEFAULT_IDLE_TIMEOUT.as_secs())]
        idle_timeout: u64,
        #[arg(long, help = "Fix RNG seed for reproducible random placement (e.g., --seed 12345)")]
        seed: Option<u64>,
    },
    /// Join a game hosted by a server.
    Client {
        #[arg(long, default_value_t = format!("127.0.0.1:{}", DEFAULT_PORT))]
        connect: String,
        #[arg(long, help = "Name shown to your opponent; prompted for when omitted")]
        username: Option<String>,
    },
}

/// Ask for a username on the terminal. Blank lets the server pick one.
fn prompt_username() -> anyhow::Result<Option<String>> {
    print!("Username (blank for a default): ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let name = line.trim();
    Ok((!name.is_empty()).then(|| name.to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Server {
            bind,
            idle_timeout,
            seed,
        } => {
            init_logging(LevelFilter::Info);
            if let Some(s) = seed {
                log::info!("using fixed seed {} (random placements are reproducible)", s);
            }
            let server = Server::bind(ServerConfig {
                bind,
                idle_timeout: Duration::from_secs(idle_timeout),
                seed,
            })
            .await?;
            println!("Battleship server listening on {}", server.local_addr()?);
            server.run().await?;
        }
        Commands::Client { connect, username } => {
            init_logging(LevelFilter::Warn);
            let username = match username {
                Some(name) => Some(name),
                None => prompt_username()?,
            };
            println!("Connecting to {}...", connect);
            run_client(ClientConfig { connect, username }).await?;
        }
    }
    Ok(())
}
