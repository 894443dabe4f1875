mod common;

use battleship_lan::{Envelope, ServerConfig};
use common::{start_server_with, Peer};
use tokio::time::{sleep, Duration};

fn config(idle_timeout: Duration) -> ServerConfig {
    ServerConfig {
        bind: "127.0.0.1:0".to_string(),
        idle_timeout,
        seed: Some(61),
    }
}

/// Next chat line, failing on any game-over notice in between.
async fn next_chat(peer: &mut Peer) -> Envelope {
    loop {
        match peer.recv().await {
            e @ Envelope::ChatResponse { .. } => return e,
            e @ Envelope::QuitResponse { .. } => panic!("game ended: {:?}", e),
            _ => {}
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_heartbeats_keep_a_waiting_player_seated() -> anyhow::Result<()> {
    let (addr, shared) = start_server_with(config(Duration::from_secs(1))).await;
    let mut alice = Peer::join(addr, "alice").await;
    let mut bob = Peer::join(addr, "bob").await;

    // Alice only sends keepalives while Bob keeps talking, well past the timeout.
    for i in 0..12 {
        alice.send(Envelope::Heartbeat).await;
        bob.send(Envelope::Chat {
            message: format!("still there? {}", i),
        })
        .await;
        next_chat(&mut bob).await;
        sleep(Duration::from_millis(200)).await;
    }

    assert_eq!(shared.lock().occupied(), 2);
    bob.send(Envelope::Chat {
        message: "good".to_string(),
    })
    .await;
    let chat = next_chat(&mut bob).await;
    assert!(matches!(chat, Envelope::ChatResponse { message, .. } if message == "good"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_silent_connection_is_still_dropped() -> anyhow::Result<()> {
    let (addr, _shared) = start_server_with(config(Duration::from_millis(300))).await;
    let _alice = Peer::join(addr, "alice").await;
    let mut bob = Peer::join(addr, "bob").await;

    // Bob stays alive on heartbeats; Alice sends nothing at all.
    let notice = bob
        .recv_until_with_heartbeats(Duration::from_millis(100), |e| {
            matches!(e, Envelope::QuitResponse { .. })
        })
        .await;
    assert!(
        matches!(&notice, Envelope::QuitResponse { player: Some(p), message } if p == "alice" && message.contains("disconnected")),
        "{:?}",
        notice
    );
    Ok(())
}
