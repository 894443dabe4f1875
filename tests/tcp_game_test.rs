mod common;

use battleship_lan::{Envelope, FireOutcome, Phase};
use common::{fleet_cells, is_target_response, open_water, start_server, Peer};

#[tokio::test(flavor = "multi_thread")]
async fn test_full_game_over_tcp() -> anyhow::Result<()> {
    let (addr, shared) = start_server(11).await;

    let mut alice = Peer::join(addr, "alice").await;
    let mut bob = Peer::join(addr, "bob").await;
    // Alice also sees Bob arrive.
    alice
        .recv_until(|e| matches!(e, Envelope::JoinResponse { player, .. } if player == "bob"))
        .await;

    alice.place_fleet().await;
    bob.place_fleet().await;
    for peer in [&mut alice, &mut bob] {
        peer.recv_until(|e| {
            matches!(e, Envelope::InfoResponse { message } if message.contains("alice fires first"))
        })
        .await;
    }
    assert_eq!(shared.lock().phase(), Phase::InProgress);

    let targets = fleet_cells();
    let misses = open_water();
    for (i, cell) in targets.iter().enumerate() {
        alice.fire(cell).await;
        let seen_by_alice = alice.recv_until(is_target_response).await;
        let seen_by_bob = bob.recv_until(is_target_response).await;
        let Envelope::TargetResponse {
            outcome, winner, ..
        } = &seen_by_alice
        else {
            unreachable!();
        };
        assert_ne!(*outcome, FireOutcome::Miss, "{} should hit", cell);
        let Envelope::TargetResponse {
            boards: bob_view, ..
        } = &seen_by_bob
        else {
            unreachable!();
        };
        // Bob's own grid shows the incoming hit.
        let row = (cell.as_bytes()[0] - b'A') as usize;
        let col: usize = cell[1..].parse::<usize>()? - 1;
        assert_eq!(bob_view.ship_positions[row][col], '*');

        if i + 1 == targets.len() {
            assert_eq!(*outcome, FireOutcome::HitAndSunk);
            assert_eq!(winner.as_deref(), Some("alice"));
            break;
        }
        assert!(winner.is_none());

        bob.fire(&misses[i]).await;
        alice.recv_until(is_target_response).await;
        bob.recv_until(is_target_response).await;
    }

    for peer in [&mut alice, &mut bob] {
        let end = peer.recv().await;
        assert!(
            matches!(&end, Envelope::QuitResponse { player: Some(p), .. } if p == "alice"),
            "{:?}",
            end
        );
        peer.expect_closed().await;
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_out_of_turn_and_gated_fire_over_tcp() -> anyhow::Result<()> {
    let (addr, _shared) = start_server(12).await;
    let mut alice = Peer::join(addr, "alice").await;
    let mut bob = Peer::join(addr, "bob").await;

    alice.fire("A1").await;
    let err = alice
        .recv_until(|e| matches!(e, Envelope::ErrorResponse { .. }))
        .await;
    assert!(matches!(err, Envelope::ErrorResponse { message } if message.contains("must place all ships")));

    alice.place_fleet().await;
    bob.send(Envelope::Place {
        position: "random".to_string(),
    })
    .await;
    bob.recv_until(|e| matches!(e, Envelope::PlaceResponse { .. })).await;

    bob.fire("A1").await;
    let err = bob
        .recv_until(|e| matches!(e, Envelope::ErrorResponse { .. }))
        .await;
    assert_eq!(err, Envelope::error("It is not your turn"));

    bob.send(Envelope::Boards).await;
    let state = bob
        .recv_until(|e| matches!(e, Envelope::GameState { .. }))
        .await;
    assert!(matches!(
        state,
        Envelope::GameState {
            phase: Phase::InProgress,
            your_turn: false,
            ..
        }
    ));

    bob.send(Envelope::Chat {
        message: "your move".to_string(),
    })
    .await;
    let chat = alice
        .recv_until(|e| matches!(e, Envelope::ChatResponse { .. }))
        .await;
    assert_eq!(
        chat,
        Envelope::ChatResponse {
            player: "bob".to_string(),
            message: "your move".to_string()
        }
    );
    Ok(())
}
