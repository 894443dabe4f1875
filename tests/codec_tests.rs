use battleship_lan::{
    decode, encode, BoardsView, DecodeError, Envelope, FireOutcome, Phase, Slot, BOARD_SIZE,
};

fn sample_boards() -> BoardsView {
    let mut view = BoardsView {
        ship_positions: [['~'; BOARD_SIZE]; BOARD_SIZE],
        target_positions: [['~'; BOARD_SIZE]; BOARD_SIZE],
    };
    view.ship_positions[0][0] = '<';
    view.ship_positions[0][1] = '*';
    view.target_positions[4][7] = 'o';
    view
}

#[test]
fn test_encode_ends_with_single_newline() {
    let bytes = encode(&Envelope::Chat {
        message: "hi\nthere".to_string(),
    })
    .unwrap();
    assert_eq!(bytes.last(), Some(&b'\n'));
    // Embedded newlines are escaped, so the frame is exactly one line.
    assert_eq!(bytes.iter().filter(|&&b| b == b'\n').count(), 1);
}

#[test]
fn test_wire_shape_uses_type_tag() {
    let bytes = encode(&Envelope::Target {
        target: "B7".to_string(),
    })
    .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["type"], "target");
    assert_eq!(value["target"], "B7");

    let bytes = encode(&Envelope::Boards).unwrap();
    assert_eq!(bytes, b"{\"type\":\"boards\"}\n");
}

#[test]
fn test_target_response_round_trip() {
    let envelope = Envelope::TargetResponse {
        player: "alice".to_string(),
        target: "A2".to_string(),
        outcome: FireOutcome::HitAndSunk,
        winner: Some("alice".to_string()),
        boards: sample_boards(),
        message: "alice fired at A2: hit and sunk".to_string(),
    };
    let bytes = encode(&envelope).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["outcome"], "hit_and_sunk");
    assert_eq!(value["boards"]["ship_positions"][0][0], "<");
    assert_eq!(decode(&bytes).unwrap(), envelope);
}

/// One instance of every message type, optional fields both set and unset.
fn every_envelope() -> Vec<Envelope> {
    vec![
        Envelope::Join { username: None },
        Envelope::Join {
            username: Some("alice".to_string()),
        },
        Envelope::Place {
            position: "5 H A1".to_string(),
        },
        Envelope::Target {
            target: "J10".to_string(),
        },
        Envelope::Chat {
            message: "gl \"hf\" ~ \u{1F6A2}".to_string(),
        },
        Envelope::Boards,
        Envelope::Quit,
        Envelope::Heartbeat,
        Envelope::JoinResponse {
            player: "bob".to_string(),
            slot: Slot::Second,
            message: "bob joined as Player 2".to_string(),
        },
        Envelope::PlaceResponse {
            player: "bob".to_string(),
            message: "Placed 5-cell ship at A1 (H)".to_string(),
            boards: sample_boards(),
        },
        Envelope::TargetResponse {
            player: "bob".to_string(),
            target: "C3".to_string(),
            outcome: FireOutcome::Miss,
            winner: None,
            boards: sample_boards(),
            message: "bob fired at C3: miss.".to_string(),
        },
        Envelope::ChatResponse {
            player: "alice".to_string(),
            message: "hi".to_string(),
        },
        Envelope::GameState {
            player: "alice".to_string(),
            phase: Phase::InProgress,
            your_turn: true,
            boards: sample_boards(),
        },
        Envelope::QuitResponse {
            player: None,
            message: "Goodbye.".to_string(),
        },
        Envelope::QuitResponse {
            player: Some("alice".to_string()),
            message: "alice quit. Game over.".to_string(),
        },
        Envelope::info("Waiting for an opponent to join..."),
        Envelope::error("It is not your turn"),
        Envelope::ThirdClient {
            message: "Two players are already in this game.".to_string(),
        },
    ]
}

#[test]
fn test_every_envelope_survives_the_wire() {
    let envelopes = every_envelope();
    let mut tags: Vec<&str> = envelopes.iter().map(Envelope::type_tag).collect();
    tags.dedup();
    assert_eq!(tags.len(), 16, "one entry per message type: {:?}", tags);

    for envelope in envelopes {
        let bytes = encode(&envelope).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], envelope.type_tag());
        assert_eq!(decode(&bytes).unwrap(), envelope);
    }
}

#[test]
fn test_decode_accepts_client_lines() {
    assert_eq!(
        decode(b"{\"type\":\"join\"}").unwrap(),
        Envelope::Join { username: None }
    );
    assert_eq!(
        decode(b"{\"type\":\"join\",\"username\":\"bob\"}\r\n").unwrap(),
        Envelope::Join {
            username: Some("bob".to_string())
        }
    );
    assert_eq!(
        decode(b"{\"type\":\"place\",\"position\":\"3 H B4\"}\n").unwrap(),
        Envelope::Place {
            position: "3 H B4".to_string()
        }
    );
    assert_eq!(decode(b"{\"type\":\"quit\"}").unwrap(), Envelope::Quit);
}

#[test]
fn test_decode_errors_are_typed() {
    assert_eq!(decode(b"   \n"), Err(DecodeError::Empty));
    assert!(matches!(decode(b"{not json"), Err(DecodeError::Malformed(_))));
    assert!(matches!(decode(b"[1,2,3]"), Err(DecodeError::Malformed(_))));
    assert_eq!(decode(b"{\"target\":\"A1\"}"), Err(DecodeError::MissingType));
    assert_eq!(decode(b"{\"type\":7}"), Err(DecodeError::MissingType));
    assert_eq!(
        decode(b"{\"type\":\"teleport\"}"),
        Err(DecodeError::UnknownType("teleport".to_string()))
    );
    assert!(matches!(
        decode(b"{\"type\":\"target\"}"),
        Err(DecodeError::InvalidPayload { ref tag, .. }) if tag == "target"
    ));
}

#[test]
fn test_decode_never_panics_on_garbage() {
    let inputs: [&[u8]; 5] = [b"\xff\xfe", b"{", b"null", b"\"type\"", b"{\"type\":\"game_state\"}"];
    for input in inputs {
        assert!(decode(input).is_err());
    }
}
