use tokio::io::{AsyncReadExt, BufReader};

use chroma_fuse::adapter::{run_session, RulesFile, Session, SessionConfig};
use chroma_fuse::types::{GameOverReason, Outcome};
use serde_json::Value;

const PUZZLE_RULES: &str = r#"{
    "mode": "puzzle",
    "moves": 2,
    "pieceSizeCurve": [4],
    "paletteSizeCurve": [1],
    "specialBasePerMille": 0,
    "specialGuaranteeInterval": 1000000,
    "wildcardPerMille": 0,
    "chainStepDelayMs": 0,
    "objectives": [{ "kind": "score", "target": 1000000 }],
    "shapes": [{ "name": "square", "cells": [[0, 0], [1, 0], [0, 1], [1, 1]] }]
}"#;

fn puzzle_session() -> Session {
    let rules = RulesFile::from_json(PUZZLE_RULES)
        .unwrap()
        .into_config()
        .unwrap();
    Session::new(SessionConfig {
        seed: 11,
        rules,
        stream_events: true,
    })
    .unwrap()
}

fn parse(line: &str) -> Value {
    serde_json::from_str(line.trim_end()).unwrap()
}

#[test]
fn test_puzzle_round_runs_out_of_moves() {
    let mut session = puzzle_session();
    let first = parse(&session.observation_line(0));
    assert_eq!(first["phase"], "idle");

    session.handle_line(r#"{"type":"command","seq":1,"commands":["spawn"]}"#);
    let out = session.handle_line(r#"{"type":"place","seq":2,"lane":0}"#);
    let obs = parse(out.last().unwrap());
    assert_eq!(obs["moves_left"], 1);
    assert!(obs["score"].as_u64().unwrap() > 0);
    assert!(!session.finished());

    let out = session.handle_line(r#"{"type":"place","seq":3,"lane":5}"#);
    let obs = parse(out.last().unwrap());
    assert_eq!(obs["phase"], "gameOver");
    assert_eq!(obs["outcome"], "movesExhausted");
    assert_eq!(obs["playable"], false);
    assert!(session.finished());

    let summary = session.summary();
    assert_eq!(summary.pieces_locked, 2);
    assert_eq!(
        summary.outcome,
        Some(Outcome::GameOver(GameOverReason::MovesExhausted))
    );
}

#[test]
fn test_same_seed_same_hashes() {
    let script = [
        r#"{"type":"command","seq":1,"commands":["spawn","moveLeft","rotate"]}"#,
        r#"{"type":"tick","seq":2,"elapsed_ms":1000}"#,
        r#"{"type":"command","seq":3,"commands":["hardDrop"]}"#,
    ];
    let hashes = |mut session: Session| -> Vec<String> {
        script
            .iter()
            .map(|line| {
                let out = session.handle_line(line);
                parse(out.last().unwrap())["state_hash"]
                    .as_str()
                    .unwrap()
                    .to_string()
            })
            .collect()
    };
    let a = hashes(puzzle_session());
    let b = hashes(puzzle_session());
    assert_eq!(a, b);
    assert_ne!(a[0], a[2]);
}

#[tokio::test]
async fn test_session_stops_at_terminal_outcome() {
    let (server_out, mut client_out) = tokio::io::duplex(1 << 20);

    let script = concat!(
        r#"{"type":"command","seq":1,"commands":["spawn"]}"#,
        "\n",
        "\n",
        r#"{"type":"place","seq":2,"lane":0}"#,
        "\n",
        r#"{"type":"place","seq":3,"lane":4}"#,
        "\n",
        r#"{"type":"command","seq":4,"commands":["hardDrop"]}"#,
        "\n",
    );
    let reader = tokio_test::io::Builder::new().read(script.as_bytes()).build();

    let summary = run_session(BufReader::new(reader), server_out, puzzle_session())
        .await
        .unwrap();
    // The round ends on the third line; the fourth is never handled
    assert_eq!(summary.messages, 3);
    assert_eq!(summary.pieces_locked, 2);

    let mut output = String::new();
    client_out.read_to_string(&mut output).await.unwrap();
    let messages: Vec<Value> = output.lines().map(parse).collect();

    assert_eq!(messages[0]["type"], "observation");
    assert_eq!(messages[0]["seq"], 0);
    let acks = messages.iter().filter(|m| m["type"] == "ack").count();
    assert_eq!(acks, 3);
    assert!(messages
        .iter()
        .any(|m| m["type"] == "event" && m["event"]["kind"] == "gameOver"));

    let last = messages.last().unwrap();
    assert_eq!(last["type"], "observation");
    assert_eq!(last["seq"], 3);
    assert_eq!(last["outcome"], "movesExhausted");
}
