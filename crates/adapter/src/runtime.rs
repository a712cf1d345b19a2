//! Session runtime
//!
//! A [`Session`] owns one game and answers protocol lines synchronously; every
//! mutation happens inside [`Session::handle_line`]. [`run_session`] bridges it
//! to async I/O: the read loop feeds lines to the session and a writer task
//! drains the outbound channel, so a slow reader never stalls the engine.

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use chroma_fuse_core::types::{Outcome, Phase};
use chroma_fuse_core::{GameSnapshot, GameState, RandomSource, SimpleRng};
use chroma_fuse_engine::{apply_place, Placement, Scheduler};

use crate::config::SessionConfig;
use crate::protocol::{
    build_observation, create_ack, create_error, create_event, extract_seq, parse_message,
    CommandMessage, ParsedMessage, PlaceMessage, TickMessage, CODE_INVALID_MESSAGE,
    CODE_UNKNOWN_TYPE,
};

/// Final state of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub score: u64,
    pub level: u32,
    pub max_chain: u32,
    pub pieces_locked: u32,
    pub outcome: Option<Outcome>,
    /// Lines received
    pub messages: u64,
}

pub struct Session<R: RandomSource + Clone = SimpleRng> {
    state: GameState<R>,
    scheduler: Scheduler,
    stream_events: bool,
    snapshot: GameSnapshot,
    messages: u64,
}

impl Session<SimpleRng> {
    pub fn new(config: SessionConfig) -> anyhow::Result<Self> {
        let rng = SimpleRng::new(config.seed);
        let state = GameState::with_config(config.rules, rng).context("invalid rules")?;
        Ok(Self::with_state(state, config.stream_events))
    }
}

impl<R: RandomSource + Clone> Session<R> {
    pub fn with_state(state: GameState<R>, stream_events: bool) -> Self {
        let scheduler = Scheduler::from_config(state.config());
        Self {
            state,
            scheduler,
            stream_events,
            snapshot: GameSnapshot::default(),
            messages: 0,
        }
    }

    pub fn state(&self) -> &GameState<R> {
        &self.state
    }

    /// True once the round has a terminal outcome
    pub fn finished(&self) -> bool {
        self.state.phase().is_terminal()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            score: self.state.score(),
            level: self.state.level(),
            max_chain: self.state.max_chain(),
            pieces_locked: self.state.pieces_locked(),
            outcome: self.state.outcome(),
            messages: self.messages,
        }
    }

    /// Observation of the current state, serialized
    pub fn observation_line(&mut self, seq: u64) -> String {
        self.state.snapshot_into(&mut self.snapshot);
        to_line(&build_observation(&self.snapshot, seq))
    }

    /// Apply one inbound line; returns the outbound lines in order
    ///
    /// The reply (`ack` or `error`) comes first, then one `event` per engine
    /// event, then an `observation`.
    pub fn handle_line(&mut self, line: &str) -> Vec<String> {
        self.messages += 1;
        let mut out = Vec::new();

        let seq = match parse_message(line) {
            Ok(ParsedMessage::Command(msg)) => {
                out.push(self.apply_commands(&msg));
                msg.seq
            }
            Ok(ParsedMessage::Place(msg)) => {
                out.push(self.apply_place(&msg));
                msg.seq
            }
            Ok(ParsedMessage::Tick(msg)) => {
                out.push(self.apply_tick(&msg));
                msg.seq
            }
            Ok(ParsedMessage::Unknown(msg)) => {
                out.push(to_line(&create_error(
                    msg.seq,
                    CODE_UNKNOWN_TYPE,
                    "unknown message type",
                    0,
                )));
                msg.seq
            }
            Err(err) => {
                let seq = extract_seq(line);
                warn!(seq, error = %err, "invalid message");
                out.push(to_line(&create_error(
                    seq,
                    CODE_INVALID_MESSAGE,
                    &err.to_string(),
                    0,
                )));
                seq
            }
        };

        let events = self.state.take_events();
        if self.stream_events {
            out.extend(events.iter().map(|e| to_line(&create_event(seq, e))));
        }
        out.push(self.observation_line(seq));
        out
    }

    fn apply_commands(&mut self, msg: &CommandMessage) -> String {
        let mut applied = 0;
        for &command in msg.commands.0.iter() {
            if let Err(err) = self.state.apply_command(command) {
                debug!(seq = msg.seq, command = command.as_str(), code = err.code(), "command rejected");
                return to_line(&create_error(msg.seq, err.code(), err.message(), applied));
            }
            applied += 1;
            self.kick_resolution();
        }
        to_line(&create_ack(msg.seq, applied))
    }

    fn apply_place(&mut self, msg: &PlaceMessage) -> String {
        let placement = Placement {
            rotations: msg.rotations,
            lane: msg.lane,
            use_hold: msg.use_hold,
        };
        match apply_place(&mut self.state, placement) {
            Ok(()) => {
                self.kick_resolution();
                to_line(&create_ack(msg.seq, 1))
            }
            Err(err) => to_line(&create_error(msg.seq, err.code(), err.message(), 0)),
        }
    }

    fn apply_tick(&mut self, msg: &TickMessage) -> String {
        self.scheduler.advance(&mut self.state, msg.elapsed_ms);
        to_line(&create_ack(msg.seq, 0))
    }

    /// Run the first step of a fresh cycle right away; the rest follow ticks
    fn kick_resolution(&mut self) {
        if self.state.phase() == Phase::Resolving && !self.scheduler.in_cycle() {
            self.scheduler.advance(&mut self.state, 0);
        }
    }
}

fn to_line<T: serde::Serialize>(msg: &T) -> String {
    let mut line = serde_json::to_string(msg).unwrap_or_else(|_| String::from("{}"));
    line.push('\n');
    line
}

/// Serve one session over a line-delimited stream
///
/// Sends an initial observation, then answers every inbound line until EOF or
/// until the round reaches a terminal outcome.
pub async fn run_session<Rd, W, R>(
    reader: Rd,
    writer: W,
    mut session: Session<R>,
) -> anyhow::Result<SessionSummary>
where
    Rd: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    R: RandomSource + Clone,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let write_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(line) = rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let _ = tx.send(session.observation_line(0));

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("failed to read line")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        for out in session.handle_line(line) {
            if tx.send(out).is_err() {
                break;
            }
        }
        if session.finished() {
            info!(score = session.state().score(), "session finished");
            break;
        }
    }

    drop(tx);
    write_task
        .await
        .context("writer task panicked")?
        .context("failed to write")?;
    Ok(session.summary())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chroma_fuse_core::shapes::{ShapeCatalog, ShapeTemplate};
    use chroma_fuse_core::RulesConfig;
    use serde_json::Value;

    fn square_session(delay: u32) -> Session {
        let rules = RulesConfig {
            piece_size_curve: vec![4],
            palette_size_curve: vec![1],
            special_base_per_mille: 0,
            special_per_level_per_mille: 0,
            special_guarantee_interval: u32::MAX,
            wildcard_per_mille: 0,
            chain_step_delay_ms: delay,
            shapes: ShapeCatalog::new(vec![ShapeTemplate::new(
                "square",
                vec![(0, 0), (1, 0), (0, 1), (1, 1)],
            )])
            .unwrap(),
            ..RulesConfig::default()
        };
        Session::new(SessionConfig {
            seed: 5,
            rules,
            stream_events: true,
        })
        .unwrap()
    }

    fn parse(lines: &[String]) -> Vec<Value> {
        lines
            .iter()
            .map(|l| serde_json::from_str(l.trim_end()).unwrap())
            .collect()
    }

    #[test]
    fn test_spawn_then_hard_drop() {
        let mut session = square_session(0);
        let out = parse(&session.handle_line(r#"{"type":"command","seq":1,"commands":["spawn"]}"#));
        assert_eq!(out[0]["type"], "ack");
        assert_eq!(out.last().unwrap()["phase"], "awaitingInput");

        let out = parse(&session.handle_line(r#"{"type":"command","seq":2,"commands":["hardDrop"]}"#));
        assert_eq!(out[0]["type"], "ack");
        let kinds: Vec<&str> = out
            .iter()
            .filter(|m| m["type"] == "event")
            .filter_map(|m| m["event"]["kind"].as_str())
            .collect();
        assert_eq!(kinds, ["locked", "step", "resolutionFinished"]);
        let obs = out.last().unwrap();
        assert_eq!(obs["type"], "observation");
        assert_eq!(obs["seq"], 2);
        assert!(obs["score"].as_u64().unwrap() > 0);
    }

    #[test]
    fn test_rejected_command_reports_code() {
        let mut session = square_session(0);
        let out = parse(&session.handle_line(r#"{"type":"command","seq":3,"commands":["rotate"]}"#));
        assert_eq!(out[0]["type"], "error");
        assert_eq!(out[0]["code"], "not_playing");
        assert_eq!(out[0]["applied"], 0);
    }

    #[test]
    fn test_paced_resolution_follows_ticks() {
        let mut session = square_session(300);
        session.handle_line(r#"{"type":"command","seq":1,"commands":["spawn","hardDrop"]}"#);
        assert_eq!(session.state().phase(), Phase::Resolving);

        let out = parse(&session.handle_line(r#"{"type":"command","seq":2,"commands":["moveLeft"]}"#));
        assert_eq!(out[0]["code"], "resolution_in_progress");

        session.handle_line(r#"{"type":"tick","seq":3,"elapsed_ms":300}"#);
        assert_eq!(session.state().phase(), Phase::AwaitingInput);
    }

    #[test]
    fn test_invalid_and_unknown_messages() {
        let mut session = square_session(0);
        let out = parse(&session.handle_line(r#"{"type":"command","seq":4,"commands":[1]}"#));
        assert_eq!(out[0]["code"], "invalid_message");
        assert_eq!(out[0]["seq"], 4);

        let out = parse(&session.handle_line(r#"{"type":"hello","seq":5}"#));
        assert_eq!(out[0]["code"], "unknown_type");
        assert_eq!(session.summary().messages, 2);
    }

    #[test]
    fn test_place_message() {
        let mut session = square_session(0);
        session.handle_line(r#"{"type":"command","seq":1,"commands":["spawn"]}"#);
        let out = parse(&session.handle_line(r#"{"type":"place","seq":2,"lane":0}"#));
        assert_eq!(out[0]["type"], "ack");
        assert_eq!(session.state().pieces_locked(), 1);

        let out = parse(&session.handle_line(r#"{"type":"place","seq":3,"lane":7}"#));
        assert_eq!(out[0]["code"], "lane_out_of_bounds");
    }

    #[tokio::test]
    async fn test_run_session_over_duplex() {
        let session = square_session(0);
        let input = concat!(
            r#"{"type":"command","seq":1,"commands":["spawn","hardDrop"]}"#,
            "\n",
            r#"{"type":"tick","seq":2,"elapsed_ms":16}"#,
            "\n"
        );
        let (client, server) = tokio::io::duplex(1 << 20);
        let reader = tokio::io::BufReader::new(input.as_bytes());
        let summary = run_session(reader, server, session).await.unwrap();
        assert_eq!(summary.pieces_locked, 1);
        assert_eq!(summary.messages, 2);

        let mut output = String::new();
        let mut client = tokio::io::BufReader::new(client);
        use tokio::io::AsyncReadExt;
        client.read_to_string(&mut output).await.unwrap();
        let first: Value = serde_json::from_str(output.lines().next().unwrap()).unwrap();
        assert_eq!(first["type"], "observation");
        assert_eq!(first["phase"], "idle");
    }
}
