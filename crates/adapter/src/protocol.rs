//! Protocol module - JSON message types for the session adapter
//!
//! Line-delimited JSON. Every message carries `type` and `seq`.
//!
//! ## Client → Engine
//!
//! - **command**: `{"type":"command","seq":1,"commands":["moveLeft","rotate","hardDrop"]}`
//! - **place**: `{"type":"place","seq":2,"lane":3,"rotations":1,"useHold":false}`
//! - **tick**: `{"type":"tick","seq":3,"elapsed_ms":16}`
//!
//! ## Engine → Client
//!
//! - **ack**: the message was applied
//! - **error**: the message was rejected, with a stable `code`
//! - **event**: one engine event (chain step, garbage, fever, outcome, ...)
//! - **observation**: full state snapshot after the message

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use chroma_fuse_core::types::{
    ClearedCell, EffectTrigger, GameCommand, GameEvent, Outcome, Pos, StepEvent,
};
use chroma_fuse_core::{GameSnapshot, Objective, PieceSnapshot};

/// Most commands accepted in one `command` message
pub const MAX_COMMANDS: usize = 32;

// ============== Client -> Engine Messages ==============

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandList(pub ArrayVec<GameCommand, MAX_COMMANDS>);

impl<'de> Deserialize<'de> for CommandList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;
        impl<'de> serde::de::Visitor<'de> for V {
            type Value = CommandList;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "an array of command strings")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut out = ArrayVec::<GameCommand, MAX_COMMANDS>::new();
                while let Some(name) = seq.next_element::<std::borrow::Cow<'de, str>>()? {
                    let command = GameCommand::from_str(&name).ok_or_else(|| {
                        serde::de::Error::custom(format!("unknown command '{}'", name))
                    })?;
                    out.try_push(command)
                        .map_err(|_| serde::de::Error::custom("too many commands"))?;
                }
                Ok(CommandList(out))
            }
        }

        deserializer.deserialize_seq(V)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandMessage {
    pub seq: u64,
    pub commands: CommandList,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PlaceMessage {
    pub seq: u64,
    pub lane: i8,
    #[serde(default)]
    pub rotations: u8,
    #[serde(default, rename = "useHold")]
    pub use_hold: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TickMessage {
    pub seq: u64,
    #[serde(rename = "elapsed_ms", alias = "elapsedMs")]
    pub elapsed_ms: u32,
}

/// Parsed incoming message
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Command(CommandMessage),
    Place(PlaceMessage),
    Tick(TickMessage),
    Unknown(UnknownMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMessage {
    pub seq: u64,
}

/// Parse a JSON message from a string
///
/// An unknown `type` is not a parse error; it is reported as
/// [`ParsedMessage::Unknown`] so the session can answer with its `seq`.
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    #[serde(tag = "type")]
    enum InboundMessage {
        #[serde(rename = "command")]
        Command(CommandMessage),
        #[serde(rename = "place")]
        Place(PlaceMessage),
        #[serde(rename = "tick")]
        Tick(TickMessage),
    }

    match serde_json::from_str::<InboundMessage>(json) {
        Ok(InboundMessage::Command(m)) => Ok(ParsedMessage::Command(m)),
        Ok(InboundMessage::Place(m)) => Ok(ParsedMessage::Place(m)),
        Ok(InboundMessage::Tick(m)) => Ok(ParsedMessage::Tick(m)),
        Err(e) => {
            #[derive(Debug, Deserialize)]
            struct Envelope {
                #[serde(rename = "type")]
                msg_type: Option<String>,
                seq: Option<u64>,
            }
            let envelope = serde_json::from_str::<Envelope>(json)?;
            let known = matches!(
                envelope.msg_type.as_deref(),
                Some("command") | Some("place") | Some("tick")
            );
            if known {
                return Err(e);
            }
            Ok(ParsedMessage::Unknown(UnknownMessage {
                seq: envelope.seq.unwrap_or(0),
            }))
        }
    }
}

/// Best-effort `seq` of a line that failed to parse
pub fn extract_seq(line: &str) -> u64 {
    #[derive(Deserialize)]
    struct SeqOnly {
        seq: Option<u64>,
    }
    serde_json::from_str::<SeqOnly>(line)
        .ok()
        .and_then(|s| s.seq)
        .unwrap_or(0)
}

// ============== Engine -> Client Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckType {
    #[serde(rename = "ack")]
    Ack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "error")]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "event")]
    Event,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservationType {
    #[serde(rename = "observation")]
    Observation,
}

/// Protocol-level error codes; engine rejections use the engine's own codes
pub const CODE_INVALID_MESSAGE: &str = "invalid_message";
pub const CODE_UNKNOWN_TYPE: &str = "unknown_type";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckMessage {
    #[serde(rename = "type")]
    pub msg_type: AckType,
    pub seq: u64,
    /// Commands applied from a `command` message
    pub applied: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: ErrorType,
    pub seq: u64,
    pub code: String,
    pub message: String,
    /// Commands applied before the rejected one
    #[serde(default)]
    pub applied: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub msg_type: EventType,
    pub seq: u64,
    pub event: EventPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellDto {
    pub x: i8,
    pub y: i8,
    pub color: String,
    pub special: String,
}

impl From<&ClearedCell> for CellDto {
    fn from(c: &ClearedCell) -> Self {
        Self {
            x: c.x,
            y: c.y,
            color: c.color.as_str().to_string(),
            special: c.special.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectDto {
    pub special: String,
    pub x: i8,
    pub y: i8,
}

impl From<&EffectTrigger> for EffectDto {
    fn from(e: &EffectTrigger) -> Self {
        Self {
            special: e.special.as_str().to_string(),
            x: e.x,
            y: e.y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDto {
    pub chain_index: u32,
    pub groups: u32,
    pub cleared: Vec<CellDto>,
    pub effects: Vec<EffectDto>,
    pub frozen_hits: Vec<Pos>,
    pub score: u64,
    pub multiplier: u32,
    pub combo: u32,
    pub perfect_clear: bool,
    pub fever_active: bool,
}

impl From<&StepEvent> for StepDto {
    fn from(s: &StepEvent) -> Self {
        Self {
            chain_index: s.chain_index,
            groups: s.groups,
            cleared: s.cleared.iter().map(CellDto::from).collect(),
            effects: s.effects.iter().map(EffectDto::from).collect(),
            frozen_hits: s.frozen_hits.clone(),
            score: s.score,
            multiplier: s.multiplier,
            combo: s.combo,
            perfect_clear: s.perfect_clear,
            fever_active: s.fever_active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EventPayload {
    Locked { cells: u32 },
    Step(StepDto),
    ResolutionFinished { chain: u32, cleared: u32 },
    GarbageInjected { rows: u8 },
    FeverStarted,
    FeverEnded,
    ComboExpired { combo: u32 },
    LevelUp { level: u32 },
    ObjectiveCompleted { index: usize },
    GameOver { reason: String },
    RoundWon,
}

impl From<&GameEvent> for EventPayload {
    fn from(event: &GameEvent) -> Self {
        match event {
            GameEvent::Locked { cells } => Self::Locked { cells: *cells },
            GameEvent::Step(step) => Self::Step(StepDto::from(step)),
            GameEvent::ResolutionFinished { chain, cleared } => Self::ResolutionFinished {
                chain: *chain,
                cleared: *cleared,
            },
            GameEvent::GarbageInjected { rows } => Self::GarbageInjected { rows: *rows },
            GameEvent::FeverStarted => Self::FeverStarted,
            GameEvent::FeverEnded => Self::FeverEnded,
            GameEvent::ComboExpired { combo } => Self::ComboExpired { combo: *combo },
            GameEvent::LevelUp { level } => Self::LevelUp { level: *level },
            GameEvent::ObjectiveCompleted { index } => {
                Self::ObjectiveCompleted { index: *index }
            }
            GameEvent::GameOver(reason) => Self::GameOver {
                reason: reason.as_str().to_string(),
            },
            GameEvent::RoundWon => Self::RoundWon,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceCellDto {
    pub x: i8,
    pub y: i8,
    pub color: String,
    pub special: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceDto {
    pub shape: String,
    pub x: i8,
    pub y: i8,
    pub cells: Vec<PieceCellDto>,
}

impl From<&PieceSnapshot> for PieceDto {
    fn from(p: &PieceSnapshot) -> Self {
        Self {
            shape: p.shape.clone(),
            x: p.x,
            y: p.y,
            cells: p
                .cells
                .iter()
                .map(|c| PieceCellDto {
                    x: c.x,
                    y: c.y,
                    color: c.color.as_str().to_string(),
                    special: c.special.as_str().to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardDto {
    pub width: u8,
    pub height: u8,
    /// Rows top first; 0 = empty, 1-8 palette colors, 9 = wildcard
    pub cells: Vec<Vec<u8>>,
    pub specials: Vec<SpecialDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialDto {
    pub x: i8,
    pub y: i8,
    pub special: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub frozen_count: u8,
}

fn is_zero(v: &u8) -> bool {
    *v == 0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveDto {
    pub kind: String,
    pub target: u64,
    pub current: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub completed: bool,
}

impl From<&Objective> for ObjectiveDto {
    fn from(o: &Objective) -> Self {
        Self {
            kind: o.kind.as_str().to_string(),
            target: o.target,
            current: o.current,
            color: o.color.map(|c| c.as_str().to_string()),
            completed: o.completed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeverDto {
    pub gauge: u32,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimersDto {
    pub drop_ms: u32,
    pub combo_ms: u32,
    pub fever_ms: u32,
    pub garbage_ms: u32,
}

/// Deterministic state hash serialized as lowercase hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateHash(pub u64);

impl Serialize for StateHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&format!("{:016x}", self.0))
    }
}

impl<'de> Deserialize<'de> for StateHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        u64::from_str_radix(s.trim(), 16)
            .map(StateHash)
            .map_err(|_| serde::de::Error::custom("invalid hex"))
    }
}

struct Fnv1aHasher {
    state: u64,
}

impl Fnv1aHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl std::hash::Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

/// Hash of everything that affects future play
pub fn state_hash(snap: &GameSnapshot) -> StateHash {
    use std::hash::{Hash, Hasher};

    let mut hasher = Fnv1aHasher::new();
    snap.width.hash(&mut hasher);
    snap.height.hash(&mut hasher);
    snap.board.hash(&mut hasher);
    snap.specials.hash(&mut hasher);
    snap.active.hash(&mut hasher);
    snap.next.hash(&mut hasher);
    snap.hold.hash(&mut hasher);
    snap.can_hold.hash(&mut hasher);
    snap.gravity.hash(&mut hasher);
    snap.phase.hash(&mut hasher);
    snap.paused.hash(&mut hasher);
    snap.episode_id.hash(&mut hasher);
    snap.pieces_locked.hash(&mut hasher);
    snap.score.hash(&mut hasher);
    snap.level.hash(&mut hasher);
    snap.cleared.hash(&mut hasher);
    snap.combo.hash(&mut hasher);
    snap.fever_gauge.hash(&mut hasher);
    snap.fever_active.hash(&mut hasher);
    snap.garbage_pending.hash(&mut hasher);
    snap.objectives.hash(&mut hasher);
    snap.moves_left.hash(&mut hasher);
    snap.timers.hash(&mut hasher);
    StateHash(hasher.finish())
}

/// Game state observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationMessage {
    #[serde(rename = "type")]
    pub msg_type: ObservationType,
    pub seq: u64,
    pub phase: String,
    pub playable: bool,
    pub paused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    pub episode_id: u32,
    pub pieces_locked: u32,
    pub board: BoardDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<PieceDto>,
    pub ghost: Vec<Pos>,
    pub next: Vec<PieceDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold: Option<PieceCellDto>,
    pub can_hold: bool,
    pub gravity: String,
    pub score: u64,
    pub level: u32,
    pub cleared: u32,
    pub combo: u32,
    pub chain: u32,
    pub max_chain: u32,
    pub fever: FeverDto,
    pub garbage_pending: u8,
    pub objectives: Vec<ObjectiveDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moves_left: Option<u32>,
    pub timers: TimersDto,
    pub state_hash: StateHash,
}

fn outcome_name(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::GameOver(reason) => reason.as_str(),
        Outcome::RoundWon => "roundWon",
    }
}

pub fn build_observation(snap: &GameSnapshot, seq: u64) -> ObservationMessage {
    let width = snap.width.max(1) as usize;
    ObservationMessage {
        msg_type: ObservationType::Observation,
        seq,
        phase: snap.phase.as_str().to_string(),
        playable: snap.playable(),
        paused: snap.paused,
        outcome: snap.outcome.map(|o| outcome_name(o).to_string()),
        episode_id: snap.episode_id,
        pieces_locked: snap.pieces_locked,
        board: BoardDto {
            width: snap.width,
            height: snap.height,
            cells: snap.board.chunks(width).map(|row| row.to_vec()).collect(),
            specials: snap
                .specials
                .iter()
                .map(|s| SpecialDto {
                    x: s.x,
                    y: s.y,
                    special: s.special.as_str().to_string(),
                    frozen_count: s.frozen_count,
                })
                .collect(),
        },
        active: snap.active.as_ref().map(PieceDto::from),
        ghost: snap.ghost.clone(),
        next: snap.next.iter().map(PieceDto::from).collect(),
        hold: snap.hold.map(|c| PieceCellDto {
            x: 0,
            y: 0,
            color: c.color.as_str().to_string(),
            special: c.special.as_str().to_string(),
        }),
        can_hold: snap.can_hold,
        gravity: snap.gravity.as_str().to_string(),
        score: snap.score,
        level: snap.level,
        cleared: snap.cleared,
        combo: snap.combo,
        chain: snap.chain,
        max_chain: snap.max_chain,
        fever: FeverDto {
            gauge: snap.fever_gauge,
            active: snap.fever_active,
        },
        garbage_pending: snap.garbage_pending,
        objectives: snap.objectives.iter().map(ObjectiveDto::from).collect(),
        moves_left: snap.moves_left,
        timers: TimersDto {
            drop_ms: snap.timers.drop_ms,
            combo_ms: snap.timers.combo_ms,
            fever_ms: snap.timers.fever_ms,
            garbage_ms: snap.timers.garbage_ms,
        },
        state_hash: state_hash(snap),
    }
}

pub fn create_ack(seq: u64, applied: u32) -> AckMessage {
    AckMessage {
        msg_type: AckType::Ack,
        seq,
        applied,
    }
}

pub fn create_error(seq: u64, code: &str, message: &str, applied: u32) -> ErrorMessage {
    ErrorMessage {
        msg_type: ErrorType::Error,
        seq,
        code: code.to_string(),
        message: message.to_string(),
        applied,
    }
}

pub fn create_event(seq: u64, event: &GameEvent) -> EventMessage {
    EventMessage {
        msg_type: EventType::Event,
        seq,
        event: EventPayload::from(event),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chroma_fuse_core::types::{Direction, GameOverReason};
    use chroma_fuse_core::GameState;

    #[test]
    fn test_parse_command_message() {
        let msg = parse_message(
            r#"{"type":"command","seq":4,"commands":["moveLeft","rotate","hardDrop"]}"#,
        )
        .unwrap();
        let ParsedMessage::Command(cmd) = msg else {
            panic!("expected command");
        };
        assert_eq!(cmd.seq, 4);
        assert_eq!(
            cmd.commands.0.as_slice(),
            &[
                GameCommand::Move(Direction::Left),
                GameCommand::Rotate,
                GameCommand::HardDrop
            ]
        );
    }

    #[test]
    fn test_parse_rejects_unknown_command_name() {
        let err = parse_message(r#"{"type":"command","seq":1,"commands":["teleport"]}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_parse_tick_and_place() {
        let msg = parse_message(r#"{"type":"tick","seq":2,"elapsed_ms":16}"#).unwrap();
        assert!(matches!(msg, ParsedMessage::Tick(TickMessage { seq: 2, elapsed_ms: 16 })));

        let msg = parse_message(r#"{"type":"place","seq":3,"lane":5}"#).unwrap();
        let ParsedMessage::Place(place) = msg else {
            panic!("expected place");
        };
        assert_eq!((place.lane, place.rotations, place.use_hold), (5, 0, false));
    }

    #[test]
    fn test_parse_unknown_type() {
        let msg = parse_message(r#"{"type":"hello","seq":9}"#).unwrap();
        assert!(matches!(msg, ParsedMessage::Unknown(UnknownMessage { seq: 9 })));
        assert_eq!(extract_seq(r#"{"seq":12,"type":"command"}"#), 12);
        assert_eq!(extract_seq("not json"), 0);
    }

    #[test]
    fn test_event_payload_shape() {
        let event = create_event(
            7,
            &GameEvent::GameOver(GameOverReason::GarbageOverflow),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "event");
        assert_eq!(json["event"]["kind"], "gameOver");
        assert_eq!(json["event"]["reason"], "garbageOverflow");

        let step = create_event(8, &GameEvent::Step(StepEvent::default()));
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["event"]["kind"], "step");
        assert_eq!(json["event"]["chain_index"], 0);
    }

    #[test]
    fn test_observation_from_snapshot() {
        let mut game = GameState::new(3);
        game.start();
        let obs = build_observation(&game.snapshot(), 1);
        assert_eq!(obs.phase, "awaitingInput");
        assert!(obs.playable);
        assert_eq!(obs.board.cells.len(), 16);
        assert_eq!(obs.board.cells[0].len(), 8);
        assert!(obs.active.is_some());

        let json = serde_json::to_string(&obs).unwrap();
        assert!(json.contains(r#""type":"observation""#));
        let back: ObservationMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.state_hash, obs.state_hash);
    }

    #[test]
    fn test_state_hash_tracks_changes() {
        let mut game = GameState::new(3);
        game.start();
        let before = state_hash(&game.snapshot());
        game.set_gravity(Direction::Left).unwrap();
        assert_ne!(state_hash(&game.snapshot()), before);
    }
}
