//! Adapter module - drive the engine over a line-delimited JSON protocol
//!
//! External controllers (scripts, bots, a UI process) talk to one game
//! session through newline-separated JSON messages on any async byte stream:
//! stdin/stdout for the `serve` subcommand, in-memory pipes in tests.
//!
//! # Protocol Overview
//!
//! 1. **Start**: the session sends an `observation` with `seq` 0 (phase `idle`)
//! 2. **Commanding**: the client sends `command` messages with protocol
//!    command names (`spawn`, `moveLeft`, `rotate`, `hardDrop`, `gravityUp`, ...)
//!    or `place` messages with a target lane and rotation count
//! 3. **Time**: the client sends `tick` messages with elapsed milliseconds;
//!    they drive the drop timer and pace chain steps
//! 4. **Replies**: each message is answered with `ack` or `error`, the engine
//!    events it caused, and a fresh `observation`
//!
//! The session ends at EOF or when the round reaches a terminal outcome.
//!
//! # Example Protocol Flow
//!
//! ```text
//! Engine -> Client: {"type":"observation","seq":0,"phase":"idle",...}
//! Client -> Engine: {"type":"command","seq":1,"commands":["spawn","moveLeft","hardDrop"]}
//! Engine -> Client: {"type":"ack","seq":1,"applied":3}
//! Engine -> Client: {"type":"event","seq":1,"event":{"kind":"locked","cells":2}}
//! Engine -> Client: {"type":"observation","seq":1,"phase":"resolving",...}
//! Client -> Engine: {"type":"tick","seq":2,"elapsed_ms":300}
//! ```
//!
//! See [`protocol`] for message structures, [`config`] for the rules file and
//! environment variables, and [`runtime`] for the session loop.

pub mod config;
pub mod protocol;
pub mod runtime;

pub use chroma_fuse_core as core;
pub use chroma_fuse_engine as engine;
pub use chroma_fuse_types as types;

pub use config::{RulesFile, SessionConfig};
pub use protocol::{parse_message, ParsedMessage};
pub use runtime::{run_session, Session, SessionSummary};
