//! Chroma Fuse (workspace facade crate).
//!
//! Re-exports the workspace crates under one name so binaries, integration
//! tests and benches can use `chroma_fuse::{core, engine, adapter, types}`.

pub use chroma_fuse_adapter as adapter;
pub use chroma_fuse_core as core;
pub use chroma_fuse_engine as engine;
pub use chroma_fuse_types as types;
