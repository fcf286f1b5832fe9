//! Pass infrastructure for a Wasm optimizer: a catalog of named
//! passes, a runner that schedules them over a module (in parallel
//! across functions where a pass allows it), and a CFG-based dataflow
//! framework used by the taint analysis.

pub mod cfg;
pub mod entity;
mod errors;
mod ir;
pub mod pass;
pub mod passes;

pub use errors::*;
pub use ir::*;
