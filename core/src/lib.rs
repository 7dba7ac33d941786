//! Server-side building blocks for the real-time game-session subsystem:
//! room bookkeeping, the game engine contract, the game store, socket
//! fan-out, the turn timer, action routing, broadcast, and lifecycle
//! coordination. The `server` crate wires these into an axum application;
//! this crate has no transport-layer knowledge of its own.

pub mod broadcast;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod lock;
pub mod rng;
pub mod room;
pub mod socket;
pub mod store;
pub mod timer;

pub use engine::GameEngine;
pub use error::{EngineError, RouterError};
