//! Core traits and deterministic primitives for the lookahead engine
//!
//! This crate provides the building blocks every other crate in the
//! workspace consumes:
//! - `Q`: fixed-point scalar used for all decision-affecting values
//! - `DetRng`: seedable xorshift64* generator with exposed state
//! - `DetMap` / `DetHeap`: containers whose iteration order depends only
//!   on insertion history
//! - `Action`: the totally-ordered move record the engine searches over
//! - `GameState`: the capability set a domain adapter implements

pub mod action;
pub mod fixed;
pub mod ordered;
pub mod rng;
pub mod state;

// Re-export main types for convenience
pub use action::{Action, FLAG_CAPTURE, FLAG_FORCING};
pub use fixed::Q;
pub use ordered::{DetHeap, DetMap};
pub use rng::DetRng;
pub use state::GameState;
