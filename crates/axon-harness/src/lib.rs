#![forbid(unsafe_code)]

//! Test fixtures for Axon crates.
//!
//! # Role in Axon
//! `axon-harness` provides the pieces tests need around the event queue:
//! [`SimTree`], an in-memory accessibility tree implementing
//! [`TreeAccess`](axon_tree::TreeAccess) with a builder-style mutation API,
//! and [`Recorder`], a bundle of recording sinks that captures every
//! delivery of a drain in one ordered log.
//!
//! Production code never depends on this crate; the other Axon crates pull
//! it in as a dev-dependency only.

pub mod recorder;
pub mod sim_tree;

pub use recorder::{Delivered, Recorder};
pub use sim_tree::{KillSwitch, SimTree};
