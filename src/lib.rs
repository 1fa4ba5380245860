//! Pushgrid: a terminal block-pushing puzzle.
//!
//! `domain` is the pure puzzle (grid, entities, world, push engine),
//! `sim` the session state and step function, `ui` the terminal front-end.
//! The binary in `main.rs` wires them into a game loop.

pub mod config;
pub mod domain;
pub mod sim;
pub mod ui;
