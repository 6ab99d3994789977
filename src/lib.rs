//! Cowboy Autoplay - autonomous controller for turn-based grid combat games

pub mod api;
pub mod control;
pub mod core;
pub mod game;
pub mod session;
pub mod tactics;
