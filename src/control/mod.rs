//! Control layer
//!
//! - autoplay: the background wait/decide/submit loop
//! - controller: session lifecycle and the query/command surface

pub mod autoplay;
pub mod controller;

pub use autoplay::{Autoplay, AutoplayPhase, AutoplayStatus, DecisionRecord, LoopContext};
pub use controller::{
    AutoplayReport, BindReport, Controller, GameStateReport, MovePreview, SessionInfo, WaitOutcome,
};
