//! Tactical decision engine
//!
//! Architecture: pure functions over validated snapshots
//! - geometry: T-shaped shot mechanics (adjacent laser cell + perpendicular sweeps)
//! - engine: five-tier priority cascade built on the geometry
//! - decision: the chosen action plus its reason code and trace

pub mod decision;
pub mod engine;
pub mod geometry;

pub use decision::{Decision, DecisionTrace, ReasonCode};
pub use engine::{choose_action, decide, MoveCandidate};
pub use geometry::{find_shots, Hit, ShotOption};
