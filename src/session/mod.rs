//! Manual fishing session: state machine, timers and controller

pub mod controller;
pub mod state;
pub mod timers;

pub use controller::SessionController;
pub use state::{
    transition, try_transition, ActionKind, CastSession, CatchFailure, CatchSuccess, Phase,
    SessionAction, SessionOutcome, SessionState,
};
pub use timers::{TimerId, TimerRegistry};
