//! Fishing session state machine
//!
//! [`transition`] is a pure, gated function: an action is applied only
//! when the current phase is one of its source phases, otherwise the
//! state comes back unchanged. Late timer callbacks and duplicate input
//! are absorbed here.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::error::TransitionRejected;
use crate::fish::{CatchResponse, CompletedChallenge, Fish};

/// Phase of the current fishing attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Phase {
    #[default]
    Walking,
    Casting,
    Waiting,
    FishAppeared,
    Catching,
    Success,
    Failure,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::Walking,
        Phase::Casting,
        Phase::Waiting,
        Phase::FishAppeared,
        Phase::Catching,
        Phase::Success,
        Phase::Failure,
    ];

    /// Get human-readable description of the phase
    pub fn description(&self) -> &'static str {
        match self {
            Phase::Walking => "Ready to cast",
            Phase::Casting => "Casting line...",
            Phase::Waiting => "Waiting for a bite...",
            Phase::FishAppeared => "Fish on the line!",
            Phase::Catching => "Reeling in...",
            Phase::Success => "Caught!",
            Phase::Failure => "It got away",
        }
    }
}

/// Server-issued parameters of the cast in progress
#[derive(Debug, Clone, PartialEq)]
pub struct CastSession {
    pub session_id: String,
    pub wait_time: Duration,
    pub miss_timeout: Duration,
    pub cast_started_at: Instant,
    pub fish_appeared_at: Option<Instant>,
    pub pity_triggered: bool,
    pub mercy_bonus: Option<serde_json::Value>,
    /// Set when the catch window expired and a miss is being reported
    pub auto_miss: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatchSuccess {
    pub fish: Option<Fish>,
    pub quality: Option<String>,
    pub quantity: Option<u32>,
    pub reaction_time: Option<u64>,
    pub streak: Option<u32>,
    pub pity_triggered: bool,
    pub challenges_completed: Vec<CompletedChallenge>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatchFailure {
    pub fish: Option<Fish>,
    pub reaction_time: Option<u64>,
    pub timing_window: Option<u64>,
    pub miss_streak: Option<u32>,
    pub mercy_bonus: Option<serde_json::Value>,
    pub message: Option<String>,
}

/// Result of a finished attempt, kept for display after the reset
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SessionOutcome {
    Success(CatchSuccess),
    Failure(CatchFailure),
}

impl SessionOutcome {
    /// Whether the fish was caught
    pub fn is_success(&self) -> bool {
        matches!(self, SessionOutcome::Success(_))
    }

    /// Fish involved in the attempt, if the server named one
    pub fn fish(&self) -> Option<&Fish> {
        match self {
            SessionOutcome::Success(s) => s.fish.as_ref(),
            SessionOutcome::Failure(f) => f.fish.as_ref(),
        }
    }

    /// Split a catch / miss-report response by its own success flag
    pub fn from_response(resp: &CatchResponse) -> Self {
        if resp.success {
            SessionOutcome::Success(CatchSuccess {
                fish: resp.fish.clone(),
                quality: resp.catch_quality.clone(),
                quantity: resp.fish_quantity,
                reaction_time: resp.reaction_time,
                streak: resp.streak,
                pity_triggered: resp.pity_triggered,
                challenges_completed: resp.challenges_completed.clone(),
            })
        } else {
            SessionOutcome::Failure(CatchFailure {
                fish: resp.fish.clone(),
                reaction_time: resp.reaction_time,
                timing_window: resp.timing_window,
                miss_streak: resp.miss_streak,
                mercy_bonus: resp.mercy_bonus.clone(),
                message: resp.message.clone(),
            })
        }
    }
}

/// Inputs to [`transition`]. Timestamps are carried by the action so the
/// transition itself stays pure.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    CastStarted {
        session_id: String,
        wait_time: Duration,
        miss_timeout: Duration,
        pity_triggered: bool,
        mercy_bonus: Option<serde_json::Value>,
        at: Instant,
    },
    CastAnimationComplete,
    FishAppeared {
        at: Instant,
    },
    CatchStarted,
    MissTimeout,
    CatchSuccess(CatchSuccess),
    CatchFailure(CatchFailure),
    ResultDismissed,
    CastFailed,
    Reset,
}

/// Payload-free tag of a [`SessionAction`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActionKind {
    CastStarted,
    CastAnimationComplete,
    FishAppeared,
    CatchStarted,
    MissTimeout,
    CatchSuccess,
    CatchFailure,
    ResultDismissed,
    CastFailed,
    Reset,
}

impl ActionKind {
    pub const ALL: [ActionKind; 10] = [
        ActionKind::CastStarted,
        ActionKind::CastAnimationComplete,
        ActionKind::FishAppeared,
        ActionKind::CatchStarted,
        ActionKind::MissTimeout,
        ActionKind::CatchSuccess,
        ActionKind::CatchFailure,
        ActionKind::ResultDismissed,
        ActionKind::CastFailed,
        ActionKind::Reset,
    ];

    /// Whether this action may be applied in `phase`
    pub fn accepts(self, phase: Phase) -> bool {
        use Phase::*;
        match self {
            ActionKind::CastStarted => phase == Walking,
            ActionKind::CastAnimationComplete => phase == Casting,
            ActionKind::FishAppeared => phase == Waiting,
            ActionKind::CatchStarted | ActionKind::MissTimeout => phase == FishAppeared,
            ActionKind::CatchSuccess | ActionKind::CatchFailure => phase == Catching,
            // Catching is a source too: a failed catch request leaves
            // without showing a result.
            ActionKind::ResultDismissed => matches!(phase, Catching | Success | Failure),
            ActionKind::CastFailed => phase == Casting,
            ActionKind::Reset => true,
        }
    }
}

impl SessionAction {
    /// Get the payload-free tag
    pub fn kind(&self) -> ActionKind {
        match self {
            SessionAction::CastStarted { .. } => ActionKind::CastStarted,
            SessionAction::CastAnimationComplete => ActionKind::CastAnimationComplete,
            SessionAction::FishAppeared { .. } => ActionKind::FishAppeared,
            SessionAction::CatchStarted => ActionKind::CatchStarted,
            SessionAction::MissTimeout => ActionKind::MissTimeout,
            SessionAction::CatchSuccess(_) => ActionKind::CatchSuccess,
            SessionAction::CatchFailure(_) => ActionKind::CatchFailure,
            SessionAction::ResultDismissed => ActionKind::ResultDismissed,
            SessionAction::CastFailed => ActionKind::CastFailed,
            SessionAction::Reset => ActionKind::Reset,
        }
    }
}

/// The single mutable session record.
///
/// `session` is `Some` exactly when `phase` is not `Walking`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub phase: Phase,
    pub session: Option<CastSession>,
    pub last_result: Option<SessionOutcome>,
}

impl SessionState {
    /// A new cast may start
    pub fn can_cast(&self) -> bool {
        self.phase == Phase::Walking
    }

    /// The fish is on the line and can be caught
    pub fn can_catch(&self) -> bool {
        self.phase == Phase::FishAppeared && self.session.is_some()
    }

    /// Between the cast and the server's verdict
    pub fn is_fishing(&self) -> bool {
        self.phase != Phase::Walking
    }

    /// A success or failure is on screen
    pub fn is_showing_result(&self) -> bool {
        matches!(self.phase, Phase::Success | Phase::Failure)
    }

    /// Server id of the session in progress
    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.session_id.as_str())
    }

    /// Time since the fish appeared, if it has
    pub fn reaction_time(&self, now: Instant) -> Option<Duration> {
        self.session
            .as_ref()
            .and_then(|s| s.fish_appeared_at)
            .map(|at| now.saturating_duration_since(at))
    }
}

/// Apply `action` if the current phase accepts it
pub fn try_transition(
    state: &SessionState,
    action: SessionAction,
) -> Result<SessionState, TransitionRejected> {
    let kind = action.kind();
    if !kind.accepts(state.phase) {
        return Err(TransitionRejected {
            phase: state.phase,
            action: kind,
        });
    }

    let mut next = state.clone();
    match action {
        SessionAction::CastStarted {
            session_id,
            wait_time,
            miss_timeout,
            pity_triggered,
            mercy_bonus,
            at,
        } => {
            next.phase = Phase::Casting;
            next.last_result = None;
            next.session = Some(CastSession {
                session_id,
                wait_time,
                miss_timeout,
                cast_started_at: at,
                fish_appeared_at: None,
                pity_triggered,
                mercy_bonus,
                auto_miss: false,
            });
        }
        SessionAction::CastAnimationComplete => next.phase = Phase::Waiting,
        SessionAction::FishAppeared { at } => {
            next.phase = Phase::FishAppeared;
            if let Some(session) = next.session.as_mut() {
                session.fish_appeared_at = Some(at);
            }
        }
        SessionAction::CatchStarted => next.phase = Phase::Catching,
        SessionAction::MissTimeout => {
            next.phase = Phase::Catching;
            if let Some(session) = next.session.as_mut() {
                session.auto_miss = true;
            }
        }
        SessionAction::CatchSuccess(result) => {
            next.phase = Phase::Success;
            next.last_result = Some(SessionOutcome::Success(result));
        }
        SessionAction::CatchFailure(result) => {
            next.phase = Phase::Failure;
            next.last_result = Some(SessionOutcome::Failure(result));
        }
        SessionAction::ResultDismissed | SessionAction::CastFailed | SessionAction::Reset => {
            next.phase = Phase::Walking;
            next.session = None;
        }
    }
    Ok(next)
}

/// Gated transition; a rejected action returns the state unchanged
pub fn transition(state: &SessionState, action: SessionAction) -> SessionState {
    match try_transition(state, action) {
        Ok(next) => next,
        Err(rejected) => {
            tracing::debug!("[SESSION] Ignored: {}", rejected);
            state.clone()
        }
    }
}
