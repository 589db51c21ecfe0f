//! Notifications delivered to the embedding UI

use tokio::sync::mpsc;

use crate::autofish::AttemptRecord;
use crate::fish::{CastResponse, CompletedChallenge, DailyStats, RefreshData};
use crate::session::{Phase, SessionOutcome};

#[derive(Debug, Clone, PartialEq)]
pub enum FishingEvent {
    /// Raw cast response, after the timing chain is armed
    CastSucceeded(CastResponse),
    /// A catch or reported miss came back from the server
    CatchResolved(SessionOutcome),
    PhaseChanged(Phase),
    /// A remote failure, already recovered from locally
    Error(String),
    DailyLimitReached(DailyStats),
    DataRefreshed(RefreshData),
    ChallengeCompleted(CompletedChallenge),
    AutofishAttempt(AttemptRecord),
}

pub type EventSender = mpsc::UnboundedSender<FishingEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<FishingEvent>;

/// Create the event channel
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Send without caring whether anyone is still listening
pub(crate) fn emit(tx: &EventSender, event: FishingEvent) {
    let _ = tx.send(event);
}
