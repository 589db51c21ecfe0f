//! Drives one cast from request to displayed result
//!
//! The controller is the only writer of [`SessionState`]. Every change
//! goes through the gated [`try_transition`], either directly from a
//! public entry point or from a timer armed in the [`TimerRegistry`].
//! Timer callbacks hold a weak reference, so dropping the last controller
//! handle tears the timers down with it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::state::{try_transition, Phase, SessionAction, SessionOutcome, SessionState};
use super::timers::{TimerId, TimerRegistry};
use crate::config::SessionTiming;
use crate::error::FishingError;
use crate::events::{emit, EventSender, FishingEvent};
use crate::fish::{CastResponse, CatchResponse, DailyStats, FishingService};
use crate::utils::action_lock::ActionLock;

struct Shared {
    state: Mutex<SessionState>,
    daily: Mutex<Option<DailyStats>>,
    /// Bumped by `cancel_session`; a cast response from an older epoch is dropped
    cancel_epoch: AtomicU64,
    timers: TimerRegistry,
    /// Miss report sent after the catch window expired
    miss_report: Mutex<Option<JoinHandle<()>>>,
    service: Arc<dyn FishingService>,
    events: EventSender,
    timing: SessionTiming,
    cast_lock: ActionLock,
    catch_lock: ActionLock,
}

#[derive(Clone)]
pub struct SessionController {
    shared: Arc<Shared>,
}

impl SessionController {
    /// Create a controller in the walking phase
    pub fn new(service: Arc<dyn FishingService>, events: EventSender, timing: SessionTiming) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState::default()),
                daily: Mutex::new(None),
                cancel_epoch: AtomicU64::new(0),
                timers: TimerRegistry::new(),
                miss_report: Mutex::new(None),
                service,
                events,
                timing,
                cast_lock: ActionLock::new("cast"),
                catch_lock: ActionLock::with_cooldown("catch", timing.catch_cooldown),
            }),
        }
    }

    /// Get a copy of the current state for rendering
    pub fn snapshot(&self) -> SessionState {
        self.shared.state.lock().clone()
    }

    /// Get the current phase
    pub fn phase(&self) -> Phase {
        self.shared.state.lock().phase
    }

    /// Last quota seen in a server response
    pub fn daily(&self) -> Option<DailyStats> {
        *self.shared.daily.lock()
    }

    /// Seed the local quota mirror, e.g. from the info endpoint
    pub fn set_daily(&self, daily: DailyStats) {
        *self.shared.daily.lock() = Some(daily);
    }

    /// Whether the timer under `id` is pending
    pub fn has_timer(&self, id: TimerId) -> bool {
        self.shared.timers.has_timer(id)
    }

    /// Ask the server for a new cast and arm the bite / miss timing chain.
    pub async fn start_cast(&self) -> Result<CastResponse, FishingError> {
        let shared = &self.shared;

        let phase = shared.state.lock().phase;
        if phase != Phase::Walking {
            return Err(FishingError::SessionBusy { phase });
        }
        if let Some(daily) = *shared.daily.lock() {
            if daily.exhausted() {
                return Err(FishingError::QuotaExceeded {
                    message: format!("daily limit of {} reached", daily.limit),
                });
            }
        }

        let epoch = shared.cancel_epoch.load(Ordering::SeqCst);
        let result = match shared.cast_lock.with_lock(|| shared.service.cast()).await {
            Some(result) => result,
            None => return Err(FishingError::SessionBusy { phase }),
        };

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                let err = e.into_cast_failure();
                tracing::warn!("[SESSION] Cast failed: {}", err);
                shared.dispatch(SessionAction::CastFailed);
                emit(&shared.events, FishingEvent::Error(err.to_string()));
                return Err(err);
            }
        };

        if let Some(daily) = resp.daily {
            *shared.daily.lock() = Some(daily);
        }
        if shared.cancel_epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!("[SESSION] Cast {} arrived after cancel, dropped", resp.session_id);
            return Err(FishingError::Cancelled);
        }

        let wait_time = Duration::from_millis(resp.wait_time);
        let miss_timeout = resp
            .miss_timeout
            .map(Duration::from_millis)
            .unwrap_or(shared.timing.default_miss_timeout);

        let started = shared.dispatch(SessionAction::CastStarted {
            session_id: resp.session_id.clone(),
            wait_time,
            miss_timeout,
            pity_triggered: resp.pity_triggered,
            mercy_bonus: resp.mercy_bonus.clone(),
            at: Instant::now(),
        });
        if !started {
            return Err(FishingError::SessionBusy {
                phase: self.phase(),
            });
        }

        tracing::info!(
            "[SESSION] Cast {} (bite in {:?}, window {:?})",
            resp.session_id,
            wait_time,
            miss_timeout
        );
        Shared::arm_cast_animation(shared, resp.session_id.clone(), wait_time, miss_timeout);
        emit(&shared.events, FishingEvent::CastSucceeded(resp.clone()));
        Ok(resp)
    }

    /// Player catch attempt for `session_id`.
    ///
    /// Returns `Ok(None)` when the session is no longer current or the
    /// phase does not allow a catch (the miss timeout got there first).
    pub async fn attempt_catch(
        &self,
        session_id: &str,
        reaction_time: Duration,
    ) -> Result<Option<SessionOutcome>, FishingError> {
        let shared = &self.shared;
        if shared.state.lock().session_id() != Some(session_id) {
            tracing::debug!("[SESSION] Catch for stale session {} ignored", session_id);
            return Ok(None);
        }

        shared.timers.clear_timer(TimerId::MissTimeout);
        if !shared.dispatch_if_current(session_id, SessionAction::CatchStarted) {
            return Ok(None);
        }

        tracing::info!("[SESSION] Catch attempt, reaction {:?}", reaction_time);
        Shared::resolve(shared, session_id, reaction_time)
            .await
            .map(Some)
    }

    /// Catch the current session using the measured reaction time.
    ///
    /// Guarded by the catch lock, so repeated presses fire once.
    pub async fn catch_now(&self) -> Result<Option<SessionOutcome>, FishingError> {
        let (session_id, reaction_time) = {
            let state = self.shared.state.lock();
            match (state.session_id(), state.reaction_time(Instant::now())) {
                (Some(id), Some(rt)) if state.can_catch() => (id.to_string(), rt),
                _ => return Ok(None),
            }
        };

        self.shared
            .catch_lock
            .with_lock(|| self.attempt_catch(&session_id, reaction_time))
            .await
            .unwrap_or(Ok(None))
    }

    /// Drop every pending timer and any miss report in flight, then
    /// hard-reset to walking. The last result stays visible.
    pub fn cancel_session(&self) {
        self.shared.cancel_epoch.fetch_add(1, Ordering::SeqCst);
        self.shared.timers.clear_all();
        self.shared.abort_miss_report();
        self.shared.dispatch(SessionAction::Reset);
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(task) = self.miss_report.get_mut().take() {
            task.abort();
        }
    }
}

impl Shared {
    fn dispatch(&self, action: SessionAction) -> bool {
        self.apply(None, action)
    }

    /// Like [`dispatch`](Self::dispatch), but only while `session_id` is
    /// still the session in progress.
    fn dispatch_if_current(&self, session_id: &str, action: SessionAction) -> bool {
        self.apply(Some(session_id), action)
    }

    fn apply(&self, expected_session: Option<&str>, action: SessionAction) -> bool {
        let phase = {
            let mut state = self.state.lock();
            if let Some(expected) = expected_session {
                if state.session_id() != Some(expected) {
                    tracing::debug!("[SESSION] Ignored {:?} for stale session", action.kind());
                    return false;
                }
            }
            match try_transition(&state, action) {
                Ok(next) => {
                    *state = next;
                    state.phase
                }
                Err(rejected) => {
                    tracing::debug!("[SESSION] Ignored: {}", rejected);
                    return false;
                }
            }
        };
        tracing::debug!("[SESSION] Phase -> {:?}", phase);
        emit(&self.events, FishingEvent::PhaseChanged(phase));
        true
    }

    fn arm_cast_animation(
        this: &Arc<Self>,
        session_id: String,
        wait_time: Duration,
        miss_timeout: Duration,
    ) {
        let weak = Arc::downgrade(this);
        this.timers.set_timer(
            TimerId::CastAnimation,
            this.timing.cast_animation_delay,
            async move {
                let Some(shared) = weak.upgrade() else { return };
                if shared.dispatch_if_current(&session_id, SessionAction::CastAnimationComplete) {
                    Self::arm_fish_bite(&shared, session_id, wait_time, miss_timeout);
                }
            },
        );
    }

    fn arm_fish_bite(
        this: &Arc<Self>,
        session_id: String,
        wait_time: Duration,
        miss_timeout: Duration,
    ) {
        let weak = Arc::downgrade(this);
        this.timers.set_timer(TimerId::FishBite, wait_time, async move {
            let Some(shared) = weak.upgrade() else { return };
            let appeared = SessionAction::FishAppeared { at: Instant::now() };
            if shared.dispatch_if_current(&session_id, appeared) {
                tracing::info!("[SESSION] Fish appeared");
                Self::arm_miss_timeout(&shared, session_id, miss_timeout);
            }
        });
    }

    fn arm_miss_timeout(this: &Arc<Self>, session_id: String, miss_timeout: Duration) {
        let weak: Weak<Self> = Arc::downgrade(this);
        this.timers.set_timer(TimerId::MissTimeout, miss_timeout, async move {
            let Some(shared) = weak.upgrade() else { return };
            if !shared.dispatch_if_current(&session_id, SessionAction::MissTimeout) {
                return;
            }
            tracing::info!("[SESSION] Catch window expired, reporting miss");
            Self::spawn_miss_report(&shared, session_id);
        });
    }

    /// The report runs on its own task holding only a weak reference, so
    /// cancelling or dropping the controller does not wait on it.
    fn spawn_miss_report(this: &Arc<Self>, session_id: String) {
        let service = this.service.clone();
        let weak = Arc::downgrade(this);
        let task = tokio::spawn(async move {
            let response = service.report_miss(&session_id).await;
            let Some(shared) = weak.upgrade() else { return };
            // Failure is already surfaced through the event channel
            let _ = Self::settle(&shared, &session_id, response);
        });
        if let Some(previous) = this.miss_report.lock().replace(task) {
            previous.abort();
        }
    }

    fn abort_miss_report(&self) {
        if let Some(task) = self.miss_report.lock().take() {
            task.abort();
        }
    }

    fn arm_result_display(this: &Arc<Self>, session_id: String) {
        let weak = Arc::downgrade(this);
        this.timers.set_timer(
            TimerId::ResultDisplay,
            this.timing.result_display,
            async move {
                let Some(shared) = weak.upgrade() else { return };
                shared.dispatch_if_current(&session_id, SessionAction::ResultDismissed);
            },
        );
    }

    /// Send the player's catch and apply the server's verdict
    async fn resolve(
        this: &Arc<Self>,
        session_id: &str,
        reaction_time: Duration,
    ) -> Result<SessionOutcome, FishingError> {
        let response = this.service.catch(session_id, reaction_time).await;
        Self::settle(this, session_id, response)
    }

    /// Apply a catch or miss-report response to the session it belongs to
    fn settle(
        this: &Arc<Self>,
        session_id: &str,
        response: Result<CatchResponse, FishingError>,
    ) -> Result<SessionOutcome, FishingError> {
        let resp = match response {
            Ok(resp) => resp,
            Err(e) => {
                let err = e.into_catch_failure();
                tracing::warn!("[SESSION] {}", err);
                // Back to walking without a result
                this.dispatch_if_current(session_id, SessionAction::ResultDismissed);
                emit(&this.events, FishingEvent::Error(err.to_string()));
                return Err(err);
            }
        };

        if let Some(daily) = resp.daily {
            *this.daily.lock() = Some(daily);
        }

        let outcome = SessionOutcome::from_response(&resp);
        let action = match &outcome {
            SessionOutcome::Success(s) => SessionAction::CatchSuccess(s.clone()),
            SessionOutcome::Failure(f) => SessionAction::CatchFailure(f.clone()),
        };

        if this.dispatch_if_current(session_id, action) {
            tracing::info!(
                "[SESSION] {} {}",
                if outcome.is_success() { "Caught" } else { "Missed" },
                outcome
                    .fish()
                    .map(|f| f.to_string())
                    .unwrap_or_else(|| "nothing".to_string())
            );
            emit(&this.events, FishingEvent::CatchResolved(outcome.clone()));
            for challenge in &resp.challenges_completed {
                emit(&this.events, FishingEvent::ChallengeCompleted(challenge.clone()));
            }
            Self::arm_result_display(this, session_id.to_string());
        } else {
            tracing::debug!("[SESSION] Dropped result for abandoned session {}", session_id);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events;
    use crate::fish::{AutofishResponse, CatchResponse};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    /// Casts succeed after `cast_delay`; every catch is a hit
    struct Pond {
        cast_delay: Duration,
        fail_cast: bool,
        casts: AtomicUsize,
        catches: AtomicUsize,
    }

    impl Pond {
        fn new() -> Self {
            Self {
                cast_delay: Duration::ZERO,
                fail_cast: false,
                casts: AtomicUsize::new(0),
                catches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FishingService for Pond {
        async fn cast(&self) -> Result<CastResponse, FishingError> {
            let n = self.casts.fetch_add(1, Ordering::SeqCst);
            sleep(self.cast_delay).await;
            if self.fail_cast {
                return Err(FishingError::Transport("offline".to_string()));
            }
            Ok(CastResponse {
                session_id: format!("s-{}", n),
                wait_time: 1000,
                miss_timeout: None,
                pity_triggered: false,
                mercy_bonus: None,
                daily: None,
            })
        }

        async fn catch(&self, _: &str, rt: Duration) -> Result<CatchResponse, FishingError> {
            self.catches.fetch_add(1, Ordering::SeqCst);
            Ok(CatchResponse {
                success: true,
                reaction_time: Some(rt.as_millis() as u64),
                ..CatchResponse::default()
            })
        }

        async fn report_miss(&self, _: &str) -> Result<CatchResponse, FishingError> {
            Ok(CatchResponse::default())
        }

        async fn autofish(&self) -> Result<AutofishResponse, FishingError> {
            Err(FishingError::Transport("unused".to_string()))
        }

        async fn fetch_info(&self) -> Result<serde_json::Value, FishingError> {
            Ok(serde_json::Value::Null)
        }

        async fn fetch_rank(&self) -> Result<serde_json::Value, FishingError> {
            Ok(serde_json::Value::Null)
        }

        async fn fetch_challenges(&self) -> Result<serde_json::Value, FishingError> {
            Ok(serde_json::Value::Null)
        }
    }

    fn controller(pond: Arc<Pond>) -> SessionController {
        let (tx, _rx) = events::channel();
        SessionController::new(pond, tx, SessionTiming::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_miss_timeout_applied() {
        let ctl = controller(Arc::new(Pond::new()));
        ctl.start_cast().await.unwrap();
        let session = ctl.snapshot().session.unwrap();
        assert_eq!(session.miss_timeout, Duration::from_millis(2500));
        assert!(ctl.has_timer(TimerId::CastAnimation));
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_cast_calls_service_once() {
        let pond = Arc::new(Pond {
            cast_delay: Duration::from_millis(100),
            ..Pond::new()
        });
        let ctl = controller(pond.clone());

        let (first, second) = tokio::join!(ctl.start_cast(), ctl.start_cast());
        assert!(first.is_ok());
        assert!(matches!(second, Err(FishingError::SessionBusy { .. })));
        assert_eq!(pond.casts.load(Ordering::SeqCst), 1);

        // Already fishing
        assert!(matches!(
            ctl.start_cast().await,
            Err(FishingError::SessionBusy { phase: Phase::Casting })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cast_failure_returns_to_walking() {
        let pond = Arc::new(Pond {
            fail_cast: true,
            ..Pond::new()
        });
        let ctl = controller(pond);
        let err = ctl.start_cast().await.unwrap_err();
        assert_eq!(err, FishingError::CastFailed("transport error: offline".to_string()));
        assert_eq!(ctl.snapshot(), SessionState::default());
        assert_eq!(ctl.shared.timers.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_quota_blocks_cast() {
        let pond = Arc::new(Pond::new());
        let ctl = controller(pond.clone());
        ctl.set_daily(DailyStats::new(20, 20));
        assert!(ctl.start_cast().await.unwrap_err().is_quota_exceeded());
        assert_eq!(pond.casts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_catch_now_mashing_fires_once() {
        let pond = Arc::new(Pond::new());
        let ctl = controller(pond.clone());
        ctl.start_cast().await.unwrap();

        sleep(Duration::from_millis(1700)).await;
        assert_eq!(ctl.phase(), Phase::FishAppeared);

        let (a, b) = tokio::join!(ctl.catch_now(), ctl.catch_now());
        assert!(a.unwrap().unwrap().is_success());
        assert_eq!(b.unwrap(), None);
        assert_eq!(pond.catches.load(Ordering::SeqCst), 1);
        assert_eq!(ctl.phase(), Phase::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_catch_before_bite_is_ignored() {
        let pond = Arc::new(Pond::new());
        let ctl = controller(pond.clone());
        let resp = ctl.start_cast().await.unwrap();

        sleep(Duration::from_millis(700)).await;
        assert_eq!(ctl.phase(), Phase::Waiting);
        let outcome = ctl
            .attempt_catch(&resp.session_id, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(outcome, None);
        assert_eq!(pond.catches.load(Ordering::SeqCst), 0);
        assert_eq!(ctl.phase(), Phase::Waiting);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cast_response_after_cancel_is_dropped() {
        let pond = Arc::new(Pond {
            cast_delay: Duration::from_millis(100),
            ..Pond::new()
        });
        let ctl = controller(pond);
        let canceller = ctl.clone();

        let (cast, _) = tokio::join!(ctl.start_cast(), async move {
            sleep(Duration::from_millis(50)).await;
            canceller.cancel_session();
        });
        assert_eq!(cast.unwrap_err(), FishingError::Cancelled);
        assert_eq!(ctl.phase(), Phase::Walking);
        assert_eq!(ctl.shared.timers.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_session_stops_chain() {
        let ctl = controller(Arc::new(Pond::new()));
        ctl.start_cast().await.unwrap();
        sleep(Duration::from_millis(700)).await;

        ctl.cancel_session();
        assert_eq!(ctl.phase(), Phase::Walking);
        assert_eq!(ctl.shared.timers.pending(), 0);

        sleep(Duration::from_secs(10)).await;
        assert_eq!(ctl.phase(), Phase::Walking);
    }
}
