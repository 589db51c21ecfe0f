//! Unattended autofish loop
//!
//! A fixed-interval ticker issues one server-side autofish call per tick.
//! `in_flight` bounds the loop to a single outstanding request: a tick that
//! finds it set is skipped, never queued. A failsafe timer releases the
//! guard if a response never arrives.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::log::{AttemptLog, AttemptRecord};
use crate::config::{AutofishSettings, DisplayDensity};
use crate::error::FishingError;
use crate::events::{emit, EventSender, FishingEvent};
use crate::fish::{AutofishResponse, DailyStats, FishingService, RefreshData};
use crate::session::timers::{TimerId, TimerRegistry};

struct LoopState {
    log: AttemptLog,
    daily: Option<DailyStats>,
    last_refresh: Option<Instant>,
    consecutive_errors: u32,
}

struct Shared {
    service: Arc<dyn FishingService>,
    events: EventSender,
    settings: AutofishSettings,
    active: AtomicBool,
    in_flight: AtomicBool,
    /// Sequence number of the most recent attempt
    attempt_seq: AtomicU64,
    state: Mutex<LoopState>,
    timers: TimerRegistry,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

/// Point-in-time view for the UI
#[derive(Debug, Clone, Serialize)]
pub struct AutofishStatus {
    pub active: bool,
    pub in_flight: bool,
    pub daily: Option<DailyStats>,
    pub log: Vec<AttemptRecord>,
}

#[derive(Clone)]
pub struct AutofishLoop {
    shared: Arc<Shared>,
}

impl AutofishLoop {
    /// Create an inactive loop
    pub fn new(
        service: Arc<dyn FishingService>,
        events: EventSender,
        settings: AutofishSettings,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                service,
                events,
                settings,
                active: AtomicBool::new(false),
                in_flight: AtomicBool::new(false),
                attempt_seq: AtomicU64::new(0),
                state: Mutex::new(LoopState {
                    log: AttemptLog::new(settings.log_lifetime, settings.log_capacity),
                    daily: None,
                    last_refresh: None,
                    consecutive_errors: 0,
                }),
                timers: TimerRegistry::new(),
                ticker: Mutex::new(None),
            }),
        }
    }

    /// Whether the loop is running
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Whether an attempt is awaiting its response
    pub fn is_in_flight(&self) -> bool {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    /// Last quota seen in a server response
    pub fn daily(&self) -> Option<DailyStats> {
        self.shared.state.lock().daily
    }

    /// Seed the quota mirror, e.g. from the info endpoint
    pub fn set_daily(&self, daily: DailyStats) {
        self.shared.state.lock().daily = Some(daily);
    }

    /// Resize the attempt log for the UI's display density
    pub fn set_display_density(&self, density: DisplayDensity) {
        self.shared
            .state
            .lock()
            .log
            .set_capacity(density.max_log_entries());
    }

    /// Get a snapshot for the UI
    pub fn status(&self) -> AutofishStatus {
        let state = self.shared.state.lock();
        AutofishStatus {
            active: self.is_active(),
            in_flight: self.is_in_flight(),
            daily: state.daily,
            log: state.log.entries().cloned().collect(),
        }
    }

    /// Flip the loop on or off. Returns the new `active` value.
    pub fn toggle(&self) -> Result<bool, FishingError> {
        if self.is_active() {
            self.stop();
            Ok(false)
        } else {
            self.start().map(|_| true)
        }
    }

    /// Activate the loop. Refused when the known daily quota is used up.
    pub fn start(&self) -> Result<(), FishingError> {
        let shared = &self.shared;
        shared.settings.validate()?;
        if let Some(daily) = shared.state.lock().daily.filter(DailyStats::exhausted) {
            tracing::info!("[AUTOFISH] Daily limit reached, not starting");
            emit(&shared.events, FishingEvent::DailyLimitReached(daily));
            return Err(FishingError::QuotaExceeded {
                message: format!("daily limit of {} reached", daily.limit),
            });
        }

        if shared
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        {
            let mut state = shared.state.lock();
            state.log.clear();
            state.last_refresh = Some(Instant::now());
            state.consecutive_errors = 0;
        }

        let period = shared.settings.interval;
        let weak = Arc::downgrade(shared);
        let ticker = tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticks.tick().await;
                let Some(shared) = weak.upgrade() else { break };
                if !shared.active.load(Ordering::SeqCst) {
                    break;
                }
                Shared::tick(&shared);
            }
        });
        if let Some(previous) = shared.ticker.lock().replace(ticker) {
            previous.abort();
        }

        tracing::info!("[AUTOFISH] Started, every {:?}", period);
        Ok(())
    }

    /// Deactivate and tear down the ticker, failsafe and in-flight guard
    pub fn stop(&self) {
        if self.shared.deactivate() {
            tracing::info!("[AUTOFISH] Stopped");
        }
    }
}

impl Shared {
    fn tick(this: &Arc<Self>) {
        if this
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("[AUTOFISH] Previous attempt still in flight, tick skipped");
            return;
        }
        let attempt = this.attempt_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let weak = Arc::downgrade(this);
        let failsafe = this.settings.failsafe;
        this.timers
            .set_timer(TimerId::AutofishFailsafe, failsafe, async move {
                let Some(shared) = weak.upgrade() else { return };
                if shared.is_current(attempt) {
                    tracing::warn!(
                        "[AUTOFISH] No response after {:?}, releasing in-flight guard",
                        failsafe
                    );
                    shared.in_flight.store(false, Ordering::SeqCst);
                }
            });

        let service = this.service.clone();
        let weak = Arc::downgrade(this);
        tokio::spawn(async move {
            let result = service.autofish().await;
            let Some(shared) = weak.upgrade() else { return };
            shared.handle_result(attempt, result);
            shared.finish_attempt(attempt);
        });
    }

    /// Release the guard, unless a newer attempt already owns it
    fn finish_attempt(&self, attempt: u64) {
        if self.is_current(attempt) {
            self.timers.clear_timer(TimerId::AutofishFailsafe);
            self.in_flight.store(false, Ordering::SeqCst);
        }
    }

    fn is_current(&self, attempt: u64) -> bool {
        self.attempt_seq.load(Ordering::SeqCst) == attempt
    }

    fn handle_result(&self, attempt: u64, result: Result<AutofishResponse, FishingError>) {
        if !self.is_current(attempt) {
            self.keep_quota_only(attempt, result);
            return;
        }
        match result {
            Ok(resp) => self.handle_response(attempt, resp),
            Err(e) if e.is_quota_exceeded() => {
                tracing::warn!("[AUTOFISH] {}", e);
                let daily = {
                    let mut state = self.state.lock();
                    let daily = DailyStats {
                        remaining: 0,
                        ..state.daily.unwrap_or_default()
                    };
                    state.daily = Some(daily);
                    daily
                };
                self.deactivate();
                emit(&self.events, FishingEvent::DailyLimitReached(daily));
            }
            Err(e) if e.is_permission_denied() => {
                tracing::warn!("[AUTOFISH] Permission denied: {}", e);
                self.deactivate();
                emit(&self.events, FishingEvent::Error(e.to_string()));
            }
            Err(e) => {
                let failures = {
                    let mut state = self.state.lock();
                    state.consecutive_errors += 1;
                    state.consecutive_errors
                };
                tracing::warn!("[AUTOFISH] Attempt failed ({} in a row): {}", failures, e);
                if let Some(limit) = self.settings.max_consecutive_errors {
                    if failures >= limit {
                        self.deactivate();
                        emit(
                            &self.events,
                            FishingEvent::Error(format!(
                                "autofish stopped after {} failed attempts: {}",
                                failures, e
                            )),
                        );
                    }
                }
            }
        }
    }

    fn handle_response(&self, attempt: u64, resp: AutofishResponse) {
        let record = {
            let mut state = self.state.lock();
            state.daily = Some(resp.daily);
            state.consecutive_errors = 0;
            if !self.is_current(attempt) || !self.active.load(Ordering::SeqCst) {
                tracing::debug!("[AUTOFISH] Late response for attempt {}, only quota kept", attempt);
                return;
            }
            let record = AttemptRecord::new(resp.fish.clone(), resp.success);
            state.log.push(record.clone());
            record
        };

        tracing::info!(
            "[AUTOFISH] {} {} ({}/{} used)",
            if resp.success { "Caught" } else { "Missed" },
            resp.fish
                .as_ref()
                .map(|f| f.to_string())
                .unwrap_or_else(|| "nothing".to_string()),
            resp.daily.used,
            resp.daily.limit
        );
        emit(&self.events, FishingEvent::AutofishAttempt(record));
        for challenge in resp.challenges_completed {
            emit(&self.events, FishingEvent::ChallengeCompleted(challenge));
        }

        if resp.daily.exhausted() {
            tracing::info!("[AUTOFISH] Daily limit reached, stopping");
            self.deactivate();
            emit(&self.events, FishingEvent::DailyLimitReached(resp.daily));
            return;
        }

        self.refresh_if_stale();
    }

    /// Result of an attempt that was stopped or superseded. Only the quota
    /// it reports is kept; the log, error count and active flag belong to
    /// the current run.
    fn keep_quota_only(&self, attempt: u64, result: Result<AutofishResponse, FishingError>) {
        let mut state = self.state.lock();
        match result {
            Ok(resp) => state.daily = Some(resp.daily),
            Err(e) if e.is_quota_exceeded() => {
                state.daily = Some(DailyStats {
                    remaining: 0,
                    ..state.daily.unwrap_or_default()
                });
            }
            Err(_) => {}
        }
        tracing::debug!("[AUTOFISH] Late result for attempt {}, only quota kept", attempt);
    }

    /// Best-effort re-fetch of info / rank / challenges
    fn refresh_if_stale(&self) {
        let now = Instant::now();
        {
            let mut state = self.state.lock();
            let stale = state
                .last_refresh
                .map_or(true, |at| now.saturating_duration_since(at) > self.settings.refresh_stale);
            if !stale {
                return;
            }
            state.last_refresh = Some(now);
        }

        let service = self.service.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let (info, rank, challenges) = tokio::join!(
                service.fetch_info(),
                service.fetch_rank(),
                service.fetch_challenges()
            );
            let data = RefreshData {
                info: info.ok(),
                rank: rank.ok(),
                challenges: challenges.ok(),
            };
            tracing::debug!("[AUTOFISH] Refreshed auxiliary data");
            emit(&events, FishingEvent::DataRefreshed(data));
        });
    }

    /// Returns false when the loop was already inactive.
    /// Any attempt still in flight stops being current.
    fn deactivate(&self) -> bool {
        let was_active = self.active.swap(false, Ordering::SeqCst);
        self.attempt_seq.fetch_add(1, Ordering::SeqCst);
        if let Some(ticker) = self.ticker.lock().take() {
            ticker.abort();
        }
        self.timers.clear_timer(TimerId::AutofishFailsafe);
        self.in_flight.store(false, Ordering::SeqCst);
        self.state.lock().log.clear();
        was_active
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.get_mut().take() {
            ticker.abort();
        }
    }
}
