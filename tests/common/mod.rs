//! Scripted fishing service shared by the integration tests
//!
//! Each endpoint pops the next queued [`Step`]; when its queue is empty it
//! falls back to a fixed, successful default reply.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use reel_client::events::{EventReceiver, FishingEvent};
use reel_client::fish::{
    AutofishResponse, CastResponse, CatchResponse, DailyStats, Fish, FishingService, Rarity,
};
use reel_client::FishingError;

pub enum Reply<T> {
    Ok(T),
    Err(FishingError),
    /// Never answers
    Hang,
}

pub struct Step<T> {
    pub delay: Duration,
    pub reply: Reply<T>,
}

impl<T> Step<T> {
    pub fn ok(value: T) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Reply::Ok(value),
        }
    }

    pub fn err(error: FishingError) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Reply::Err(error),
        }
    }

    pub fn hang() -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Reply::Hang,
        }
    }

    pub fn after(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }
}

async fn play<T>(step: Option<Step<T>>, fallback: impl FnOnce() -> T) -> Result<T, FishingError> {
    let Some(step) = step else {
        return Ok(fallback());
    };
    tokio::time::sleep(step.delay).await;
    match step.reply {
        Reply::Ok(value) => Ok(value),
        Reply::Err(e) => Err(e),
        Reply::Hang => std::future::pending().await,
    }
}

pub fn carp() -> Fish {
    Fish::new("carp", "Carp", Rarity::Common)
}

pub fn cast_response(session_id: &str, wait_time: u64, miss_timeout: Option<u64>) -> CastResponse {
    CastResponse {
        session_id: session_id.to_string(),
        wait_time,
        miss_timeout,
        pity_triggered: false,
        mercy_bonus: None,
        daily: None,
    }
}

pub fn caught(fish: Fish) -> CatchResponse {
    CatchResponse {
        success: true,
        fish: Some(fish),
        ..CatchResponse::default()
    }
}

pub fn missed(message: &str) -> CatchResponse {
    CatchResponse {
        success: false,
        fish: Some(carp()),
        message: Some(message.to_string()),
        ..CatchResponse::default()
    }
}

pub fn autofish_response(success: bool, daily: DailyStats) -> AutofishResponse {
    AutofishResponse {
        fish: Some(carp()),
        success,
        daily,
        challenges_completed: Vec::new(),
    }
}

#[derive(Default)]
pub struct MockService {
    casts: Mutex<VecDeque<Step<CastResponse>>>,
    catches: Mutex<VecDeque<Step<CatchResponse>>>,
    misses: Mutex<VecDeque<Step<CatchResponse>>>,
    autofish: Mutex<VecDeque<Step<AutofishResponse>>>,
    /// (session id, reaction time) of every catch request
    pub catch_args: Mutex<Vec<(String, Duration)>>,
    pub cast_calls: AtomicUsize,
    pub catch_calls: AtomicUsize,
    pub miss_calls: AtomicUsize,
    pub autofish_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    /// Miss reports started but neither finished nor dropped
    pub live_misses: AtomicUsize,
}

/// Counts a request as live until its future completes or is dropped
struct Live<'a>(&'a AtomicUsize);

impl<'a> Live<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Live<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn queue_cast(&self, step: Step<CastResponse>) {
        self.casts.lock().push_back(step);
    }

    pub fn queue_catch(&self, step: Step<CatchResponse>) {
        self.catches.lock().push_back(step);
    }

    pub fn queue_miss(&self, step: Step<CatchResponse>) {
        self.misses.lock().push_back(step);
    }

    pub fn queue_autofish(&self, step: Step<AutofishResponse>) {
        self.autofish.lock().push_back(step);
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FishingService for MockService {
    async fn cast(&self) -> Result<CastResponse, FishingError> {
        let n = self.cast_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let step = self.casts.lock().pop_front();
        play(step, || cast_response(&format!("session-{}", n), 1000, Some(2500))).await
    }

    async fn catch(
        &self,
        session_id: &str,
        reaction_time: Duration,
    ) -> Result<CatchResponse, FishingError> {
        self.catch_calls.fetch_add(1, Ordering::SeqCst);
        self.catch_args
            .lock()
            .push((session_id.to_string(), reaction_time));
        let step = self.catches.lock().pop_front();
        play(step, || caught(carp())).await
    }

    async fn report_miss(&self, _session_id: &str) -> Result<CatchResponse, FishingError> {
        self.miss_calls.fetch_add(1, Ordering::SeqCst);
        let _live = Live::enter(&self.live_misses);
        let step = self.misses.lock().pop_front();
        play(step, || missed("The fish got away")).await
    }

    async fn autofish(&self) -> Result<AutofishResponse, FishingError> {
        let n = self.autofish_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let step = self.autofish.lock().pop_front();
        play(step, || autofish_response(true, DailyStats::new(n as i64, 1000))).await
    }

    async fn fetch_info(&self) -> Result<serde_json::Value, FishingError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "level": 3 }))
    }

    async fn fetch_rank(&self) -> Result<serde_json::Value, FishingError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "rank": 12 }))
    }

    async fn fetch_challenges(&self) -> Result<serde_json::Value, FishingError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!([]))
    }
}

/// Everything delivered so far, without waiting
pub fn drain(rx: &mut EventReceiver) -> Vec<FishingEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
