//! Reel Client - fishing session controller and autofish engine
//!
//! Drives the cast, bite, catch/miss cycle of a remote fishing game
//! service with precisely timed, cancellable transitions, and runs an
//! unattended autofish loop on top of the same service.

pub mod autofish;
pub mod config;
pub mod error;
pub mod events;
pub mod fish;
pub mod history;
pub mod session;
pub mod utils;

// Re-exports for convenience
pub use autofish::{AttemptLog, AttemptRecord, AutofishLoop, AutofishStatus};
pub use config::{load_config, AutofishSettings, DisplayDensity, ReelConfig, SessionTiming};
pub use error::{FishingError, TransitionRejected};
pub use events::{FishingEvent, EventReceiver, EventSender};
pub use fish::{FishingService, HttpFishingService};
pub use session::{Phase, SessionController, SessionOutcome, SessionState, TimerId, TimerRegistry};
pub use utils::{action_lock::ActionLock, path::get_data_dir};
