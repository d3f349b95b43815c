//! 服务模块

pub mod feed;
pub mod probe;
pub mod rating;
pub mod session;
pub mod state;

pub use feed::{FeedManager, FeedPolicy, FeedState, ReplenishRequest};
pub use probe::{ProbePhase, ProbeRequest, ProbeRunner, ProbeScheduler};
pub use rating::{Decision, RatingOutcome, rate};
pub use session::{EngineEvent, PreferenceEngine, ProbeView};
pub use state::{EngineState, SessionOverview};
