//! 会话状态
//!
//! 一个会话内的全部可变状态。所有状态转换都是同步的 `(state, event) -> state'`，
//! 需要等待外部服务的部分以请求的形式返回给调用方执行。

use serde::Serialize;

use crate::config::config::EngineConfig;
use crate::models::probe::ProbeResult;
use crate::models::profile::Profile;
use crate::models::weights::{WeightPolicy, WeightStore};
use crate::services::feed::{FeedPolicy, FeedState};
use crate::services::probe::{ProbePhase, ProbeScheduler};

/// 会话状态
#[derive(Debug, Clone)]
pub struct EngineState {
    pub(crate) weights: WeightStore,
    pub(crate) feed: FeedState,
    pub(crate) feed_policy: FeedPolicy,
    pub(crate) interactions: u64,
    pub(crate) probe_result: ProbeResult,
    pub(crate) scheduler: ProbeScheduler,
}

impl EngineState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            weights: WeightStore::new(WeightPolicy::from(config)),
            feed: FeedState::new(),
            feed_policy: FeedPolicy::from(config),
            interactions: 0,
            probe_result: ProbeResult::default(),
            scheduler: ProbeScheduler::new(config.probe_cadence),
        }
    }

    pub fn weights(&self) -> &WeightStore {
        &self.weights
    }

    pub fn feed(&self) -> &FeedState {
        &self.feed
    }

    pub fn feed_policy(&self) -> FeedPolicy {
        self.feed_policy
    }

    /// 交互计数
    pub fn interactions(&self) -> u64 {
        self.interactions
    }

    pub fn probe_result(&self) -> &ProbeResult {
        &self.probe_result
    }

    pub fn scheduler(&self) -> &ProbeScheduler {
        &self.scheduler
    }

    pub fn overview(&self) -> SessionOverview {
        SessionOverview {
            interaction_count: self.interactions,
            cursor: self.feed.cursor(),
            queued: self.feed.len(),
            remaining: self.feed.remaining(),
            is_replenishing: self.feed.is_replenishing(),
            probe_phase: self.scheduler.phase(),
            probes_fired: self.scheduler.fired(),
            current: self.feed.current().cloned(),
        }
    }
}

/// 会话概览
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOverview {
    pub interaction_count: u64,
    pub cursor: usize,
    pub queued: usize,
    pub remaining: usize,
    pub is_replenishing: bool,
    pub probe_phase: ProbePhase,
    pub probes_fired: u64,
    pub current: Option<Profile>,
}
