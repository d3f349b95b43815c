//! 偏好引擎会话
//!
//! 持有单个会话的 [`EngineState`]，在写锁内执行同步状态转换，
//! 释放锁之后再在 tokio 任务中执行补货与探测请求。
//! 每次转换都会在广播通道上发布一个 [`EngineEvent`]。

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::config::EngineConfig;
use crate::error::Result;
use crate::models::probe::{ProbeFieldsUpdated, ProbeResult};
use crate::models::profile::Profile;
use crate::models::weights::{WeightDeviation, WeightSnapshot};
use crate::observability::EngineMetrics;
use crate::providers::{AnalysisOracle, ProfileSource};
use crate::services::feed::{FeedManager, ReplenishRequest};
use crate::services::probe::{ProbePhase, ProbeRequest, ProbeRunner};
use crate::services::rating::{self, Decision, RatingOutcome};
use crate::services::state::{EngineState, SessionOverview};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// 引擎事件
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum EngineEvent {
    Rated {
        profile_id: String,
        decision: Decision,
        interaction_count: u64,
        remaining: usize,
    },
    FeedReplenished {
        appended: usize,
        remaining: usize,
    },
    FeedReplenishFailed {
        reason: String,
    },
    ProbeStarted {
        interaction: u64,
    },
    ProbeSettled {
        interaction: u64,
        updated: ProbeFieldsUpdated,
    },
    QuestionDismissed,
}

/// 探测结果与当前状态
#[derive(Debug, Clone, Serialize)]
pub struct ProbeView {
    pub phase: ProbePhase,
    #[serde(flatten)]
    pub result: ProbeResult,
}

struct EngineInner {
    state: RwLock<EngineState>,
    feed: FeedManager,
    probes: ProbeRunner,
    events: broadcast::Sender<EngineEvent>,
    metrics: Arc<EngineMetrics>,
}

/// 偏好引擎
///
/// 画像源与预言机在构造时注入。克隆开销很小，所有克隆共享同一个会话。
#[derive(Clone)]
pub struct PreferenceEngine {
    inner: Arc<EngineInner>,
}

impl PreferenceEngine {
    pub fn new(
        config: &EngineConfig,
        request_timeout: Duration,
        source: Arc<dyn ProfileSource>,
        oracle: Arc<dyn AnalysisOracle>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(EngineInner {
                state: RwLock::new(EngineState::new(config)),
                feed: FeedManager::new(source, request_timeout),
                probes: ProbeRunner::new(oracle, request_timeout),
                events,
                metrics,
            }),
        }
    }

    /// 会话开始时加载第一批画像
    pub async fn start(&self) -> Result<usize> {
        info!("Starting preference session");
        self.replenish().await
    }

    /// 订阅引擎事件
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.events.subscribe()
    }

    /// 对当前画像评分
    ///
    /// 转换在写锁内一次完成，事件也在锁内发布，订阅者看到的顺序与转换顺序一致。
    /// 补货与探测在释放锁后异步执行。没有当前画像时返回 `InvariantViolation`。
    pub fn rate(&self, decision: Decision) -> Result<RatingOutcome> {
        let outcome = {
            let mut state = self.inner.state.write();
            let outcome = rating::rate(&mut state, decision)?;
            self.publish(EngineEvent::Rated {
                profile_id: outcome.profile_id.clone(),
                decision,
                interaction_count: outcome.interaction_count,
                remaining: outcome.remaining,
            });
            if let Some(request) = &outcome.probe {
                self.publish(EngineEvent::ProbeStarted {
                    interaction: request.interaction,
                });
            }
            outcome
        };

        self.inner.metrics.record_rating(decision.is_like());

        if let Some(request) = outcome.replenish {
            let engine = self.clone();
            tokio::spawn(async move {
                let _ = engine.run_replenish(request).await;
            });
        }

        if let Some(request) = outcome.probe.clone() {
            let engine = self.clone();
            tokio::spawn(async move {
                engine.run_probe(request).await;
            });
        }

        Ok(outcome)
    }

    /// 显式补货
    ///
    /// 已有请求在途时直接返回 0。画像源失败时队列保持不变并返回错误，调用方可以稍后重试。
    pub async fn replenish(&self) -> Result<usize> {
        let request = {
            let mut state = self.inner.state.write();
            let policy = state.feed_policy();
            state.feed.begin_replenish(policy)
        };

        match request {
            Some(request) => self.run_replenish(request).await,
            None => Ok(0),
        }
    }

    async fn run_replenish(&self, request: ReplenishRequest) -> Result<usize> {
        let fetched = self.inner.feed.fetch(request).await;

        let (result, remaining) = {
            let mut state = self.inner.state.write();
            let result = state.feed.complete_replenish(fetched);
            let remaining = state.feed.remaining();
            match &result {
                Ok(appended) => self.publish(EngineEvent::FeedReplenished {
                    appended: *appended,
                    remaining,
                }),
                Err(e) => self.publish(EngineEvent::FeedReplenishFailed {
                    reason: e.to_string(),
                }),
            }
            (result, remaining)
        };

        match &result {
            Ok(appended) => {
                debug!("Appended {} profiles, {} remaining", appended, remaining);
                self.inner.metrics.record_replenish(Some(*appended));
            }
            Err(e) => {
                warn!("Profile replenish failed: {}", e);
                self.inner.metrics.record_replenish(None);
            }
        }

        result
    }

    async fn run_probe(&self, request: ProbeRequest) {
        debug!("Running probe for interaction {}", request.interaction);
        let outcome = self.inner.probes.run(&request.snapshot).await;
        let failures = outcome.failures();

        let updated = {
            let mut state = self.inner.state.write();
            let updated = state.probe_result.apply(outcome);
            state.scheduler.settle(request.interaction);
            self.publish(EngineEvent::ProbeSettled {
                interaction: request.interaction,
                updated,
            });
            updated
        };

        self.inner.metrics.record_probe(failures);
        info!(
            "Probe {} settled ({} of 3 calls failed, updated {:?})",
            request.interaction, failures, updated
        );
    }

    /// 清除当前的追问
    pub fn dismiss_question(&self) -> bool {
        let mut state = self.inner.state.write();
        let dismissed = state.probe_result.dismiss_question();
        if dismissed {
            self.publish(EngineEvent::QuestionDismissed);
        }
        dismissed
    }

    pub fn overview(&self) -> SessionOverview {
        self.inner.state.read().overview()
    }

    pub fn current_profile(&self) -> Option<Profile> {
        self.inner.state.read().feed().current().cloned()
    }

    pub fn weights(&self) -> WeightSnapshot {
        self.inner.state.read().weights().snapshot()
    }

    pub fn top_deviations(&self, limit: usize) -> Vec<WeightDeviation> {
        self.inner.state.read().weights().top_deviations(limit)
    }

    pub fn probe(&self) -> ProbeView {
        let state = self.inner.state.read();
        ProbeView {
            phase: state.scheduler().phase(),
            result: state.probe_result().clone(),
        }
    }

    pub fn metrics(&self) -> Arc<EngineMetrics> {
        self.inner.metrics.clone()
    }

    /// 只在持有写锁时调用，保证事件顺序与状态转换顺序一致
    fn publish(&self, event: EngineEvent) {
        // 没有订阅者时发送失败是正常情况
        let _ = self.inner.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{SimpleAnalysisOracle, SimpleProfileSource};
    use serde_json::json;

    #[test]
    fn test_event_wire_format() {
        let event = EngineEvent::Rated {
            profile_id: "p-1".into(),
            decision: Decision::Like,
            interaction_count: 3,
            remaining: 12,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "rated",
                "profileId": "p-1",
                "decision": "like",
                "interactionCount": 3,
                "remaining": 12
            })
        );

        let settled = serde_json::to_value(EngineEvent::ProbeSettled {
            interaction: 10,
            updated: ProbeFieldsUpdated::default(),
        })
        .unwrap();
        assert_eq!(settled["type"], "probe_settled");
        assert_eq!(settled["updated"]["question"], false);
    }

    #[tokio::test]
    async fn test_probe_started_follows_its_rating() {
        let config = EngineConfig {
            probe_cadence: 1,
            ..Default::default()
        };
        let engine = PreferenceEngine::new(
            &config,
            Duration::from_secs(1),
            Arc::new(SimpleProfileSource::new()),
            Arc::new(SimpleAnalysisOracle::new()),
            Arc::new(EngineMetrics::default()),
        );
        engine.start().await.unwrap();
        let mut events = engine.subscribe();

        engine.rate(Decision::Pass).unwrap();

        assert!(matches!(
            events.try_recv().unwrap(),
            EngineEvent::Rated { interaction_count: 1, .. }
        ));
        assert_eq!(
            events.try_recv().unwrap(),
            EngineEvent::ProbeStarted { interaction: 1 }
        );
    }
}
