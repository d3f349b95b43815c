//! 分析探测调度
//!
//! 状态机只有 `Idle` 与 `Probing` 两个状态。交互计数到达节奏的整数倍时，
//! 在触发时刻捕获权重快照并发起三个并发的预言机调用；全部结束后回到 `Idle`。
//! `Probing` 期间到达的触发被跳过。

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::probe::ProbeOutcome;
use crate::models::weights::{WeightSnapshot, WeightStore};
use crate::providers::{AnalysisOracle, oracle_error};

/// 探测状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProbePhase {
    #[default]
    Idle,
    Probing {
        /// 触发本次探测的交互计数
        interaction: u64,
    },
}

/// 一次探测请求，携带触发时的快照
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub interaction: u64,
    pub snapshot: WeightSnapshot,
}

/// 探测调度器
#[derive(Debug, Clone)]
pub struct ProbeScheduler {
    cadence: u64,
    phase: ProbePhase,
    fired: u64,
}

impl ProbeScheduler {
    pub fn new(cadence: u64) -> Self {
        Self {
            cadence: cadence.max(1),
            phase: ProbePhase::Idle,
            fired: 0,
        }
    }

    pub fn cadence(&self) -> u64 {
        self.cadence
    }

    pub fn phase(&self) -> ProbePhase {
        self.phase
    }

    /// 已发起的探测次数
    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// 交互计数是否落在节奏上
    pub fn is_due(&self, interactions: u64) -> bool {
        interactions > 0 && interactions % self.cadence == 0
    }

    /// 交互计数变化时调用
    pub fn on_interaction(&mut self, interactions: u64, weights: &WeightStore) -> Option<ProbeRequest> {
        if !self.is_due(interactions) {
            return None;
        }

        if let ProbePhase::Probing { interaction } = self.phase {
            tracing::warn!(
                "Probe for interaction {} still running, skipping trigger at {}",
                interaction,
                interactions
            );
            return None;
        }

        self.phase = ProbePhase::Probing {
            interaction: interactions,
        };
        self.fired += 1;

        Some(ProbeRequest {
            interaction: interactions,
            snapshot: weights.snapshot(),
        })
    }

    /// 探测结束，回到 Idle
    pub fn settle(&mut self, interaction: u64) {
        match self.phase {
            ProbePhase::Probing { interaction: running } if running == interaction => {
                self.phase = ProbePhase::Idle;
            }
            other => {
                tracing::warn!(
                    "Settling probe {} while scheduler is {:?}",
                    interaction,
                    other
                );
            }
        }
    }
}

/// 并发执行三个预言机调用
#[derive(Clone)]
pub struct ProbeRunner {
    oracle: Arc<dyn AnalysisOracle>,
    timeout: Duration,
}

impl ProbeRunner {
    pub fn new(oracle: Arc<dyn AnalysisOracle>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    pub async fn run(&self, snapshot: &WeightSnapshot) -> ProbeOutcome {
        let (question, hotspots, report) = tokio::join!(
            self.bounded("refining question", self.oracle.refining_question(snapshot)),
            self.bounded("hotspots", self.oracle.hotspots(snapshot)),
            self.bounded("insight report", self.oracle.insight_report(snapshot)),
        );

        ProbeOutcome {
            question,
            hotspots,
            report,
        }
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(oracle_error),
            Err(_) => Err(AppError::OracleUnavailable(format!(
                "{} timed out after {:?}",
                operation, self.timeout
            ))),
        };

        if let Err(e) = &result {
            tracing::warn!("Oracle call '{}' failed: {}", operation, e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attribute::AttributeKey;
    use crate::models::probe::{Hotspot, InsightReport};
    use crate::models::profile::fixtures::profile_with;
    use crate::providers::MockAnalysisOracle;

    #[test]
    fn test_fires_only_at_multiples_of_cadence() {
        let mut scheduler = ProbeScheduler::new(10);
        let store = WeightStore::default();

        let mut fired_at = Vec::new();
        for n in 0..=35 {
            if let Some(request) = scheduler.on_interaction(n, &store) {
                fired_at.push(request.interaction);
                scheduler.settle(request.interaction);
            }
        }

        assert_eq!(fired_at, vec![10, 20, 30]);
        assert_eq!(scheduler.fired(), 3);
    }

    #[test]
    fn test_trigger_while_probing_is_skipped() {
        let mut scheduler = ProbeScheduler::new(1);
        let store = WeightStore::default();

        assert!(scheduler.on_interaction(1, &store).is_some());
        assert!(scheduler.on_interaction(2, &store).is_none());
        assert_eq!(scheduler.phase(), ProbePhase::Probing { interaction: 1 });

        scheduler.settle(1);
        assert_eq!(scheduler.phase(), ProbePhase::Idle);
        assert!(scheduler.on_interaction(3, &store).is_some());
    }

    #[test]
    fn test_stale_settle_does_not_reset_phase() {
        let mut scheduler = ProbeScheduler::new(2);
        let store = WeightStore::default();
        scheduler.on_interaction(2, &store);

        scheduler.settle(4);
        assert_eq!(scheduler.phase(), ProbePhase::Probing { interaction: 2 });
    }

    #[test]
    fn test_snapshot_captured_at_trigger() {
        let mut scheduler = ProbeScheduler::new(1);
        let mut store = WeightStore::default();
        let profile = profile_with("a", &[(AttributeKey::Style, "Classic")]);
        store.apply_rating(&profile, true).unwrap();

        let request = scheduler.on_interaction(1, &store).unwrap();
        store.apply_rating(&profile, true).unwrap();

        assert!((request.snapshot.weight(AttributeKey::Style, "Classic") - 1.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_runner_collects_partial_failures() {
        let mut oracle = MockAnalysisOracle::new();
        oracle
            .expect_refining_question()
            .times(1)
            .returning(|_| Ok("Long or short?".to_string()));
        oracle
            .expect_hotspots()
            .times(1)
            .returning(|_| Err(AppError::Http("500".into())));
        oracle.expect_insight_report().times(1).returning(|_| {
            Ok(InsightReport {
                summary: "Prefers classic looks".into(),
                dominant_traits: vec!["Classic".into()],
                psychological_profile: None,
            })
        });

        let runner = ProbeRunner::new(Arc::new(oracle), Duration::from_secs(1));
        let outcome = runner.run(&WeightStore::default().snapshot()).await;

        assert_eq!(outcome.question.as_deref().unwrap(), "Long or short?");
        assert!(matches!(outcome.hotspots, Err(AppError::OracleUnavailable(_))));
        assert!(outcome.report.is_ok());
        assert_eq!(outcome.failures(), 1);
    }

    #[tokio::test]
    async fn test_runner_times_out_slow_calls() {
        struct SlowHotspots;
        #[async_trait::async_trait]
        impl AnalysisOracle for SlowHotspots {
            async fn refining_question(&self, _: &WeightSnapshot) -> Result<String> {
                Ok("q".into())
            }
            async fn hotspots(&self, _: &WeightSnapshot) -> Result<Vec<Hotspot>> {
                std::future::pending().await
            }
            async fn insight_report(&self, _: &WeightSnapshot) -> Result<InsightReport> {
                Err(AppError::MalformedResponse("summary missing".into()))
            }
        }

        let runner = ProbeRunner::new(Arc::new(SlowHotspots), Duration::from_millis(20));
        let outcome = runner.run(&WeightStore::default().snapshot()).await;

        assert!(outcome.question.is_ok());
        assert!(matches!(outcome.hotspots, Err(AppError::OracleUnavailable(msg)) if msg.contains("timed out")));
        assert!(matches!(outcome.report, Err(AppError::MalformedResponse(_))));
    }
}
