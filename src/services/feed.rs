//! 画像队列管理
//!
//! 队列只在尾部追加、从不重排；游标单调递增且不超过队列长度。
//! 未消费画像低于低水位时请求补货，同一时间最多一个补货请求在途。

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::config::config::EngineConfig;
use crate::error::{AppError, Result};
use crate::models::profile::Profile;
use crate::providers::{ProfileSource, source_error};

/// 补货策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedPolicy {
    pub low_water_mark: usize,
    pub batch_size: usize,
}

impl Default for FeedPolicy {
    fn default() -> Self {
        Self {
            low_water_mark: 5,
            batch_size: 15,
        }
    }
}

impl From<&EngineConfig> for FeedPolicy {
    fn from(config: &EngineConfig) -> Self {
        Self {
            low_water_mark: config.low_water_mark,
            batch_size: config.batch_size,
        }
    }
}

/// 一次补货请求
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplenishRequest {
    pub count: usize,
}

/// 画像队列状态
#[derive(Debug, Clone, Default)]
pub struct FeedState {
    profiles: Vec<Profile>,
    ids: HashSet<String>,
    cursor: usize,
    in_flight: bool,
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 游标处的画像，队列耗尽时为 None
    pub fn current(&self) -> Option<&Profile> {
        self.profiles.get(self.cursor)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// 未消费的画像数量
    pub fn remaining(&self) -> usize {
        self.profiles.len() - self.cursor
    }

    /// 是否有补货请求在途
    pub fn is_replenishing(&self) -> bool {
        self.in_flight
    }

    /// 游标前进一位，仅在存在当前画像时调用
    pub(crate) fn advance(&mut self) -> Result<()> {
        if self.cursor >= self.profiles.len() {
            return Err(AppError::InvariantViolation(
                "cannot advance past the end of the feed".to_string(),
            ));
        }
        self.cursor += 1;
        Ok(())
    }

    /// 低水位检查：低于水位且无在途请求时发起补货
    pub fn ensure_capacity(&mut self, policy: FeedPolicy) -> Option<ReplenishRequest> {
        if self.remaining() >= policy.low_water_mark {
            return None;
        }
        self.begin_replenish(policy)
    }

    /// 无条件发起补货（显式重试），已有请求在途时返回 None
    pub fn begin_replenish(&mut self, policy: FeedPolicy) -> Option<ReplenishRequest> {
        if self.in_flight {
            tracing::debug!("Replenish already in flight, skipping");
            return None;
        }
        self.in_flight = true;
        Some(ReplenishRequest {
            count: policy.batch_size,
        })
    }

    /// 补货结束：成功则按到达顺序追加，失败则队列保持不变
    ///
    /// 标识已在队列中出现过的画像换用新的 uuid。
    pub fn complete_replenish(&mut self, result: Result<Vec<Profile>>) -> Result<usize> {
        self.in_flight = false;
        let batch = result?;
        let appended = batch.len();

        for profile in batch {
            let profile = if self.ids.contains(&profile.id) {
                let id = uuid::Uuid::new_v4().to_string();
                tracing::warn!("Duplicate profile id {} re-keyed as {}", profile.id, id);
                profile.rekeyed(id)
            } else {
                profile
            };
            self.ids.insert(profile.id.clone());
            self.profiles.push(profile);
        }

        Ok(appended)
    }
}

/// 调用画像源的执行器
#[derive(Clone)]
pub struct FeedManager {
    source: Arc<dyn ProfileSource>,
    timeout: Duration,
}

impl FeedManager {
    pub fn new(source: Arc<dyn ProfileSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// 带超时地请求一批画像
    pub async fn fetch(&self, request: ReplenishRequest) -> Result<Vec<Profile>> {
        tracing::debug!("Requesting {} profiles from source", request.count);

        match tokio::time::timeout(self.timeout, self.source.generate_profiles(request.count)).await
        {
            Ok(result) => result.map_err(source_error),
            Err(_) => Err(AppError::SourceUnavailable(format!(
                "profile source timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::fixtures::profile_with;
    use crate::providers::MockProfileSource;

    fn batch(n: usize) -> Vec<Profile> {
        (0..n).map(|i| profile_with(&format!("p{}", i), &[])).collect()
    }

    #[test]
    fn test_empty_feed_requests_batch() {
        let mut feed = FeedState::new();
        assert!(feed.current().is_none());

        let request = feed.ensure_capacity(FeedPolicy::default());
        assert_eq!(request, Some(ReplenishRequest { count: 15 }));
        assert!(feed.is_replenishing());
    }

    #[test]
    fn test_in_flight_guard_blocks_duplicates() {
        let mut feed = FeedState::new();
        assert!(feed.ensure_capacity(FeedPolicy::default()).is_some());
        assert!(feed.ensure_capacity(FeedPolicy::default()).is_none());
        assert!(feed.begin_replenish(FeedPolicy::default()).is_none());

        feed.complete_replenish(Ok(batch(2))).unwrap();
        assert!(feed.ensure_capacity(FeedPolicy::default()).is_some());
    }

    #[test]
    fn test_no_request_at_or_above_low_water() {
        let mut feed = FeedState::new();
        feed.begin_replenish(FeedPolicy::default());
        feed.complete_replenish(Ok(batch(5))).unwrap();

        assert!(feed.ensure_capacity(FeedPolicy::default()).is_none());
        feed.advance().unwrap();
        assert_eq!(feed.remaining(), 4);
        assert!(feed.ensure_capacity(FeedPolicy::default()).is_some());
    }

    #[test]
    fn test_failed_replenish_leaves_feed_unchanged() {
        let mut feed = FeedState::new();
        feed.begin_replenish(FeedPolicy::default());
        feed.complete_replenish(Ok(batch(3))).unwrap();
        feed.advance().unwrap();

        feed.begin_replenish(FeedPolicy::default());
        let err = feed
            .complete_replenish(Err(AppError::SourceUnavailable("down".into())))
            .unwrap_err();

        assert!(matches!(err, AppError::SourceUnavailable(_)));
        assert_eq!(feed.len(), 3);
        assert_eq!(feed.cursor(), 1);
        assert!(!feed.is_replenishing());
    }

    #[test]
    fn test_batches_append_in_arrival_order() {
        let mut feed = FeedState::new();
        feed.begin_replenish(FeedPolicy::default());
        feed.complete_replenish(Ok(vec![profile_with("first", &[])])).unwrap();
        feed.begin_replenish(FeedPolicy::default());
        feed.complete_replenish(Ok(vec![profile_with("second", &[])])).unwrap();

        assert_eq!(feed.current().unwrap().id, "first");
        feed.advance().unwrap();
        assert_eq!(feed.current().unwrap().id, "second");
    }

    #[test]
    fn test_repeated_ids_are_rekeyed() {
        let mut feed = FeedState::new();
        feed.begin_replenish(FeedPolicy::default());
        feed.complete_replenish(Ok(vec![profile_with("1", &[])])).unwrap();
        feed.begin_replenish(FeedPolicy::default());
        feed.complete_replenish(Ok(vec![profile_with("1", &[]), profile_with("1", &[])]))
            .unwrap();

        assert_eq!(feed.len(), 3);
        let ids: HashSet<&str> = feed.profiles.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains("1"));

        let images: HashSet<&str> = feed.profiles.iter().map(|p| p.image_url.as_str()).collect();
        assert_eq!(images.len(), 3);
    }

    #[test]
    fn test_advance_past_end_is_invariant_violation() {
        let mut feed = FeedState::new();
        assert!(matches!(
            feed.advance(),
            Err(AppError::InvariantViolation(_))
        ));
        assert_eq!(feed.cursor(), 0);
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        // mockall 的返回值是同步给出的，超时需要一个永不完成的源
        struct Stalled;
        #[async_trait::async_trait]
        impl ProfileSource for Stalled {
            async fn generate_profiles(&self, _count: usize) -> Result<Vec<Profile>> {
                std::future::pending().await
            }
        }

        let manager = FeedManager::new(Arc::new(Stalled), Duration::from_millis(20));
        let err = manager.fetch(ReplenishRequest { count: 15 }).await.unwrap_err();
        assert!(matches!(err, AppError::SourceUnavailable(msg) if msg.contains("timed out")));
    }

    #[tokio::test]
    async fn test_fetch_reclassifies_transport_errors() {
        let mut source = MockProfileSource::new();
        source
            .expect_generate_profiles()
            .withf(|count| *count == 15)
            .times(1)
            .returning(|_| Err(AppError::Http("connection reset".into())));

        let manager = FeedManager::new(Arc::new(source), Duration::from_secs(1));
        let err = manager.fetch(ReplenishRequest { count: 15 }).await.unwrap_err();
        assert!(matches!(err, AppError::SourceUnavailable(_)));
    }
}
