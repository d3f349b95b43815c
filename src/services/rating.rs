//! 评分流水线
//!
//! 一次评分作为单个状态转换完成：更新权重、交互计数加一、游标前进、低水位检查。
//! 外部观察者不会看到其中任何一步单独生效。

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::services::feed::ReplenishRequest;
use crate::services::probe::ProbeRequest;
use crate::services::state::EngineState;

/// 用户决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Like,
    Pass,
}

impl Decision {
    pub fn is_like(self) -> bool {
        matches!(self, Decision::Like)
    }
}

impl From<bool> for Decision {
    fn from(liked: bool) -> Self {
        if liked { Decision::Like } else { Decision::Pass }
    }
}

/// 评分结果以及需要执行的后续请求
#[derive(Debug, Clone)]
pub struct RatingOutcome {
    pub profile_id: String,
    pub decision: Decision,
    pub interaction_count: u64,
    pub cursor: usize,
    pub remaining: usize,
    pub replenish: Option<ReplenishRequest>,
    pub probe: Option<ProbeRequest>,
}

/// 对游标处的画像应用一次评分
///
/// 没有当前画像时返回 `InvariantViolation`，状态保持不变。
pub fn rate(state: &mut EngineState, decision: Decision) -> Result<RatingOutcome> {
    let profile = state.feed.current().ok_or_else(|| {
        AppError::InvariantViolation(format!(
            "no current profile to rate (cursor {} of {})",
            state.feed.cursor(),
            state.feed.len()
        ))
    })?;
    let profile_id = profile.id.clone();

    state.weights.apply_rating(profile, decision.is_like())?;
    state.interactions += 1;
    state.feed.advance()?;

    let replenish = state.feed.ensure_capacity(state.feed_policy);
    let probe = state
        .scheduler
        .on_interaction(state.interactions, &state.weights);

    tracing::debug!(
        "Rated profile {} as {:?} (interaction {}, {} remaining)",
        profile_id,
        decision,
        state.interactions,
        state.feed.remaining()
    );

    Ok(RatingOutcome {
        profile_id,
        decision,
        interaction_count: state.interactions,
        cursor: state.feed.cursor(),
        remaining: state.feed.remaining(),
        replenish,
        probe,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config::EngineConfig;
    use crate::models::attribute::AttributeKey;
    use crate::models::profile::fixtures::profile_with;
    use crate::services::probe::ProbePhase;
    use rstest::rstest;

    fn state_with(n: usize) -> EngineState {
        let mut state = EngineState::new(&EngineConfig::default());
        let policy = state.feed_policy();
        state.feed.begin_replenish(policy);
        state
            .feed
            .complete_replenish(Ok((0..n)
                .map(|i| profile_with(&format!("p{}", i), &[(AttributeKey::HairType, "Wavy")]))
                .collect()))
            .unwrap();
        state
    }

    #[rstest]
    #[case(Decision::Like)]
    #[case(Decision::Pass)]
    fn test_rating_advances_cursor_and_counter_by_one(#[case] decision: Decision) {
        let mut state = state_with(20);

        let outcome = rate(&mut state, decision).unwrap();

        assert_eq!(outcome.profile_id, "p0");
        assert_eq!(state.feed().cursor(), 1);
        assert_eq!(state.interactions(), 1);
        assert_eq!(outcome.interaction_count, 1);
        assert_eq!(outcome.remaining, 19);
    }

    #[test]
    fn test_rating_without_current_profile_changes_nothing() {
        let mut state = EngineState::new(&EngineConfig::default());

        let err = rate(&mut state, Decision::Like).unwrap_err();

        assert!(matches!(err, AppError::InvariantViolation(_)));
        assert_eq!(state.interactions(), 0);
        assert_eq!(state.feed().cursor(), 0);
        assert!(state.weights().is_empty());
    }

    #[test]
    fn test_likes_accumulate_on_shared_value() {
        let mut state = state_with(20);
        for _ in 0..4 {
            rate(&mut state, Decision::Like).unwrap();
        }
        let weight = state.weights().weight(AttributeKey::HairType, "Wavy");
        assert!((weight - 1.8).abs() < 1e-9);
    }

    #[test]
    fn test_dropping_below_low_water_requests_replenish() {
        let mut state = state_with(6);

        let first = rate(&mut state, Decision::Pass).unwrap();
        assert!(first.replenish.is_none());
        assert_eq!(first.remaining, 5);

        let second = rate(&mut state, Decision::Pass).unwrap();
        assert_eq!(second.remaining, 4);
        assert_eq!(second.replenish, Some(ReplenishRequest { count: 15 }));

        // 在途请求未结束前不再重复发起
        let third = rate(&mut state, Decision::Pass).unwrap();
        assert!(third.replenish.is_none());
    }

    #[test]
    fn test_probe_requested_at_cadence() {
        let mut state = state_with(30);
        let mut probes = Vec::new();
        for _ in 0..10 {
            if let Some(probe) = rate(&mut state, Decision::Like).unwrap().probe {
                probes.push(probe.interaction);
            }
        }

        assert_eq!(probes, vec![10]);
        assert_eq!(
            state.scheduler().phase(),
            ProbePhase::Probing { interaction: 10 }
        );
    }

    #[test]
    fn test_exhausted_feed_rejects_further_ratings() {
        let mut state = state_with(1);
        rate(&mut state, Decision::Like).unwrap();

        assert!(state.feed().current().is_none());
        assert!(rate(&mut state, Decision::Like).is_err());
        assert_eq!(state.interactions(), 1);
    }
}
