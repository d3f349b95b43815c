//! 偏好权重存储
//!
//! 每个属性键对应一张 值 → 权重 的映射。未出现过的值隐式取基线权重 1.0，
//! 任何一次更新后的权重都不低于下限 0.1，没有上限。

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::config::EngineConfig;
use crate::error::{AppError, Result};
use crate::models::attribute::AttributeKey;
use crate::models::profile::Profile;

type WeightTable = BTreeMap<AttributeKey, BTreeMap<String, f64>>;

/// 权重更新规则
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightPolicy {
    /// 每次评分的增量
    pub increment: f64,
    /// 权重下限
    pub floor: f64,
    /// 未见过的值的基线权重
    pub baseline: f64,
}

impl Default for WeightPolicy {
    fn default() -> Self {
        Self {
            increment: 0.2,
            floor: 0.1,
            baseline: 1.0,
        }
    }
}

impl From<&EngineConfig> for WeightPolicy {
    fn from(config: &EngineConfig) -> Self {
        Self {
            increment: config.weight_increment,
            floor: config.weight_floor,
            baseline: config.baseline_weight,
        }
    }
}

/// 偏离基线的单个权重，用于分析面板
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightDeviation {
    pub attribute: AttributeKey,
    pub value: String,
    pub weight: f64,
}

/// 权重存储
#[derive(Debug, Clone, PartialEq)]
pub struct WeightStore {
    weights: WeightTable,
    policy: WeightPolicy,
}

impl Default for WeightStore {
    fn default() -> Self {
        Self::new(WeightPolicy::default())
    }
}

impl WeightStore {
    /// 创建空存储，每个属性键对应一张空映射
    pub fn new(policy: WeightPolicy) -> Self {
        let weights = AttributeKey::ALL
            .into_iter()
            .map(|key| (key, BTreeMap::new()))
            .collect();
        Self { weights, policy }
    }

    pub fn policy(&self) -> WeightPolicy {
        self.policy
    }

    /// 读取权重，未出现过的值返回基线
    pub fn weight(&self, key: AttributeKey, value: &str) -> f64 {
        lookup(&self.weights, self.policy.baseline, key, value)
    }

    /// 对画像应用一次评分
    ///
    /// 每个属性键恰好更新一个值：`max(floor, current ± increment)`。
    /// 画像缺少任一属性时在写入之前失败，存储保持不变。
    pub fn apply_rating(&mut self, profile: &Profile, liked: bool) -> Result<()> {
        let values = AttributeKey::ALL
            .into_iter()
            .map(|key| {
                profile.attribute(key).map(|v| (key, v)).ok_or_else(|| {
                    AppError::InvariantViolation(format!(
                        "profile {} has no value for attribute {}",
                        profile.id, key
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let delta = if liked {
            self.policy.increment
        } else {
            -self.policy.increment
        };

        for (key, value) in values {
            let table = self.weights.entry(key).or_default();
            let current = table.get(value).copied().unwrap_or(self.policy.baseline);
            let updated = (current + delta).max(self.policy.floor);
            table.insert(value.to_string(), updated);
        }

        Ok(())
    }

    /// 捕获当前权重的不可变快照
    pub fn snapshot(&self) -> WeightSnapshot {
        WeightSnapshot {
            weights: Arc::new(self.weights.clone()),
            baseline: self.policy.baseline,
        }
    }

    /// 偏离基线的权重，按权重降序
    pub fn top_deviations(&self, limit: usize) -> Vec<WeightDeviation> {
        deviations(&self.weights, self.policy.baseline, limit)
    }

    /// 已记录的 (属性, 值) 数量
    pub fn len(&self) -> usize {
        self.weights.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Serialize for WeightStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.weights.serialize(serializer)
    }
}

/// 权重快照
///
/// 在触发时捕获，之后的评分不会影响正在进行中的分析。
#[derive(Debug, Clone, PartialEq)]
pub struct WeightSnapshot {
    weights: Arc<WeightTable>,
    baseline: f64,
}

impl WeightSnapshot {
    pub fn weight(&self, key: AttributeKey, value: &str) -> f64 {
        lookup(&self.weights, self.baseline, key, value)
    }

    pub fn values(&self, key: AttributeKey) -> impl Iterator<Item = (&str, f64)> {
        self.weights
            .get(&key)
            .into_iter()
            .flat_map(|table| table.iter().map(|(v, w)| (v.as_str(), *w)))
    }

    pub fn top_deviations(&self, limit: usize) -> Vec<WeightDeviation> {
        deviations(&self.weights, self.baseline, limit)
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    /// 序列化为 attribute → value → weight 的 JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self.weights.as_ref())?)
    }
}

impl Serialize for WeightSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.weights.as_ref().serialize(serializer)
    }
}

fn lookup(weights: &WeightTable, baseline: f64, key: AttributeKey, value: &str) -> f64 {
    weights
        .get(&key)
        .and_then(|table| table.get(value))
        .copied()
        .unwrap_or(baseline)
}

fn deviations(weights: &WeightTable, baseline: f64, limit: usize) -> Vec<WeightDeviation> {
    let mut out: Vec<WeightDeviation> = weights
        .iter()
        .flat_map(|(key, table)| {
            table.iter().map(move |(value, weight)| WeightDeviation {
                attribute: *key,
                value: value.clone(),
                weight: *weight,
            })
        })
        .filter(|d| (d.weight - baseline).abs() > 1e-9)
        .collect();

    out.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    out.truncate(limit);
    out
}
