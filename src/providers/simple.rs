//! 本地简易提供方
//!
//! 不依赖网络：画像源按固定词表轮换生成画像，预言机直接读取权重快照做启发式分析。
//! 未配置 API 密钥时使用。

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;
use crate::models::attribute::AttributeKey;
use crate::models::probe::{FALLBACK_QUESTION, Hotspot, InsightReport};
use crate::models::profile::Profile;
use crate::models::weights::WeightSnapshot;
use crate::providers::{AnalysisOracle, ProfileSource};

const NAMES: &[&str] = &[
    "Ava", "Lena", "Noor", "Sofia", "Mei", "Amara", "Ingrid", "Lucia", "Priya", "Yara", "Hana",
];

const BIOS: &[&str] = &[
    "Weekend hiker and amateur potter.",
    "Collects vinyl and bad puns.",
    "Architect who sketches strangers on the metro.",
    "Learning to sail, slowly.",
    "Will trade recipes for book recommendations.",
];

fn vocabulary(key: AttributeKey) -> &'static [&'static str] {
    match key {
        AttributeKey::Ethnicity => &[
            "East Asian",
            "Nordic",
            "Mediterranean",
            "Latin American",
            "South Asian",
            "West African",
            "Middle Eastern",
        ],
        AttributeKey::AgeGroup => &["18-24", "25-30", "31-35", "36-40"],
        AttributeKey::BodyType => &["Petite", "Athletic", "Curvy", "Slim", "Tall"],
        AttributeKey::EyeColor => &["Brown", "Blue", "Green", "Hazel", "Grey"],
        AttributeKey::HairColor => &["Black", "Brown", "Blonde", "Auburn", "Red"],
        AttributeKey::HairType => &["Straight", "Wavy", "Curly", "Coily"],
        AttributeKey::Style => &["Minimalist", "Bohemian", "Streetwear", "Classic", "Sporty"],
    }
}

/// 已知族群对应的代表城市
fn city_for(ethnicity: &str) -> Option<(&'static str, &'static str)> {
    match ethnicity {
        "East Asian" => Some(("Seoul", "South Korea")),
        "Nordic" => Some(("Stockholm", "Sweden")),
        "Mediterranean" => Some(("Naples", "Italy")),
        "Latin American" => Some(("Medellín", "Colombia")),
        "South Asian" => Some(("Mumbai", "India")),
        "West African" => Some(("Lagos", "Nigeria")),
        "Middle Eastern" => Some(("Beirut", "Lebanon")),
        _ => None,
    }
}

/// 按词表轮换生成画像的本地画像源
#[derive(Debug, Default)]
pub struct SimpleProfileSource {
    generated: AtomicU64,
}

impl SimpleProfileSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn build(&self, seq: u64) -> Result<Profile> {
        // 每个属性使用不同步长，避免组合按固定周期重复
        let attributes: BTreeMap<AttributeKey, String> = AttributeKey::ALL
            .into_iter()
            .enumerate()
            .map(|(i, key)| {
                let words = vocabulary(key);
                let index = (seq * (i as u64 * 2 + 1) + i as u64) % words.len() as u64;
                (key, words[index as usize].to_string())
            })
            .collect();

        let name = NAMES[(seq % NAMES.len() as u64) as usize];
        let bio = BIOS[(seq % BIOS.len() as u64) as usize];
        Profile::new(uuid::Uuid::new_v4().to_string(), name, bio, None, attributes)
    }
}

#[async_trait]
impl ProfileSource for SimpleProfileSource {
    async fn generate_profiles(&self, count: usize) -> Result<Vec<Profile>> {
        let start = self.generated.fetch_add(count as u64, Ordering::SeqCst);
        (start..start + count as u64)
            .map(|seq| self.build(seq))
            .collect()
    }
}

/// 直接读取快照的启发式预言机
#[derive(Debug, Default)]
pub struct SimpleAnalysisOracle;

impl SimpleAnalysisOracle {
    pub fn new() -> Self {
        Self
    }

    fn liked_values(snapshot: &WeightSnapshot, limit: usize) -> Vec<(AttributeKey, String, f64)> {
        snapshot
            .top_deviations(usize::MAX)
            .into_iter()
            .filter(|d| d.weight > snapshot.baseline())
            .take(limit)
            .map(|d| (d.attribute, d.value, d.weight))
            .collect()
    }
}

#[async_trait]
impl AnalysisOracle for SimpleAnalysisOracle {
    async fn refining_question(&self, snapshot: &WeightSnapshot) -> Result<String> {
        let liked = Self::liked_values(snapshot, 2);
        Ok(match liked.as_slice() {
            [(k1, v1, _), (k2, v2, _)] => format!(
                "I notice you lean towards {} ({}) and {} ({}). Is it one of them that draws you, or the combination?",
                v1, k1, v2, k2
            ),
            [(k1, v1, _)] => format!(
                "You keep choosing {} for {}. Would you still like it paired with something unexpected?",
                v1, k1
            ),
            _ => FALLBACK_QUESTION.to_string(),
        })
    }

    async fn hotspots(&self, snapshot: &WeightSnapshot) -> Result<Vec<Hotspot>> {
        let mut favoured: Vec<(&str, f64)> = snapshot
            .values(AttributeKey::Ethnicity)
            .filter(|(_, weight)| *weight > snapshot.baseline())
            .collect();
        favoured.sort_by(|a, b| b.1.total_cmp(&a.1));

        let Some(top) = favoured.first().map(|(_, w)| *w) else {
            return Ok(Vec::new());
        };

        Ok(favoured
            .into_iter()
            .filter_map(|(value, weight)| {
                city_for(value).map(|(city, country)| Hotspot {
                    city: city.to_string(),
                    country: country.to_string(),
                    reason: format!("{} features are common here", value),
                    match_score: (weight / top).clamp(0.0, 1.0),
                })
            })
            .take(3)
            .collect())
    }

    async fn insight_report(&self, snapshot: &WeightSnapshot) -> Result<InsightReport> {
        let liked = Self::liked_values(snapshot, 3);
        if liked.is_empty() {
            return Ok(InsightReport {
                summary: "No clear preference has emerged yet.".to_string(),
                dominant_traits: Vec::new(),
                psychological_profile: None,
            });
        }

        let traits: Vec<String> = liked.iter().map(|(_, v, _)| v.clone()).collect();
        let summary = liked
            .iter()
            .map(|(k, v, w)| format!("{} {} (weight {:.2})", k, v, w))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(InsightReport {
            summary: format!("Strongest pulls so far: {}.", summary),
            dominant_traits: traits,
            psychological_profile: Some(
                "Consistent choices suggest a settled, well-defined taste.".to_string(),
            ),
        })
    }
}
