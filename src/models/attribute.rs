//! 属性键枚举
//!
//! 画像校验与权重存储共用同一组封闭的分类属性键，二者不会出现偏差。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 画像的分类属性键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeKey {
    Ethnicity,
    AgeGroup,
    BodyType,
    EyeColor,
    HairColor,
    HairType,
    Style,
}

impl AttributeKey {
    /// 全部属性键，按固定顺序排列
    pub const ALL: [AttributeKey; 7] = [
        AttributeKey::Ethnicity,
        AttributeKey::AgeGroup,
        AttributeKey::BodyType,
        AttributeKey::EyeColor,
        AttributeKey::HairColor,
        AttributeKey::HairType,
        AttributeKey::Style,
    ];

    /// 线上传输使用的字段名
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeKey::Ethnicity => "ethnicity",
            AttributeKey::AgeGroup => "ageGroup",
            AttributeKey::BodyType => "bodyType",
            AttributeKey::EyeColor => "eyeColor",
            AttributeKey::HairColor => "hairColor",
            AttributeKey::HairType => "hairType",
            AttributeKey::Style => "style",
        }
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttributeKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("unknown attribute key: {}", s))
    }
}
