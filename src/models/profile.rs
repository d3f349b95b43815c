//! 候选画像数据模型
//!
//! 画像一旦构造即不可变。构造时校验每个属性键都存在且为字符串，
//! 不完整的记录在画像源边界被拒绝，不会进入队列。

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{AppError, Result};
use crate::models::attribute::AttributeKey;

/// 候选画像
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// 画像唯一标识
    pub id: String,

    /// 显示名称
    pub name: String,

    /// 一句话简介
    pub bio: String,

    /// 图片地址
    pub image_url: String,

    /// 分类属性值，每个属性键恰好一个
    #[serde(flatten)]
    attributes: BTreeMap<AttributeKey, String>,
}

impl Profile {
    /// 从完整的属性表构造画像
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        bio: impl Into<String>,
        image_url: Option<String>,
        attributes: BTreeMap<AttributeKey, String>,
    ) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(AppError::MalformedResponse(
                "profile id must not be empty".to_string(),
            ));
        }

        if let Some(missing) = AttributeKey::ALL
            .into_iter()
            .find(|key| !attributes.contains_key(key))
        {
            return Err(AppError::MalformedResponse(format!(
                "profile {} is missing attribute {}",
                id, missing
            )));
        }

        let image_url = image_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| derive_image_url(&id));

        Ok(Self {
            name: name.into(),
            bio: bio.into(),
            image_url,
            attributes,
            id,
        })
    }

    /// 读取某个属性的值
    pub fn attribute(&self, key: AttributeKey) -> Option<&str> {
        self.attributes.get(&key).map(String::as_str)
    }

    /// 全部属性
    pub fn attributes(&self) -> &BTreeMap<AttributeKey, String> {
        &self.attributes
    }

    /// 替换标识；派生出的图片地址随之更新，外部提供的保持不变
    pub(crate) fn rekeyed(mut self, id: String) -> Self {
        if self.image_url == derive_image_url(&self.id) {
            self.image_url = derive_image_url(&id);
        }
        self.id = id;
        self
    }
}

/// 根据标识派生图片地址
pub fn derive_image_url(id: &str) -> String {
    format!(
        "https://picsum.photos/seed/{}/600/800",
        urlencoding::encode(id)
    )
}

/// 画像源返回的原始记录
///
/// 所有字段都是可选的，通过 [`ProfileRecord::validate`] 转换为 [`Profile`]。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ProfileRecord {
    /// 校验原始记录，缺少必填字段或属性类型错误时返回 `MalformedResponse`
    pub fn validate(self) -> Result<Profile> {
        let id = required(self.id, "id")?;
        let name = required(self.name, "name")?;
        let bio = required(self.bio, "bio")?;

        let mut attributes = BTreeMap::new();
        for key in AttributeKey::ALL {
            match self.extra.get(key.as_str()) {
                Some(serde_json::Value::String(value)) if !value.trim().is_empty() => {
                    attributes.insert(key, value.trim().to_string());
                }
                Some(other) if !other.is_null() && !other.is_string() => {
                    return Err(AppError::MalformedResponse(format!(
                        "profile {} attribute {} must be a string",
                        id, key
                    )));
                }
                _ => {
                    return Err(AppError::MalformedResponse(format!(
                        "profile {} is missing attribute {}",
                        id, key
                    )));
                }
            }
        }

        Profile::new(id, name, bio, self.image_url, attributes)
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::MalformedResponse(format!("profile field {} is required", field)))
}

/// 校验整批记录，任一记录不合法或标识重复则整批失败
pub fn validate_batch(records: Vec<ProfileRecord>) -> Result<Vec<Profile>> {
    let profiles = records
        .into_iter()
        .map(ProfileRecord::validate)
        .collect::<Result<Vec<_>>>()?;

    {
        let mut seen = HashSet::with_capacity(profiles.len());
        if let Some(duplicate) = profiles.iter().find(|p| !seen.insert(p.id.as_str())) {
            return Err(AppError::MalformedResponse(format!(
                "duplicate profile id {} in batch",
                duplicate.id
            )));
        }
    }

    Ok(profiles)
}
