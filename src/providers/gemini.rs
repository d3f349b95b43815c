//! Gemini 客户端
//!
//! 通过 Generative Language API 的 `generateContent` 接口生成画像和分析结果。
//! JSON 类的操作附带 `responseSchema`，返回文本在进入引擎前会再做一次校验。

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;

use crate::config::config::ProviderConfig;
use crate::error::{AppError, Result};
use crate::models::attribute::AttributeKey;
use crate::models::probe::{Hotspot, InsightReport, normalize_question};
use crate::models::profile::{Profile, ProfileRecord, validate_batch};
use crate::models::weights::WeightSnapshot;
use crate::providers::{AnalysisOracle, ProfileSource, oracle_error, source_error};

pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// 调用 generateContent，返回首个候选的文本（可能为空）
    async fn generate(&self, prompt: String, schema: Option<Value>) -> Result<String> {
        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });
        if let Some(schema) = schema {
            body["generationConfig"] = json!({
                "responseMimeType": "application/json",
                "responseSchema": schema,
            });
        }

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Http(format!(
                "generateContent returned {}: {}",
                status, error_text
            )));
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::MalformedResponse(e.to_string()))?;

        Ok(payload
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default())
    }

    async fn generate_json<T: DeserializeOwned>(
        &self,
        prompt: String,
        schema: Value,
        empty: &str,
    ) -> Result<T> {
        let text = self.generate(prompt, Some(schema)).await?;
        let text = if text.trim().is_empty() { empty } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| AppError::MalformedResponse(e.to_string()))
    }
}

fn profile_schema() -> Value {
    let mut properties = serde_json::Map::new();
    let mut required = vec![json!("id"), json!("name"), json!("bio")];
    for field in ["id", "name", "bio"] {
        properties.insert(field.to_string(), json!({ "type": "STRING" }));
    }
    for key in AttributeKey::ALL {
        properties.insert(key.as_str().to_string(), json!({ "type": "STRING" }));
        required.push(json!(key.as_str()));
    }

    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": properties,
            "required": required,
        }
    })
}

fn hotspot_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "city": { "type": "STRING" },
                "country": { "type": "STRING" },
                "reason": { "type": "STRING" },
                "matchScore": { "type": "NUMBER" }
            },
            "required": ["city", "country", "reason", "matchScore"]
        }
    })
}

fn report_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": { "type": "STRING" },
            "dominantTraits": { "type": "ARRAY", "items": { "type": "STRING" } },
            "psychologicalProfile": { "type": "STRING" }
        },
        "required": ["summary", "dominantTraits"]
    })
}

#[async_trait]
impl ProfileSource for GeminiClient {
    async fn generate_profiles(&self, count: usize) -> Result<Vec<Profile>> {
        let attributes = AttributeKey::ALL
            .iter()
            .map(AttributeKey::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let prompt = format!(
            "Generate {count} varied, realistic dating profile records. Each record needs a \
             unique id, a name, a one-sentence bio and these descriptive fields: {attributes}. \
             Avoid stereotypes and reuse natural wording for the descriptive values."
        );

        let records: Vec<ProfileRecord> = self
            .generate_json(prompt, profile_schema(), "[]")
            .await
            .map_err(source_error)?;

        tracing::debug!("Gemini returned {} profile records", records.len());
        validate_batch(records)
    }
}

#[async_trait]
impl AnalysisOracle for GeminiClient {
    async fn refining_question(&self, snapshot: &WeightSnapshot) -> Result<String> {
        let prompt = format!(
            "You study aesthetic preferences. These are a user's attribute weights \
             (1.0 is neutral, higher means liked): {}. Pick the two attributes that appear \
             most correlated and write one short, supportive question that helps the user \
             tell correlation from causation.",
            snapshot.to_json()?
        );

        let text = self.generate(prompt, None).await.map_err(oracle_error)?;
        Ok(normalize_question(Some(&text)))
    }

    async fn hotspots(&self, snapshot: &WeightSnapshot) -> Result<Vec<Hotspot>> {
        let prompt = format!(
            "Given these aesthetic preference weights (1.0 is neutral): {}, name three \
             real-world cities where the preferred looks and styles are most common. \
             Give each a matchScore between 0 and 1.",
            snapshot.to_json()?
        );

        let hotspots: Vec<Hotspot> = self
            .generate_json(prompt, hotspot_schema(), "[]")
            .await
            .map_err(oracle_error)?;
        for hotspot in &hotspots {
            hotspot.validate()?;
        }
        Ok(hotspots)
    }

    async fn insight_report(&self, snapshot: &WeightSnapshot) -> Result<InsightReport> {
        let prompt = format!(
            "Write an aesthetic preference profile for a user with these attribute \
             weights (1.0 is neutral): {}. Summarise the underlying patterns in their taste \
             and list the dominant traits.",
            snapshot.to_json()?
        );

        let report: InsightReport = self
            .generate_json(prompt, report_schema(), "{}")
            .await
            .map_err(oracle_error)?;
        report.validate()?;
        Ok(report)
    }
}
