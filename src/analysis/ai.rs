//! OpenAI-compatible chat-completions backend for resale assessments.
//!
//! The backend is behind a trait so the engine (and tests) can swap in
//! other implementations. Responses must be a strict JSON object with
//! `demand`, `estimatedSalePrice`, `salesTime`, and `reasoning`; anything
//! else counts as malformed and is handled by the engine's retry/fallback.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::{prelude::FromPrimitive, Decimal};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::analysis::Demand;
use crate::config::AiConfig;
use crate::ingest::Item;

/// Errors from one AI backend attempt. All variants are retryable from the
/// engine's perspective; the distinction is kept for logging.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("AI request failed: {0}")]
    Transport(String),

    #[error("AI backend returned HTTP {0}")]
    Http(u16),

    #[error("AI response malformed: {0}")]
    Malformed(String),
}

/// Assessment fields as the backend reports them, before validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAssessment {
    demand: String,
    estimated_sale_price: f64,
    sales_time: String,
    reasoning: String,
}

/// Validated AI output, normalized to crate types.
#[derive(Clone, Debug, PartialEq)]
pub struct AiAssessment {
    pub demand: Demand,
    pub estimated_sale_price: Decimal,
    pub sales_time: String,
    pub reasoning: String,
}

#[async_trait]
pub trait AiBackend: Send + Sync {
    /// One assessment attempt for one item. Retry policy lives in the
    /// engine, not here.
    async fn assess(&self, item: &Item) -> Result<AiAssessment, AiError>;
}

/// Chat-completions client for any OpenAI-compatible endpoint.
pub struct ChatCompletionsBackend {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionsBackend {
    /// Builds the backend when an API key is configured; `None` disables
    /// the AI path entirely (every item takes the heuristic fallback).
    pub fn from_config(config: &AiConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .ok()?;

        Some(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        })
    }

    /// Test constructor with an explicit endpoint and timeout.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn build_prompt(item: &Item) -> String {
        let category_hint = item.notes.as_deref().unwrap_or("Industrial Equipment");
        format!(
            "Analyze this liquidation item for resale pricing.\n\
             \n\
             Item: {title}\n\
             MSRP: ${msrp:.2}\n\
             Category hints: {hints}\n\
             \n\
             This sells at liquidation prices (typically 15-50% of MSRP).\n\
             Respond in JSON format:\n\
             {{\"estimatedSalePrice\": number, \"demand\": \"High/Medium/Low\", \
             \"salesTime\": \"timeframe\", \"reasoning\": \"brief explanation\"}}",
            title = item.title,
            msrp = item.msrp,
            hints = category_hint,
        )
    }
}

#[async_trait]
impl AiBackend for ChatCompletionsBackend {
    async fn assess(&self, item: &Item) -> Result<AiAssessment, AiError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are an expert in retail arbitrage analysis for liquidation inventory. Always respond with valid JSON."
                },
                {
                    "role": "user",
                    "content": Self::build_prompt(item)
                }
            ],
            "temperature": 0.3,
            "max_tokens": 500
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AiError::Http(status.as_u16()));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AiError::Malformed(format!("invalid JSON body: {}", e)))?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AiError::Malformed("missing message content".to_string()))?;

        debug!(item_number = %item.item_number, "received AI assessment payload");
        parse_assessment(content)
    }
}

/// Parses and validates the model's JSON content, tolerating markdown code
/// fences around the object.
pub fn parse_assessment(content: &str) -> Result<AiAssessment, AiError> {
    let cleaned = strip_code_fences(content);

    let wire: WireAssessment = serde_json::from_str(cleaned)
        .map_err(|e| AiError::Malformed(format!("unparseable assessment: {}", e)))?;

    let demand = Demand::from_str(wire.demand.trim())
        .map_err(|_| AiError::Malformed(format!("unknown demand tier '{}'", wire.demand)))?;

    let price = Decimal::from_f64(wire.estimated_sale_price)
        .filter(|p| *p >= Decimal::ZERO)
        .ok_or_else(|| {
            AiError::Malformed(format!(
                "implausible estimatedSalePrice {}",
                wire.estimated_sale_price
            ))
        })?;

    if wire.sales_time.trim().is_empty() {
        return Err(AiError::Malformed("empty salesTime".to_string()));
    }

    Ok(AiAssessment {
        demand,
        estimated_sale_price: price.round_dp(2),
        sales_time: wire.sales_time.trim().to_string(),
        reasoning: wire.reasoning.trim().to_string(),
    })
}

fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_plain_json_assessment() {
        let content = r#"{"estimatedSalePrice": 450.5, "demand": "High", "salesTime": "2-4 weeks", "reasoning": "strong demand"}"#;
        let parsed = parse_assessment(content).unwrap();
        assert_eq!(parsed.demand, Demand::High);
        assert_eq!(parsed.estimated_sale_price, dec!(450.50));
        assert_eq!(parsed.sales_time, "2-4 weeks");
    }

    #[test]
    fn parses_fenced_json_assessment() {
        let content = "```json\n{\"estimatedSalePrice\": 10, \"demand\": \"low\", \"salesTime\": \"3-6 months\", \"reasoning\": \"niche\"}\n```";
        let parsed = parse_assessment(content).unwrap();
        assert_eq!(parsed.demand, Demand::Low);
    }

    #[test]
    fn rejects_unknown_demand_tier() {
        let content = r#"{"estimatedSalePrice": 10, "demand": "Stratospheric", "salesTime": "1 week", "reasoning": "x"}"#;
        assert!(matches!(
            parse_assessment(content),
            Err(AiError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_negative_price() {
        let content = r#"{"estimatedSalePrice": -5.0, "demand": "Low", "salesTime": "1 week", "reasoning": "x"}"#;
        assert!(matches!(
            parse_assessment(content),
            Err(AiError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_missing_fields() {
        let content = r#"{"demand": "Low"}"#;
        assert!(matches!(
            parse_assessment(content),
            Err(AiError::Malformed(_))
        ));
    }
}
