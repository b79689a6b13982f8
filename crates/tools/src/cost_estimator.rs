//! GPU inference cost estimator.

use async_trait::async_trait;
use genaiops_core::error::ToolError;
use genaiops_core::tool::{parse_arguments, Tool};
use serde::Deserialize;

pub const PRICING_VERSION: &str = "2025-Q1";

/// One row of the pricing table.
#[derive(Debug, Clone, Copy)]
pub struct PriceTier {
    pub model_size: &'static str,
    pub price_per_1m_tokens: f64,
    pub gpu_type: &'static str,
    pub typical_models: &'static str,
}

pub const PRICING_TABLE: &[PriceTier] = &[
    PriceTier {
        model_size: "small",
        price_per_1m_tokens: 0.20,
        gpu_type: "NVIDIA A10",
        typical_models: "7B parameter models",
    },
    PriceTier {
        model_size: "medium",
        price_per_1m_tokens: 0.50,
        gpu_type: "NVIDIA A100",
        typical_models: "13B-70B parameter models",
    },
    PriceTier {
        model_size: "large",
        price_per_1m_tokens: 1.50,
        gpu_type: "NVIDIA H100",
        typical_models: "70B-180B parameter models",
    },
    PriceTier {
        model_size: "xlarge",
        price_per_1m_tokens: 3.00,
        gpu_type: "NVIDIA H100 x4",
        typical_models: "340B+ parameter models",
    },
];

pub fn tier(model_size: &str) -> Option<&'static PriceTier> {
    PRICING_TABLE.iter().find(|t| t.model_size == model_size)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub struct CostEstimator;

#[derive(Deserialize)]
struct EstimateArgs {
    model_size: String,
    tokens_per_month: i64,
}

#[async_trait]
impl Tool for CostEstimator {
    fn name(&self) -> &str {
        "cost_estimator"
    }

    fn description(&self) -> &str {
        "Estimate GPU inference costs for different model sizes and usage patterns. Provides monthly cost estimates based on token usage."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "model_size": {
                    "type": "string",
                    "enum": ["small", "medium", "large", "xlarge"],
                    "description": "Model size category (small: 7B, medium: 13B-70B, large: 70B-180B, xlarge: 340B+)"
                },
                "tokens_per_month": {
                    "type": "integer",
                    "description": "Expected monthly token usage (input + output tokens)"
                }
            },
            "required": ["model_size", "tokens_per_month"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: EstimateArgs = parse_arguments(arguments)?;

        let Some(pricing) = tier(&args.model_size) else {
            let sizes: Vec<&str> = PRICING_TABLE.iter().map(|t| t.model_size).collect();
            return Err(ToolError::InvalidArguments(format!(
                "Invalid model_size: {}. Must be one of: {}",
                args.model_size,
                sizes.join(", ")
            )));
        };

        if args.tokens_per_month < 0 {
            return Err(ToolError::InvalidArguments(
                "tokens_per_month must be a positive number".into(),
            ));
        }

        let monthly = (args.tokens_per_month as f64 / 1_000_000.0) * pricing.price_per_1m_tokens;

        Ok(serde_json::json!({
            "model_size": pricing.model_size,
            "gpu_type": pricing.gpu_type,
            "typical_models": pricing.typical_models,
            "tokens_per_month": args.tokens_per_month,
            "cost_per_1m_tokens_usd": pricing.price_per_1m_tokens,
            "estimated_monthly_cost_usd": round_cents(monthly),
            "breakdown": {
                "daily_cost_usd": round_cents(monthly / 30.0),
                "yearly_cost_usd": round_cents(monthly * 12.0),
            },
            "pricing_version": PRICING_VERSION,
            "note": "These are estimated costs. Actual pricing may vary based on deployment configuration and volume discounts.",
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn medium_model_estimate() {
        let data = CostEstimator
            .execute(serde_json::json!({"model_size": "medium", "tokens_per_month": 10_000_000}))
            .await
            .unwrap();
        assert_eq!(data["gpu_type"], "NVIDIA A100");
        assert_eq!(data["estimated_monthly_cost_usd"], 5.0);
        assert_eq!(data["breakdown"]["daily_cost_usd"], 0.17);
        assert_eq!(data["breakdown"]["yearly_cost_usd"], 60.0);
        assert_eq!(data["pricing_version"], "2025-Q1");
    }

    #[tokio::test]
    async fn xlarge_rounds_to_cents() {
        let data = CostEstimator
            .execute(serde_json::json!({"model_size": "xlarge", "tokens_per_month": 1_234_567}))
            .await
            .unwrap();
        assert_eq!(data["estimated_monthly_cost_usd"], 3.7);
        assert_eq!(data["gpu_type"], "NVIDIA H100 x4");
    }

    #[tokio::test]
    async fn zero_tokens_is_free() {
        let data = CostEstimator
            .execute(serde_json::json!({"model_size": "small", "tokens_per_month": 0}))
            .await
            .unwrap();
        assert_eq!(data["estimated_monthly_cost_usd"], 0.0);
    }

    #[tokio::test]
    async fn unknown_size_rejected() {
        let err = CostEstimator
            .execute(serde_json::json!({"model_size": "huge", "tokens_per_month": 5}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid model_size: huge"));
        assert!(err.to_string().contains("small, medium, large, xlarge"));
    }

    #[tokio::test]
    async fn negative_tokens_rejected() {
        let err = CostEstimator
            .execute(serde_json::json!({"model_size": "large", "tokens_per_month": -1}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("must be a positive number"));
    }
}
