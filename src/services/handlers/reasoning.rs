//! Reasoning handler: turns a `reasoning_request` thought into a decision
//! by delegating to the provider fallback gateway, then records the
//! decision for later audit.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{GenerateOptions, Thought};
use crate::services::handlers::SubsystemHandler;
use crate::services::provider_gateway::ProviderGateway;
use crate::services::scheduler::ThoughtHandler;
use crate::services::store_facade::StoreFacade;

/// One step of a parsed chain-of-thought response.
#[derive(Debug, Clone, PartialEq)]
struct ReasoningStep {
    step_number: u32,
    description: String,
    conclusion: String,
    confidence: f64,
    evidence: Vec<String>,
}

/// Parse the declarative step format requested by the reasoning prompt:
/// one line per step, `STEP <n>: <description> | CONCLUSION: <text> |
/// CONFIDENCE: <0.0-1.0> | EVIDENCE: <item>; <item>`. Malformed or
/// unparseable lines are skipped rather than failing the whole response,
/// since providers don't always follow instructions exactly.
fn parse_steps(response: &str) -> Vec<ReasoningStep> {
    let mut steps = Vec::new();
    for line in response.lines() {
        let Some(rest) = line.trim().strip_prefix("STEP ") else { continue };
        let Some((number_part, rest)) = rest.split_once(':') else { continue };
        let Ok(step_number) = number_part.trim().parse::<u32>() else { continue };

        let mut fields = rest.split('|');
        let description = fields.next().unwrap_or_default().trim().to_string();
        let mut conclusion = String::new();
        let mut confidence = 0.5_f64;
        let mut evidence = Vec::new();

        for field in fields {
            let field = field.trim();
            if let Some(value) = field.strip_prefix("CONCLUSION:") {
                conclusion = value.trim().to_string();
            } else if let Some(value) = field.strip_prefix("CONFIDENCE:") {
                confidence = value.trim().parse::<f64>().unwrap_or(0.5).clamp(0.0, 1.0);
            } else if let Some(value) = field.strip_prefix("EVIDENCE:") {
                evidence = value.split(';').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect();
            }
        }

        steps.push(ReasoningStep { step_number, description, conclusion, confidence, evidence });
    }
    steps
}

/// Step-index-weighted mean confidence: later steps (which reason over
/// earlier ones) carry proportionally more weight than earlier ones.
fn weighted_confidence(steps: &[ReasoningStep]) -> f64 {
    let weight_sum: f64 = steps.iter().map(|s| f64::from(s.step_number)).sum();
    if weight_sum == 0.0 {
        return 0.5;
    }
    let weighted: f64 = steps.iter().map(|s| f64::from(s.step_number) * s.confidence).sum();
    weighted / weight_sum
}

pub struct ReasoningHandler {
    gateway: Arc<ProviderGateway>,
    store: Arc<StoreFacade>,
}

impl ReasoningHandler {
    pub fn new(gateway: Arc<ProviderGateway>, store: Arc<StoreFacade>) -> Self {
        Self { gateway, store }
    }

    #[instrument(skip(self, context, options))]
    pub async fn decide(&self, context: &Value, options: &Value, urgency: &str) -> DomainResult<Value> {
        let prompt = format!(
            "Given context: {context}\nChoose the best option from: {options}\n\
             Reason step by step. Respond with one line per step in the form:\n\
             STEP <n>: <description> | CONCLUSION: <text> | CONFIDENCE: <0.0-1.0> | EVIDENCE: <item>; <item>\n\
             The final step's conclusion must name the chosen option."
        );
        let generated = self
            .gateway
            .generate(&prompt, &GenerateOptions::default(), true, true)
            .await
            .map_err(crate::domain::errors::DomainError::from)?;

        let steps = parse_steps(&generated.response);
        let (selected_option, confidence, reasoning) = if steps.is_empty() {
            let confidence = if generated.from_cache { 0.5 } else { 0.8 };
            (generated.response.clone(), confidence, format!("provider={}", generated.provider_used))
        } else {
            let confidence = weighted_confidence(&steps);
            let final_step = steps.iter().max_by_key(|s| s.step_number).expect("steps is non-empty");
            let reasoning = steps
                .iter()
                .map(|s| format!("step {}: {}", s.step_number, s.description))
                .collect::<Vec<_>>()
                .join("; ");
            (final_step.conclusion.clone(), confidence, reasoning)
        };

        let decision_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO decisions (id, created_at, context, options, urgency, selected_option, confidence, reasoning) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(decision_id.to_string())
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(context.to_string())
        .bind(options.to_string())
        .bind(urgency)
        .bind(&selected_option)
        .bind(confidence)
        .bind(&reasoning)
        .execute(self.store.pool())
        .await?;

        info!(decision_id = %decision_id, provider = %generated.provider_used, "reasoning decision recorded");
        Ok(serde_json::json!({
            "decision_id": decision_id,
            "selected_option": selected_option,
            "confidence": confidence,
            "reasoning": reasoning,
            "provider_used": generated.provider_used,
        }))
    }
}

#[async_trait]
impl ThoughtHandler for ReasoningHandler {
    async fn handle(&self, thought: &Thought) -> DomainResult<Value> {
        let context = thought.payload.get("context").cloned().unwrap_or(Value::Null);
        let options = thought.payload.get("options").cloned().unwrap_or(Value::Null);
        let urgency = thought.priority.as_str();
        self.decide(&context, &options, urgency).await
    }
}

#[async_trait]
impl SubsystemHandler for ReasoningHandler {
    fn name(&self) -> &'static str {
        "reasoning"
    }

    async fn health(&self) -> DomainResult<Value> {
        let metrics = self.gateway.metrics().await;
        Ok(serde_json::json!({
            "status": if metrics.available.is_empty() { "degraded" } else { "healthy" },
            "score": if metrics.available.is_empty() { 0.0 } else { 1.0 },
            "details": { "available_providers": metrics.available },
        }))
    }
}
