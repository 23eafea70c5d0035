//! Awareness handler: alert intake and sustained-breach gating.
//!
//! Metric-derived alerts (cpu, memory, db latency) are noisy sample to
//! sample; this handler only raises once every sample in a rolling
//! window has breached, and clears the window on the first normal
//! sample, so a single spike doesn't page anyone.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, instrument};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Alert, AlertSeverity, AlertThresholdConfig, Thought, ThoughtKind, ThoughtPriority};
use crate::domain::ports::AlertRepository;
use crate::services::attention_manager::AttentionHold;
use crate::services::handlers::SubsystemHandler;
use crate::services::scheduler::{ThoughtHandler, ThoughtSink};

/// Rolling window of pass/fail samples for one metrics-derived alert kind.
#[derive(Debug, Default)]
struct BreachWindow {
    samples: Vec<bool>,
}

impl BreachWindow {
    fn record(&mut self, breached: bool, window_size: usize) -> bool {
        if !breached {
            self.samples.clear();
            return false;
        }
        self.samples.push(true);
        if self.samples.len() > window_size {
            self.samples.remove(0);
        }
        self.samples.len() >= window_size && self.samples.iter().all(|s| *s)
    }
}

pub struct AwarenessHandler<R: AlertRepository> {
    repository: Arc<R>,
    sink: Arc<dyn ThoughtSink>,
    attention: Arc<dyn AttentionHold>,
    config: AlertThresholdConfig,
    windows: Mutex<HashMap<String, BreachWindow>>,
}

impl<R: AlertRepository> AwarenessHandler<R> {
    pub fn new(
        repository: Arc<R>,
        sink: Arc<dyn ThoughtSink>,
        attention: Arc<dyn AttentionHold>,
        config: AlertThresholdConfig,
    ) -> Self {
        Self { repository, sink, attention, config, windows: Mutex::new(HashMap::new()) }
    }

    /// Record and, if warranted, raise an alert. `alert_type` is read from
    /// the caller's `kind` field (falling back to `"external"` when
    /// absent, matching how ad-hoc alerts arrive with no explicit type).
    #[instrument(skip(self, message, details))]
    pub async fn handle_alert(
        &self,
        kind: &str,
        severity: AlertSeverity,
        message: &str,
        details: Value,
    ) -> DomainResult<Alert> {
        let (alert, _inserted) = self.repository.upsert(kind, severity, message, details).await?;

        if severity == AlertSeverity::Critical {
            self.attention.preempt_for_alert(&alert.kind).await?;
        }

        if severity.notifies() {
            self.sink
                .emit_thought(
                    serde_json::json!({ "alert_id": alert.id, "kind": alert.kind, "severity": severity.as_str(), "status": "acknowledged" }),
                    ThoughtKind::AlertRaised,
                    ThoughtPriority::Urgent,
                )
                .await?;
            info!(alert_kind = %alert.kind, severity = severity.as_str(), "alert raised");
        }

        if severity == AlertSeverity::Critical {
            self.attention.release_alert_hold().await;
        }

        Ok(alert)
    }

    /// Feed one metrics sample through the sustained-breach gate for
    /// `metric` (e.g. `"cpu"`, `"memory"`, `"db_ms"`). Only raises once
    /// every sample across `breach_window_size` consecutive calls has
    /// breached; a single normal sample clears the window.
    #[instrument(skip(self))]
    pub async fn observe_metric(&self, metric: &str, value: f64) -> DomainResult<Option<Alert>> {
        let threshold = match metric {
            "cpu" => self.config.cpu,
            "memory" => self.config.memory,
            "db_ms" => self.config.db_ms,
            other => return Err(DomainError::ValidationFailed(format!("unknown metric {other}"))),
        };
        let breached = value > threshold;

        let should_raise = {
            let mut windows = self.windows.lock().expect("breach windows poisoned");
            windows.entry(metric.to_string()).or_default().record(breached, self.config.breach_window_size)
        };

        if !should_raise {
            return Ok(None);
        }

        let kind = format!("high_{metric}");
        let message = format!("{metric} sustained above threshold: {value} > {threshold}");
        let alert = self
            .handle_alert(&kind, AlertSeverity::Critical, &message, serde_json::json!({ "value": value, "threshold": threshold }))
            .await?;
        Ok(Some(alert))
    }
}

#[async_trait]
impl<R: AlertRepository> ThoughtHandler for AwarenessHandler<R> {
    async fn handle(&self, thought: &Thought) -> DomainResult<Value> {
        let kind = thought
            .payload
            .get("alert_type")
            .or_else(|| thought.payload.get("type"))
            .and_then(|v| v.as_str())
            .unwrap_or("external")
            .to_string();

        let severity = thought
            .payload
            .get("severity")
            .and_then(|v| v.as_str())
            .and_then(AlertSeverity::from_str)
            .unwrap_or(AlertSeverity::Warning);

        let message = thought.payload.get("message").and_then(|v| v.as_str()).unwrap_or("alert").to_string();
        let details = thought.payload.get("details").cloned().unwrap_or(Value::Null);

        let alert = self.handle_alert(&kind, severity, &message, details).await?;
        Ok(serde_json::json!({ "alert_id": alert.id, "occurrence_count": alert.occurrence_count }))
    }
}

#[async_trait]
impl<R: AlertRepository> SubsystemHandler for AwarenessHandler<R> {
    fn name(&self) -> &'static str {
        "awareness"
    }

    async fn health(&self) -> DomainResult<Value> {
        let recent = self.repository.list_recent(10).await?;
        let critical = recent.iter().filter(|a| a.severity == AlertSeverity::Critical).count();
        let status = if critical > 0 { "degraded" } else { "healthy" };
        Ok(serde_json::json!({ "status": status, "score": if critical > 0 { 0.5 } else { 1.0 }, "details": { "recent_critical": critical } }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteAlertRepository};
    use std::sync::Mutex as StdMutex;
    use uuid::Uuid;
    use crate::domain::models::ThoughtPriority as TP;

    struct RecordingSink {
        emitted: StdMutex<Vec<ThoughtKind>>,
    }

    #[async_trait]
    impl ThoughtSink for RecordingSink {
        async fn emit_thought(&self, _payload: Value, kind: ThoughtKind, _priority: TP) -> DomainResult<Uuid> {
            self.emitted.lock().unwrap().push(kind);
            Ok(Uuid::new_v4())
        }
    }

    struct RecordingAttentionHold {
        preempted: StdMutex<Vec<String>>,
        released: StdMutex<u32>,
    }

    impl RecordingAttentionHold {
        fn new() -> Self {
            Self { preempted: StdMutex::new(Vec::new()), released: StdMutex::new(0) }
        }
    }

    #[async_trait]
    impl AttentionHold for RecordingAttentionHold {
        async fn preempt_for_alert(&self, alert_kind: &str) -> DomainResult<()> {
            self.preempted.lock().unwrap().push(alert_kind.to_string());
            Ok(())
        }

        async fn release_alert_hold(&self) {
            *self.released.lock().unwrap() += 1;
        }
    }

    async fn handler() -> (AwarenessHandler<SqliteAlertRepository>, Arc<RecordingSink>, Arc<RecordingAttentionHold>) {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = Arc::new(SqliteAlertRepository::new(pool));
        let sink = Arc::new(RecordingSink { emitted: StdMutex::new(Vec::new()) });
        let attention = Arc::new(RecordingAttentionHold::new());
        (AwarenessHandler::new(repo, sink.clone(), attention.clone(), AlertThresholdConfig::default()), sink, attention)
    }

    #[tokio::test]
    async fn test_warning_alert_emits_alert_raised() {
        let (handler, sink, _attention) = handler().await;
        handler.handle_alert("slow_database", AlertSeverity::Warning, "slow", serde_json::json!({})).await.unwrap();
        assert_eq!(sink.emitted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_info_alert_does_not_emit() {
        let (handler, sink, _attention) = handler().await;
        handler.handle_alert("low_disk", AlertSeverity::Info, "fyi", serde_json::json!({})).await.unwrap();
        assert!(sink.emitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sustained_breach_gating_requires_all_samples() {
        let (handler, sink, _attention) = handler().await;
        handler.observe_metric("cpu", 95.0).await.unwrap();
        handler.observe_metric("cpu", 95.0).await.unwrap();
        assert!(sink.emitted.lock().unwrap().is_empty());

        let raised = handler.observe_metric("cpu", 95.0).await.unwrap();
        assert!(raised.is_some());
        assert_eq!(sink.emitted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_normal_sample_clears_breach_window() {
        let (handler, sink, _attention) = handler().await;
        handler.observe_metric("cpu", 95.0).await.unwrap();
        handler.observe_metric("cpu", 95.0).await.unwrap();
        handler.observe_metric("cpu", 10.0).await.unwrap();
        handler.observe_metric("cpu", 95.0).await.unwrap();
        assert!(sink.emitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_critical_alert_preempts_and_releases_attention() {
        let (handler, _sink, attention) = handler().await;
        handler.handle_alert("high_cpu", AlertSeverity::Critical, "cpu pegged", serde_json::json!({})).await.unwrap();
        assert_eq!(attention.preempted.lock().unwrap().as_slice(), ["high_cpu".to_string()]);
        assert_eq!(*attention.released.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_warning_alert_does_not_touch_attention() {
        let (handler, _sink, attention) = handler().await;
        handler.handle_alert("slow_database", AlertSeverity::Warning, "slow", serde_json::json!({})).await.unwrap();
        assert!(attention.preempted.lock().unwrap().is_empty());
        assert_eq!(*attention.released.lock().unwrap(), 0);
    }
}
