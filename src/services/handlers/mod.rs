//! Subsystem handlers.
//!
//! Each handler binds one or more [`crate::domain::models::ThoughtKind`]
//! values to application logic. The scheduler dispatches by kind; handlers
//! never reach back into the scheduler's queue directly, only through the
//! narrow [`crate::services::scheduler::ThoughtSink`] port.

pub mod awareness;
pub mod goals;
pub mod learning;
pub mod memory;
pub mod proactive;
pub mod reasoning;
pub mod self_optimization;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::errors::DomainResult;

/// Lifecycle contract shared by every subsystem handler, per the runtime's
/// bind/health/shutdown convention.
#[async_trait]
pub trait SubsystemHandler: Send + Sync {
    /// Human name used in health reports and logs.
    fn name(&self) -> &'static str;

    /// One-shot setup run before the handler is registered with the
    /// scheduler (e.g. priming caches). Default no-op.
    async fn initialize(&self) -> DomainResult<()> {
        Ok(())
    }

    /// Current health as `{status, score, details}`.
    async fn health(&self) -> DomainResult<Value>;

    /// Graceful teardown. Default no-op; overridden by handlers owning
    /// background state (e.g. awareness's breach windows are in-memory
    /// only and need no teardown, but a future handler with its own
    /// connections would close them here).
    async fn shutdown(&self) -> DomainResult<()> {
        Ok(())
    }
}
