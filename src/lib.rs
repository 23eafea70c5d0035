//! Cortex - AI orchestration runtime
//!
//! A metacognitive coordination engine built around five core components:
//! a provider fallback gateway, a metacognitive scheduler, a priority
//! attention manager, a background loop supervisor, and a resilient store
//! facade, dispatching to seven subsystem handlers (awareness, memory,
//! goals, learning, proactive, reasoning, self_optimization).

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{DomainError, DomainResult};
