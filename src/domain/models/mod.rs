//! Domain models
//!
//! Pure domain entities with business logic and validation rules.
//! These models are framework-agnostic and contain no infrastructure concerns.

pub mod alert;
pub mod config;
pub mod goal;
pub mod learning;
pub mod memory;
pub mod neuron;
pub mod optimization;
pub mod proactive;
pub mod provider;
pub mod reflection;
pub mod state_snapshot;
pub mod thought;

pub use alert::{Alert, AlertSeverity};
pub use config::{
    AlertThresholdConfig, AttentionConfig, Config, DatabaseConfig, GatewayConfig, LoggingConfig,
    SchedulerConfig,
};
pub use goal::{Goal, GoalBuilder, GoalLevel, GoalPriority, GoalStatus};
pub use learning::{Outcome, Pattern, PatternCategory};
pub use memory::{deterministic_hash_embedding, Memory, MemoryType};
pub use neuron::{CoActivation, Neuron, NeuronType, Synapse, SynapseState};
pub use optimization::{OptimizationRecord, SelfHealingEvent};
pub use proactive::{Opportunity, Prediction};
pub use provider::{GenerateOptions, Provider};
pub use reflection::{Insight, Reflection};
pub use state_snapshot::StateSnapshot;
pub use thought::{Thought, ThoughtKind, ThoughtPriority};
