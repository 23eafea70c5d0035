use serde::{Deserialize, Serialize};

/// Main configuration structure for the cortex runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Deployment environment: `production`, `staging`, or anything else.
    /// Drives the resilient store facade's DDL kill-switch policy.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Store connection and retry configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Provider fallback gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Metacognitive scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Priority attention manager configuration
    #[serde(default)]
    pub attention: AttentionConfig,

    /// Alert threshold configuration
    #[serde(default)]
    pub alerts: AlertThresholdConfig,
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            gateway: GatewayConfig::default(),
            scheduler: SchedulerConfig::default(),
            attention: AttentionConfig::default(),
            alerts: AlertThresholdConfig::default(),
        }
    }
}

impl Config {
    /// Returns true if the configured environment enforces the DDL
    /// kill-switch unconditionally.
    pub fn is_ddl_locked_environment(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "staging")
    }
}

/// Store connection and bounded-retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to the `SQLite` database file, or any `sqlx`-compatible URL
    #[serde(default = "default_database_path")]
    pub url: String,

    /// Maximum number of database connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Maximum retries for a transient connection error
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base retry delay in milliseconds; actual delay is `base * (attempt + 1)`
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Opt-in flag allowing DDL statements outside production/staging
    #[serde(default)]
    pub enable_runtime_ddl: bool,
}

fn default_database_path() -> String {
    "sqlite:.cortex/cortex.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_retry_base_delay_ms() -> u64 {
    200
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_path(),
            max_connections: default_max_connections(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            enable_runtime_ddl: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Number of days to retain logs
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            retention_days: default_retention_days(),
        }
    }
}

/// Provider fallback gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GatewayConfig {
    /// Consecutive driver failures before a provider is marked unavailable
    #[serde(default = "default_failure_streak_threshold")]
    pub failure_streak_threshold: u32,

    /// Maximum number of response cache entries
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Entries kept after an eviction pass (FIFO, preserves most recent)
    #[serde(default = "default_cache_eviction_keep")]
    pub cache_eviction_keep: usize,

    /// Maximum recent errors retained for `metrics()`
    #[serde(default = "default_recent_errors_cap")]
    pub recent_errors_cap: usize,

    /// Default retry attempts for `generate_with_retry`
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff between retries, in milliseconds
    #[serde(default = "default_gateway_base_delay_ms")]
    pub base_delay_ms: u64,
}

const fn default_failure_streak_threshold() -> u32 {
    3
}

const fn default_cache_size() -> usize {
    1000
}

const fn default_cache_eviction_keep() -> usize {
    500
}

const fn default_recent_errors_cap() -> usize {
    100
}

const fn default_gateway_base_delay_ms() -> u64 {
    500
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            failure_streak_threshold: default_failure_streak_threshold(),
            cache_size: default_cache_size(),
            cache_eviction_keep: default_cache_eviction_keep(),
            recent_errors_cap: default_recent_errors_cap(),
            max_retries: default_max_retries(),
            base_delay_ms: default_gateway_base_delay_ms(),
        }
    }
}

/// Metacognitive scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Target main-loop tick period in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Maximum thoughts drained per tick
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// In-memory ring buffer capacity for processed thoughts
    #[serde(default = "default_ring_buffer_capacity")]
    pub ring_buffer_capacity: usize,

    /// Reflection loop interval in seconds
    #[serde(default = "default_reflection_interval_secs")]
    pub reflection_interval_secs: u64,

    /// State persistence loop interval in seconds
    #[serde(default = "default_state_persistence_interval_secs")]
    pub state_persistence_interval_secs: u64,

    /// Metrics collection loop interval in seconds
    #[serde(default = "default_metrics_collection_interval_secs")]
    pub metrics_collection_interval_secs: u64,

    /// Attention management loop interval in seconds
    #[serde(default = "default_attention_interval_secs")]
    pub attention_interval_secs: u64,

    /// Minimum acceptable success rate before the reflection loop emits a
    /// learning thought
    #[serde(default = "default_min_success_rate")]
    pub min_success_rate: f64,

    /// Hard-stop deadline for in-flight handlers on shutdown, in seconds
    #[serde(default = "default_shutdown_deadline_secs")]
    pub shutdown_deadline_secs: u64,
}

const fn default_tick_interval_ms() -> u64 {
    100
}

const fn default_batch_size() -> usize {
    10
}

const fn default_ring_buffer_capacity() -> usize {
    10_000
}

const fn default_reflection_interval_secs() -> u64 {
    300
}

const fn default_state_persistence_interval_secs() -> u64 {
    60
}

const fn default_metrics_collection_interval_secs() -> u64 {
    30
}

const fn default_attention_interval_secs() -> u64 {
    1
}

const fn default_min_success_rate() -> f64 {
    0.7
}

const fn default_shutdown_deadline_secs() -> u64 {
    10
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            batch_size: default_batch_size(),
            ring_buffer_capacity: default_ring_buffer_capacity(),
            reflection_interval_secs: default_reflection_interval_secs(),
            state_persistence_interval_secs: default_state_persistence_interval_secs(),
            metrics_collection_interval_secs: default_metrics_collection_interval_secs(),
            attention_interval_secs: default_attention_interval_secs(),
            min_success_rate: default_min_success_rate(),
            shutdown_deadline_secs: default_shutdown_deadline_secs(),
        }
    }
}

/// Priority attention manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AttentionConfig {
    /// Capacity of the in-memory attention-shift history
    #[serde(default = "default_attention_history_capacity")]
    pub history_capacity: usize,

    /// Maximum goals pulled per attention recomputation
    #[serde(default = "default_attention_top_goals")]
    pub top_goals: usize,
}

const fn default_attention_history_capacity() -> usize {
    1000
}

const fn default_attention_top_goals() -> usize {
    10
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_attention_history_capacity(),
            top_goals: default_attention_top_goals(),
        }
    }
}

/// Alert threshold configuration, read from `ALERT_THRESHOLD_*` and
/// `BREACH_WINDOW_SIZE`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AlertThresholdConfig {
    /// CPU utilization percentage threshold
    #[serde(default = "default_cpu_threshold")]
    pub cpu: f64,

    /// Memory utilization percentage threshold
    #[serde(default = "default_memory_threshold")]
    pub memory: f64,

    /// Database call latency threshold in milliseconds
    #[serde(default = "default_db_ms_threshold")]
    pub db_ms: f64,

    /// Rolling sustained-breach window length
    #[serde(default = "default_breach_window_size")]
    pub breach_window_size: usize,
}

const fn default_cpu_threshold() -> f64 {
    90.0
}

const fn default_memory_threshold() -> f64 {
    90.0
}

const fn default_db_ms_threshold() -> f64 {
    3000.0
}

const fn default_breach_window_size() -> usize {
    3
}

impl Default for AlertThresholdConfig {
    fn default() -> Self {
        Self {
            cpu: default_cpu_threshold(),
            memory: default_memory_threshold(),
            db_ms: default_db_ms_threshold(),
            breach_window_size: default_breach_window_size(),
        }
    }
}
