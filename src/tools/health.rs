//! Tool telemetry: per-tool outcome counters and anomaly detection.
//!
//! In-memory sliding-window metrics per tool. Client errors (bad input,
//! unknown tool) are counted but never degrade a tool's health; only server
//! errors and latency do.

use crate::types::Error;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

// =============================================================================
// Configuration
// =============================================================================

/// Health and anomaly thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Highest server-error rate still HEALTHY (default: 0.05).
    pub error_rate_healthy: f64,
    /// Highest server-error rate still DEGRADED (default: 0.20).
    pub error_rate_degraded: f64,
    /// Maximum avg latency (ms) for HEALTHY status (default: 2000).
    pub latency_healthy_ms: u64,
    /// Maximum avg latency (ms) for DEGRADED status (default: 5000).
    pub latency_degraded_ms: u64,
    /// Minimum calls before health assessment (default: 5).
    pub min_calls_for_assessment: usize,
    /// Server errors inside `anomaly_window` that count as a burst (default: 5).
    pub error_burst_threshold: usize,
    /// Window for error bursts (default: 5 minutes).
    #[serde(with = "humantime_serde")]
    pub anomaly_window: Duration,
    /// A call slower than this multiple of the window average is a spike (default: 3.0).
    pub latency_spike_factor: f64,
    /// Calls faster than this never count as spikes (default: 100ms).
    pub latency_spike_floor_ms: u64,
    /// Sliding window size (default: 100).
    pub window_size: usize,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            error_rate_healthy: 0.05,
            error_rate_degraded: 0.20,
            latency_healthy_ms: 2000,
            latency_degraded_ms: 5000,
            min_calls_for_assessment: 5,
            error_burst_threshold: 5,
            anomaly_window: Duration::from_secs(300),
            latency_spike_factor: 3.0,
            latency_spike_floor_ms: 100,
            window_size: 100,
        }
    }
}

// =============================================================================
// Outcomes and anomalies
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

impl HealthStatus {
    fn rank(self) -> u8 {
        match self {
            HealthStatus::Unknown => 0,
            HealthStatus::Healthy => 1,
            HealthStatus::Degraded => 2,
            HealthStatus::Unhealthy => 3,
        }
    }

    fn worse(self, other: HealthStatus) -> HealthStatus {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

/// How one invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    ClientError,
    ServerError,
}

impl Outcome {
    pub fn of<T>(result: &Result<T, Error>) -> Self {
        match result {
            Ok(_) => Outcome::Success,
            Err(e) if e.status_code().is_server_error() => Outcome::ServerError,
            Err(_) => Outcome::ClientError,
        }
    }
}

/// Something unusual about the latest call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    LatencySpike { latency_ms: u64, window_avg_ms: f64 },
    ErrorBurst { server_errors: usize, window_secs: u64 },
}

// =============================================================================
// Per-tool metrics
// =============================================================================

#[derive(Debug, Clone)]
struct CallRecord {
    outcome: Outcome,
    latency_ms: u64,
    at: Instant,
}

#[derive(Debug)]
struct ToolMetrics {
    records: VecDeque<CallRecord>,
    window_size: usize,
    anomalies: u64,
}

impl ToolMetrics {
    fn new(window_size: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(window_size),
            window_size,
            anomalies: 0,
        }
    }

    fn push(&mut self, outcome: Outcome, latency_ms: u64) {
        if self.records.len() >= self.window_size {
            self.records.pop_front();
        }
        self.records.push_back(CallRecord {
            outcome,
            latency_ms,
            at: Instant::now(),
        });
    }

    fn total(&self) -> usize {
        self.records.len()
    }

    fn count(&self, outcome: Outcome) -> usize {
        self.records.iter().filter(|r| r.outcome == outcome).count()
    }

    fn server_error_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.count(Outcome::ServerError) as f64 / total as f64
    }

    fn avg_latency_ms(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let sum: u64 = self.records.iter().map(|r| r.latency_ms).sum();
        sum as f64 / total as f64
    }

    fn server_errors_within(&self, window: Duration) -> usize {
        let now = Instant::now();
        self.records
            .iter()
            .filter(|r| r.outcome == Outcome::ServerError && now.duration_since(r.at) <= window)
            .count()
    }
}

// =============================================================================
// Reports
// =============================================================================

/// Health report for a single tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolHealthReport {
    pub tool_name: String,
    pub status: HealthStatus,
    pub total_calls: usize,
    pub successes: usize,
    pub client_errors: usize,
    pub server_errors: usize,
    pub server_error_rate: f64,
    pub avg_latency_ms: f64,
    pub anomalies_detected: u64,
    pub issues: Vec<String>,
}

/// Service-wide report.
#[derive(Debug, Clone, Serialize)]
pub struct SystemHealthReport {
    pub status: HealthStatus,
    pub tools: Vec<ToolHealthReport>,
}

// =============================================================================
// Tracker
// =============================================================================

/// Sliding-window telemetry for every tool.
#[derive(Debug)]
pub struct ToolHealthTracker {
    config: HealthConfig,
    metrics: HashMap<String, ToolMetrics>,
    /// Catalog tools, reported even before their first call.
    registered_tools: Vec<String>,
}

impl ToolHealthTracker {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            config,
            metrics: HashMap::new(),
            registered_tools: Vec::new(),
        }
    }

    pub fn set_registered_tools(&mut self, tool_names: Vec<String>) {
        self.registered_tools = tool_names;
    }

    /// Record one invocation and return any anomalies it revealed.
    pub fn record(&mut self, tool_name: &str, outcome: Outcome, latency_ms: u64) -> Vec<Anomaly> {
        let config = &self.config;
        let metrics = self
            .metrics
            .entry(tool_name.to_string())
            .or_insert_with(|| ToolMetrics::new(config.window_size));

        let mut anomalies = Vec::new();

        // Compare against history before this call joins it.
        if metrics.total() >= config.min_calls_for_assessment {
            let avg = metrics.avg_latency_ms();
            if latency_ms >= config.latency_spike_floor_ms
                && latency_ms as f64 > avg * config.latency_spike_factor
            {
                anomalies.push(Anomaly::LatencySpike {
                    latency_ms,
                    window_avg_ms: avg,
                });
            }
        }

        metrics.push(outcome, latency_ms);

        if outcome == Outcome::ServerError {
            let errors = metrics.server_errors_within(config.anomaly_window);
            if errors >= config.error_burst_threshold {
                anomalies.push(Anomaly::ErrorBurst {
                    server_errors: errors,
                    window_secs: config.anomaly_window.as_secs(),
                });
            }
        }

        metrics.anomalies += anomalies.len() as u64;
        for anomaly in &anomalies {
            tracing::warn!(tool = tool_name, ?anomaly, "tool anomaly detected");
        }
        anomalies
    }

    /// Check health of a single tool.
    pub fn check_tool_health(&self, tool_name: &str) -> ToolHealthReport {
        let Some(m) = self.metrics.get(tool_name) else {
            return ToolHealthReport {
                tool_name: tool_name.to_string(),
                status: HealthStatus::Unknown,
                total_calls: 0,
                successes: 0,
                client_errors: 0,
                server_errors: 0,
                server_error_rate: 0.0,
                avg_latency_ms: 0.0,
                anomalies_detected: 0,
                issues: vec!["No calls recorded".to_string()],
            };
        };

        let total = m.total();
        let error_rate = m.server_error_rate();
        let avg_latency = m.avg_latency_ms();
        let mut issues = Vec::new();

        let status = if total < self.config.min_calls_for_assessment {
            issues.push(format!(
                "Insufficient data ({}/{})",
                total, self.config.min_calls_for_assessment
            ));
            HealthStatus::Unknown
        } else {
            let rate_status = if error_rate <= self.config.error_rate_healthy {
                HealthStatus::Healthy
            } else if error_rate <= self.config.error_rate_degraded {
                HealthStatus::Degraded
            } else {
                HealthStatus::Unhealthy
            };
            let latency_status = if avg_latency <= self.config.latency_healthy_ms as f64 {
                HealthStatus::Healthy
            } else if avg_latency <= self.config.latency_degraded_ms as f64 {
                HealthStatus::Degraded
            } else {
                HealthStatus::Unhealthy
            };

            if error_rate > self.config.error_rate_healthy {
                issues.push(format!(
                    "Server error rate {:.1}% above {:.0}% threshold",
                    error_rate * 100.0,
                    self.config.error_rate_healthy * 100.0,
                ));
            }
            if avg_latency > self.config.latency_healthy_ms as f64 {
                issues.push(format!(
                    "Avg latency {:.0}ms exceeds {}ms threshold",
                    avg_latency, self.config.latency_healthy_ms,
                ));
            }
            rate_status.worse(latency_status)
        };

        ToolHealthReport {
            tool_name: tool_name.to_string(),
            status,
            total_calls: total,
            successes: m.count(Outcome::Success),
            client_errors: m.count(Outcome::ClientError),
            server_errors: m.count(Outcome::ServerError),
            server_error_rate: error_rate,
            avg_latency_ms: avg_latency,
            anomalies_detected: m.anomalies,
            issues,
        }
    }

    /// Report for every registered or called tool; status is the worst of them.
    pub fn check_system_health(&self) -> SystemHealthReport {
        let mut names: Vec<String> = self.registered_tools.clone();
        for name in self.metrics.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names.sort();

        let tools: Vec<ToolHealthReport> =
            names.iter().map(|name| self.check_tool_health(name)).collect();

        // Unknown tools never pull a healthy service down.
        let status = tools
            .iter()
            .map(|r| r.status)
            .fold(HealthStatus::Unknown, HealthStatus::worse);
        let status = if status == HealthStatus::Unknown {
            HealthStatus::Healthy
        } else {
            status
        };

        SystemHealthReport { status, tools }
    }

    /// Number of tools with recorded calls.
    pub fn tool_count(&self) -> usize {
        self.metrics.len()
    }
}

impl Default for ToolHealthTracker {
    fn default() -> Self {
        Self::new(HealthConfig::default())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> ToolHealthTracker {
        ToolHealthTracker::new(HealthConfig {
            min_calls_for_assessment: 3,
            error_burst_threshold: 3,
            ..Default::default()
        })
    }

    #[test]
    fn test_no_data_unknown() {
        let report = tracker().check_tool_health("getweatherforecast");
        assert_eq!(report.status, HealthStatus::Unknown);
        assert_eq!(report.total_calls, 0);
    }

    #[test]
    fn test_insufficient_data_unknown() {
        let mut t = tracker();
        t.record("getweatherforecast", Outcome::Success, 10);
        t.record("getweatherforecast", Outcome::Success, 10);
        assert_eq!(t.check_tool_health("getweatherforecast").status, HealthStatus::Unknown);
    }

    #[test]
    fn test_client_errors_do_not_degrade() {
        let mut t = tracker();
        for _ in 0..10 {
            t.record("getweatherforecast", Outcome::ClientError, 5);
        }
        let report = t.check_tool_health("getweatherforecast");
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.client_errors, 10);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_server_errors_degrade_then_fail() {
        let mut t = tracker();
        for _ in 0..9 {
            t.record("a", Outcome::Success, 5);
        }
        t.record("a", Outcome::ServerError, 5);
        // 10% server errors → degraded
        assert_eq!(t.check_tool_health("a").status, HealthStatus::Degraded);

        for _ in 0..5 {
            t.record("a", Outcome::ServerError, 5);
        }
        assert_eq!(t.check_tool_health("a").status, HealthStatus::Unhealthy);
    }

    #[test]
    fn test_latency_status() {
        let mut t = tracker();
        for _ in 0..5 {
            t.record("slow", Outcome::Success, 3000);
        }
        assert_eq!(t.check_tool_health("slow").status, HealthStatus::Degraded);
    }

    #[test]
    fn test_latency_spike_detected() {
        let mut t = tracker();
        for _ in 0..5 {
            assert!(t.record("a", Outcome::Success, 50).is_empty());
        }
        let anomalies = t.record("a", Outcome::Success, 400);
        assert_eq!(anomalies.len(), 1);
        assert!(matches!(anomalies[0], Anomaly::LatencySpike { latency_ms: 400, .. }));
        assert_eq!(t.check_tool_health("a").anomalies_detected, 1);
    }

    #[test]
    fn test_fast_calls_never_spike() {
        let mut t = tracker();
        for _ in 0..5 {
            t.record("a", Outcome::Success, 1);
        }
        assert!(t.record("a", Outcome::Success, 20).is_empty());
    }

    #[test]
    fn test_error_burst_detected() {
        let mut t = tracker();
        assert!(t.record("a", Outcome::ServerError, 5).is_empty());
        assert!(t.record("a", Outcome::ServerError, 5).is_empty());
        let anomalies = t.record("a", Outcome::ServerError, 5);
        assert!(matches!(anomalies[0], Anomaly::ErrorBurst { server_errors: 3, .. }));
    }

    #[test]
    fn test_sliding_window_eviction() {
        let mut t = ToolHealthTracker::new(HealthConfig {
            window_size: 5,
            min_calls_for_assessment: 3,
            ..Default::default()
        });
        for _ in 0..5 {
            t.record("a", Outcome::ServerError, 5);
        }
        for _ in 0..5 {
            t.record("a", Outcome::Success, 5);
        }
        let report = t.check_tool_health("a");
        assert_eq!(report.server_errors, 0);
        assert_eq!(report.status, HealthStatus::Healthy);
    }

    #[test]
    fn test_system_health_report() {
        let mut t = tracker();
        t.set_registered_tools(vec!["a".into(), "b".into()]);
        for _ in 0..5 {
            t.record("a", Outcome::Success, 5);
        }
        let report = t.check_system_health();
        assert_eq!(report.tools.len(), 2);
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.tools[1].status, HealthStatus::Unknown);
    }

    #[test]
    fn test_outcome_classification() {
        let ok: Result<(), Error> = Ok(());
        let bad: Result<(), Error> = Err(Error::not_found("x"));
        let broken: Result<(), Error> = Err(Error::internal("x"));
        assert_eq!(Outcome::of(&ok), Outcome::Success);
        assert_eq!(Outcome::of(&bad), Outcome::ClientError);
        assert_eq!(Outcome::of(&broken), Outcome::ServerError);
    }
}
