//! Request metrics aggregation
//!
//! One [`MetricsRecorder`] is constructed at startup and shared by every
//! request. All state sits behind a single mutex so concurrent `record`
//! calls cannot lose updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Entries kept in the recent-request history
pub const HISTORY_CAPACITY: usize = 100;

/// One record per pipeline invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMetric {
    pub timestamp: DateTime<Utc>,
    pub query_length: usize,
    pub answer_length: usize,
    pub total_latency_ms: f64,
    pub retrieval_latency_ms: f64,
    pub llm_latency_ms: f64,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub top_k: usize,
    pub context_size: usize,
    pub citations_count: usize,
    pub blocked: bool,
    pub blocked_reason: Option<String>,
    pub failed: bool,
    pub failure_reason: Option<String>,
}

impl RequestMetric {
    /// Metric for a query rejected by a guardrail policy
    pub fn blocked(query_length: usize, top_k: usize, total_latency_ms: f64, policy: &str) -> Self {
        Self {
            blocked: true,
            blocked_reason: Some(policy.to_string()),
            ..Self::empty(query_length, top_k, total_latency_ms)
        }
    }

    /// Metric for a request that failed after validation
    pub fn failed(query_length: usize, top_k: usize, total_latency_ms: f64, reason: &str) -> Self {
        Self {
            failed: true,
            failure_reason: Some(reason.to_string()),
            ..Self::empty(query_length, top_k, total_latency_ms)
        }
    }

    fn empty(query_length: usize, top_k: usize, total_latency_ms: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            query_length,
            answer_length: 0,
            total_latency_ms,
            retrieval_latency_ms: 0.0,
            llm_latency_ms: 0.0,
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            top_k,
            context_size: 0,
            citations_count: 0,
            blocked: false,
            blocked_reason: None,
            failed: false,
            failure_reason: None,
        }
    }

    fn is_sampled(&self) -> bool {
        !self.blocked && !self.failed
    }
}

/// Aggregate statistics over every recorded request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_requests: u64,
    pub blocked_requests: u64,
    pub failed_requests: u64,
    pub success_requests: u64,
    pub block_rate: f64,
    pub avg_latency_ms: f64,
    pub p50_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub p99_latency_ms: f64,
    pub avg_retrieval_latency_ms: f64,
    pub avg_llm_latency_ms: f64,
    pub avg_tokens: f64,
    pub total_tokens: u64,
}

#[derive(Default)]
struct MetricsState {
    request_count: u64,
    blocked_count: u64,
    failed_count: u64,
    latencies: Vec<f64>,
    retrieval_latencies: Vec<f64>,
    llm_latencies: Vec<f64>,
    token_usage: Vec<u32>,
    history: VecDeque<RequestMetric>,
}

/// Thread-safe metrics recorder
pub struct MetricsRecorder {
    state: Mutex<MetricsState>,
    capacity: usize,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Recorder keeping at most `capacity` history entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(MetricsState {
                history: VecDeque::with_capacity(capacity),
                ..MetricsState::default()
            }),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricsState> {
        // every update is a handful of pushes, a poisoned guard is still consistent
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record one request
    pub fn record(&self, metric: RequestMetric) {
        let mut state = self.lock();

        state.request_count += 1;
        if metric.blocked {
            state.blocked_count += 1;
        }
        if metric.failed {
            state.failed_count += 1;
        }
        if metric.is_sampled() {
            state.latencies.push(metric.total_latency_ms);
            state.retrieval_latencies.push(metric.retrieval_latency_ms);
            state.llm_latencies.push(metric.llm_latency_ms);
            state.token_usage.push(metric.total_tokens);
        }

        if self.capacity > 0 {
            if state.history.len() == self.capacity {
                state.history.pop_front();
            }
            state.history.push_back(metric.clone());
        }

        tracing::info!(
            request_count = state.request_count,
            blocked = metric.blocked,
            failed = metric.failed,
            total_latency_ms = metric.total_latency_ms,
            "Request recorded"
        );
    }

    /// Aggregate statistics; latency and token figures are zero until a
    /// successful request has been recorded
    pub fn statistics(&self) -> Statistics {
        let state = self.lock();

        let block_rate = if state.request_count > 0 {
            state.blocked_count as f64 / state.request_count as f64
        } else {
            0.0
        };

        let base = Statistics {
            total_requests: state.request_count,
            blocked_requests: state.blocked_count,
            failed_requests: state.failed_count,
            success_requests: state.latencies.len() as u64,
            block_rate,
            ..Statistics::default()
        };

        if state.latencies.is_empty() {
            return base;
        }

        let mut sorted = state.latencies.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let total_tokens: u64 = state.token_usage.iter().map(|&t| t as u64).sum();

        Statistics {
            avg_latency_ms: mean(&state.latencies),
            p50_latency_ms: nearest_rank(&sorted, 0.5),
            p95_latency_ms: nearest_rank(&sorted, 0.95),
            p99_latency_ms: nearest_rank(&sorted, 0.99),
            avg_retrieval_latency_ms: mean(&state.retrieval_latencies),
            avg_llm_latency_ms: mean(&state.llm_latencies),
            avg_tokens: total_tokens as f64 / state.token_usage.len() as f64,
            total_tokens,
            ..base
        }
    }

    /// The most recent `limit` history entries, oldest first
    pub fn recent(&self, limit: usize) -> Vec<RequestMetric> {
        let state = self.lock();
        let skip = state.history.len().saturating_sub(limit);
        state.history.iter().skip(skip).cloned().collect()
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Percentile without interpolation: `sorted[floor(n * q)]`
pub fn nearest_rank(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64 * q) as usize).min(sorted.len() - 1);
    sorted[idx]
}
