//! Process-wide operational counters.
//!
//! A single [`MetricsRegistry`] is created at startup and shared by every turn. All mutation goes
//! through one mutex; [`MetricsRegistry::snapshot`] copies the state under the same lock and never
//! performs I/O while holding it. Counters only ever increase.
//!
//! Percentiles are approximations: p50 is reported as the mean and p95 as the observed maximum.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde::Serialize;

use crate::domain::intent::Intent;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LatencyBucket {
    /// End-to-end turn handling.
    Answer,
    /// Knowledge-base retrieval only.
    Retrieval,
}

#[derive(Clone, Copy, Debug, Default)]
struct LatencyAccumulator {
    count: u64,
    total_ms: f64,
    max_ms: f64,
}

impl LatencyAccumulator {
    fn observe(&mut self, ms: f64) {
        self.count += 1;
        self.total_ms += ms;
        if ms > self.max_ms {
            self.max_ms = ms;
        }
    }

    fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_ms / self.count as f64
        }
    }

    fn summary(&self) -> LatencySummary {
        LatencySummary {
            avg: round_to(self.avg(), 2),
            p50: round_to(self.avg(), 2),
            p95: round_to(self.max_ms, 2),
            count: self.count,
        }
    }
}

#[derive(Debug, Default)]
struct MetricsState {
    calls_total: u64,
    intents: [u64; 4],
    handoffs: u64,
    refusals: u64,
    redactions: u64,
    tool_success: u64,
    tool_fail: u64,
    answer_latency: LatencyAccumulator,
    retrieval_latency: LatencyAccumulator,
    confidence_sum: f64,
    confidence_count: u64,
}

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    state: Mutex<MetricsState>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub calls_total: u64,
    pub intents: BTreeMap<String, u64>,
    pub handoffs: u64,
    pub refusals: u64,
    pub redactions: u64,
    pub tool: ToolCounters,
    pub latency_ms: LatencyReport,
    pub confidence_avg: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ToolCounters {
    pub success: u64,
    pub fail: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LatencyReport {
    pub answer: LatencySummary,
    pub rag: LatencySummary,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LatencySummary {
    pub avg: f64,
    pub p50: f64,
    pub p95: f64,
    pub count: u64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MetricsState> {
        // Counters stay usable even if a panicking thread held the lock.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_call(&self) {
        self.lock().calls_total += 1;
    }

    pub fn record_intent(&self, intent: Intent) {
        self.lock().intents[intent.index()] += 1;
    }

    pub fn record_handoff(&self) {
        self.lock().handoffs += 1;
    }

    pub fn record_refusal(&self) {
        self.lock().refusals += 1;
    }

    pub fn record_redaction(&self) {
        self.lock().redactions += 1;
    }

    pub fn record_tool_outcome(&self, success: bool) {
        let mut state = self.lock();
        if success {
            state.tool_success += 1;
        } else {
            state.tool_fail += 1;
        }
    }

    pub fn observe_latency(&self, bucket: LatencyBucket, ms: f64) {
        let mut state = self.lock();
        match bucket {
            LatencyBucket::Answer => state.answer_latency.observe(ms),
            LatencyBucket::Retrieval => state.retrieval_latency.observe(ms),
        }
    }

    pub fn observe_confidence(&self, value: f64) {
        let mut state = self.lock();
        state.confidence_sum += value;
        state.confidence_count += 1;
    }

    /// Starts a scoped timer that records into `bucket` when finished or dropped.
    pub fn start_timer(&self, bucket: LatencyBucket) -> LatencyTimer<'_> {
        LatencyTimer { metrics: self, bucket, started: Instant::now(), recorded: false }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.lock();
        let intents = Intent::ALL
            .iter()
            .map(|intent| (intent.as_str().to_string(), state.intents[intent.index()]))
            .collect();
        let confidence_avg = if state.confidence_count == 0 {
            0.0
        } else {
            state.confidence_sum / state.confidence_count as f64
        };

        MetricsSnapshot {
            calls_total: state.calls_total,
            intents,
            handoffs: state.handoffs,
            refusals: state.refusals,
            redactions: state.redactions,
            tool: ToolCounters { success: state.tool_success, fail: state.tool_fail },
            latency_ms: LatencyReport {
                answer: state.answer_latency.summary(),
                rag: state.retrieval_latency.summary(),
            },
            confidence_avg: round_to(confidence_avg, 3),
        }
    }
}

/// Records elapsed wall time exactly once, on [`LatencyTimer::finish`] or on drop.
pub struct LatencyTimer<'a> {
    metrics: &'a MetricsRegistry,
    bucket: LatencyBucket,
    started: Instant,
    recorded: bool,
}

impl LatencyTimer<'_> {
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    pub fn finish(mut self) -> f64 {
        let elapsed = self.elapsed_ms();
        self.metrics.observe_latency(self.bucket, elapsed);
        self.recorded = true;
        elapsed
    }
}

impl Drop for LatencyTimer<'_> {
    fn drop(&mut self) {
        if !self.recorded {
            self.metrics.observe_latency(self.bucket, self.elapsed_ms());
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use crate::domain::intent::Intent;

    use super::{LatencyBucket, MetricsRegistry};

    #[test]
    fn empty_snapshot_is_all_zero() {
        let snapshot = MetricsRegistry::new().snapshot();
        assert_eq!(snapshot.calls_total, 0);
        assert_eq!(snapshot.latency_ms.answer.count, 0);
        assert_eq!(snapshot.latency_ms.answer.avg, 0.0);
        assert_eq!(snapshot.confidence_avg, 0.0);
        assert_eq!(snapshot.intents.len(), 4);
        assert!(snapshot.intents.values().all(|count| *count == 0));
    }

    #[test]
    fn latency_summary_uses_mean_and_max() {
        let metrics = MetricsRegistry::new();
        metrics.observe_latency(LatencyBucket::Answer, 10.0);
        metrics.observe_latency(LatencyBucket::Answer, 30.0);
        metrics.observe_latency(LatencyBucket::Retrieval, 4.125);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.latency_ms.answer.count, 2);
        assert_eq!(snapshot.latency_ms.answer.avg, 20.0);
        assert_eq!(snapshot.latency_ms.answer.p50, 20.0);
        assert_eq!(snapshot.latency_ms.answer.p95, 30.0);
        assert_eq!(snapshot.latency_ms.rag.count, 1);
        assert_eq!(snapshot.latency_ms.rag.p95, 4.13);
    }

    #[test]
    fn counters_and_confidence_accumulate() {
        let metrics = MetricsRegistry::new();
        metrics.record_intent(Intent::Faq);
        metrics.record_intent(Intent::Faq);
        metrics.record_intent(Intent::OrderStatus);
        metrics.record_tool_outcome(true);
        metrics.record_tool_outcome(false);
        metrics.record_handoff();
        metrics.record_refusal();
        metrics.record_redaction();
        metrics.observe_confidence(0.5);
        metrics.observe_confidence(0.8);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.intents["faq"], 2);
        assert_eq!(snapshot.intents["order_status"], 1);
        assert_eq!(snapshot.intents["create_ticket"], 0);
        assert_eq!(snapshot.tool.success, 1);
        assert_eq!(snapshot.tool.fail, 1);
        assert_eq!(snapshot.handoffs, 1);
        assert_eq!(snapshot.refusals, 1);
        assert_eq!(snapshot.redactions, 1);
        assert_eq!(snapshot.confidence_avg, 0.65);
    }

    #[test]
    fn timer_records_once_on_finish_or_drop() {
        let metrics = MetricsRegistry::new();
        {
            let timer = metrics.start_timer(LatencyBucket::Retrieval);
            let elapsed = timer.finish();
            assert!(elapsed >= 0.0);
        }
        {
            let _timer = metrics.start_timer(LatencyBucket::Retrieval);
        }

        assert_eq!(metrics.snapshot().latency_ms.rag.count, 2);
    }

    #[test]
    fn concurrent_calls_are_not_lost() {
        let metrics = Arc::new(MetricsRegistry::new());
        let workers = (0..8)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..250 {
                        metrics.record_call();
                    }
                })
            })
            .collect::<Vec<_>>();
        for worker in workers {
            worker.join().expect("worker thread should finish");
        }

        assert_eq!(metrics.snapshot().calls_total, 2_000);
    }

    #[test]
    fn snapshot_serializes_nested_shape() {
        let metrics = MetricsRegistry::new();
        metrics.record_call();
        let value = serde_json::to_value(metrics.snapshot()).expect("serialize snapshot");
        assert_eq!(value["calls_total"], 1);
        assert!(value["tool"]["success"].is_u64());
        assert!(value["latency_ms"]["answer"]["p95"].is_f64());
        assert!(value["latency_ms"]["rag"]["count"].is_u64());
    }
}
