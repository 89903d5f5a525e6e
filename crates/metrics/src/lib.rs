use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Thread-safe metrics collector for the signal and execution path.
#[derive(Debug)]
pub struct ExecutionMetrics {
    // Counters
    advice_emitted: AtomicU64,
    orders_placed: AtomicU64,
    orders_filled: AtomicU64,
    orders_canceled: AtomicU64,
    retries: AtomicU64,
    fatal_errors: AtomicU64,
    exhausted_operations: AtomicU64,
    canceled_operations: AtomicU64,

    // Timestamps
    inner: RwLock<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    start_time: Instant,
    last_advice_time: Option<Instant>,
    last_fill_time: Option<Instant>,
    last_failure_time: Option<Instant>,
}

impl Default for ExecutionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionMetrics {
    pub fn new() -> Self {
        Self {
            advice_emitted: AtomicU64::new(0),
            orders_placed: AtomicU64::new(0),
            orders_filled: AtomicU64::new(0),
            orders_canceled: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            fatal_errors: AtomicU64::new(0),
            exhausted_operations: AtomicU64::new(0),
            canceled_operations: AtomicU64::new(0),
            inner: RwLock::new(MetricsInner {
                start_time: Instant::now(),
                last_advice_time: None,
                last_fill_time: None,
                last_failure_time: None,
            }),
        }
    }

    // --- Increment methods ---

    pub fn inc_advice_emitted(&self) {
        self.advice_emitted.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_advice_time = Some(Instant::now());
    }

    pub fn inc_orders_placed(&self) {
        self.orders_placed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_orders_filled(&self) {
        self.orders_filled.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_fill_time = Some(Instant::now());
    }

    pub fn inc_orders_canceled(&self) {
        self.orders_canceled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_retries(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fatal_errors(&self) {
        self.fatal_errors.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_failure_time = Some(Instant::now());
    }

    pub fn inc_exhausted_operations(&self) {
        self.exhausted_operations.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_failure_time = Some(Instant::now());
    }

    pub fn inc_canceled_operations(&self) {
        self.canceled_operations.fetch_add(1, Ordering::Relaxed);
    }

    // --- Getter methods ---

    pub fn advice_emitted(&self) -> u64 {
        self.advice_emitted.load(Ordering::Relaxed)
    }

    pub fn orders_placed(&self) -> u64 {
        self.orders_placed.load(Ordering::Relaxed)
    }

    pub fn orders_filled(&self) -> u64 {
        self.orders_filled.load(Ordering::Relaxed)
    }

    pub fn orders_canceled(&self) -> u64 {
        self.orders_canceled.load(Ordering::Relaxed)
    }

    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    pub fn fatal_errors(&self) -> u64 {
        self.fatal_errors.load(Ordering::Relaxed)
    }

    pub fn exhausted_operations(&self) -> u64 {
        self.exhausted_operations.load(Ordering::Relaxed)
    }

    pub fn canceled_operations(&self) -> u64 {
        self.canceled_operations.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> f64 {
        self.inner.read().start_time.elapsed().as_secs_f64()
    }

    pub fn secs_since_last_advice(&self) -> Option<f64> {
        self.inner
            .read()
            .last_advice_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    pub fn secs_since_last_fill(&self) -> Option<f64> {
        self.inner
            .read()
            .last_fill_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    pub fn secs_since_last_failure(&self) -> Option<f64> {
        self.inner
            .read()
            .last_failure_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    /// Generate a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            advice_emitted: self.advice_emitted(),
            orders_placed: self.orders_placed(),
            orders_filled: self.orders_filled(),
            orders_canceled: self.orders_canceled(),
            retries: self.retries(),
            fatal_errors: self.fatal_errors(),
            exhausted_operations: self.exhausted_operations(),
            canceled_operations: self.canceled_operations(),
            uptime_secs: self.uptime_secs(),
            secs_since_last_advice: self.secs_since_last_advice(),
            secs_since_last_fill: self.secs_since_last_fill(),
            secs_since_last_failure: self.secs_since_last_failure(),
        }
    }

    pub fn health_status(&self) -> HealthStatus {
        self.snapshot().health_status()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub advice_emitted: u64,
    pub orders_placed: u64,
    pub orders_filled: u64,
    pub orders_canceled: u64,
    pub retries: u64,
    pub fatal_errors: u64,
    pub exhausted_operations: u64,
    pub canceled_operations: u64,
    pub uptime_secs: f64,
    pub secs_since_last_advice: Option<f64>,
    pub secs_since_last_fill: Option<f64>,
    pub secs_since_last_failure: Option<f64>,
}

/// Health status of the execution path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Every venue operation either succeeded or is still retrying.
    Healthy,
    /// At least one operation failed fatally or ran out of retries.
    Degraded,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "HEALTHY"),
            HealthStatus::Degraded => write!(f, "DEGRADED"),
        }
    }
}

impl MetricsSnapshot {
    /// Operations that gave up: fatal plus exhausted.
    pub fn failures(&self) -> u64 {
        self.fatal_errors + self.exhausted_operations
    }

    /// Determine the health status based on metrics.
    pub fn health_status(&self) -> HealthStatus {
        if self.failures() > 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Execution Metrics ===")?;
        writeln!(f, "Uptime:              {:.1}s", self.uptime_secs)?;
        writeln!(f, "Advice emitted:      {}", self.advice_emitted)?;
        writeln!(f, "Orders placed:       {}", self.orders_placed)?;
        writeln!(f, "Orders filled:       {}", self.orders_filled)?;
        writeln!(f, "Orders canceled:     {}", self.orders_canceled)?;
        writeln!(f, "Retries:             {}", self.retries)?;
        writeln!(f, "Fatal errors:        {}", self.fatal_errors)?;
        writeln!(f, "Exhausted retries:   {}", self.exhausted_operations)?;
        writeln!(f, "Canceled operations: {}", self.canceled_operations)?;
        writeln!(f, "Health:              {}", self.health_status())?;
        if let Some(secs) = self.secs_since_last_fill {
            writeln!(f, "Since last fill:     {:.1}s", secs)?;
        }
        if let Some(secs) = self.secs_since_last_failure {
            writeln!(f, "Since last failure:  {:.1}s", secs)?;
        }
        Ok(())
    }
}

/// Shared handle to metrics.
pub type SharedMetrics = Arc<ExecutionMetrics>;

pub fn create_metrics() -> SharedMetrics {
    Arc::new(ExecutionMetrics::new())
}
