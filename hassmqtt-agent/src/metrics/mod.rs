//! Host metrics exposed to Home Assistant
//!
//! Provides:
//! - The set of publishable system metrics and their discovery metadata
//! - A sampler reading them through `sysinfo`
//! - One publish pass over every enabled metric

use hassmqtt::{Device, Metric, Transport};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::System;
use tracing::{debug, warn};

/// System metrics the agent knows how to publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemMetric {
    CpuPercent,
    MemoryPercent,
    MemoryUsed,
    Uptime,
    LoadAverage,
}

impl SystemMetric {
    pub const ALL: [SystemMetric; 5] = [
        SystemMetric::CpuPercent,
        SystemMetric::MemoryPercent,
        SystemMetric::MemoryUsed,
        SystemMetric::Uptime,
        SystemMetric::LoadAverage,
    ];

    /// Config key, also used as the metric id in topics
    pub fn key(self) -> &'static str {
        match self {
            SystemMetric::CpuPercent => "cpu_percent",
            SystemMetric::MemoryPercent => "memory_percent",
            SystemMetric::MemoryUsed => "memory_used",
            SystemMetric::Uptime => "uptime",
            SystemMetric::LoadAverage => "load_1m",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.key() == key)
    }

    /// Home Assistant sensor describing this metric on `device`
    pub fn describe(self, device: Arc<Device>) -> Metric {
        let metric = Metric::new(device, self.key(), "sensor");
        match self {
            SystemMetric::CpuPercent => metric
                .with_name("CPU usage")
                .with_unit("%")
                .with_state_class("measurement"),
            SystemMetric::MemoryPercent => metric
                .with_name("Memory usage")
                .with_unit("%")
                .with_state_class("measurement"),
            SystemMetric::MemoryUsed => metric
                .with_name("Memory used")
                .with_device_class("data_size")
                .with_unit("MiB")
                .with_state_class("measurement"),
            SystemMetric::Uptime => metric
                .with_name("Uptime")
                .with_device_class("duration")
                .with_unit("s")
                .with_state_class("total_increasing"),
            SystemMetric::LoadAverage => metric
                .with_name("Load average (1m)")
                .with_state_class("measurement"),
        }
    }
}

/// Resolve configured keys, skipping (and logging) unknown ones
pub fn enabled_metrics(keys: &[String], device: &Arc<Device>) -> Vec<AgentMetric> {
    keys.iter()
        .filter_map(|key| match SystemMetric::from_key(key) {
            Some(kind) => Some(AgentMetric {
                kind,
                metric: kind.describe(device.clone()),
            }),
            None => {
                warn!("Unknown metric '{}' in config, skipped", key);
                None
            }
        })
        .collect()
}

/// A published metric together with what it measures
#[derive(Debug)]
pub struct AgentMetric {
    pub kind: SystemMetric,
    pub metric: Metric,
}

/// Value sent on a state topic
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reading {
    Float(f64),
    Count(u64),
}

/// One snapshot of the host
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub memory_used_mb: u64,
    pub uptime_seconds: u64,
    pub load_one: f64,
}

impl Sample {
    pub fn reading(&self, metric: SystemMetric) -> Reading {
        match metric {
            SystemMetric::CpuPercent => Reading::Float(round1(self.cpu_percent as f64)),
            SystemMetric::MemoryPercent => Reading::Float(round1(self.memory_percent as f64)),
            SystemMetric::MemoryUsed => Reading::Count(self.memory_used_mb),
            SystemMetric::Uptime => Reading::Count(self.uptime_seconds),
            SystemMetric::LoadAverage => Reading::Float((self.load_one * 100.0).round() / 100.0),
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Keeps a `System` between samples so CPU usage is measured over the interval
pub struct SystemSampler {
    sys: System,
}

impl SystemSampler {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();
        Self { sys }
    }

    pub fn sample(&mut self) -> Sample {
        self.sys.refresh_cpu();
        self.sys.refresh_memory();

        let total = self.sys.total_memory();
        let used = self.sys.used_memory();
        let memory_percent = if total > 0 {
            (used as f32 / total as f32) * 100.0
        } else {
            0.0
        };

        // Load averages are Unix-only, 0 elsewhere
        let load_one = if cfg!(unix) { System::load_average().one } else { 0.0 };

        Sample {
            cpu_percent: self.sys.global_cpu_info().cpu_usage(),
            memory_percent,
            memory_used_mb: used / (1024 * 1024),
            uptime_seconds: System::uptime(),
            load_one,
        }
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Publish `sample` for every metric. Failures are logged and counted,
/// the remaining metrics are still published.
pub async fn publish_sample<T>(metrics: &[AgentMetric], transport: &T, sample: &Sample) -> usize
where
    T: Transport + Sync,
{
    let mut failures = 0;
    for entry in metrics {
        let reading = sample.reading(entry.kind);
        match entry.metric.publish(transport, &reading).await {
            Ok(()) => debug!("Published {} = {:?}", entry.kind.key(), reading),
            Err(e) => {
                failures += 1;
                warn!("Failed to publish {}: {}", entry.kind.key(), e);
            }
        }
    }
    failures
}

/// [`publish_sample`] bounded by `limit`. `None` when the pass was cut short;
/// metrics not reached keep their state and are retried on the next pass.
pub async fn publish_sample_within<T>(
    metrics: &[AgentMetric],
    transport: &T,
    sample: &Sample,
    limit: Duration,
) -> Option<usize>
where
    T: Transport + Sync,
{
    tokio::time::timeout(limit, publish_sample(metrics, transport, sample))
        .await
        .ok()
}
