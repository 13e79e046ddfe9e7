//! Metrics collection and export for keyed pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Metrics data for a keyed pool
///
/// # Examples
///
/// ```
/// use keyed_objectpool::KeyedObjectPool;
///
/// let pool = KeyedObjectPool::new();
///
/// let obj = pool.check_out("a", || 1);
/// pool.check_in("a", obj);
/// let _again = pool.check_out("a", || 2);
///
/// let metrics = pool.get_metrics();
/// assert_eq!(metrics.total_checked_out, 2);
/// assert_eq!(metrics.reused, 1);
/// assert_eq!(metrics.allocated, 1);
/// assert_eq!(metrics.idle_objects, 0);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolMetrics {
    /// Total successful check-outs
    pub total_checked_out: usize,

    /// Check-outs served from a bucket
    pub reused: usize,

    /// Check-outs that had to call the allocator
    pub allocated: usize,

    /// Fallible allocators that returned an error
    pub allocation_failures: usize,

    /// Total objects checked in
    pub total_checked_in: usize,

    /// Objects currently idle across all buckets
    pub idle_objects: usize,

    /// Number of keys that have a bucket
    pub keys: usize,

    /// Share of check-outs served from a bucket (0.0 to 1.0)
    pub reuse_ratio: f64,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_checked_out".to_string(), self.total_checked_out.to_string());
        metrics.insert("reused".to_string(), self.reused.to_string());
        metrics.insert("allocated".to_string(), self.allocated.to_string());
        metrics.insert("allocation_failures".to_string(), self.allocation_failures.to_string());
        metrics.insert("total_checked_in".to_string(), self.total_checked_in.to_string());
        metrics.insert("idle_objects".to_string(), self.idle_objects.to_string());
        metrics.insert("keys".to_string(), self.keys.to_string());
        metrics.insert("reuse_ratio".to_string(), format!("{:.2}", self.reuse_ratio));
        metrics
    }
}

/// Metrics exporter for Prometheus format
pub struct MetricsExporter;

impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use keyed_objectpool::KeyedObjectPool;
    /// use std::collections::HashMap;
    ///
    /// let pool: KeyedObjectPool<&str, u32> = KeyedObjectPool::new();
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = pool.export_metrics_prometheus(Some(&tags));
    /// assert!(output.contains("keyed_objectpool_objects_idle"));
    /// assert!(output.contains("pool=\"default\""));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        let mut output = String::new();
        let labels = Self::format_labels(pool_name, tags);

        // Gauge metrics
        output.push_str("# HELP keyed_objectpool_objects_idle Objects currently idle in buckets\n");
        output.push_str("# TYPE keyed_objectpool_objects_idle gauge\n");
        output.push_str(&format!("keyed_objectpool_objects_idle{{{}}} {}\n", labels, metrics.idle_objects));

        output.push_str("# HELP keyed_objectpool_keys Keys with a bucket\n");
        output.push_str("# TYPE keyed_objectpool_keys gauge\n");
        output.push_str(&format!("keyed_objectpool_keys{{{}}} {}\n", labels, metrics.keys));

        output.push_str("# HELP keyed_objectpool_reuse_ratio Share of check-outs served from a bucket\n");
        output.push_str("# TYPE keyed_objectpool_reuse_ratio gauge\n");
        output.push_str(&format!("keyed_objectpool_reuse_ratio{{{}}} {:.2}\n", labels, metrics.reuse_ratio));

        // Counter metrics
        output.push_str("# HELP keyed_objectpool_checked_out_total Total check-outs\n");
        output.push_str("# TYPE keyed_objectpool_checked_out_total counter\n");
        output.push_str(&format!("keyed_objectpool_checked_out_total{{{}}} {}\n", labels, metrics.total_checked_out));

        output.push_str("# HELP keyed_objectpool_reused_total Check-outs served from a bucket\n");
        output.push_str("# TYPE keyed_objectpool_reused_total counter\n");
        output.push_str(&format!("keyed_objectpool_reused_total{{{}}} {}\n", labels, metrics.reused));

        output.push_str("# HELP keyed_objectpool_allocated_total Objects built by an allocator\n");
        output.push_str("# TYPE keyed_objectpool_allocated_total counter\n");
        output.push_str(&format!("keyed_objectpool_allocated_total{{{}}} {}\n", labels, metrics.allocated));

        output.push_str("# HELP keyed_objectpool_allocation_failures_total Allocator failures\n");
        output.push_str("# TYPE keyed_objectpool_allocation_failures_total counter\n");
        output.push_str(&format!("keyed_objectpool_allocation_failures_total{{{}}} {}\n", labels, metrics.allocation_failures));

        output.push_str("# HELP keyed_objectpool_checked_in_total Total check-ins\n");
        output.push_str("# TYPE keyed_objectpool_checked_in_total counter\n");
        output.push_str(&format!("keyed_objectpool_checked_in_total{{{}}} {}\n", labels, metrics.total_checked_in));

        output
    }

    fn format_labels(pool_name: &str, tags: Option<&HashMap<String, String>>) -> String {
        let mut labels = vec![format!("pool=\"{}\"", Self::escape_label_value(pool_name))];

        if let Some(tags) = tags {
            let mut sorted: Vec<_> = tags.iter().collect();
            sorted.sort();
            for (key, value) in sorted {
                labels.push(format!("{}=\"{}\"", key, Self::escape_label_value(value)));
            }
        }

        labels.join(",")
    }

    /// Escape `\`, `"` and newlines as the exposition format requires
    fn escape_label_value(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len());
        for c in value.chars() {
            match c {
                '\\' => escaped.push_str("\\\\"),
                '"' => escaped.push_str("\\\""),
                '\n' => escaped.push_str("\\n"),
                _ => escaped.push(c),
            }
        }
        escaped
    }
}

/// Internal metrics tracker
#[derive(Debug, Default)]
pub(crate) struct MetricsTracker {
    pub reused: AtomicUsize,
    pub allocated: AtomicUsize,
    pub allocation_failures: AtomicUsize,
    pub total_checked_in: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_metrics(&self, idle: usize, keys: usize) -> PoolMetrics {
        let reused = self.reused.load(Ordering::Relaxed);
        let allocated = self.allocated.load(Ordering::Relaxed);
        let total_checked_out = reused + allocated;

        let reuse_ratio = if total_checked_out > 0 {
            reused as f64 / total_checked_out as f64
        } else {
            0.0
        };

        PoolMetrics {
            total_checked_out,
            reused,
            allocated,
            allocation_failures: self.allocation_failures.load(Ordering::Relaxed),
            total_checked_in: self.total_checked_in.load(Ordering::Relaxed),
            idle_objects: idle,
            keys,
            reuse_ratio,
        }
    }
}
