//! Per-device aggregate state and the derived availability metrics.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::duration::format_duration;

/// Running aggregate for a single device.
///
/// One instance exists per known device identifier. It is created once
/// (bootstrap or first auto-create access), never deleted, and mutated in
/// place under the store's exclusive lock for the life of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStats {
    pub id: String,
    /// Earliest heartbeat timestamp ever observed; `None` until the first
    /// heartbeat arrives.
    pub first_heartbeat: Option<DateTime<Utc>>,
    /// Latest heartbeat timestamp ever observed; `None` until the first
    /// heartbeat arrives.
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub heartbeat_count: i64,
    pub upload_count: i64,
    /// Accumulated upload duration in nanoseconds.
    pub upload_sum_ns: i64,
}

/// Derived point-in-time metrics for a device, shaped for serialization.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSummary {
    pub uptime: f64,
    pub avg_upload_time: String,
}

impl DeviceStats {
    /// A zero-valued aggregate for a freshly registered device.
    pub fn new(id: impl Into<String>) -> Self {
        DeviceStats {
            id: id.into(),
            first_heartbeat: None,
            last_heartbeat: None,
            heartbeat_count: 0,
            upload_count: 0,
            upload_sum_ns: 0,
        }
    }

    /// Record a heartbeat, widening the observation window with min/max
    /// semantics so out-of-order arrivals still land correctly.
    pub fn record_heartbeat(&mut self, sent_at: DateTime<Utc>) {
        match self.first_heartbeat {
            Some(first) if sent_at >= first => {}
            _ => self.first_heartbeat = Some(sent_at),
        }
        match self.last_heartbeat {
            Some(last) if sent_at <= last => {}
            _ => self.last_heartbeat = Some(sent_at),
        }
        self.heartbeat_count += 1;
    }

    /// Record an upload report. Negative durations are rejected at the HTTP
    /// boundary before they can reach this method.
    pub fn record_upload(&mut self, duration_ns: i64) {
        self.upload_count += 1;
        self.upload_sum_ns += duration_ns;
    }

    /// Heartbeat density over the observed window, as a percentage.
    ///
    /// The window is `last_heartbeat - first_heartbeat` in minutes; a
    /// non-positive window (all heartbeats coincide) counts as exactly one
    /// minute. The result is `(count / minutes) * 100` and legitimately
    /// exceeds 100 when heartbeats arrive more than once per minute.
    pub fn uptime_percent(&self) -> f64 {
        if self.heartbeat_count == 0 {
            return 0.0;
        }
        let (Some(first), Some(last)) = (self.first_heartbeat, self.last_heartbeat) else {
            return 0.0;
        };
        let mut window_minutes = (last - first).num_milliseconds() as f64 / 60_000.0;
        if window_minutes <= 0.0 {
            window_minutes = 1.0;
        }
        (self.heartbeat_count as f64 / window_minutes) * 100.0
    }

    /// Average upload duration, truncated by integer division.
    ///
    /// Zero when no uploads have been reported. A negative computed average
    /// means inconsistent internal state and clamps to zero.
    pub fn avg_upload_duration(&self) -> Duration {
        if self.upload_count == 0 {
            return Duration::zero();
        }
        let avg_ns = self.upload_sum_ns / self.upload_count;
        if avg_ns < 0 {
            return Duration::zero();
        }
        Duration::nanoseconds(avg_ns)
    }

    /// Shape the derived metrics for the query path.
    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            uptime: self.uptime_percent(),
            avg_upload_time: format_duration(self.avg_upload_duration()),
        }
    }
}
