//! apo-quality
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The non-blocking quality monitor (§4.5): a bounded ring buffer of recent
//! [`QualityRecord`]s shared across all jobs, emitting [`Alert`]s on
//! threshold breaches or regression trends. Alerts are advisory — they are
//! logged and retained, and never fail a job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

/// Window size for the quality monitor's ring buffer (§4.5: `W=100`).
pub const WINDOW_SIZE: usize = 100;
/// `aeo_score` below which a record triggers a `critical` alert.
pub const CRITICAL_AEO_THRESHOLD: f64 = 50.0;
/// `aeo_score` below which a record triggers a `warning` alert.
pub const WARNING_AEO_THRESHOLD: f64 = 70.0;
/// `critical_issue_count` above which a record triggers a `warning` alert.
pub const CRITICAL_ISSUE_COUNT_THRESHOLD: u32 = 3;
/// Minimum point drop in the 10-vs-10 rolling mean to flag a regression.
pub const REGRESSION_DROP_THRESHOLD: f64 = 10.0;
/// Width of the rolling window compared for regression-trend detection.
const TREND_WINDOW: usize = 10;

/// One post-run metric snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityRecord {
    /// Job the record was computed for.
    pub job_id: Uuid,
    /// Composite 0-100 quality score.
    pub aeo_score: f64,
    /// Number of critical issues flagged by the scorer.
    pub critical_issue_count: u32,
    /// When the record was appended.
    pub timestamp: DateTime<Utc>,
}

/// Severity of a quality [`Alert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational note.
    Info,
    /// Worth attention but non-blocking.
    Warning,
    /// Serious quality breach, still non-blocking.
    Critical,
}

/// The condition that produced an [`Alert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// `aeo_score` below [`CRITICAL_AEO_THRESHOLD`].
    CriticalAeo,
    /// `aeo_score` below [`WARNING_AEO_THRESHOLD`].
    LowAeo,
    /// `critical_issue_count` above [`CRITICAL_ISSUE_COUNT_THRESHOLD`].
    TooManyCriticalIssues,
    /// Rolling mean AEO dropped by at least [`REGRESSION_DROP_THRESHOLD`]
    /// points versus the preceding window.
    RegressionTrend,
}

/// A quality violation notice. Non-blocking: logged and retained, never
/// fails a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Severity of the condition.
    pub severity: Severity,
    /// Which condition fired.
    pub kind: AlertKind,
    /// Human-readable description.
    pub message: String,
    /// Job the alert pertains to.
    pub job_id: Uuid,
    /// When the alert was emitted.
    pub timestamp: DateTime<Utc>,
}

/// Aggregate statistics over the current window (§4.5 `statistics()`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityStatistics {
    /// Mean `aeo_score` across the window.
    pub mean_aeo: f64,
    /// Fraction of records with `aeo_score < 70`.
    pub low_quality_rate: f64,
    /// Fraction of records with `aeo_score < 50`.
    pub critical_rate: f64,
    /// Number of alerts currently retained.
    pub recent_alert_count: usize,
}

impl Default for QualityStatistics {
    fn default() -> Self {
        Self {
            mean_aeo: 0.0,
            low_quality_rate: 0.0,
            critical_rate: 0.0,
            recent_alert_count: 0,
        }
    }
}

struct Inner {
    records: VecDeque<QualityRecord>,
    alerts: VecDeque<Alert>,
}

/// Process-scoped quality monitor, shared across all jobs and instantiated
/// once at engine construction (§9: "Global monitor singleton... acceptable
/// as a process-scoped service"). Access is serialized by a mutex around the
/// ring buffer.
#[derive(Clone)]
pub struct QualityMonitor {
    inner: Arc<Mutex<Inner>>,
    window: usize,
}

impl Default for QualityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl QualityMonitor {
    /// Create a monitor with the default window size ([`WINDOW_SIZE`]).
    #[must_use]
    pub fn new() -> Self {
        Self::with_window(WINDOW_SIZE)
    }

    /// Create a monitor with a custom ring-buffer window size.
    #[must_use]
    pub fn with_window(window: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                records: VecDeque::with_capacity(window),
                alerts: VecDeque::with_capacity(window),
            })),
            window,
        }
    }

    /// Record one post-run quality measurement and return the alerts it
    /// produced, if any. Appending the `window+1`-th record evicts the
    /// oldest (invariant 6: `|QualityMonitor.records| <= W`).
    pub fn record(&self, job_id: Uuid, aeo_score: f64, critical_issue_count: u32) -> Vec<Alert> {
        let timestamp = Utc::now();
        let record = QualityRecord {
            job_id,
            aeo_score,
            critical_issue_count,
            timestamp,
        };

        let mut guard = self.inner.lock().expect("quality monitor lock poisoned");

        let mut new_alerts = Vec::new();
        if aeo_score < CRITICAL_AEO_THRESHOLD {
            new_alerts.push(Alert {
                severity: Severity::Critical,
                kind: AlertKind::CriticalAeo,
                message: format!("aeo_score {aeo_score:.1} below critical threshold {CRITICAL_AEO_THRESHOLD}"),
                job_id,
                timestamp,
            });
        } else if aeo_score < WARNING_AEO_THRESHOLD {
            new_alerts.push(Alert {
                severity: Severity::Warning,
                kind: AlertKind::LowAeo,
                message: format!("aeo_score {aeo_score:.1} below warning threshold {WARNING_AEO_THRESHOLD}"),
                job_id,
                timestamp,
            });
        }

        if critical_issue_count > CRITICAL_ISSUE_COUNT_THRESHOLD {
            new_alerts.push(Alert {
                severity: Severity::Warning,
                kind: AlertKind::TooManyCriticalIssues,
                message: format!(
                    "{critical_issue_count} critical issues exceeds threshold {CRITICAL_ISSUE_COUNT_THRESHOLD}"
                ),
                job_id,
                timestamp,
            });
        }

        guard.records.push_back(record);
        if guard.records.len() > self.window {
            guard.records.pop_front();
        }

        if let Some(drop) = regression_drop(&guard.records) {
            if drop >= REGRESSION_DROP_THRESHOLD {
                new_alerts.push(Alert {
                    severity: Severity::Warning,
                    kind: AlertKind::RegressionTrend,
                    message: format!("rolling mean AEO dropped by {drop:.1} points"),
                    job_id,
                    timestamp,
                });
            }
        }

        for alert in &new_alerts {
            match alert.severity {
                Severity::Critical => warn!(job_id = %alert.job_id, kind = ?alert.kind, "{}", alert.message),
                Severity::Warning => warn!(job_id = %alert.job_id, kind = ?alert.kind, "{}", alert.message),
                Severity::Info => info!(job_id = %alert.job_id, kind = ?alert.kind, "{}", alert.message),
            }
            guard.alerts.push_back(alert.clone());
            if guard.alerts.len() > self.window {
                guard.alerts.pop_front();
            }
        }

        new_alerts
    }

    /// Number of records currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("quality monitor lock poisoned").records.len()
    }

    /// `true` if no records have been retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all retained alerts, oldest first.
    #[must_use]
    pub fn alerts(&self) -> Vec<Alert> {
        self.inner
            .lock()
            .expect("quality monitor lock poisoned")
            .alerts
            .iter()
            .cloned()
            .collect()
    }

    /// Compute aggregate statistics over the current window.
    #[must_use]
    pub fn statistics(&self) -> QualityStatistics {
        let guard = self.inner.lock().expect("quality monitor lock poisoned");
        if guard.records.is_empty() {
            return QualityStatistics {
                recent_alert_count: guard.alerts.len(),
                ..QualityStatistics::default()
            };
        }
        let count = guard.records.len() as f64;
        let sum: f64 = guard.records.iter().map(|r| r.aeo_score).sum();
        let low = guard
            .records
            .iter()
            .filter(|r| r.aeo_score < WARNING_AEO_THRESHOLD)
            .count() as f64;
        let critical = guard
            .records
            .iter()
            .filter(|r| r.aeo_score < CRITICAL_AEO_THRESHOLD)
            .count() as f64;
        QualityStatistics {
            mean_aeo: sum / count,
            low_quality_rate: low / count,
            critical_rate: critical / count,
            recent_alert_count: guard.alerts.len(),
        }
    }

    /// Clear all records and alerts. Exposed for tests.
    pub fn clear(&self) {
        let mut guard = self.inner.lock().expect("quality monitor lock poisoned");
        guard.records.clear();
        guard.alerts.clear();
    }
}

/// Compare the mean of the last [`TREND_WINDOW`] records against the mean of
/// the preceding [`TREND_WINDOW`]; returns the point drop if the buffer holds
/// at least `2 * TREND_WINDOW` records.
fn regression_drop(records: &VecDeque<QualityRecord>) -> Option<f64> {
    if records.len() < TREND_WINDOW * 2 {
        return None;
    }
    let len = records.len();
    let recent: f64 = records
        .iter()
        .skip(len - TREND_WINDOW)
        .map(|r| r.aeo_score)
        .sum::<f64>()
        / TREND_WINDOW as f64;
    let preceding: f64 = records
        .iter()
        .skip(len - TREND_WINDOW * 2)
        .take(TREND_WINDOW)
        .map(|r| r.aeo_score)
        .sum::<f64>()
        / TREND_WINDOW as f64;
    Some(preceding - recent)
}
