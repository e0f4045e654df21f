use crate::verdict::{Verdict, VerdictStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// In-memory aggregation over finalized verdicts: pass rate and
/// flaw-type frequency for the reporting layer. Persistence of the
/// underlying rows is the host's concern; this only consumes verdicts.
#[derive(Debug)]
pub struct VerdictAggregator {
    passed: u64,
    failed: u64,
    overridden: u64,
    flaw_counts: HashMap<String, u64>,
    started_at: DateTime<Utc>,
    last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlawFrequency {
    pub flaw_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_items: u64,
    pub passed: u64,
    pub failed: u64,
    pub overridden: u64,
    pub pass_rate: f64,
    pub flaw_frequency: Vec<FlawFrequency>,
    pub started_at: DateTime<Utc>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for VerdictAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl VerdictAggregator {
    pub fn new() -> Self {
        VerdictAggregator {
            passed: 0,
            failed: 0,
            overridden: 0,
            flaw_counts: HashMap::new(),
            started_at: Utc::now(),
            last_updated: None,
        }
    }

    /// Fold one finalized verdict into the running totals. Triggered
    /// fail rules are counted per flaw type; alerts are advisory and do
    /// not feed the frequency ranking.
    pub fn record_verdict(&mut self, verdict: &Verdict) {
        match verdict.status {
            VerdictStatus::Passed => self.passed += 1,
            VerdictStatus::Failed => self.failed += 1,
            VerdictStatus::Overridden => self.overridden += 1,
        }
        for rule in &verdict.triggered_fails {
            *self.flaw_counts.entry(rule.flaw_type.clone()).or_insert(0) += 1;
        }
        self.last_updated = Some(Utc::now());
    }

    pub fn total_items(&self) -> u64 {
        self.passed + self.failed + self.overridden
    }

    /// Percentage of items that shipped: passed plus overridden, the
    /// same bucket production reporting uses for completed work.
    pub fn pass_rate(&self) -> f64 {
        let total = self.total_items();
        if total == 0 {
            return 0.0;
        }
        (self.passed + self.overridden) as f64 / total as f64 * 100.0
    }

    /// Flaw types ranked by fail count, most frequent first; ties break
    /// alphabetically so reports are stable.
    pub fn flaw_frequency(&self) -> Vec<FlawFrequency> {
        let mut ranked: Vec<FlawFrequency> = self
            .flaw_counts
            .iter()
            .map(|(flaw_type, count)| FlawFrequency {
                flaw_type: flaw_type.clone(),
                count: *count,
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then(a.flaw_type.cmp(&b.flaw_type)));
        ranked
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            total_items: self.total_items(),
            passed: self.passed,
            failed: self.failed,
            overridden: self.overridden,
            pass_rate: self.pass_rate(),
            flaw_frequency: self.flaw_frequency(),
            started_at: self.started_at,
            last_updated: self.last_updated,
        }
    }
}
