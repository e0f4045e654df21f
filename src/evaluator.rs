use crate::config::{Rule, Severity};
use crate::debounce::{DebouncePhase, DebounceTracker};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-orientation coverage facts. An orientation that was never
/// inspected cannot be judged absent, only not-yet-checked, so absence
/// rules stay dormant until `seen` and `closed` both hold.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrientationCoverage {
    /// At least one event has been observed for this orientation.
    pub seen: bool,
    /// The inspection window for this orientation has been closed.
    pub closed: bool,
    pub last_event_at: Option<DateTime<Utc>>,
    /// Coverage and tracker state captured at the instant the window
    /// closed. Absence rules are judged against this, so events arriving
    /// after the close can neither arm nor disarm them.
    pub at_close: Option<CloseSnapshot>,
}

/// Frozen view of one orientation taken when its window closes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloseSnapshot {
    pub seen: bool,
    /// Debounce state per flaw type as of the close.
    pub trackers: HashMap<String, DebounceTracker>,
}

/// Outcome of one rule against the current tracker/coverage state.
/// Recomputed on every evaluation pass, never stored independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub rule: Rule,
    pub triggered: bool,
    pub severity: Severity,
}

/// One full evaluation pass over the rule set.
#[derive(Debug, Clone, Default)]
pub struct EvaluationSnapshot {
    pub outcomes: Vec<RuleOutcome>,
}

impl EvaluationSnapshot {
    pub fn triggered_fails(&self) -> Vec<Rule> {
        self.triggered(Severity::Fail)
    }

    pub fn triggered_alerts(&self) -> Vec<Rule> {
        self.triggered(Severity::Alert)
    }

    fn triggered(&self, severity: Severity) -> Vec<Rule> {
        self.outcomes
            .iter()
            .filter(|o| o.triggered && o.severity == severity)
            .map(|o| o.rule.clone())
            .collect()
    }

    /// Any triggered Fail-severity rule forces the composite result to
    /// FAILED; alerts never do.
    pub fn has_failures(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.triggered && o.severity == Severity::Fail)
    }
}

/// Applies the active rule set against confirmed detection state and
/// orientation-absence facts. Every rule is evaluated independently,
/// with no first-match short-circuit, so the verdict carries complete
/// evidence when several rules trigger at once.
pub struct RuleEvaluator {
    rules: Vec<Rule>,
}

impl RuleEvaluator {
    pub fn new(rules: Vec<Rule>) -> Self {
        RuleEvaluator { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn evaluate(
        &self,
        trackers: &HashMap<(String, String), DebounceTracker>,
        coverage: &HashMap<String, OrientationCoverage>,
    ) -> EvaluationSnapshot {
        let outcomes = self
            .rules
            .iter()
            .map(|rule| {
                let triggered = self.rule_triggered(rule, trackers, coverage);
                if triggered {
                    log::info!("rule triggered: {}", rule.describe());
                }
                RuleOutcome {
                    rule: rule.clone(),
                    triggered,
                    severity: rule.severity(),
                }
            })
            .collect();
        EvaluationSnapshot { outcomes }
    }

    fn rule_triggered(
        &self,
        rule: &Rule,
        trackers: &HashMap<(String, String), DebounceTracker>,
        coverage: &HashMap<String, OrientationCoverage>,
    ) -> bool {
        if rule.kind.is_absence() {
            // Absence is decided by the state the orientation was in
            // when its window closed, not by whatever came later.
            let Some(at_close) = coverage
                .get(&rule.orientation)
                .and_then(|cov| cov.at_close.as_ref())
            else {
                return false;
            };
            if !at_close.seen {
                return false;
            }
            // Absent means the pair never held a confirmed streak, even
            // one that was later revoked.
            !at_close
                .trackers
                .get(&rule.flaw_type)
                .is_some_and(|t| t.ever_confirmed(rule.stability_seconds))
        } else {
            let key = (rule.orientation.clone(), rule.flaw_type.clone());
            trackers
                .get(&key)
                .is_some_and(|t| t.phase_at(rule.stability_seconds) == DebouncePhase::Confirmed)
        }
    }
}
