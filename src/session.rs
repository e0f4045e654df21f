use crate::config::InspectionConfig;
use crate::debounce::DebounceTracker;
use crate::error::EngineError;
use crate::evaluator::{CloseSnapshot, EvaluationSnapshot, OrientationCoverage, RuleEvaluator};
use crate::verdict::{Verdict, VerdictStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// One observation tick from the upstream detector: the flaw is either
/// currently seen or currently not seen on that orientation, at that
/// instant. Ticks for a given (orientation, flaw_type) pair must arrive
/// in non-decreasing timestamp order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlawEvent {
    pub orientation: String,
    pub flaw_type: String,
    pub timestamp: DateTime<Utc>,
    pub present: bool,
}

/// One item's pass through its required orientations.
///
/// Owns the debounce trackers and the running rule-outcome snapshot.
/// Lifecycle is OPEN → SEALED: `finalize` seals the session and yields
/// the verdict; every mutating call after that is rejected. A session
/// is exclusively owned by the single task inspecting the item. Rule
/// sets are injected at construction, never read from shared state, so
/// sessions for different items run fully in parallel.
pub struct InspectionSession {
    required_orientations: BTreeSet<String>,
    known_orientations: HashSet<String>,
    known_flaw_types: HashSet<String>,
    evaluator: RuleEvaluator,
    trackers: HashMap<(String, String), DebounceTracker>,
    coverage: HashMap<String, OrientationCoverage>,
    snapshot: EvaluationSnapshot,
    sealed: bool,
}

impl InspectionSession {
    pub fn new(config: InspectionConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let required_orientations: BTreeSet<String> =
            config.orientations_required.iter().cloned().collect();
        let mut known_orientations: HashSet<String> = required_orientations.iter().cloned().collect();
        let mut known_flaw_types = HashSet::new();
        for rule in &config.rules {
            known_orientations.insert(rule.orientation.clone());
            known_flaw_types.insert(rule.flaw_type.clone());
        }

        let coverage = known_orientations
            .iter()
            .map(|o| (o.clone(), OrientationCoverage::default()))
            .collect();

        let mut session = InspectionSession {
            required_orientations,
            known_orientations,
            known_flaw_types,
            evaluator: RuleEvaluator::new(config.rules),
            trackers: HashMap::new(),
            coverage,
            snapshot: EvaluationSnapshot::default(),
            sealed: false,
        };
        // Snapshot starts with every rule enumerated and untriggered
        // rather than empty.
        session.reevaluate();
        Ok(session)
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Running rule-outcome snapshot as of the last mutation.
    pub fn outcomes(&self) -> &EvaluationSnapshot {
        &self.snapshot
    }

    /// Feed one detector tick into the matching debounce tracker and
    /// refresh the outcome snapshot. Rejected events leave the session
    /// unchanged.
    pub fn record_event(&mut self, event: &FlawEvent) -> Result<(), EngineError> {
        if self.sealed {
            return Err(EngineError::SessionAlreadySealed);
        }
        if !self.known_orientations.contains(&event.orientation) {
            return Err(EngineError::UnknownOrientation(event.orientation.clone()));
        }
        if !self.known_flaw_types.contains(&event.flaw_type) {
            return Err(EngineError::UnknownFlawType(event.flaw_type.clone()));
        }

        let key = (event.orientation.clone(), event.flaw_type.clone());
        if let Some(last) = self.trackers.get(&key).and_then(|t| t.last_event_at()) {
            // Equal timestamps are fine; only a step backwards violates
            // the delivery contract.
            if event.timestamp < last {
                return Err(EngineError::OutOfOrderEvent {
                    orientation: event.orientation.clone(),
                    flaw_type: event.flaw_type.clone(),
                    timestamp: event.timestamp,
                    last_seen: last,
                });
            }
        }

        self.trackers
            .entry(key)
            .or_default()
            .observe(event.timestamp, event.present);

        let cov = self.coverage.entry(event.orientation.clone()).or_default();
        cov.seen = true;
        cov.last_event_at = Some(event.timestamp);

        log::debug!(
            "event recorded: {} {} present={} at {}",
            event.orientation,
            event.flaw_type,
            event.present,
            event.timestamp
        );
        self.reevaluate();
        Ok(())
    }

    /// Close the inspection window for one orientation, arming any
    /// absence rules targeting it. Idempotent.
    pub fn close_orientation(&mut self, orientation: &str) -> Result<(), EngineError> {
        if self.sealed {
            return Err(EngineError::SessionAlreadySealed);
        }
        if !self.known_orientations.contains(orientation) {
            return Err(EngineError::UnknownOrientation(orientation.to_string()));
        }

        let trackers_at_close: HashMap<String, DebounceTracker> = self
            .trackers
            .iter()
            .filter(|((o, _), _)| o.as_str() == orientation)
            .map(|((_, flaw_type), tracker)| (flaw_type.clone(), tracker.clone()))
            .collect();

        let cov = self.coverage.entry(orientation.to_string()).or_default();
        if !cov.closed {
            cov.closed = true;
            cov.at_close = Some(CloseSnapshot {
                seen: cov.seen,
                trackers: trackers_at_close,
            });
            log::debug!("orientation closed: {orientation}");
        }
        self.reevaluate();
        Ok(())
    }

    /// Seal the session and compute the verdict. Every required
    /// orientation must have been closed first; an incomplete session
    /// stays OPEN with all tracker state intact so the caller can keep
    /// feeding events and retry.
    pub fn finalize(&mut self) -> Result<Verdict, EngineError> {
        if self.sealed {
            return Err(EngineError::SessionAlreadySealed);
        }

        let missing: Vec<String> = self
            .required_orientations
            .iter()
            .filter(|o| !self.coverage.get(*o).map(|c| c.closed).unwrap_or(false))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(EngineError::IncompleteInspection { missing });
        }

        self.sealed = true;
        self.reevaluate();

        let triggered_fails = self.snapshot.triggered_fails();
        let triggered_alerts = self.snapshot.triggered_alerts();
        let status = if triggered_fails.is_empty() {
            VerdictStatus::Passed
        } else {
            VerdictStatus::Failed
        };
        log::info!(
            "session finalized: {status:?} ({} fails, {} alerts)",
            triggered_fails.len(),
            triggered_alerts.len()
        );

        Ok(Verdict {
            status,
            triggered_fails,
            triggered_alerts,
            finalized_at: Utc::now(),
            override_audit: None,
        })
    }

    fn reevaluate(&mut self) {
        self.snapshot = self.evaluator.evaluate(&self.trackers, &self.coverage);
    }
}
