use crate::config::Rule;
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supervisor user id, as issued by the account system.
pub type SupervisorId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerdictStatus {
    Passed,
    Failed,
    /// A supervisor manually cleared a failed item. Reachable only from
    /// `Failed`, never produced by finalization.
    Overridden,
}

/// Audit trail attached when a supervisor overrides a failed verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideAudit {
    pub reason: String,
    pub actor: SupervisorId,
    pub timestamp: DateTime<Utc>,
}

/// Final computed outcome for one inspected item. Immutable once
/// produced; an override yields a new verdict rather than mutating
/// this one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub triggered_fails: Vec<Rule>,
    pub triggered_alerts: Vec<Rule>,
    pub finalized_at: DateTime<Utc>,
    pub override_audit: Option<OverrideAudit>,
}

impl Verdict {
    /// Supervisor override of a failed verdict. Pure transformation: it
    /// does not re-run evaluation, and the triggered-rule evidence is
    /// carried over unchanged for audit.
    pub fn apply_override(
        &self,
        reason: &str,
        actor: SupervisorId,
    ) -> Result<Verdict, EngineError> {
        if self.status != VerdictStatus::Failed {
            log::warn!(
                "override rejected by supervisor {actor}: verdict status is {:?}",
                self.status
            );
            return Err(EngineError::InvalidOverride(self.status));
        }

        log::info!(
            "verdict overridden by supervisor {actor} ({} fail rules retained): {reason}",
            self.triggered_fails.len()
        );
        Ok(Verdict {
            status: VerdictStatus::Overridden,
            triggered_fails: self.triggered_fails.clone(),
            triggered_alerts: self.triggered_alerts.clone(),
            finalized_at: self.finalized_at,
            override_audit: Some(OverrideAudit {
                reason: reason.to_string(),
                actor,
                timestamp: Utc::now(),
            }),
        })
    }
}
