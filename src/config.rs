use serde::{Deserialize, Serialize};

/// Default stability window, matching the factory-floor device defaults.
pub const DEFAULT_STABILITY_SECONDS: f64 = 3.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionConfig {
    /// Ordered list of orientations that must be closed before a verdict
    /// is legal, e.g. ["Front", "Back", "Inside-Out Back"].
    pub orientations_required: Vec<String>,
    pub rules: Vec<Rule>,
}

/// One configured quality criterion. Immutable once a session is built
/// from it. Several rules may target the same (orientation, flaw_type)
/// pair, e.g. an Alert at 1s and a Fail at 3s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub orientation: String,
    pub flaw_type: String,
    pub kind: RuleKind,
    #[serde(default = "default_stability")]
    pub stability_seconds: f64,
}

fn default_stability() -> f64 {
    DEFAULT_STABILITY_SECONDS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RuleKind {
    /// Fail the item if the flaw is confirmed present on the orientation.
    FailIfPresent,
    /// Raise a non-fatal alert if the flaw is confirmed present.
    AlertIfPresent,
    /// Fail the item if the orientation was inspected and closed without
    /// the flaw type ever being confirmed (e.g. a required label).
    FailIfAbsent,
    /// Alert if the orientation closed without the flaw type confirmed.
    AlertIfAbsent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Fail,
    Alert,
}

impl RuleKind {
    pub fn severity(&self) -> Severity {
        match self {
            RuleKind::FailIfPresent | RuleKind::FailIfAbsent => Severity::Fail,
            RuleKind::AlertIfPresent | RuleKind::AlertIfAbsent => Severity::Alert,
        }
    }

    /// Absence rules trigger on a closed orientation that never
    /// confirmed the flaw; presence rules on a currently confirmed one.
    pub fn is_absence(&self) -> bool {
        matches!(self, RuleKind::FailIfAbsent | RuleKind::AlertIfAbsent)
    }
}

impl Rule {
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    /// Short human-readable tag used in log lines.
    pub fn describe(&self) -> String {
        format!(
            "{:?}({}, {}, {}s)",
            self.kind, self.orientation, self.flaw_type, self.stability_seconds
        )
    }
}

impl Default for InspectionConfig {
    fn default() -> Self {
        InspectionConfig {
            orientations_required: vec!["Front".to_string(), "Back".to_string()],
            rules: vec![
                Rule {
                    orientation: "Back".to_string(),
                    flaw_type: "NGO".to_string(),
                    kind: RuleKind::FailIfPresent,
                    stability_seconds: DEFAULT_STABILITY_SECONDS,
                },
                Rule {
                    orientation: "Back".to_string(),
                    flaw_type: "Loose Thread".to_string(),
                    kind: RuleKind::AlertIfPresent,
                    stability_seconds: 1.0,
                },
                Rule {
                    orientation: "Front".to_string(),
                    flaw_type: "Label".to_string(),
                    kind: RuleKind::FailIfAbsent,
                    stability_seconds: 0.0,
                },
            ],
        }
    }
}

impl InspectionConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: InspectionConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.orientations_required.is_empty() {
            anyhow::bail!("at least one required orientation must be configured");
        }
        for rule in &self.rules {
            if rule.orientation.trim().is_empty() {
                anyhow::bail!("rule has an empty orientation");
            }
            if rule.flaw_type.trim().is_empty() {
                anyhow::bail!("rule has an empty flaw type");
            }
            if !rule.stability_seconds.is_finite() || rule.stability_seconds < 0.0 {
                anyhow::bail!(
                    "rule {} has invalid stability_seconds {}",
                    rule.describe(),
                    rule.stability_seconds
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = InspectionConfig::default();
        config.validate().unwrap();
        assert!(!config.rules.is_empty());
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(RuleKind::FailIfPresent.severity(), Severity::Fail);
        assert_eq!(RuleKind::FailIfAbsent.severity(), Severity::Fail);
        assert_eq!(RuleKind::AlertIfPresent.severity(), Severity::Alert);
        assert_eq!(RuleKind::AlertIfAbsent.severity(), Severity::Alert);
    }

    #[test]
    fn test_negative_stability_rejected() {
        let config = InspectionConfig {
            orientations_required: vec!["Front".to_string()],
            rules: vec![Rule {
                orientation: "Front".to_string(),
                flaw_type: "NGO".to_string(),
                kind: RuleKind::FailIfPresent,
                stability_seconds: -1.0,
            }],
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_round_trip_uses_tagged_kind() {
        let yaml = serde_yaml::to_string(&InspectionConfig::default()).unwrap();
        assert!(yaml.contains("type: FailIfPresent"));
        let parsed: InspectionConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.rules.len(), InspectionConfig::default().rules.len());
    }

    #[test]
    fn test_missing_stability_defaults_to_three_seconds() {
        let yaml = r#"
orientations_required: ["Back"]
rules:
  - orientation: Back
    flaw_type: NGO
    kind:
      type: FailIfPresent
"#;
        let parsed: InspectionConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.rules[0].stability_seconds, 3.0);
    }
}
