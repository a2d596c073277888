use crate::types::Stage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// FollowUpRule / FollowUpRules
// ---------------------------------------------------------------------------

/// A follow-up reminder rule attached to a pipeline stage: entering the stage
/// schedules a reminder `delay_days` out with the given reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpRule {
    pub delay_days: u32,
    pub reason: String,
}

/// Stage → follow-up rule table. Stages absent from the table schedule
/// nothing. Built once at startup and passed into the engine; never mutated
/// at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FollowUpRules(HashMap<Stage, FollowUpRule>);

impl Default for FollowUpRules {
    fn default() -> Self {
        default_rules()
    }
}

impl FollowUpRules {
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    pub fn rule_for(&self, stage: Stage) -> Option<&FollowUpRule> {
        self.0.get(&stage)
    }

    pub fn insert(&mut self, stage: Stage, rule: FollowUpRule) {
        self.0.insert(stage, rule);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Stage, &FollowUpRule)> + '_ {
        self.0.iter()
    }
}

pub fn default_rules() -> FollowUpRules {
    let mut rules = FollowUpRules::empty();
    let table: &[(Stage, u32, &str)] = &[
        (Stage::Contacted, 3, "Follow up after initial contact"),
        (
            Stage::DiscoveryCompleted,
            2,
            "Send proposal after discovery call",
        ),
        (Stage::ProposalSent, 5, "Check in on proposal"),
        (Stage::Negotiation, 4, "Nudge negotiation forward"),
        (
            Stage::ProjectDelivered,
            14,
            "Request testimonial and referral",
        ),
        (Stage::Retention, 90, "Quarterly retention check-in"),
    ];
    for (stage, delay_days, reason) in table {
        rules.insert(
            *stage,
            FollowUpRule {
                delay_days: *delay_days,
                reason: (*reason).to_string(),
            },
        );
    }
    rules
}

// ---------------------------------------------------------------------------
// Entry hooks
// ---------------------------------------------------------------------------

/// An extra write applied in the same transaction as a stage change. New
/// per-stage effects belong here, not in the engine's guard path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryHook {
    /// Stamp `last_contacted_at` on the lead.
    StampLastContacted,
}

/// Per-stage entry hook table.
pub fn hooks_for(stage: Stage) -> &'static [EntryHook] {
    match stage {
        Stage::Contacted => &[EntryHook::StampLastContacted],
        _ => &[],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_cover_expected_stages() {
        let rules = default_rules();
        let contacted = rules.rule_for(Stage::Contacted).unwrap();
        assert_eq!(contacted.delay_days, 3);
        assert_eq!(contacted.reason, "Follow up after initial contact");

        assert!(rules.rule_for(Stage::NewLead).is_none());
        assert!(rules.rule_for(Stage::DiscoveryScheduled).is_none());
        assert!(rules.rule_for(Stage::ContractSigned).is_none());
        assert!(rules.rule_for(Stage::ActiveClient).is_none());
    }

    #[test]
    fn rules_yaml_roundtrip() {
        let rules = default_rules();
        let yaml = serde_yaml::to_string(&rules).unwrap();
        assert!(yaml.contains("contacted"));
        assert!(yaml.contains("Follow up after initial contact"));
        let parsed: FollowUpRules = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.len(), rules.len());
        assert_eq!(
            parsed.rule_for(Stage::Retention),
            rules.rule_for(Stage::Retention)
        );
    }

    #[test]
    fn rules_parse_from_yaml_map() {
        let yaml = "contacted:\n  delay_days: 1\n  reason: Call back\n";
        let rules: FollowUpRules = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.rule_for(Stage::Contacted).unwrap().delay_days, 1);
    }

    #[test]
    fn contacted_stamps_last_contact() {
        assert_eq!(
            hooks_for(Stage::Contacted),
            &[EntryHook::StampLastContacted]
        );
        assert!(hooks_for(Stage::NewLead).is_empty());
        assert!(hooks_for(Stage::Retention).is_empty());
    }
}
