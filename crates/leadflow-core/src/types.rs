use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// A pipeline stage. Variant order is the pipeline order; `Ord` is derived so
/// enum position is the sole ordering key for forward/backward comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    NewLead,
    Contacted,
    DiscoveryScheduled,
    DiscoveryCompleted,
    ProposalSent,
    Negotiation,
    ContractSigned,
    ActiveClient,
    ProjectDelivered,
    Retention,
}

impl Stage {
    pub fn all() -> &'static [Stage] {
        &[
            Stage::NewLead,
            Stage::Contacted,
            Stage::DiscoveryScheduled,
            Stage::DiscoveryCompleted,
            Stage::ProposalSent,
            Stage::Negotiation,
            Stage::ContractSigned,
            Stage::ActiveClient,
            Stage::ProjectDelivered,
            Stage::Retention,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Stage> {
        let all = Stage::all();
        let i = self.index();
        all.get(i + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::NewLead => "new_lead",
            Stage::Contacted => "contacted",
            Stage::DiscoveryScheduled => "discovery_scheduled",
            Stage::DiscoveryCompleted => "discovery_completed",
            Stage::ProposalSent => "proposal_sent",
            Stage::Negotiation => "negotiation",
            Stage::ContractSigned => "contract_signed",
            Stage::ActiveClient => "active_client",
            Stage::ProjectDelivered => "project_delivered",
            Stage::Retention => "retention",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = crate::error::LeadflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new_lead" => Ok(Stage::NewLead),
            "contacted" => Ok(Stage::Contacted),
            "discovery_scheduled" => Ok(Stage::DiscoveryScheduled),
            "discovery_completed" => Ok(Stage::DiscoveryCompleted),
            "proposal_sent" => Ok(Stage::ProposalSent),
            "negotiation" => Ok(Stage::Negotiation),
            "contract_signed" => Ok(Stage::ContractSigned),
            "active_client" => Ok(Stage::ActiveClient),
            "project_delivered" => Ok(Stage::ProjectDelivered),
            "retention" => Ok(Stage::Retention),
            _ => Err(crate::error::LeadflowError::InvalidStage(s.to_string())),
        }
    }
}

/// Rank used for the forward-only guard. A lead with no stage sits strictly
/// before the first pipeline stage, so any real stage counts as forward
/// motion from unset. This is the only place the unset case is special-cased.
pub fn stage_rank(stage: Option<Stage>) -> i64 {
    match stage {
        None => 0,
        Some(s) => s.index() as i64 + 1,
    }
}

// ---------------------------------------------------------------------------
// ReminderStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Pending,
    Sent,
    Dismissed,
}

impl ReminderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReminderStatus::Pending => "pending",
            ReminderStatus::Sent => "sent",
            ReminderStatus::Dismissed => "dismissed",
        }
    }
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReminderStatus {
    type Err = crate::error::LeadflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReminderStatus::Pending),
            "sent" => Ok(ReminderStatus::Sent),
            "dismissed" => Ok(ReminderStatus::Dismissed),
            _ => Err(crate::error::LeadflowError::InvalidReminderStatus(
                s.to_string(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
