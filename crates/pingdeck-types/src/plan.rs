use serde::{Deserialize, Serialize};

/// Subscription tier. Stored in the `users.plan` column as its `as_str` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanTier {
    Free,
    Pro,
}

/// Monthly allowances for a plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanQuota {
    pub max_events_per_month: u32,
    pub max_event_categories: u32,
}

pub const FREE_QUOTA: PlanQuota = PlanQuota {
    max_events_per_month: 100,
    max_event_categories: 3,
};

pub const PRO_QUOTA: PlanQuota = PlanQuota {
    max_events_per_month: 1000,
    max_event_categories: 10,
};

impl PlanTier {
    pub fn quota(&self) -> &'static PlanQuota {
        match self {
            PlanTier::Free => &FREE_QUOTA,
            PlanTier::Pro => &PRO_QUOTA,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "FREE",
            PlanTier::Pro => "PRO",
        }
    }

    /// Parse the stored column value. Unknown values fall back to FREE so a
    /// corrupt row degrades to the strictest allowance instead of failing the
    /// request.
    pub fn from_db(value: &str) -> Self {
        match value {
            "PRO" => PlanTier::Pro,
            _ => PlanTier::Free,
        }
    }
}
