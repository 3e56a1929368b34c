//! Subscription plans and their record quotas

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A subscription plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Plan assigned to new accounts
    #[default]
    Free,
    Pro,
    Enterprise,
}

impl Plan {
    /// Every plan, cheapest first
    pub fn all() -> [Plan; 3] {
        [Plan::Free, Plan::Pro, Plan::Enterprise]
    }

    /// Maximum number of records an owner on this plan may hold
    pub fn record_limit(&self) -> u32 {
        match self {
            Plan::Free => 2,
            Plan::Pro => 50,
            Plan::Enterprise => 500,
        }
    }

    /// Identifier used in configuration and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
            Plan::Enterprise => "enterprise",
        }
    }

    /// Human readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Plan::Free => "Free",
            Plan::Pro => "Pro",
            Plan::Enterprise => "Enterprise",
        }
    }

    /// Advertised monthly price
    pub fn price(&self) -> &'static str {
        match self {
            Plan::Free => "$0",
            Plan::Pro => "$5/mo",
            Plan::Enterprise => "$20/mo",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Plan::all()
            .into_iter()
            .find(|plan| plan.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                crate::Error::invalid_input(format!(
                    "unknown plan '{}' (expected free, pro or enterprise)",
                    s
                ))
            })
    }
}

/// Record usage of one owner against their plan limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    /// Committed records currently held
    pub current_count: usize,
    /// Limit of the owner's plan
    pub max_allowed: u32,
}

impl Quota {
    /// Whether another create must be refused
    pub fn is_exhausted(&self) -> bool {
        self.current_count >= self.max_allowed as usize
    }

    /// Whether the owner holds more records than the plan allows
    ///
    /// Only reachable after a downgrade; existing records are grandfathered.
    pub fn is_over_limit(&self) -> bool {
        self.current_count > self.max_allowed as usize
    }

    /// Creates still available (zero when exhausted)
    pub fn remaining(&self) -> usize {
        (self.max_allowed as usize).saturating_sub(self.current_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_limits() {
        assert_eq!(Plan::Free.record_limit(), 2);
        assert_eq!(Plan::Pro.record_limit(), 50);
        assert_eq!(Plan::Enterprise.record_limit(), 500);
        assert_eq!(Plan::default(), Plan::Free);
    }

    #[test]
    fn test_plan_parsing() {
        assert_eq!("PRO".parse::<Plan>().unwrap(), Plan::Pro);
        assert!("gold".parse::<Plan>().is_err());
    }

    #[test]
    fn test_quota_boundaries() {
        let below = Quota { current_count: 1, max_allowed: 2 };
        assert!(!below.is_exhausted());
        assert_eq!(below.remaining(), 1);

        let at = Quota { current_count: 2, max_allowed: 2 };
        assert!(at.is_exhausted());
        assert!(!at.is_over_limit());

        let over = Quota { current_count: 5, max_allowed: 2 };
        assert!(over.is_exhausted());
        assert!(over.is_over_limit());
        assert_eq!(over.remaining(), 0);
    }
}
