//! Spend policies.

use agentwallet_crypto::Pubkey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Amount;

/// What a policy applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyScope {
    /// Every transfer in the organization.
    #[default]
    Org,
    /// Transfers made on behalf of `scope_id` (an agent id).
    Agent,
    /// Transfers out of `scope_id` (a wallet id).
    Wallet,
}

string_enum!(PolicyScope {
    Org => "org",
    Agent => "agent",
    Wallet => "wallet",
});

/// A daily time-of-day window, `HH:MM` in `timezone`, inclusive of both ends.
///
/// `timezone` is a fixed UTC offset: `UTC`, `Z`, `±HH:MM`, or `UTC±HH[:MM]`,
/// at most 14 hours either way. Region names such as `America/New_York`
/// are not supported and make the window deny every transfer, so a window
/// does not follow daylight saving changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: String,
    pub end: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// The rule set of one policy. Every rule is optional; an empty rule set
/// allows everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spending_limit_lamports: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_limit_lamports: Option<Amount>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destination_whitelist: Vec<Pubkey>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destination_blacklist: Vec<Pubkey>,
    /// Mint addresses, or `"SOL"` for native transfers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub token_whitelist: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<TimeWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_approval_above_lamports: Option<Amount>,
}

/// A named, prioritized rule set. Lower `priority` is evaluated first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub scope: PolicyScope,
    pub scope_id: Option<Uuid>,
    pub priority: i32,
    pub enabled: bool,
    pub rules: PolicyRules,
    pub created_at: DateTime<Utc>,
}

impl Policy {
    /// An enabled org-wide policy.
    pub fn org_wide(org_id: Uuid, name: impl Into<String>, priority: i32, rules: PolicyRules) -> Self {
        Self {
            id: Uuid::new_v4(),
            org_id,
            name: name.into(),
            scope: PolicyScope::Org,
            scope_id: None,
            priority,
            enabled: true,
            rules,
            created_at: Utc::now(),
        }
    }

    /// Narrow the policy to one agent or wallet.
    pub fn scoped(mut self, scope: PolicyScope, scope_id: Uuid) -> Self {
        self.scope = scope;
        self.scope_id = Some(scope_id);
        self
    }

    /// Whether this policy governs a transfer from `wallet_id` on behalf of
    /// `agent_id`.
    pub fn applies_to(&self, agent_id: Option<Uuid>, wallet_id: Uuid) -> bool {
        if !self.enabled {
            return false;
        }
        match self.scope {
            PolicyScope::Org => true,
            PolicyScope::Agent => agent_id.is_some() && self.scope_id == agent_id,
            PolicyScope::Wallet => self.scope_id == Some(wallet_id),
        }
    }
}
