//! Policy evaluation against persisted policies and spend history.

use std::sync::Arc;

use agentwallet_store::Store;
use agentwallet_types::{utc_day_bounds, Clock, Policy, TransferRequest};
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::decision::{DenyReason, PolicyDecision};
use crate::error::PolicyResult;
use crate::rules::{parse_window, validate_rules};

/// Outcome of checking one policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyCheck {
    Pass,
    Deny(DenyReason),
    /// The approval threshold was crossed.
    NeedsApproval,
}

/// Check one policy's rules against a transfer.
///
/// `spent_today` is the wallet's confirmed and submitted spend for the
/// current UTC day, excluding this transfer. Checks run in a fixed order:
/// per-transaction cap, daily cap, destination whitelist, destination
/// blacklist, token whitelist, time window, approval threshold.
pub fn check_policy(
    policy: &Policy,
    request: &TransferRequest,
    spent_today: u64,
    now: DateTime<Utc>,
) -> PolicyCheck {
    let rules = &policy.rules;
    let amount = request.amount;

    if let Some(limit) = rules.spending_limit_lamports {
        if amount > limit {
            return PolicyCheck::Deny(DenyReason::ExceedsTransactionLimit { amount, limit });
        }
    }

    if let Some(limit) = rules.daily_limit_lamports {
        let projected = spent_today.saturating_add(amount);
        if projected > limit {
            return PolicyCheck::Deny(DenyReason::ExceedsDailyLimit { projected, limit });
        }
    }

    if !rules.destination_whitelist.is_empty()
        && !rules.destination_whitelist.contains(&request.to_address)
    {
        return PolicyCheck::Deny(DenyReason::DestinationNotWhitelisted(request.to_address));
    }

    if rules.destination_blacklist.contains(&request.to_address) {
        return PolicyCheck::Deny(DenyReason::DestinationBlacklisted(request.to_address));
    }

    if !rules.token_whitelist.is_empty() {
        let token = request
            .token_mint
            .map(|mint| mint.to_string())
            .unwrap_or_else(|| "SOL".to_string());
        if !rules.token_whitelist.contains(&token) {
            return PolicyCheck::Deny(DenyReason::TokenNotWhitelisted(token));
        }
    }

    if let Some(window) = &rules.time_window {
        match parse_window(window) {
            Ok(parsed) if parsed.contains(now) => {}
            Ok(_) => {
                return PolicyCheck::Deny(DenyReason::OutsideTimeWindow {
                    start: window.start.clone(),
                    end: window.end.clone(),
                    timezone: window.timezone.clone(),
                })
            }
            Err(e) => return PolicyCheck::Deny(DenyReason::InvalidTimeWindow(e.to_string())),
        }
    }

    match rules.require_approval_above_lamports {
        Some(threshold) if amount > threshold => PolicyCheck::NeedsApproval,
        _ => PolicyCheck::Pass,
    }
}

/// Evaluates transfers against an organization's policies.
#[derive(Clone)]
pub struct PolicyEngine {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl PolicyEngine {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Enabled policies governing a transfer, in evaluation order.
    ///
    /// Sorted by ascending priority; the sort is stable so ties keep
    /// creation order.
    pub async fn applicable_policies(
        &self,
        org_id: Uuid,
        agent_id: Option<Uuid>,
        wallet_id: Uuid,
    ) -> PolicyResult<Vec<Policy>> {
        let mut policies: Vec<Policy> = self
            .store
            .list_policies(org_id)
            .await?
            .into_iter()
            .filter(|p| p.applies_to(agent_id, wallet_id))
            .collect();
        policies.sort_by_key(|p| p.priority);
        Ok(policies)
    }

    /// Evaluate a transfer.
    ///
    /// The first deny wins. Approval thresholds accumulate across policies
    /// and only take effect when nothing denies.
    pub async fn evaluate(&self, org_id: Uuid, request: &TransferRequest) -> PolicyResult<PolicyDecision> {
        let policies = self
            .applicable_policies(org_id, request.agent_id, request.wallet_id)
            .await?;
        let now = self.clock.now();

        let mut spent_today: Option<u64> = None;
        let mut approval_policy: Option<Uuid> = None;

        for policy in &policies {
            if policy.rules.daily_limit_lamports.is_some() && spent_today.is_none() {
                let (from, to) = utc_day_bounds(now);
                spent_today = Some(
                    self.store
                        .spend_between(request.wallet_id, request.agent_id, from, to)
                        .await?,
                );
            }

            match check_policy(policy, request, spent_today.unwrap_or(0), now) {
                PolicyCheck::Pass => {}
                PolicyCheck::NeedsApproval => {
                    approval_policy.get_or_insert(policy.id);
                }
                PolicyCheck::Deny(reason) => {
                    debug!(
                        policy = %policy.name,
                        wallet_id = %request.wallet_id,
                        reason = %reason,
                        "Transfer denied by policy"
                    );
                    return Ok(PolicyDecision::Deny {
                        policy_id: policy.id,
                        policy_name: policy.name.clone(),
                        reason,
                    });
                }
            }
        }

        let decision = match approval_policy {
            Some(policy_id) => PolicyDecision::RequireApproval { policy_id },
            None => PolicyDecision::Allow,
        };
        debug!(
            wallet_id = %request.wallet_id,
            policies = policies.len(),
            outcome = decision.outcome(),
            "Policy evaluation complete"
        );
        Ok(decision)
    }

    /// Validate and persist a new policy.
    pub async fn create_policy(&self, policy: &Policy) -> PolicyResult<()> {
        validate_rules(&policy.rules)?;
        self.store.create_policy(policy).await?;
        Ok(())
    }

    /// Validate and persist changes to an existing policy.
    pub async fn update_policy(&self, policy: &Policy) -> PolicyResult<()> {
        validate_rules(&policy.rules)?;
        self.store.update_policy(policy).await?;
        Ok(())
    }
}

impl std::fmt::Debug for PolicyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEngine").field("clock", &self.clock).finish()
    }
}
