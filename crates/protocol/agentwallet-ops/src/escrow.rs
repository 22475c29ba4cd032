//! Escrow lifecycle.
//!
//! ```text
//! created ──► funded ──► released
//!                │
//!                ├─────► refunded
//!                │
//!                └─────► disputed ──► resolved
//!                            │
//!                            └──────► refunded
//! ```
//!
//! `created` and `funded` escrows past their deadline are swept to
//! `expired`. Every transition is applied with a compare-and-update on the
//! stored status, so two concurrent callers cannot both move the same escrow.

use std::sync::Arc;

use agentwallet_chain::{confirm_signature, ChainGateway, ConfirmationOutcome};
use agentwallet_crypto::{Pubkey, Signature};
use agentwallet_store::Store;
use agentwallet_types::{Clock, Escrow, EscrowStatus, Page, Paged};
use agentwallet_wire::native::{system_transfer, token_transfer};
use agentwallet_wire::pda::associated_token_address;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::OpsConfig;
use crate::error::{OpsError, OpsResult};
use crate::helpers::{require_positive, sign_and_submit};
use crate::wallets::WalletManager;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Escrow state change published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EscrowEvent {
    Funded { escrow_id: Uuid, org_id: Uuid },
    Released { escrow_id: Uuid, org_id: Uuid },
    Refunded { escrow_id: Uuid, org_id: Uuid },
    Disputed { escrow_id: Uuid, org_id: Uuid },
    Resolved { escrow_id: Uuid, org_id: Uuid },
    Expired { escrow_id: Uuid, org_id: Uuid },
}

impl EscrowEvent {
    fn for_status(escrow: &Escrow) -> Option<Self> {
        let (escrow_id, org_id) = (escrow.id, escrow.org_id);
        Some(match escrow.status {
            EscrowStatus::Created => return None,
            EscrowStatus::Funded => Self::Funded { escrow_id, org_id },
            EscrowStatus::Released => Self::Released { escrow_id, org_id },
            EscrowStatus::Refunded => Self::Refunded { escrow_id, org_id },
            EscrowStatus::Disputed => Self::Disputed { escrow_id, org_id },
            EscrowStatus::Resolved => Self::Resolved { escrow_id, org_id },
            EscrowStatus::Expired => Self::Expired { escrow_id, org_id },
        })
    }

    pub fn escrow_id(&self) -> Uuid {
        match self {
            Self::Funded { escrow_id, .. }
            | Self::Released { escrow_id, .. }
            | Self::Refunded { escrow_id, .. }
            | Self::Disputed { escrow_id, .. }
            | Self::Resolved { escrow_id, .. }
            | Self::Expired { escrow_id, .. } => *escrow_id,
        }
    }
}

/// Parameters of a new escrow.
#[derive(Debug, Clone)]
pub struct NewEscrow {
    pub funder_wallet_id: Uuid,
    pub recipient_address: Pubkey,
    pub amount: u64,
    pub token_mint: Option<Pubkey>,
    pub arbiter_address: Option<Pubkey>,
    pub conditions: serde_json::Value,
    /// Defaults to the configured escrow lifetime.
    pub expires_in_hours: Option<i64>,
}

impl NewEscrow {
    pub fn new(funder_wallet_id: Uuid, recipient_address: Pubkey, amount: u64) -> Self {
        Self {
            funder_wallet_id,
            recipient_address,
            amount,
            token_mint: None,
            arbiter_address: None,
            conditions: serde_json::Value::Object(Default::default()),
            expires_in_hours: None,
        }
    }
}

/// Creates, funds and settles escrows.
#[derive(Clone)]
pub struct EscrowService {
    store: Arc<dyn Store>,
    chain: Arc<dyn ChainGateway>,
    clock: Arc<dyn Clock>,
    wallets: WalletManager,
    config: Arc<OpsConfig>,
    events: broadcast::Sender<EscrowEvent>,
}

impl EscrowService {
    pub fn new(
        store: Arc<dyn Store>,
        chain: Arc<dyn ChainGateway>,
        clock: Arc<dyn Clock>,
        wallets: WalletManager,
        config: Arc<OpsConfig>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            chain,
            clock,
            wallets,
            config,
            events,
        }
    }

    /// Subscribe to escrow events.
    pub fn subscribe(&self) -> broadcast::Receiver<EscrowEvent> {
        self.events.subscribe()
    }

    /// Create an escrow and try to fund it right away.
    ///
    /// Funding failures do not fail the call: the escrow stays `created`
    /// and [`fund`](Self::fund) can be retried.
    pub async fn create_escrow(&self, org_id: Uuid, params: NewEscrow) -> OpsResult<Escrow> {
        require_positive("amount", params.amount)?;
        let hours = params.expires_in_hours.unwrap_or(self.config.escrow_expiry_hours);
        if hours <= 0 {
            return Err(OpsError::validation("expires_in_hours must be positive"));
        }
        self.wallets.active_wallet(org_id, params.funder_wallet_id).await?;

        let now = self.clock.now();
        let escrow = Escrow {
            id: Uuid::new_v4(),
            org_id,
            funder_wallet_id: params.funder_wallet_id,
            recipient_address: params.recipient_address,
            arbiter_address: params.arbiter_address,
            escrow_address: None,
            amount: params.amount,
            token_mint: params.token_mint,
            status: EscrowStatus::Created,
            conditions: params.conditions,
            fund_signature: None,
            release_signature: None,
            refund_signature: None,
            dispute_reason: None,
            resolution_notes: None,
            expires_at: now + Duration::hours(hours),
            funded_at: None,
            completed_at: None,
            created_at: now,
        };
        self.store.create_escrow(&escrow).await?;

        let escrow = self.try_fund(escrow).await?;
        info!(escrow_id = %escrow.id, status = %escrow.status, amount = escrow.amount, "Escrow created");
        Ok(escrow)
    }

    /// Retry funding a `created` escrow.
    pub async fn fund(&self, org_id: Uuid, escrow_id: Uuid) -> OpsResult<Escrow> {
        let escrow = self.get(org_id, escrow_id).await?;
        if escrow.status != EscrowStatus::Created {
            return Err(transition_error(&escrow, EscrowStatus::Funded));
        }
        self.try_fund(escrow).await
    }

    /// Release funds to the recipient.
    pub async fn release(&self, org_id: Uuid, escrow_id: Uuid) -> OpsResult<Escrow> {
        self.transition(org_id, escrow_id, EscrowStatus::Released, |_| {}).await
    }

    /// Return funds to the funder.
    pub async fn refund(&self, org_id: Uuid, escrow_id: Uuid) -> OpsResult<Escrow> {
        self.transition(org_id, escrow_id, EscrowStatus::Refunded, |_| {}).await
    }

    pub async fn dispute(&self, org_id: Uuid, escrow_id: Uuid, reason: &str) -> OpsResult<Escrow> {
        if reason.trim().is_empty() {
            return Err(OpsError::validation("dispute reason must not be empty"));
        }
        self.transition(org_id, escrow_id, EscrowStatus::Disputed, |e| {
            e.dispute_reason = Some(reason.to_string());
        })
        .await
    }

    /// Settle a disputed escrow.
    pub async fn resolve(&self, org_id: Uuid, escrow_id: Uuid, notes: &str) -> OpsResult<Escrow> {
        self.transition(org_id, escrow_id, EscrowStatus::Resolved, |e| {
            e.resolution_notes = Some(notes.to_string());
        })
        .await
    }

    pub async fn get(&self, org_id: Uuid, escrow_id: Uuid) -> OpsResult<Escrow> {
        self.store
            .get_escrow(org_id, escrow_id)
            .await?
            .ok_or_else(|| OpsError::not_found("escrow", escrow_id))
    }

    /// Newest first.
    pub async fn list(&self, org_id: Uuid, status: Option<EscrowStatus>, page: Page) -> OpsResult<Paged<Escrow>> {
        Ok(self.store.list_escrows(org_id, status, page).await?)
    }

    /// Expire `created` and `funded` escrows past their deadline.
    pub async fn expire_stale(&self, now: DateTime<Utc>) -> OpsResult<Vec<Escrow>> {
        let expired = self.store.expire_escrows(now).await?;
        for escrow in &expired {
            self.publish(escrow);
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "Escrows expired");
        }
        Ok(expired)
    }

    async fn transition<F>(&self, org_id: Uuid, escrow_id: Uuid, target: EscrowStatus, apply: F) -> OpsResult<Escrow>
    where
        F: FnOnce(&mut Escrow),
    {
        let mut escrow = self.get(org_id, escrow_id).await?;
        let current = escrow.status;
        if !current.can_transition_to(target) {
            return Err(transition_error(&escrow, target));
        }

        apply(&mut escrow);
        escrow.status = target;
        if target.is_terminal() {
            escrow.completed_at = Some(self.clock.now());
        }

        if !self.store.compare_and_update_escrow(&escrow, current).await? {
            // Lost a race; report against whatever state won.
            let latest = self.get(org_id, escrow_id).await?;
            return Err(transition_error(&latest, target));
        }

        info!(escrow_id = %escrow_id, from = %current, to = %target, "Escrow transition");
        self.publish(&escrow);
        Ok(escrow)
    }

    /// Send the escrowed amount to the holding address and wait for
    /// confirmation. Persists whatever progress was made.
    ///
    /// A transfer from an earlier attempt is checked first and only
    /// resubmitted once the chain reports it failed.
    async fn try_fund(&self, mut escrow: Escrow) -> OpsResult<Escrow> {
        let holder = self.config.platform_wallet.unwrap_or(escrow.recipient_address);

        let mut outcome = None;
        if let Some(previous) = escrow.fund_signature {
            match confirm_signature(self.chain.as_ref(), &previous, &self.config.confirm).await {
                ConfirmationOutcome::Failed(reason) => {
                    warn!(escrow_id = %escrow.id, reason = %reason, "Earlier escrow funding reverted; resubmitting");
                }
                other => outcome = Some((previous, other)),
            }
        }

        let (signature, outcome) = match outcome {
            Some(found) => found,
            None => {
                let signature = match self.submit_funding(&escrow, &holder).await {
                    Ok(signature) => signature,
                    Err(e) => {
                        error!(escrow_id = %escrow.id, error = %e, "Escrow funding failed");
                        return Ok(escrow);
                    }
                };
                escrow.fund_signature = Some(signature);
                let outcome = confirm_signature(self.chain.as_ref(), &signature, &self.config.confirm).await;
                (signature, outcome)
            }
        };

        match outcome {
            ConfirmationOutcome::Confirmed => {
                escrow.status = EscrowStatus::Funded;
                escrow.funded_at = Some(self.clock.now());
                escrow.escrow_address = Some(holder);
            }
            ConfirmationOutcome::Failed(reason) => {
                warn!(escrow_id = %escrow.id, reason = %reason, "Escrow funding reverted");
            }
            ConfirmationOutcome::TimedOut => {
                warn!(escrow_id = %escrow.id, signature = %signature.short(), "Escrow funding unconfirmed");
            }
        }

        if !self
            .store
            .compare_and_update_escrow(&escrow, EscrowStatus::Created)
            .await?
        {
            debug!(escrow_id = %escrow.id, "Escrow changed while funding");
            return self.get(escrow.org_id, escrow.id).await;
        }
        self.publish(&escrow);
        Ok(escrow)
    }

    async fn submit_funding(&self, escrow: &Escrow, holder: &Pubkey) -> OpsResult<Signature> {
        let wallet = self.wallets.active_wallet(escrow.org_id, escrow.funder_wallet_id).await?;
        let signer = self.wallets.signer(&wallet)?;
        let instruction = match &escrow.token_mint {
            Some(mint) => token_transfer(
                &associated_token_address(&wallet.address, mint)?,
                &associated_token_address(holder, mint)?,
                &wallet.address,
                escrow.amount,
            ),
            None => system_transfer(&wallet.address, holder, escrow.amount),
        };
        sign_and_submit(self.chain.as_ref(), &[instruction], &signer).await
    }

    fn publish(&self, escrow: &Escrow) {
        if let Some(event) = EscrowEvent::for_status(escrow) {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
    }
}

impl std::fmt::Debug for EscrowService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscrowService")
            .field("subscribers", &self.events.receiver_count())
            .finish()
    }
}

fn transition_error(escrow: &Escrow, target: EscrowStatus) -> OpsError {
    OpsError::state("escrow", escrow.status, target, escrow.status.allowed_transitions())
}
