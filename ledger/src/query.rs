// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ticket Query Service
//!
//! Read side of the ledger. Every listing runs the same pipeline:
//!
//! ```text
//! index scan ──► load tickets ──► enrich ──► validity fields ──► sort (newest first)
//! ```
//!
//! Listings never fail as a whole. A ticket that cannot be loaded is logged
//! and skipped; if the index itself cannot be read the listing comes back
//! empty. Callers that need hard errors use [`TicketQueryService::check_ticket`]
//! or the reconciliation operations, which propagate store faults.
//!
//! Earnings reconciliation also lives here because it is a scan over the
//! same owner index.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::config::{MAX_RESYNC_ATTEMPTS, UNKNOWN_RIDER_EMAIL, UNKNOWN_RIDER_NAME};
use crate::error::{LedgerError, LedgerResult};
use crate::model::Ticket;
use crate::storage::LedgerStore;
use crate::validity::{is_valid, time_remaining, TicketState, ValidityReport};

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// A ticket as shown in listings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    /// Ticket id.
    pub ticket_id: String,
    /// Rider who paid.
    pub rider_id: String,
    /// Owner who was credited.
    pub owner_id: String,
    /// Vehicle the ticket was bought for.
    pub vehicle_id: String,
    /// Fare charged at issuance.
    pub fare_paid: u64,
    /// Issuance instant.
    pub issued_at: DateTime<Utc>,
    /// End of the validity window.
    pub expires_at: DateTime<Utc>,
    /// `valid` or the invalidation label.
    pub status: String,
    /// Usable at the time the listing was built.
    pub is_valid: bool,
    /// Seconds left, zero when not usable.
    pub time_remaining: i64,
    /// Paying rider's name (owner listings only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rider_name: Option<String>,
    /// Paying rider's email (owner listings only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rider_email: Option<String>,
}

impl TicketView {
    fn new<Tz: TimeZone>(ticket: Ticket, now: &DateTime<Tz>) -> Self {
        let is_valid = is_valid(&ticket, now);
        let time_remaining = time_remaining(&ticket, now).num_seconds();
        Self {
            status: ticket.status.to_string(),
            ticket_id: ticket.ticket_id,
            rider_id: ticket.rider_id,
            owner_id: ticket.owner_id,
            vehicle_id: ticket.vehicle_id,
            fare_paid: ticket.fare_paid,
            issued_at: ticket.issued_at,
            expires_at: ticket.expires_at,
            is_valid,
            time_remaining,
            rider_name: None,
            rider_email: None,
        }
    }
}

/// Outcome of an earnings resync.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsReport {
    /// Owner that was resynchronized.
    pub owner_id: String,
    /// Sum of `farePaid` over the owner's tickets, now stored as earnings.
    pub total_revenue: u64,
    /// Tickets counted, now stored as `tickets_issued`.
    pub ticket_count: u64,
}

/// Stored earnings next to the recomputed sum. Nothing is written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsAudit {
    /// Owner that was audited.
    pub owner_id: String,
    /// `total_earnings` as stored on the owner.
    pub stored_earnings: u64,
    /// Sum of `farePaid` over the owner's tickets.
    pub computed_earnings: u64,
    /// Tickets summed.
    pub ticket_count: u64,
    /// `computed - stored`.
    pub drift: i64,
    /// `drift == 0`.
    pub in_sync: bool,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Read-side operations over tickets.
pub struct TicketQueryService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for TicketQueryService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: LedgerStore> TicketQueryService<S> {
    /// Creates a query service reading `store` with `clock` as "now".
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Every ticket the rider bought, newest first.
    pub fn tickets_for_rider(&self, rider_id: &str) -> Vec<TicketView> {
        let ids = match self.store.ticket_ids_for_rider(rider_id) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(rider_id, error = %e, "failed to list rider tickets");
                return Vec::new();
            }
        };

        let now = self.clock.now();
        let mut views: Vec<TicketView> = self
            .load_tickets(&ids)
            .into_iter()
            .map(|ticket| TicketView::new(ticket, &now))
            .collect();
        sort_newest_first(&mut views);
        views
    }

    /// Every ticket issued for the owner, newest first, with the paying
    /// rider's name and email.
    pub fn tickets_for_owner(&self, owner_id: &str) -> Vec<TicketView> {
        self.owner_listing(owner_id, None)
    }

    /// Owner listing restricted to tickets in `state` at call time.
    pub fn tickets_for_owner_by_state(&self, owner_id: &str, state: TicketState) -> Vec<TicketView> {
        self.owner_listing(owner_id, Some(state))
    }

    /// Validity of a single ticket right now.
    pub fn check_ticket(&self, ticket_id: &str) -> LedgerResult<ValidityReport> {
        self.check_ticket_at(ticket_id, &self.clock.now())
    }

    /// Validity of a single ticket at an arbitrary instant.
    ///
    /// # Errors
    ///
    /// [`LedgerError::TicketNotFound`] if no such ticket exists.
    pub fn check_ticket_at<Tz: TimeZone>(
        &self,
        ticket_id: &str,
        at: &DateTime<Tz>,
    ) -> LedgerResult<ValidityReport> {
        let ticket = self
            .store
            .ticket(ticket_id)?
            .ok_or_else(|| LedgerError::TicketNotFound(ticket_id.to_string()))?;
        Ok(ValidityReport::new(&ticket, at))
    }

    /// Recomputes the owner's earnings from its tickets and stores the sum.
    ///
    /// A payment landing during the scan is detected through the owner's
    /// `tickets_issued` counter; the scan is then repeated. Running this
    /// twice in a row writes at most once.
    ///
    /// # Errors
    ///
    /// `OwnerNotFound`, any store fault, or `StoreUnavailable` if payments
    /// kept landing for [`MAX_RESYNC_ATTEMPTS`] scans.
    pub fn resync_owner_earnings(&self, owner_id: &str) -> LedgerResult<EarningsReport> {
        for attempt in 1..=MAX_RESYNC_ATTEMPTS {
            let before = self.owner_tickets_issued(owner_id)?;
            let (total, count) = self.sum_owner_tickets(owner_id)?;

            let (owner, applied) = self.store.update_owner(owner_id, |owner| {
                if owner.tickets_issued != before {
                    return Ok(false);
                }
                owner.total_earnings = total;
                owner.tickets_issued = count;
                Ok(true)
            })?;

            if applied {
                tracing::info!(
                    owner_id,
                    total_revenue = owner.total_earnings,
                    ticket_count = count,
                    "owner earnings resynchronized"
                );
                return Ok(EarningsReport {
                    owner_id: owner.owner_id,
                    total_revenue: total,
                    ticket_count: count,
                });
            }

            tracing::debug!(owner_id, attempt, "payment landed during resync, rescanning");
        }

        tracing::warn!(owner_id, attempts = MAX_RESYNC_ATTEMPTS, "resync gave up");
        Err(LedgerError::StoreUnavailable(format!(
            "earnings of owner {owner_id} kept changing during resync"
        )))
    }

    /// Compares stored earnings with the ticket sum without writing.
    pub fn audit_owner_earnings(&self, owner_id: &str) -> LedgerResult<EarningsAudit> {
        let owner = self
            .store
            .owner(owner_id)?
            .ok_or_else(|| LedgerError::OwnerNotFound(owner_id.to_string()))?;
        let (computed, count) = self.sum_owner_tickets(owner_id)?;

        let drift = i128::from(computed) - i128::from(owner.total_earnings);
        let drift = i64::try_from(drift).unwrap_or(if drift < 0 { i64::MIN } else { i64::MAX });

        if drift != 0 {
            tracing::warn!(owner_id, stored = owner.total_earnings, computed, "earnings drift detected");
        }

        Ok(EarningsAudit {
            owner_id: owner.owner_id,
            stored_earnings: owner.total_earnings,
            computed_earnings: computed,
            ticket_count: count,
            drift,
            in_sync: drift == 0,
        })
    }

    // -----------------------------------------------------------------------
    // Pipeline pieces
    // -----------------------------------------------------------------------

    fn owner_listing(&self, owner_id: &str, state: Option<TicketState>) -> Vec<TicketView> {
        let ids = match self.store.ticket_ids_for_owner(owner_id) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(owner_id, error = %e, "failed to list owner tickets");
                return Vec::new();
            }
        };

        let now = self.clock.now();
        let mut riders: HashMap<String, (String, String)> = HashMap::new();
        let mut views = Vec::with_capacity(ids.len());

        for ticket in self.load_tickets(&ids) {
            if let Some(wanted) = state {
                if TicketState::of(&ticket, &now) != wanted {
                    continue;
                }
            }
            let (name, email) = riders
                .entry(ticket.rider_id.clone())
                .or_insert_with(|| self.rider_contact(&ticket.rider_id))
                .clone();
            let mut view = TicketView::new(ticket, &now);
            view.rider_name = Some(name);
            view.rider_email = Some(email);
            views.push(view);
        }

        sort_newest_first(&mut views);
        views
    }

    fn load_tickets(&self, ids: &[String]) -> Vec<Ticket> {
        ids.iter()
            .filter_map(|id| match self.store.ticket(id) {
                Ok(Some(ticket)) => Some(ticket),
                Ok(None) => {
                    tracing::warn!(ticket_id = %id, "index entry without ticket, skipping");
                    None
                }
                Err(e) => {
                    tracing::warn!(ticket_id = %id, error = %e, "skipping unreadable ticket");
                    None
                }
            })
            .collect()
    }

    fn rider_contact(&self, rider_id: &str) -> (String, String) {
        match self.store.rider(rider_id) {
            Ok(Some(rider)) => (rider.full_name, rider.email),
            Ok(None) => placeholder_contact(),
            Err(e) => {
                tracing::warn!(rider_id, error = %e, "rider lookup failed, using placeholder");
                placeholder_contact()
            }
        }
    }

    fn owner_tickets_issued(&self, owner_id: &str) -> LedgerResult<u64> {
        self.store
            .owner(owner_id)?
            .map(|owner| owner.tickets_issued)
            .ok_or_else(|| LedgerError::OwnerNotFound(owner_id.to_string()))
    }

    /// `(sum of fare_paid, ticket count)` over the owner's tickets. Strict:
    /// a ticket that cannot be read fails the whole computation.
    fn sum_owner_tickets(&self, owner_id: &str) -> LedgerResult<(u64, u64)> {
        let ids = self.store.ticket_ids_for_owner(owner_id)?;
        let mut total: u64 = 0;
        let mut count: u64 = 0;
        for id in &ids {
            let Some(ticket) = self.store.ticket(id)? else {
                continue;
            };
            total = total.checked_add(ticket.fare_paid).ok_or_else(|| {
                LedgerError::Validation(format!("earnings of owner {owner_id} overflow"))
            })?;
            count += 1;
        }
        Ok((total, count))
    }
}

fn placeholder_contact() -> (String, String) {
    (UNKNOWN_RIDER_NAME.to_string(), UNKNOWN_RIDER_EMAIL.to_string())
}

/// Stable sort by issuance instant, most recent first.
fn sort_newest_first(views: &mut [TicketView]) {
    views.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
}
