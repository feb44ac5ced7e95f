// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # TransitLedger - async facade
//!
//! Bundles the ledger components over one shared store and exposes them as
//! async methods. Every call runs on tokio's blocking pool under the
//! configured store timeout, so no caller waits on the store indefinitely.
//!
//! A timeout only abandons the wait; the store call itself keeps running on
//! the blocking pool. That is fine for reads and for writes whose outcome
//! the caller can look up again, but not for money. [`TransitLedger::pay`]
//! therefore bounds only the quote phase. Once the payment transaction has
//! started, the facade waits for its outcome and reports exactly that: a
//! `StoreUnavailable` from `pay` always means no funds moved.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::{Clock, SystemClock};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::fare::{FareQuote, FareResolver};
use crate::model::{Owner, OwnerSettings, Rider, Ticket, TicketReceipt};
use crate::payment::PaymentEngine;
use crate::query::{EarningsAudit, EarningsReport, TicketQueryService, TicketView};
use crate::registry::Registry;
use crate::storage::{LedgerDb, LedgerStore};
use crate::validity::{TicketState, ValidityReport};

/// The ledger, ready to serve concurrent requests.
pub struct TransitLedger<S = LedgerDb> {
    store: Arc<S>,
    config: LedgerConfig,
    registry: Registry<S>,
    fares: FareResolver<S>,
    payments: PaymentEngine<S>,
    queries: TicketQueryService<S>,
}

impl<S> Clone for TransitLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            registry: self.registry.clone(),
            fares: self.fares.clone(),
            payments: self.payments.clone(),
            queries: self.queries.clone(),
        }
    }
}

impl TransitLedger<LedgerDb> {
    /// Opens (or creates) the on-disk ledger described by `config`.
    pub fn open(config: LedgerConfig) -> LedgerResult<Self> {
        let path = config.db_path();
        let store = LedgerDb::open(&path)?;
        tracing::info!(path = %path.display(), riders = store.rider_count(), owners = store.owner_count(), "ledger opened");
        Ok(Self::new(Arc::new(store), config, Arc::new(SystemClock)))
    }
}

impl<S: LedgerStore> TransitLedger<S> {
    /// Wires every component to `store`.
    pub fn new(store: Arc<S>, config: LedgerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: Registry::new(Arc::clone(&store), Arc::clone(&clock), config.opening_balance),
            fares: FareResolver::new(Arc::clone(&store)),
            payments: PaymentEngine::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                config.flush_on_commit,
            ),
            queries: TicketQueryService::new(Arc::clone(&store), clock),
            store,
            config,
        }
    }

    /// The configuration this ledger runs with.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Registration and records
    // -----------------------------------------------------------------------

    /// Registers a rider. `opening_balance` defaults to the configured one.
    pub async fn register_rider(
        &self,
        rider_id: &str,
        full_name: &str,
        email: &str,
        opening_balance: Option<u64>,
    ) -> LedgerResult<Rider> {
        let registry = self.registry.clone();
        let (rider_id, full_name, email) = (rider_id.to_owned(), full_name.to_owned(), email.to_owned());
        self.run_blocking("register_rider", move || {
            registry.register_rider(&rider_id, &full_name, &email, opening_balance)
        })
        .await
    }

    /// Registers an owner together with the vehicle it operates.
    pub async fn register_owner(
        &self,
        owner_id: &str,
        full_name: &str,
        email: &str,
        vehicle_id: &str,
        fixed_fare: Option<u64>,
    ) -> LedgerResult<Owner> {
        let registry = self.registry.clone();
        let (owner_id, full_name, email, vehicle_id) = (
            owner_id.to_owned(),
            full_name.to_owned(),
            email.to_owned(),
            vehicle_id.to_owned(),
        );
        self.run_blocking("register_owner", move || {
            registry.register_owner(&owner_id, &full_name, &email, &vehicle_id, fixed_fare)
        })
        .await
    }

    /// Loads a rider record.
    pub async fn rider(&self, rider_id: &str) -> LedgerResult<Rider> {
        let registry = self.registry.clone();
        let rider_id = rider_id.to_owned();
        self.run_blocking("rider", move || registry.rider(&rider_id)).await
    }

    /// Loads an owner record.
    pub async fn owner(&self, owner_id: &str) -> LedgerResult<Owner> {
        let registry = self.registry.clone();
        let owner_id = owner_id.to_owned();
        self.run_blocking("owner", move || registry.owner(&owner_id)).await
    }

    /// Applies fare and validity changes; returns what was applied.
    pub async fn update_owner_settings(
        &self,
        owner_id: &str,
        settings: OwnerSettings,
    ) -> LedgerResult<OwnerSettings> {
        let registry = self.registry.clone();
        let owner_id = owner_id.to_owned();
        self.run_blocking("update_owner_settings", move || {
            registry.update_owner_settings(&owner_id, settings)
        })
        .await
    }

    /// Moves a ticket to a non-`valid` status such as `revoked`.
    pub async fn invalidate_ticket(&self, ticket_id: &str, status: &str) -> LedgerResult<Ticket> {
        let registry = self.registry.clone();
        let (ticket_id, status) = (ticket_id.to_owned(), status.to_owned());
        self.run_blocking("invalidate_ticket", move || {
            registry.invalidate_ticket(&ticket_id, &status)
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Fares and payments
    // -----------------------------------------------------------------------

    /// Fare, validity window and owner for a vehicle.
    pub async fn resolve_fare(&self, vehicle_id: &str) -> LedgerResult<FareQuote> {
        let fares = self.fares.clone();
        let vehicle_id = vehicle_id.to_owned();
        self.run_blocking("resolve_fare", move || fares.resolve(&vehicle_id))
            .await
    }

    /// Pays the vehicle's fare from the rider's wallet. See
    /// [`PaymentEngine::pay`].
    ///
    /// The store timeout applies to the quote only. The commit is awaited
    /// to the end, so the result always reflects whether funds moved.
    pub async fn pay(&self, rider_id: &str, vehicle_id: &str) -> LedgerResult<TicketReceipt> {
        let payments = self.payments.clone();
        let (rider_id, vehicle_id) = (rider_id.to_owned(), vehicle_id.to_owned());
        let plan = self
            .run_blocking("pay", move || payments.prepare(&rider_id, &vehicle_id))
            .await?;

        let payments = self.payments.clone();
        self.run_to_completion("pay", move || payments.commit(&plan))
            .await
    }

    // -----------------------------------------------------------------------
    // Ticket queries
    // -----------------------------------------------------------------------

    /// The rider's tickets, newest first. Empty on any failure.
    pub async fn tickets_for_rider(&self, rider_id: &str) -> Vec<TicketView> {
        let queries = self.queries.clone();
        let rider_id = rider_id.to_owned();
        self.list("tickets_for_rider", move || queries.tickets_for_rider(&rider_id))
            .await
    }

    /// The owner's tickets with rider contact, newest first. Empty on any failure.
    pub async fn tickets_for_owner(&self, owner_id: &str) -> Vec<TicketView> {
        let queries = self.queries.clone();
        let owner_id = owner_id.to_owned();
        self.list("tickets_for_owner", move || queries.tickets_for_owner(&owner_id))
            .await
    }

    /// Owner listing filtered to active or expired tickets.
    pub async fn tickets_for_owner_by_state(
        &self,
        owner_id: &str,
        state: TicketState,
    ) -> Vec<TicketView> {
        let queries = self.queries.clone();
        let owner_id = owner_id.to_owned();
        self.list("tickets_for_owner_by_state", move || {
            queries.tickets_for_owner_by_state(&owner_id, state)
        })
        .await
    }

    /// Validity of one ticket now.
    pub async fn check_ticket(&self, ticket_id: &str) -> LedgerResult<ValidityReport> {
        let queries = self.queries.clone();
        let ticket_id = ticket_id.to_owned();
        self.run_blocking("check_ticket", move || queries.check_ticket(&ticket_id))
            .await
    }

    /// Validity of one ticket at `at`.
    pub async fn check_ticket_at(
        &self,
        ticket_id: &str,
        at: DateTime<Utc>,
    ) -> LedgerResult<ValidityReport> {
        let queries = self.queries.clone();
        let ticket_id = ticket_id.to_owned();
        self.run_blocking("check_ticket_at", move || {
            queries.check_ticket_at(&ticket_id, &at)
        })
        .await
    }

    /// Recomputes and stores the owner's earnings from its tickets.
    pub async fn resync_owner_earnings(&self, owner_id: &str) -> LedgerResult<EarningsReport> {
        let queries = self.queries.clone();
        let owner_id = owner_id.to_owned();
        self.run_blocking("resync_owner_earnings", move || {
            queries.resync_owner_earnings(&owner_id)
        })
        .await
    }

    /// Compares stored and recomputed earnings without writing.
    pub async fn audit_owner_earnings(&self, owner_id: &str) -> LedgerResult<EarningsAudit> {
        let queries = self.queries.clone();
        let owner_id = owner_id.to_owned();
        self.run_blocking("audit_owner_earnings", move || {
            queries.audit_owner_earnings(&owner_id)
        })
        .await
    }

    /// Blocks until everything written so far is durable.
    pub async fn flush(&self) -> LedgerResult<()> {
        let store = Arc::clone(&self.store);
        self.run_blocking("flush", move || store.flush()).await
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    async fn run_blocking<T, F>(&self, op: &'static str, work: F) -> LedgerResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> LedgerResult<T> + Send + 'static,
    {
        let limit = self.config.store_timeout;
        match tokio::time::timeout(limit, tokio::task::spawn_blocking(work)).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => {
                tracing::error!(op, error = %join, "store task aborted");
                Err(LedgerError::StoreUnavailable(format!("{op}: {join}")))
            }
            Err(_) => {
                tracing::warn!(op, timeout_ms = limit.as_millis() as u64, "store call timed out");
                Err(LedgerError::StoreUnavailable(format!(
                    "{op} timed out after {}ms, outcome unknown",
                    limit.as_millis()
                )))
            }
        }
    }

    /// Like [`run_blocking`](Self::run_blocking) but never abandons the
    /// call. Past the timeout it logs and keeps waiting.
    async fn run_to_completion<T, F>(&self, op: &'static str, work: F) -> LedgerResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> LedgerResult<T> + Send + 'static,
    {
        let limit = self.config.store_timeout;
        let mut task = tokio::task::spawn_blocking(work);
        let joined = match tokio::time::timeout(limit, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::warn!(
                    op,
                    timeout_ms = limit.as_millis() as u64,
                    "store commit past timeout, waiting for its outcome"
                );
                task.await
            }
        };
        joined.unwrap_or_else(|join| {
            tracing::error!(op, error = %join, "store task aborted");
            Err(LedgerError::StoreUnavailable(format!("{op}: {join}")))
        })
    }

    /// Listings degrade to an empty result instead of failing.
    async fn list<F>(&self, op: &'static str, work: F) -> Vec<TicketView>
    where
        F: FnOnce() -> Vec<TicketView> + Send + 'static,
    {
        self.run_blocking(op, move || Ok(work()))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(op, error = %e, "listing failed, returning no tickets");
                Vec::new()
            })
    }
}
