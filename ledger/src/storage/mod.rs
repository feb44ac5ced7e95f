// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Storage Module
//!
//! The ledger never talks to a database directly. It talks to a
//! [`LedgerStore`]: a document store with three record collections
//! (riders, owners, tickets), a vehicle index, and per-call transactions.
//!
//! ```text
//! mod.rs - the LedgerStore trait and the PaymentCommit outcome
//! db.rs  - LedgerDb, the sled-backed implementation
//! testing.rs - a stalling/failing LedgerDb wrapper (tests only)
//! ```
//!
//! ## Design Decisions
//!
//! 1. **Closures decide, the store commits.** The read-modify-write paths
//!    (`commit_payment`, `update_owner`) hand the loaded records to a
//!    closure and persist whatever it leaves behind. Business rules stay in
//!    the engine; isolation stays in the store. Closures must be pure
//!    functions of their inputs because a conflicting transaction re-runs
//!    them.
//!
//! 2. **Indexes instead of scans.** Vehicle → owner and owner/rider →
//!    tickets are maintained as index trees inside the same transactions
//!    that write the records they point at.
//!
//! 3. **Explicit handles.** A store is opened once and passed into every
//!    component. There is no process-wide handle and no "not initialized"
//!    state to check per call.

pub mod db;
#[cfg(test)]
pub(crate) mod testing;

pub use db::LedgerDb;

use crate::error::LedgerResult;
use crate::model::{Owner, Rider, Ticket, TicketStatus};

/// Everything a committed payment touched, as persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentCommit {
    /// Rider after the debit.
    pub rider: Rider,
    /// Owner after the credit.
    pub owner: Owner,
    /// The ticket that was inserted.
    pub ticket: Ticket,
}

/// The document store the ledger runs against.
///
/// Implementations must be safe to share across threads; every method may
/// be called concurrently with any other.
pub trait LedgerStore: Send + Sync + 'static {
    /// Inserts a new rider.
    ///
    /// # Errors
    ///
    /// `Validation` if a rider with the same id already exists.
    fn insert_rider(&self, rider: &Rider) -> LedgerResult<()>;

    /// Loads a rider.
    fn rider(&self, rider_id: &str) -> LedgerResult<Option<Rider>>;

    /// Inserts a new owner and maps its vehicle to it, atomically.
    ///
    /// # Errors
    ///
    /// `Validation` if the owner id exists or the vehicle is already
    /// mapped to an owner.
    fn insert_owner(&self, owner: &Owner) -> LedgerResult<()>;

    /// Loads an owner.
    fn owner(&self, owner_id: &str) -> LedgerResult<Option<Owner>>;

    /// Looks up which owner operates `vehicle_id`.
    fn owner_id_for_vehicle(&self, vehicle_id: &str) -> LedgerResult<Option<String>>;

    /// Isolated read-modify-write of one owner record.
    ///
    /// The closure may change any field except the owner and vehicle ids.
    /// The record is written back only if the closure changed it. Returns
    /// the owner as it stands afterwards together with the closure's
    /// value.
    ///
    /// # Errors
    ///
    /// `OwnerNotFound` if absent; any error the closure returns (nothing
    /// is written in that case).
    fn update_owner<T, F>(&self, owner_id: &str, update: F) -> LedgerResult<(Owner, T)>
    where
        F: Fn(&mut Owner) -> LedgerResult<T>;

    /// Loads a ticket.
    fn ticket(&self, ticket_id: &str) -> LedgerResult<Option<Ticket>>;

    /// Ids of every ticket bought by `rider_id`.
    fn ticket_ids_for_rider(&self, rider_id: &str) -> LedgerResult<Vec<String>>;

    /// Ids of every ticket issued for `owner_id`.
    fn ticket_ids_for_owner(&self, owner_id: &str) -> LedgerResult<Vec<String>>;

    /// Runs one payment as a single isolated transaction.
    ///
    /// Loads the rider and the owner, lets `settle` debit, credit and mint
    /// the ticket, then writes the rider, the owner, the ticket and both
    /// ticket indexes together. If `settle` fails nothing is written.
    ///
    /// # Errors
    ///
    /// `RiderNotFound` / `OwnerNotFound` for missing records, whatever
    /// `settle` returns, or a store fault.
    fn commit_payment<F>(
        &self,
        rider_id: &str,
        owner_id: &str,
        settle: F,
    ) -> LedgerResult<PaymentCommit>
    where
        F: Fn(&mut Rider, &mut Owner) -> LedgerResult<Ticket>;

    /// Overwrites a ticket's status and returns the updated ticket.
    ///
    /// # Errors
    ///
    /// `TicketNotFound` if absent.
    fn set_ticket_status(&self, ticket_id: &str, status: TicketStatus) -> LedgerResult<Ticket>;

    /// Blocks until all written data is durable.
    fn flush(&self) -> LedgerResult<()>;
}
