// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # LedgerDb - sled-backed Ledger Store
//!
//! The persistence layer for the ledger, built on sled's embedded
//! key-value store.
//!
//! ## Tree Layout
//!
//! | Tree            | Key                        | Value             |
//! |-----------------|----------------------------|-------------------|
//! | `riders`        | `rider_id` (UTF-8)         | `bincode(Rider)`  |
//! | `owners`        | `owner_id` (UTF-8)         | `bincode(Owner)`  |
//! | `vehicles`      | `vehicle_id` (UTF-8)       | `owner_id`        |
//! | `tickets`       | `ticket_id` (UTF-8)        | `bincode(Ticket)` |
//! | `rider_tickets` | `rider_id \0 ticket_id`    | `ticket_id`       |
//! | `owner_tickets` | `owner_id \0 ticket_id`    | `ticket_id`       |
//!
//! The two ticket indexes are prefix-keyed so that all tickets of one
//! rider or owner are a single `scan_prefix` away.
//!
//! ## Atomicity
//!
//! A payment touches five trees. They are written in one multi-tree sled
//! transaction: the rider debit, the owner credit, the ticket and both
//! index entries land together or not at all, and two payments reading the
//! same rider balance cannot both commit.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{abort, ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};

use super::{LedgerStore, PaymentCommit};
use crate::error::{LedgerError, LedgerResult};
use crate::model::{Owner, Rider, Ticket, TicketStatus};

/// Separator between the parent id and the ticket id in index keys.
const INDEX_SEPARATOR: u8 = 0;

// ---------------------------------------------------------------------------
// LedgerDb
// ---------------------------------------------------------------------------

/// Persistent ledger store.
///
/// Cheap to clone: every clone shares the same sled database. sled
/// serializes conflicting transactions internally, so `LedgerDb` can be
/// shared across threads via `Arc<LedgerDb>` without extra locking.
#[derive(Debug, Clone)]
pub struct LedgerDb {
    db: Db,
    riders: Tree,
    owners: Tree,
    vehicles: Tree,
    tickets: Tree,
    rider_tickets: Tree,
    owner_tickets: Tree,
}

impl LedgerDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> LedgerResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a database that lives in a temporary location and is removed
    /// when the last handle is dropped.
    pub fn open_temporary() -> LedgerResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> LedgerResult<Self> {
        Ok(Self {
            riders: db.open_tree("riders")?,
            owners: db.open_tree("owners")?,
            vehicles: db.open_tree("vehicles")?,
            tickets: db.open_tree("tickets")?,
            rider_tickets: db.open_tree("rider_tickets")?,
            owner_tickets: db.open_tree("owner_tickets")?,
            db,
        })
    }

    /// Number of stored riders.
    pub fn rider_count(&self) -> usize {
        self.riders.len()
    }

    /// Number of stored owners.
    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    /// Number of stored tickets.
    pub fn ticket_count(&self) -> usize {
        self.tickets.len()
    }

    /// Raw ticket tree, for tests that need to plant damaged records.
    #[cfg(test)]
    pub(crate) fn tickets_tree(&self) -> &Tree {
        &self.tickets
    }
}

impl LedgerStore for LedgerDb {
    fn insert_rider(&self, rider: &Rider) -> LedgerResult<()> {
        let bytes = encode(rider)?;
        self.riders
            .compare_and_swap(rider.rider_id.as_bytes(), None::<&[u8]>, Some(bytes))?
            .map_err(|_| {
                LedgerError::Validation(format!("rider {} already registered", rider.rider_id))
            })
    }

    fn rider(&self, rider_id: &str) -> LedgerResult<Option<Rider>> {
        self.riders
            .get(rider_id.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    fn insert_owner(&self, owner: &Owner) -> LedgerResult<()> {
        let bytes = encode(owner)?;
        (&self.owners, &self.vehicles)
            .transaction(|(owners, vehicles)| {
                if owners.get(owner.owner_id.as_bytes())?.is_some() {
                    return abort(LedgerError::Validation(format!(
                        "owner {} already registered",
                        owner.owner_id
                    )));
                }
                if let Some(existing) = vehicles.get(owner.vehicle_id.as_bytes())? {
                    return abort(LedgerError::Validation(format!(
                        "vehicle {} already registered to owner {}",
                        owner.vehicle_id,
                        String::from_utf8_lossy(&existing)
                    )));
                }
                owners.insert(owner.owner_id.as_bytes(), bytes.clone())?;
                vehicles.insert(owner.vehicle_id.as_bytes(), owner.owner_id.as_bytes())?;
                Ok(())
            })
            .map_err(from_tx_error)
    }

    fn owner(&self, owner_id: &str) -> LedgerResult<Option<Owner>> {
        self.owners
            .get(owner_id.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    fn owner_id_for_vehicle(&self, vehicle_id: &str) -> LedgerResult<Option<String>> {
        self.vehicles
            .get(vehicle_id.as_bytes())?
            .map(|bytes| utf8(&bytes))
            .transpose()
    }

    fn update_owner<T, F>(&self, owner_id: &str, update: F) -> LedgerResult<(Owner, T)>
    where
        F: Fn(&mut Owner) -> LedgerResult<T>,
    {
        self.owners
            .transaction(|owners| {
                let before: Owner = match owners.get(owner_id.as_bytes())? {
                    Some(bytes) => decode(&bytes).map_err(ConflictableTransactionError::Abort)?,
                    None => return abort(LedgerError::OwnerNotFound(owner_id.to_string())),
                };

                let mut after = before.clone();
                let value = update(&mut after).map_err(ConflictableTransactionError::Abort)?;

                if after.owner_id != before.owner_id || after.vehicle_id != before.vehicle_id {
                    return abort(LedgerError::Validation(
                        "owner and vehicle ids cannot be changed".to_string(),
                    ));
                }
                if after != before {
                    let bytes = encode(&after).map_err(ConflictableTransactionError::Abort)?;
                    owners.insert(owner_id.as_bytes(), bytes)?;
                }
                Ok((after, value))
            })
            .map_err(from_tx_error)
    }

    fn ticket(&self, ticket_id: &str) -> LedgerResult<Option<Ticket>> {
        self.tickets
            .get(ticket_id.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    fn ticket_ids_for_rider(&self, rider_id: &str) -> LedgerResult<Vec<String>> {
        scan_index(&self.rider_tickets, rider_id)
    }

    fn ticket_ids_for_owner(&self, owner_id: &str) -> LedgerResult<Vec<String>> {
        scan_index(&self.owner_tickets, owner_id)
    }

    fn commit_payment<F>(
        &self,
        rider_id: &str,
        owner_id: &str,
        settle: F,
    ) -> LedgerResult<PaymentCommit>
    where
        F: Fn(&mut Rider, &mut Owner) -> LedgerResult<Ticket>,
    {
        (
            &self.riders,
            &self.owners,
            &self.tickets,
            &self.rider_tickets,
            &self.owner_tickets,
        )
            .transaction(|(riders, owners, tickets, by_rider, by_owner)| {
                let mut rider: Rider = match riders.get(rider_id.as_bytes())? {
                    Some(bytes) => decode(&bytes).map_err(ConflictableTransactionError::Abort)?,
                    None => return abort(LedgerError::RiderNotFound(rider_id.to_string())),
                };
                let mut owner: Owner = match owners.get(owner_id.as_bytes())? {
                    Some(bytes) => decode(&bytes).map_err(ConflictableTransactionError::Abort)?,
                    None => return abort(LedgerError::OwnerNotFound(owner_id.to_string())),
                };

                let ticket =
                    settle(&mut rider, &mut owner).map_err(ConflictableTransactionError::Abort)?;

                if tickets.get(ticket.ticket_id.as_bytes())?.is_some() {
                    return abort(LedgerError::Validation(format!(
                        "ticket id {} already in use",
                        ticket.ticket_id
                    )));
                }

                let rider_bytes = encode(&rider).map_err(ConflictableTransactionError::Abort)?;
                let owner_bytes = encode(&owner).map_err(ConflictableTransactionError::Abort)?;
                let ticket_bytes = encode(&ticket).map_err(ConflictableTransactionError::Abort)?;

                riders.insert(rider_id.as_bytes(), rider_bytes)?;
                owners.insert(owner_id.as_bytes(), owner_bytes)?;
                tickets.insert(ticket.ticket_id.as_bytes(), ticket_bytes)?;
                by_rider.insert(
                    index_key(&ticket.rider_id, &ticket.ticket_id),
                    ticket.ticket_id.as_bytes(),
                )?;
                by_owner.insert(
                    index_key(&ticket.owner_id, &ticket.ticket_id),
                    ticket.ticket_id.as_bytes(),
                )?;

                Ok(PaymentCommit {
                    rider,
                    owner,
                    ticket,
                })
            })
            .map_err(from_tx_error)
    }

    fn set_ticket_status(&self, ticket_id: &str, status: TicketStatus) -> LedgerResult<Ticket> {
        self.tickets
            .transaction(|tickets| {
                let mut ticket: Ticket = match tickets.get(ticket_id.as_bytes())? {
                    Some(bytes) => decode(&bytes).map_err(ConflictableTransactionError::Abort)?,
                    None => return abort(LedgerError::TicketNotFound(ticket_id.to_string())),
                };
                ticket.status = status.clone();
                let bytes = encode(&ticket).map_err(ConflictableTransactionError::Abort)?;
                tickets.insert(ticket_id.as_bytes(), bytes)?;
                Ok(ticket)
            })
            .map_err(from_tx_error)
    }

    fn flush(&self) -> LedgerResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn encode<T: Serialize>(value: &T) -> LedgerResult<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> LedgerResult<T> {
    Ok(bincode::deserialize(bytes)?)
}

fn utf8(bytes: &[u8]) -> LedgerResult<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| LedgerError::Serialization(e.to_string()))
}

fn index_prefix(parent_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(parent_id.len() + 1);
    key.extend_from_slice(parent_id.as_bytes());
    key.push(INDEX_SEPARATOR);
    key
}

fn index_key(parent_id: &str, ticket_id: &str) -> Vec<u8> {
    let mut key = index_prefix(parent_id);
    key.extend_from_slice(ticket_id.as_bytes());
    key
}

fn scan_index(tree: &Tree, parent_id: &str) -> LedgerResult<Vec<String>> {
    let mut ids = Vec::new();
    for entry in tree.scan_prefix(index_prefix(parent_id)) {
        let (_key, value) = entry?;
        ids.push(utf8(&value)?);
    }
    Ok(ids)
}

fn from_tx_error(e: TransactionError<LedgerError>) -> LedgerError {
    match e {
        TransactionError::Abort(inner) => inner,
        TransactionError::Storage(storage) => storage.into(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
