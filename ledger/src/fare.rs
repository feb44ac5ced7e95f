// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Fare Resolution
//!
//! Maps a vehicle id to the fare a rider has to pay, how long the
//! resulting ticket stays usable, and who collects the money. The lookup
//! goes through the store's vehicle index; vehicle ids are unique by
//! construction (registration rejects duplicates), so there is never more
//! than one candidate owner.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::storage::LedgerStore;

/// What riding one vehicle costs right now.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FareQuote {
    /// Vehicle the quote is for.
    pub vehicle_id: String,
    /// Owner operating the vehicle.
    pub owner_id: String,
    /// Price of one ride.
    pub fare: u64,
    /// Validity window a ticket bought now would get.
    pub validity_minutes: u32,
}

/// Resolves vehicles to fare quotes.
#[derive(Debug)]
pub struct FareResolver<S> {
    store: Arc<S>,
}

impl<S> Clone for FareResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore> FareResolver<S> {
    /// Creates a resolver over `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Quotes the current fare for `vehicle_id`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::VehicleNotFound`] if no owner operates the vehicle,
    /// including the case where the index points at a vanished owner.
    pub fn resolve(&self, vehicle_id: &str) -> LedgerResult<FareQuote> {
        let not_found = || LedgerError::VehicleNotFound(vehicle_id.to_string());

        let owner_id = self
            .store
            .owner_id_for_vehicle(vehicle_id)?
            .ok_or_else(not_found)?;
        let owner = self.store.owner(&owner_id)?.ok_or_else(|| {
            tracing::warn!(vehicle_id, owner_id = %owner_id, "vehicle index points at missing owner");
            not_found()
        })?;

        tracing::debug!(
            vehicle_id,
            owner_id = %owner.owner_id,
            fare = owner.fixed_fare,
            validity_minutes = owner.ticket_validity_minutes,
            "fare resolved"
        );

        Ok(FareQuote {
            vehicle_id: vehicle_id.to_string(),
            owner_id: owner.owner_id,
            fare: owner.fixed_fare,
            validity_minutes: owner.ticket_validity_minutes,
        })
    }
}
