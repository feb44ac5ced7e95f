// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Record Registry
//!
//! Plain record operations around the payment core: registering riders and
//! owners, reading them back, changing an owner's fare settings, and the
//! administrative ticket invalidation hook. None of these move money.
//!
//! Ids come from the external identity provider and are taken as given,
//! apart from basic shape checks. A NUL byte is rejected because the
//! ticket indexes use it as a key separator.

use std::sync::Arc;

use crate::clock::Clock;
use crate::error::{LedgerError, LedgerResult};
use crate::model::{Owner, OwnerSettings, Rider, Ticket, TicketStatus};
use crate::storage::LedgerStore;

/// Registration and record maintenance.
pub struct Registry<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    opening_balance: u64,
}

impl<S> Clone for Registry<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            opening_balance: self.opening_balance,
        }
    }
}

impl<S: LedgerStore> Registry<S> {
    /// Creates a registry. Riders registered without an explicit balance
    /// start with `opening_balance`.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, opening_balance: u64) -> Self {
        Self {
            store,
            clock,
            opening_balance,
        }
    }

    // -----------------------------------------------------------------------
    // Riders
    // -----------------------------------------------------------------------

    /// Registers a rider.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Validation`] for a malformed id, a blank name or
    /// email, or an id that is already registered.
    pub fn register_rider(
        &self,
        rider_id: &str,
        full_name: &str,
        email: &str,
        opening_balance: Option<u64>,
    ) -> LedgerResult<Rider> {
        validate_id("rider id", rider_id)?;
        require_text("full name", full_name)?;
        require_text("email", email)?;

        let rider = Rider::new(
            rider_id,
            full_name.trim(),
            email.trim(),
            opening_balance.unwrap_or(self.opening_balance),
            self.clock.now(),
        );
        self.store.insert_rider(&rider)?;

        tracing::info!(rider_id, balance = rider.wallet_balance, "rider registered");
        Ok(rider)
    }

    /// Loads a rider.
    pub fn rider(&self, rider_id: &str) -> LedgerResult<Rider> {
        self.store
            .rider(rider_id)?
            .ok_or_else(|| LedgerError::RiderNotFound(rider_id.to_string()))
    }

    // -----------------------------------------------------------------------
    // Owners
    // -----------------------------------------------------------------------

    /// Registers an owner together with the vehicle it operates.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Validation`] for malformed input, a zero fare, an
    /// existing owner id, or a vehicle already operated by someone else.
    pub fn register_owner(
        &self,
        owner_id: &str,
        full_name: &str,
        email: &str,
        vehicle_id: &str,
        fixed_fare: Option<u64>,
    ) -> LedgerResult<Owner> {
        validate_id("owner id", owner_id)?;
        validate_id("vehicle id", vehicle_id)?;
        require_text("full name", full_name)?;
        require_text("email", email)?;
        if fixed_fare == Some(0) {
            return Err(LedgerError::Validation(
                "fixed fare must be greater than 0".to_string(),
            ));
        }

        let owner = Owner::new(
            owner_id,
            full_name.trim(),
            email.trim(),
            vehicle_id,
            fixed_fare,
            self.clock.now(),
        );
        self.store.insert_owner(&owner)?;

        tracing::info!(
            owner_id,
            vehicle_id,
            fare = owner.fixed_fare,
            validity_minutes = owner.ticket_validity_minutes,
            "owner registered"
        );
        Ok(owner)
    }

    /// Loads an owner.
    pub fn owner(&self, owner_id: &str) -> LedgerResult<Owner> {
        self.store
            .owner(owner_id)?
            .ok_or_else(|| LedgerError::OwnerNotFound(owner_id.to_string()))
    }

    /// Changes an owner's fare and/or validity window and returns the
    /// applied changes. Tickets already issued are untouched.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Validation`] if no field is set or a value is zero;
    /// [`LedgerError::OwnerNotFound`] if the owner does not exist.
    pub fn update_owner_settings(
        &self,
        owner_id: &str,
        settings: OwnerSettings,
    ) -> LedgerResult<OwnerSettings> {
        settings.validate()?;

        self.store.update_owner(owner_id, |owner| {
            owner.apply_settings(&settings);
            Ok(())
        })?;

        tracing::info!(
            owner_id,
            fare = ?settings.fixed_fare,
            validity_minutes = ?settings.ticket_validity_minutes,
            "owner settings updated"
        );
        Ok(settings)
    }

    // -----------------------------------------------------------------------
    // Tickets
    // -----------------------------------------------------------------------

    /// Marks a ticket as administratively invalid with the given status
    /// label (`revoked`, `refunded`, ...).
    ///
    /// # Errors
    ///
    /// [`LedgerError::Validation`] if `status` is empty or `valid`;
    /// [`LedgerError::TicketNotFound`] if the ticket does not exist.
    pub fn invalidate_ticket(&self, ticket_id: &str, status: &str) -> LedgerResult<Ticket> {
        let status: TicketStatus = status.parse()?;
        if status.is_valid() {
            return Err(LedgerError::Validation(
                "tickets cannot be set back to valid".to_string(),
            ));
        }

        let ticket = self.store.set_ticket_status(ticket_id, status)?;
        tracing::info!(ticket_id, status = %ticket.status, "ticket invalidated");
        Ok(ticket)
    }
}

fn validate_id(what: &str, id: &str) -> LedgerResult<()> {
    if id.trim().is_empty() {
        return Err(LedgerError::Validation(format!("{what} must not be empty")));
    }
    if id.contains('\0') {
        return Err(LedgerError::Validation(format!(
            "{what} must not contain NUL bytes"
        )));
    }
    Ok(())
}

fn require_text(what: &str, value: &str) -> LedgerResult<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::Validation(format!("{what} must not be blank")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::{DEFAULT_FIXED_FARE, DEFAULT_OPENING_BALANCE};
    use crate::payment::PaymentEngine;
    use crate::storage::LedgerDb;
    use chrono::{TimeZone, Utc};

    fn registry() -> (Registry<LedgerDb>, Arc<LedgerDb>, Arc<FixedClock>) {
        let db = Arc::new(LedgerDb::open_temporary().unwrap());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap(),
        ));
        let registry = Registry::new(Arc::clone(&db), clock.clone(), DEFAULT_OPENING_BALANCE);
        (registry, db, clock)
    }

    #[test]
    fn register_rider_with_default_balance() {
        let (registry, _, clock) = registry();
        let rider = registry
            .register_rider("r1", " Asha ", "asha@example.com", None)
            .unwrap();
        assert_eq!(rider.wallet_balance, 500);
        assert_eq!(rider.full_name, "Asha");
        assert_eq!(rider.created_at, clock.now());
        assert_eq!(registry.rider("r1").unwrap(), rider);
    }

    #[test]
    fn register_rider_rejects_bad_input() {
        let (registry, _, _) = registry();
        for (id, name, email) in [
            ("", "A", "a@x"),
            ("r\0", "A", "a@x"),
            ("r1", "  ", "a@x"),
            ("r1", "A", ""),
        ] {
            assert!(
                matches!(
                    registry.register_rider(id, name, email, None),
                    Err(LedgerError::Validation(_))
                ),
                "{id:?}/{name:?}/{email:?} should be rejected"
            );
        }

        registry.register_rider("r1", "A", "a@x", Some(0)).unwrap();
        assert!(matches!(
            registry.register_rider("r1", "B", "b@x", None),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn missing_records_are_not_found() {
        let (registry, _, _) = registry();
        assert_eq!(
            registry.rider("x").unwrap_err(),
            LedgerError::RiderNotFound("x".into())
        );
        assert_eq!(
            registry.owner("x").unwrap_err(),
            LedgerError::OwnerNotFound("x".into())
        );
    }

    #[test]
    fn register_owner_defaults_and_duplicates() {
        let (registry, db, _) = registry();
        let owner = registry
            .register_owner("o1", "Ravi", "ravi@example.com", "CNG-4", None)
            .unwrap();
        assert_eq!(owner.fixed_fare, DEFAULT_FIXED_FARE);
        assert_eq!(owner.ticket_validity_minutes, 30);
        assert_eq!(owner.total_earnings, 0);
        assert_eq!(db.owner_id_for_vehicle("CNG-4").unwrap().as_deref(), Some("o1"));

        assert!(matches!(
            registry.register_owner("o2", "Mina", "mina@example.com", "CNG-4", Some(20)),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            registry.register_owner("o3", "Joy", "joy@example.com", "CNG-5", Some(0)),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn settings_update_validates_and_applies() {
        let (registry, _, _) = registry();
        registry
            .register_owner("o1", "Ravi", "ravi@example.com", "CNG-4", None)
            .unwrap();

        assert!(matches!(
            registry.update_owner_settings("o1", OwnerSettings::default()),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            registry.update_owner_settings(
                "o1",
                OwnerSettings {
                    fixed_fare: Some(0),
                    ticket_validity_minutes: None
                }
            ),
            Err(LedgerError::Validation(_))
        ));

        let applied = registry
            .update_owner_settings(
                "o1",
                OwnerSettings {
                    fixed_fare: None,
                    ticket_validity_minutes: Some(45),
                },
            )
            .unwrap();
        assert_eq!(applied.ticket_validity_minutes, Some(45));

        let owner = registry.owner("o1").unwrap();
        assert_eq!(owner.fixed_fare, DEFAULT_FIXED_FARE);
        assert_eq!(owner.ticket_validity_minutes, 45);

        assert_eq!(
            registry
                .update_owner_settings(
                    "ghost",
                    OwnerSettings {
                        fixed_fare: Some(5),
                        ticket_validity_minutes: None
                    }
                )
                .unwrap_err(),
            LedgerError::OwnerNotFound("ghost".into())
        );
    }

    #[test]
    fn invalidate_ticket_flow() {
        let (registry, db, clock) = registry();
        registry.register_rider("r1", "Asha", "a@x", None).unwrap();
        registry
            .register_owner("o1", "Ravi", "r@x", "CNG-4", None)
            .unwrap();
        let engine = PaymentEngine::new(Arc::clone(&db), clock, false);
        let receipt = engine.pay("r1", "CNG-4").unwrap();

        assert!(matches!(
            registry.invalidate_ticket(&receipt.ticket_id, "valid"),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            registry.invalidate_ticket(&receipt.ticket_id, " "),
            Err(LedgerError::Validation(_))
        ));

        let ticket = registry.invalidate_ticket(&receipt.ticket_id, "revoked").unwrap();
        assert_eq!(ticket.status.as_str(), "revoked");
        assert_eq!(
            registry.invalidate_ticket("missing", "revoked").unwrap_err(),
            LedgerError::TicketNotFound("missing".into())
        );
    }
}
