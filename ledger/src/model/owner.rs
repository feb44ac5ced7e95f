// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! Vehicle owner records and their fare settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_FIXED_FARE, DEFAULT_TICKET_VALIDITY_MINUTES};
use crate::error::{LedgerError, LedgerResult};

/// A vehicle owner who collects fares.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    /// Identity assigned by the external identity provider.
    pub owner_id: String,
    /// Display name.
    pub full_name: String,
    /// Contact email.
    pub email: String,
    /// The vehicle this owner operates. Unique across owners.
    pub vehicle_id: String,
    /// Price of one ride. Always positive.
    pub fixed_fare: u64,
    /// How long a freshly issued ticket stays usable. Always positive.
    pub ticket_validity_minutes: u32,
    /// Running total of fares collected. Only payments raise it; only
    /// earnings resynchronization may overwrite it.
    pub total_earnings: u64,
    /// Number of tickets issued for this owner. Raised in the same
    /// transaction as `total_earnings`.
    pub tickets_issued: u64,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl Owner {
    /// Creates an owner with the default validity window and no earnings.
    ///
    /// A `fixed_fare` of `None` falls back to [`DEFAULT_FIXED_FARE`].
    pub fn new(
        owner_id: impl Into<String>,
        full_name: impl Into<String>,
        email: impl Into<String>,
        vehicle_id: impl Into<String>,
        fixed_fare: Option<u64>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            full_name: full_name.into(),
            email: email.into(),
            vehicle_id: vehicle_id.into(),
            fixed_fare: fixed_fare.unwrap_or(DEFAULT_FIXED_FARE),
            ticket_validity_minutes: DEFAULT_TICKET_VALIDITY_MINUTES,
            total_earnings: 0,
            tickets_issued: 0,
            created_at,
        }
    }

    /// Books one collected fare and returns the new earnings total.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] if the total would overflow.
    pub fn credit_fare(&mut self, fare: u64) -> LedgerResult<u64> {
        let total = self.total_earnings.checked_add(fare).ok_or_else(|| {
            LedgerError::Validation(format!(
                "earnings overflow for owner {}: {} + {}",
                self.owner_id, self.total_earnings, fare
            ))
        })?;
        self.total_earnings = total;
        self.tickets_issued += 1;
        Ok(total)
    }

    /// Applies a settings change. Fields left as `None` keep their value.
    pub fn apply_settings(&mut self, settings: &OwnerSettings) {
        if let Some(fare) = settings.fixed_fare {
            self.fixed_fare = fare;
        }
        if let Some(minutes) = settings.ticket_validity_minutes {
            self.ticket_validity_minutes = minutes;
        }
    }
}

/// A partial update to an owner's fare settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSettings {
    /// New fare, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_fare: Option<u64>,
    /// New validity window in minutes, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_validity_minutes: Option<u32>,
}

impl OwnerSettings {
    /// Checks that at least one field is set and every set value is positive.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] describing the first problem.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.fixed_fare.is_none() && self.ticket_validity_minutes.is_none() {
            return Err(LedgerError::Validation(
                "no valid fields to update".to_string(),
            ));
        }
        if self.fixed_fare == Some(0) {
            return Err(LedgerError::Validation(
                "fixed fare must be greater than 0".to_string(),
            ));
        }
        if self.ticket_validity_minutes == Some(0) {
            return Err(LedgerError::Validation(
                "ticket validity must be greater than 0 minutes".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Owner {
        Owner::new("owner-1", "Ravi", "ravi@example.com", "BUS-42", None, Utc::now())
    }

    #[test]
    fn new_owner_uses_defaults() {
        let o = owner();
        assert_eq!(o.fixed_fare, DEFAULT_FIXED_FARE);
        assert_eq!(o.ticket_validity_minutes, DEFAULT_TICKET_VALIDITY_MINUTES);
        assert_eq!(o.total_earnings, 0);
        assert_eq!(o.tickets_issued, 0);
    }

    #[test]
    fn credit_fare_accumulates_and_counts() {
        let mut o = owner();
        o.credit_fare(10).unwrap();
        assert_eq!(o.credit_fare(15).unwrap(), 25);
        assert_eq!(o.tickets_issued, 2);
    }

    #[test]
    fn credit_fare_overflow_rejected() {
        let mut o = owner();
        o.total_earnings = u64::MAX;
        assert!(matches!(o.credit_fare(1), Err(LedgerError::Validation(_))));
        assert_eq!(o.tickets_issued, 0);
    }

    #[test]
    fn settings_validation() {
        assert!(OwnerSettings::default().validate().is_err());
        assert!(OwnerSettings {
            fixed_fare: Some(0),
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(OwnerSettings {
            ticket_validity_minutes: Some(0),
            fixed_fare: Some(20),
        }
        .validate()
        .is_err());
        assert!(OwnerSettings {
            ticket_validity_minutes: Some(45),
            ..Default::default()
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn apply_settings_keeps_unset_fields() {
        let mut o = owner();
        o.apply_settings(&OwnerSettings {
            fixed_fare: Some(25),
            ticket_validity_minutes: None,
        });
        assert_eq!(o.fixed_fare, 25);
        assert_eq!(o.ticket_validity_minutes, DEFAULT_TICKET_VALIDITY_MINUTES);
    }
}
