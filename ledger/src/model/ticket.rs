// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Tickets
//!
//! A ticket is minted exactly once, by the payment engine, and is never
//! deleted. Every field except `status` is frozen at issuance: the fare is
//! a snapshot of the owner's fare at that moment and `expires_at` is
//! computed once from the owner's validity window.
//!
//! `status` is the one field an outside process may overwrite. The ledger
//! itself only ever writes [`TicketStatus::Valid`]; anything else means
//! the ticket was administratively invalidated and must be honoured by
//! every read path.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Wire value of the only status the ledger writes itself.
pub const STATUS_VALID: &str = "valid";

// ---------------------------------------------------------------------------
// TicketStatus
// ---------------------------------------------------------------------------

/// Administrative status of a ticket.
///
/// Persisted and rendered as a bare string: `"valid"` or whatever value
/// the invalidating process chose (`"revoked"`, `"refunded"`, ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TicketStatus {
    /// Usable until it expires.
    Valid,
    /// Invalidated by an outside process. Carries the status value written.
    Invalidated(String),
}

impl TicketStatus {
    /// Returns `true` for [`TicketStatus::Valid`].
    pub fn is_valid(&self) -> bool {
        matches!(self, TicketStatus::Valid)
    }

    /// The wire value of this status.
    pub fn as_str(&self) -> &str {
        match self {
            TicketStatus::Valid => STATUS_VALID,
            TicketStatus::Invalidated(value) => value,
        }
    }
}

impl From<String> for TicketStatus {
    fn from(value: String) -> Self {
        if value == STATUS_VALID {
            TicketStatus::Valid
        } else {
            TicketStatus::Invalidated(value)
        }
    }
}

impl From<TicketStatus> for String {
    fn from(status: TicketStatus) -> Self {
        match status {
            TicketStatus::Valid => STATUS_VALID.to_string(),
            TicketStatus::Invalidated(value) => value,
        }
    }
}

impl FromStr for TicketStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::Validation(
                "ticket status must not be empty".to_string(),
            ));
        }
        Ok(TicketStatus::from(trimmed.to_string()))
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Ticket
// ---------------------------------------------------------------------------

/// A ride ticket bought by a rider for one owner's vehicle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Globally unique id (UUIDv4).
    pub ticket_id: String,
    /// The paying rider.
    pub rider_id: String,
    /// The owner who collected the fare.
    pub owner_id: String,
    /// The owner's vehicle id at issuance time.
    pub vehicle_id: String,
    /// Fare charged, snapshotted at issuance.
    pub fare_paid: u64,
    /// Commit instant of the payment transaction.
    pub issued_at: DateTime<Utc>,
    /// `issued_at` plus the owner's validity window at issuance.
    pub expires_at: DateTime<Utc>,
    /// Administrative status.
    pub status: TicketStatus,
}

impl Ticket {
    /// Mints a fresh, valid ticket expiring `validity_minutes` after
    /// `issued_at`.
    pub fn issue(
        ticket_id: impl Into<String>,
        rider_id: impl Into<String>,
        owner_id: impl Into<String>,
        vehicle_id: impl Into<String>,
        fare_paid: u64,
        validity_minutes: u32,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            rider_id: rider_id.into(),
            owner_id: owner_id.into(),
            vehicle_id: vehicle_id.into(),
            fare_paid,
            issued_at,
            expires_at: issued_at + Duration::minutes(i64::from(validity_minutes)),
            status: TicketStatus::Valid,
        }
    }
}

// ---------------------------------------------------------------------------
// Receipt
// ---------------------------------------------------------------------------

/// Confirmation returned from a successful payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketReceipt {
    /// Id of the minted ticket.
    pub ticket_id: String,
    /// Rider's wallet balance after the fare was taken.
    pub new_balance: u64,
    /// Fare charged.
    pub fare_paid: u64,
    /// Vehicle the ticket is for.
    pub vehicle_id: String,
    /// When the ticket was issued.
    pub issued_at: DateTime<Utc>,
    /// When the ticket stops being usable.
    pub expires_at: DateTime<Utc>,
    /// Length of the validity window that was applied.
    pub validity_minutes: u32,
}
