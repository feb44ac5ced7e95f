// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ticket Validity
//!
//! The one place that decides whether a ticket can still be used. Every
//! read path (rider listings, owner listings, status filters, the single
//! ticket check) calls into this module instead of comparing timestamps
//! on its own.
//!
//! A ticket is usable at `now` iff its status is `valid` **and**
//! `now < expires_at`. Both operands are compared as UTC instants: `now`
//! may carry any zone and is converted first. Instants that arrive as text
//! without a zone are read in the offset of the reference `now` (see
//! [`parse_instant`]).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::model::Ticket;

/// Zone-less layouts accepted by [`parse_instant`], tried in order.
const NAIVE_LAYOUTS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Returns `true` iff the ticket is usable at `now`.
pub fn is_valid<Tz: TimeZone>(ticket: &Ticket, now: &DateTime<Tz>) -> bool {
    ticket.status.is_valid() && now.with_timezone(&Utc) < ticket.expires_at
}

/// Time left before the ticket expires, or zero if it is not usable.
pub fn time_remaining<Tz: TimeZone>(ticket: &Ticket, now: &DateTime<Tz>) -> Duration {
    if is_valid(ticket, now) {
        ticket.expires_at - now.with_timezone(&Utc)
    } else {
        Duration::zero()
    }
}

/// Whether a ticket is still usable, as seen by listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketState {
    /// Valid status and not yet expired.
    Active,
    /// Expired, invalidated, or both.
    Expired,
}

impl TicketState {
    /// Classifies a ticket at `now`.
    pub fn of<Tz: TimeZone>(ticket: &Ticket, now: &DateTime<Tz>) -> Self {
        if is_valid(ticket, now) {
            TicketState::Active
        } else {
            TicketState::Expired
        }
    }

    /// Wire name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketState::Active => "active",
            TicketState::Expired => "expired",
        }
    }
}

impl FromStr for TicketState {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(TicketState::Active),
            "expired" => Ok(TicketState::Expired),
            other => Err(LedgerError::Validation(format!(
                "unknown ticket state '{other}', expected 'active' or 'expired'"
            ))),
        }
    }
}

impl fmt::Display for TicketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Single-ticket report
// ---------------------------------------------------------------------------

/// Answer to "is this ticket still good?" for one ticket id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidityReport {
    /// The ticket checked.
    pub ticket_id: String,
    /// Usable right now.
    pub is_valid: bool,
    /// Administrative status as stored.
    pub status: String,
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
    /// Fare that was paid for it.
    pub fare_paid: u64,
    /// Vehicle it was bought for.
    pub vehicle_id: String,
}

impl ValidityReport {
    /// Builds the report for `ticket` at `now`.
    pub fn new<Tz: TimeZone>(ticket: &Ticket, now: &DateTime<Tz>) -> Self {
        Self {
            ticket_id: ticket.ticket_id.clone(),
            is_valid: is_valid(ticket, now),
            status: ticket.status.to_string(),
            expires_at: ticket.expires_at,
            fare_paid: ticket.fare_paid,
            vehicle_id: ticket.vehicle_id.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Instant parsing
// ---------------------------------------------------------------------------

/// Parses a caller-supplied instant into UTC.
///
/// RFC 3339 input keeps its own offset. Input without a zone
/// (`2026-03-01T08:30:00`) is taken to be in the same offset as
/// `reference`.
///
/// # Errors
///
/// Returns [`LedgerError::Validation`] if the text matches no layout.
pub fn parse_instant(raw: &str, reference: &DateTime<FixedOffset>) -> LedgerResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(zoned) = DateTime::parse_from_rfc3339(raw) {
        return Ok(zoned.with_timezone(&Utc));
    }

    NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
        .and_then(|naive| reference.offset().from_local_datetime(&naive).single())
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| LedgerError::Validation(format!("unparseable instant '{raw}'")))
}
