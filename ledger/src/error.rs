// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! Error types for the ledger core.
//!
//! Every fallible ledger operation returns a [`LedgerError`]. The variants
//! fall into three groups: missing records and malformed input (the
//! caller's problem), insufficient funds (an expected business outcome),
//! and store faults (infrastructure). None of them is retried here.

use thiserror::Error;

/// Errors that can occur in any ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No rider record with this id.
    #[error("rider not found: {0}")]
    RiderNotFound(String),

    /// No owner record with this id.
    #[error("owner not found: {0}")]
    OwnerNotFound(String),

    /// No owner currently operates this vehicle.
    #[error("vehicle not found: {0}")]
    VehicleNotFound(String),

    /// No ticket with this id.
    #[error("ticket not found: {0}")]
    TicketNotFound(String),

    /// The rider's wallet cannot cover the fare. Checked before any write.
    #[error("insufficient funds: fare {required}, wallet balance {available}")]
    InsufficientFunds {
        /// Fare that had to be paid.
        required: u64,
        /// Wallet balance at the time of the check.
        available: u64,
    },

    /// The store failed or did not answer in time. Nothing was committed
    /// by the failing call unless the message says the outcome is unknown.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Malformed or rejected input.
    #[error("validation error: {0}")]
    Validation(String),

    /// A stored record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias used throughout the crate.
pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    /// `true` for the not-found family (rider, owner, vehicle, ticket).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LedgerError::RiderNotFound(_)
                | LedgerError::OwnerNotFound(_)
                | LedgerError::VehicleNotFound(_)
                | LedgerError::TicketNotFound(_)
        )
    }

    /// `true` when the caller caused the failure and resending the same
    /// request cannot succeed.
    pub fn is_client_error(&self) -> bool {
        self.is_not_found() || matches!(self, LedgerError::Validation(_))
    }

    /// `true` for infrastructure faults.
    pub fn is_store_fault(&self) -> bool {
        matches!(
            self,
            LedgerError::StoreUnavailable(_) | LedgerError::Serialization(_)
        )
    }
}

impl From<sled::Error> for LedgerError {
    fn from(e: sled::Error) -> Self {
        LedgerError::StoreUnavailable(e.to_string())
    }
}

impl From<bincode::Error> for LedgerError {
    fn from(e: bincode::Error) -> Self {
        LedgerError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(LedgerError::VehicleNotFound("BUS-1".into()).is_not_found());
        assert!(LedgerError::Validation("bad".into()).is_client_error());
        assert!(!LedgerError::InsufficientFunds {
            required: 10,
            available: 5
        }
        .is_client_error());
        assert!(LedgerError::StoreUnavailable("down".into()).is_store_fault());
        assert!(!LedgerError::TicketNotFound("t".into()).is_store_fault());
    }

    #[test]
    fn insufficient_funds_message_names_both_amounts() {
        let msg = LedgerError::InsufficientFunds {
            required: 10,
            available: 5,
        }
        .to_string();
        assert!(msg.contains("10"));
        assert!(msg.contains('5'));
    }
}
