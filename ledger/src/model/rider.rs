// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! Rider records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// A registered rider and their wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rider {
    /// Identity assigned by the external identity provider.
    pub rider_id: String,
    /// Display name shown to vehicle owners.
    pub full_name: String,
    /// Contact email shown to vehicle owners.
    pub email: String,
    /// Spendable balance in whole currency units.
    pub wallet_balance: u64,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl Rider {
    /// Creates a rider record with the given opening balance.
    pub fn new(
        rider_id: impl Into<String>,
        full_name: impl Into<String>,
        email: impl Into<String>,
        wallet_balance: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            rider_id: rider_id.into(),
            full_name: full_name.into(),
            email: email.into(),
            wallet_balance,
            created_at,
        }
    }

    /// Returns `true` if the wallet covers `fare`.
    pub fn can_afford(&self, fare: u64) -> bool {
        self.wallet_balance >= fare
    }

    /// Takes `fare` out of the wallet and returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientFunds`] and leaves the balance
    /// untouched when the wallet cannot cover the fare.
    pub fn debit(&mut self, fare: u64) -> LedgerResult<u64> {
        let remaining =
            self.wallet_balance
                .checked_sub(fare)
                .ok_or(LedgerError::InsufficientFunds {
                    required: fare,
                    available: self.wallet_balance,
                })?;
        self.wallet_balance = remaining;
        Ok(remaining)
    }
}
