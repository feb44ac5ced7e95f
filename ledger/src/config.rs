// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ledger Configuration & Defaults
//!
//! Every default the ledger falls back on lives here, next to the
//! [`LedgerConfig`] struct that carries the knobs an operator can turn.
//! The node binary builds a `LedgerConfig` from its command-line flags and
//! environment; tests use [`LedgerConfig::default`].

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Fare Defaults
// ---------------------------------------------------------------------------

/// Fare charged by a newly registered owner who didn't specify one.
pub const DEFAULT_FIXED_FARE: u64 = 10;

/// Minutes a ticket stays usable after issuance unless the owner changes it.
pub const DEFAULT_TICKET_VALIDITY_MINUTES: u32 = 30;

/// Wallet credit a new rider starts with.
pub const DEFAULT_OPENING_BALANCE: u64 = 500;

// ---------------------------------------------------------------------------
// Display Placeholders
// ---------------------------------------------------------------------------

/// Rider name shown on an owner's ticket when the paying rider is gone.
pub const UNKNOWN_RIDER_NAME: &str = "Unknown User";

/// Rider email shown on an owner's ticket when the paying rider is gone.
pub const UNKNOWN_RIDER_EMAIL: &str = "No email";

// ---------------------------------------------------------------------------
// Store Behaviour
// ---------------------------------------------------------------------------

/// Upper bound on a single store call made through the async facade.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// How many times earnings resynchronization recomputes the ticket sum
/// when payments keep landing underneath it.
pub const MAX_RESYNC_ATTEMPTS: usize = 5;

/// Directory name of the sled database inside the data directory.
pub const DB_DIR_NAME: &str = "ledger-db";

// ---------------------------------------------------------------------------
// LedgerConfig
// ---------------------------------------------------------------------------

/// Runtime configuration for a ledger instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LedgerConfig {
    /// Root directory for on-disk state. The database lives in
    /// `<data_dir>/ledger-db`.
    pub data_dir: PathBuf,
    /// Maximum time a store call may take before the caller gets
    /// `StoreUnavailable`.
    #[serde(with = "duration_millis")]
    pub store_timeout: Duration,
    /// Flush the store to disk after every committed payment.
    pub flush_on_commit: bool,
    /// Wallet balance granted to riders registered without an explicit one.
    pub opening_balance: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".cholo"),
            store_timeout: DEFAULT_STORE_TIMEOUT,
            flush_on_commit: true,
            opening_balance: DEFAULT_OPENING_BALANCE,
        }
    }
}

impl LedgerConfig {
    /// Path of the sled database for this configuration.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_DIR_NAME)
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
