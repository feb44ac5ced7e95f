//! # CLI Interface
//!
//! Defines the command-line argument structure for `cholo-node` using
//! `clap` derive. Every subcommand maps onto one ledger operation; ledger
//! settings are global flags that can also come from `CHOLO_*` environment
//! variables.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use cholo_ledger::validity::TicketState;
use cholo_ledger::LedgerConfig;

use crate::logging::LogFormat;

/// Cholo Pay ledger operator tool.
///
/// Opens the on-disk fare ledger and runs a single operation against it:
/// registering riders and owners, paying fares, listing and checking
/// tickets, and reconciling owner earnings. Results are printed to stdout
/// as JSON; logs go to stderr.
#[derive(Parser, Debug)]
#[command(
    name = "cholo-node",
    about = "Cholo Pay fare ledger operator tool",
    version,
    propagate_version = true
)]
pub struct CholoNodeCli {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// Log output format.
    #[arg(long, global = true, env = "CHOLO_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Ledger settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct LedgerArgs {
    /// Directory holding the ledger database. Created on first use.
    #[arg(long, short = 'd', global = true, env = "CHOLO_DATA_DIR", default_value = ".cholo")]
    pub data_dir: PathBuf,

    /// Milliseconds a store call may take before it is reported as
    /// unavailable.
    #[arg(long, global = true, env = "CHOLO_STORE_TIMEOUT_MS", default_value_t = 5000)]
    pub store_timeout_ms: u64,

    /// Skip the disk flush after each payment.
    #[arg(long, global = true, env = "CHOLO_NO_FLUSH")]
    pub no_flush: bool,

    /// Wallet balance for riders registered without `--balance`.
    #[arg(long, global = true, env = "CHOLO_OPENING_BALANCE", default_value_t = cholo_ledger::config::DEFAULT_OPENING_BALANCE)]
    pub opening_balance: u64,
}

impl LedgerArgs {
    /// Builds the ledger configuration these flags describe.
    pub fn to_config(&self) -> LedgerConfig {
        LedgerConfig {
            data_dir: self.data_dir.clone(),
            store_timeout: Duration::from_millis(self.store_timeout_ms),
            flush_on_commit: !self.no_flush,
            opening_balance: self.opening_balance,
        }
    }
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory and an empty ledger.
    Init,
    /// Register a rider.
    RegisterRider {
        /// Rider id issued by the identity provider.
        rider_id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Opening wallet balance; defaults to `--opening-balance`.
        #[arg(long)]
        balance: Option<u64>,
    },
    /// Register a vehicle owner and the vehicle they operate.
    RegisterOwner {
        owner_id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        vehicle: String,
        /// Fixed fare; defaults to 10.
        #[arg(long)]
        fare: Option<u64>,
    },
    /// Show a rider record.
    Rider { rider_id: String },
    /// Show an owner record.
    Owner { owner_id: String },
    /// Quote the current fare of a vehicle.
    Fare { vehicle_id: String },
    /// Pay a vehicle's fare from a rider's wallet and issue a ticket.
    Pay { rider_id: String, vehicle_id: String },
    /// List a rider's tickets, newest first.
    Tickets { rider_id: String },
    /// List the tickets issued for an owner, newest first.
    OwnerTickets {
        owner_id: String,
        /// Only `active` or only `expired` tickets.
        #[arg(long)]
        status: Option<TicketState>,
    },
    /// Check whether a ticket is usable.
    CheckTicket {
        ticket_id: String,
        /// Check at this instant instead of now. RFC 3339, or a local
        /// date-time without zone (`2026-03-01T08:30:00`).
        #[arg(long)]
        at: Option<String>,
    },
    /// Change an owner's fare and/or ticket validity window.
    UpdateSettings {
        owner_id: String,
        #[arg(long)]
        fare: Option<u64>,
        #[arg(long)]
        validity_minutes: Option<u32>,
    },
    /// Recompute an owner's earnings from their tickets and store the sum.
    ResyncEarnings { owner_id: String },
    /// Compare an owner's stored earnings with their tickets, read-only.
    AuditEarnings { owner_id: String },
    /// Mark a ticket as no longer usable.
    InvalidateTicket {
        ticket_id: String,
        /// Status value to record.
        #[arg(long, default_value = "revoked")]
        status: String,
    },
    /// Print version information and exit.
    Version,
}
