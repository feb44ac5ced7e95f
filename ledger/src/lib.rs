// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Cholo Pay Ledger - Core Library
//!
//! The payment and ticketing core of a transit-fare backend. Riders hold a
//! wallet balance, vehicle owners set a fixed fare, and paying that fare
//! issues a ticket that stays usable for the owner's validity window.
//!
//! Everything that touches money goes through one place: the payment
//! engine moves the fare from rider to owner and mints the ticket inside a
//! single store transaction. Everything else is either a record read or a
//! pure function over ticket data.
//!
//! ## Architecture
//!
//! ```text
//!   vehicleId ──► fare::FareResolver ──► FareQuote
//!                                           │
//!   riderId ─────────────────────────────► payment::PaymentEngine
//!                                           │   (one sled transaction:
//!                                           │    debit, credit, ticket)
//!                                           ▼
//!                                      TicketReceipt
//!
//!   query::TicketQueryService ──► validity::* ──► TicketView (active/expired)
//! ```
//!
//! - **model** - rider, owner and ticket records plus caller-facing payloads.
//! - **storage** - the [`storage::LedgerStore`] seam and its sled backend.
//! - **fare** - vehicle → (fare, validity window, owner) resolution.
//! - **payment** - the atomic fare transfer and ticket issuance.
//! - **validity** - the single shared ticket validity evaluator.
//! - **query** - ticket listings and earnings reconciliation.
//! - **registry** - rider/owner registration and owner settings.
//! - **service** - async facade with bounded store latency.
//! - **clock** - injectable time source.
//! - **config** - defaults and runtime knobs.

pub mod clock;
pub mod config;
pub mod error;
pub mod fare;
pub mod model;
pub mod payment;
pub mod query;
pub mod registry;
pub mod service;
pub mod storage;
pub mod validity;

pub use clock::{Clock, SystemClock};
pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use model::{Owner, Rider, Ticket, TicketReceipt, TicketStatus};
pub use service::TransitLedger;
pub use storage::{LedgerDb, LedgerStore};
