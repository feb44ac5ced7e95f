// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ledger Records
//!
//! The three record kinds the ledger store holds, plus the receipt handed
//! back from a successful payment.
//!
//! ```text
//! rider.rs  - Rider (wallet balance)
//! owner.rs  - Owner (vehicle, fare, validity window, earnings)
//! ticket.rs - Ticket, TicketStatus, TicketReceipt
//! ```
//!
//! Records are persisted with bincode and rendered to callers as camelCase
//! JSON. Balances and fares are whole currency units (`u64`), so the
//! non-negativity invariant is carried by the type; every subtraction goes
//! through a checked helper that reports `InsufficientFunds` instead.

pub mod owner;
pub mod rider;
pub mod ticket;

pub use owner::{Owner, OwnerSettings};
pub use rider::Rider;
pub use ticket::{Ticket, TicketReceipt, TicketStatus};
