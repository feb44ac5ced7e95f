// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Payment Transaction Engine
//!
//! `pay(rider, vehicle)` is the only operation in the ledger that moves
//! money. It runs in two phases:
//!
//! 1. **Quote** - resolve the vehicle's fare, validity window and owner.
//!    This read happens outside the transaction; the balances it does not
//!    look at are re-read inside.
//! 2. **Commit** - one store transaction that loads the rider and the
//!    owner, rejects the payment if the wallet cannot cover the fare,
//!    debits the rider, credits the owner and inserts the ticket.
//!
//! Either all three writes of phase 2 land or none do. Two payments that
//! race on the same rider are serialized by the store, so the second one
//! sees the first one's debit and fails with `InsufficientFunds` if the
//! remaining balance is too small. Nothing is retried here: every failure
//! goes back to the caller as-is.
//!
//! Once phase 2 has committed the payment is reported as successful. A
//! failed flush afterwards is logged, never returned, so an error from
//! [`PaymentEngine::pay`] always means the wallet was not touched.

use std::sync::Arc;

use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{LedgerError, LedgerResult};
use crate::fare::{FareQuote, FareResolver};
use crate::model::{Owner, Rider, Ticket, TicketReceipt};
use crate::storage::LedgerStore;

/// A quoted payment that has not been committed yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentPlan {
    /// The paying rider.
    pub rider_id: String,
    /// Id the ticket will carry if the payment commits.
    pub ticket_id: String,
    /// Fare, validity window and owner of the vehicle.
    pub quote: FareQuote,
}

/// Executes fare payments against a store.
pub struct PaymentEngine<S> {
    store: Arc<S>,
    resolver: FareResolver<S>,
    clock: Arc<dyn Clock>,
    flush_on_commit: bool,
}

impl<S> Clone for PaymentEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            resolver: self.resolver.clone(),
            clock: Arc::clone(&self.clock),
            flush_on_commit: self.flush_on_commit,
        }
    }
}

impl<S: LedgerStore> PaymentEngine<S> {
    /// Creates an engine. With `flush_on_commit` every successful payment
    /// is flushed to disk before the receipt is returned.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, flush_on_commit: bool) -> Self {
        Self {
            resolver: FareResolver::new(Arc::clone(&store)),
            store,
            clock,
            flush_on_commit,
        }
    }

    /// Pays the fare of `vehicle_id` from `rider_id`'s wallet and issues a
    /// ticket. Equivalent to [`prepare`](Self::prepare) followed by
    /// [`commit`](Self::commit).
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Validation`] for empty ids.
    /// - [`LedgerError::VehicleNotFound`] if no owner operates the vehicle.
    /// - [`LedgerError::RiderNotFound`] if the rider does not exist.
    /// - [`LedgerError::InsufficientFunds`] if the wallet is short; nothing
    ///   is written.
    /// - [`LedgerError::StoreUnavailable`] on a store fault; nothing is
    ///   written.
    pub fn pay(&self, rider_id: &str, vehicle_id: &str) -> LedgerResult<TicketReceipt> {
        let plan = self.prepare(rider_id, vehicle_id)?;
        self.commit(&plan)
    }

    /// Phase 1: validates the ids, resolves the fare and picks the ticket
    /// id. Writes nothing.
    pub fn prepare(&self, rider_id: &str, vehicle_id: &str) -> LedgerResult<PaymentPlan> {
        require_id("rider id", rider_id)?;
        require_id("vehicle id", vehicle_id)?;

        let quote = self.resolver.resolve(vehicle_id)?;
        Ok(PaymentPlan {
            rider_id: rider_id.to_string(),
            ticket_id: Uuid::new_v4().to_string(),
            quote,
        })
    }

    /// Phase 2: the payment transaction. On `Ok` the debit, the credit and
    /// the ticket are committed; on `Err` none of them are.
    pub fn commit(&self, plan: &PaymentPlan) -> LedgerResult<TicketReceipt> {
        let PaymentPlan {
            rider_id,
            ticket_id,
            quote,
        } = plan;
        let (rider_id, vehicle_id) = (rider_id.as_str(), quote.vehicle_id.as_str());

        tracing::debug!(
            rider_id,
            vehicle_id,
            owner_id = %quote.owner_id,
            fare = quote.fare,
            "processing payment"
        );

        let result = self
            .store
            .commit_payment(rider_id, &quote.owner_id, |rider, owner| {
                self.settle(quote, ticket_id, rider, owner)
            });

        let commit = match result {
            Ok(commit) => commit,
            // The owner disappeared between quote and commit.
            Err(LedgerError::OwnerNotFound(_)) => {
                return Err(LedgerError::VehicleNotFound(vehicle_id.to_string()))
            }
            Err(e @ LedgerError::InsufficientFunds { .. }) => {
                tracing::debug!(rider_id, vehicle_id, error = %e, "payment rejected");
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(rider_id, vehicle_id, error = %e, "payment failed");
                return Err(e);
            }
        };

        if self.flush_on_commit {
            if let Err(e) = self.store.flush() {
                tracing::warn!(
                    ticket_id = %commit.ticket.ticket_id,
                    error = %e,
                    "payment committed but flush failed"
                );
            }
        }

        tracing::info!(
            ticket_id = %commit.ticket.ticket_id,
            rider_id,
            vehicle_id,
            fare = commit.ticket.fare_paid,
            new_balance = commit.rider.wallet_balance,
            "payment successful, ticket issued"
        );

        Ok(TicketReceipt {
            ticket_id: commit.ticket.ticket_id,
            new_balance: commit.rider.wallet_balance,
            fare_paid: commit.ticket.fare_paid,
            vehicle_id: commit.ticket.vehicle_id,
            issued_at: commit.ticket.issued_at,
            expires_at: commit.ticket.expires_at,
            validity_minutes: quote.validity_minutes,
        })
    }

    /// The in-transaction half of a payment. Re-run by the store on
    /// conflict, so it only reads its arguments and the clock.
    fn settle(
        &self,
        quote: &FareQuote,
        ticket_id: &str,
        rider: &mut Rider,
        owner: &mut Owner,
    ) -> LedgerResult<Ticket> {
        rider.debit(quote.fare)?;
        owner.credit_fare(quote.fare)?;
        Ok(Ticket::issue(
            ticket_id,
            rider.rider_id.as_str(),
            owner.owner_id.as_str(),
            quote.vehicle_id.as_str(),
            quote.fare,
            quote.validity_minutes,
            self.clock.now(),
        ))
    }
}

fn require_id(what: &str, value: &str) -> LedgerResult<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::Validation(format!("{what} must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::model::TicketStatus;
    use crate::storage::LedgerDb;
    use crate::validity::is_valid;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 12, 18, 0, 0).unwrap()
    }

    fn setup(balance: u64, fare: u64) -> (PaymentEngine<LedgerDb>, Arc<LedgerDb>, Arc<FixedClock>) {
        let db = Arc::new(LedgerDb::open_temporary().unwrap());
        db.insert_rider(&Rider::new("r1", "Asha", "asha@example.com", balance, start()))
            .unwrap();
        db.insert_owner(&Owner::new(
            "o1",
            "Ravi",
            "ravi@example.com",
            "BUS-12",
            Some(fare),
            start(),
        ))
        .unwrap();
        let clock = Arc::new(FixedClock::new(start()));
        let engine = PaymentEngine::new(Arc::clone(&db), clock.clone(), false);
        (engine, db, clock)
    }

    #[test]
    fn scenario_balance_500_fare_10() {
        let (engine, db, clock) = setup(500, 10);

        let receipt = engine.pay("r1", "BUS-12").unwrap();
        assert_eq!(receipt.new_balance, 490);
        assert_eq!(receipt.fare_paid, 10);
        assert_eq!(receipt.validity_minutes, 30);
        assert_eq!(receipt.issued_at, start());
        assert_eq!(receipt.expires_at, start() + Duration::minutes(30));

        let ticket = db.ticket(&receipt.ticket_id).unwrap().expect("ticket stored");
        assert_eq!(ticket.status, TicketStatus::Valid);
        assert_eq!(ticket.rider_id, "r1");
        assert_eq!(ticket.owner_id, "o1");
        assert_eq!(ticket.vehicle_id, "BUS-12");
        assert!(is_valid(&ticket, &clock.now()));
        assert!(!is_valid(&ticket, &(start() + Duration::minutes(31))));

        assert_eq!(db.owner("o1").unwrap().unwrap().total_earnings, 10);
    }

    #[test]
    fn scenario_balance_5_fare_10() {
        let (engine, db, _) = setup(5, 10);

        let err = engine.pay("r1", "BUS-12").unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                required: 10,
                available: 5
            }
        );
        assert_eq!(db.rider("r1").unwrap().unwrap().wallet_balance, 5);
        assert_eq!(db.owner("o1").unwrap().unwrap().total_earnings, 0);
        assert_eq!(db.ticket_count(), 0);
    }

    #[test]
    fn exact_balance_is_enough() {
        let (engine, _, _) = setup(10, 10);
        assert_eq!(engine.pay("r1", "BUS-12").unwrap().new_balance, 0);
        assert!(matches!(
            engine.pay("r1", "BUS-12"),
            Err(LedgerError::InsufficientFunds { available: 0, .. })
        ));
    }

    #[test]
    fn unknown_vehicle_checked_before_rider() {
        let (engine, _, _) = setup(500, 10);
        assert_eq!(
            engine.pay("ghost", "TRAM-1").unwrap_err(),
            LedgerError::VehicleNotFound("TRAM-1".into())
        );
    }

    #[test]
    fn unknown_rider() {
        let (engine, db, _) = setup(500, 10);
        assert_eq!(
            engine.pay("ghost", "BUS-12").unwrap_err(),
            LedgerError::RiderNotFound("ghost".into())
        );
        assert_eq!(db.owner("o1").unwrap().unwrap().total_earnings, 0);
    }

    #[test]
    fn empty_ids_rejected() {
        let (engine, _, _) = setup(500, 10);
        assert!(matches!(engine.pay("", "BUS-12"), Err(LedgerError::Validation(_))));
        assert!(matches!(engine.pay("r1", "  "), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn fare_change_does_not_touch_existing_tickets() {
        let (engine, db, clock) = setup(500, 10);
        let first = engine.pay("r1", "BUS-12").unwrap();

        db.update_owner("o1", |o| {
            o.fixed_fare = 40;
            o.ticket_validity_minutes = 5;
            Ok(())
        })
        .unwrap();
        clock.advance(Duration::minutes(1));
        let second = engine.pay("r1", "BUS-12").unwrap();

        let old = db.ticket(&first.ticket_id).unwrap().unwrap();
        assert_eq!(old.fare_paid, 10);
        assert_eq!(old.expires_at, start() + Duration::minutes(30));
        assert_eq!(second.fare_paid, 40);
        assert_eq!(second.expires_at, clock.now() + Duration::minutes(5));
        assert_eq!(second.new_balance, 450);
    }

    #[test]
    fn each_payment_issues_a_distinct_ticket() {
        let (engine, db, _) = setup(500, 10);
        let a = engine.pay("r1", "BUS-12").unwrap();
        let b = engine.pay("r1", "BUS-12").unwrap();
        assert_ne!(a.ticket_id, b.ticket_id);
        assert_eq!(db.ticket_ids_for_rider("r1").unwrap().len(), 2);
        let owner = db.owner("o1").unwrap().unwrap();
        assert_eq!(owner.total_earnings, 20);
        assert_eq!(owner.tickets_issued, 2);
    }

    #[test]
    fn concurrent_payments_at_most_one_succeeds() {
        let (engine, db, _) = setup(100, 60);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                std::thread::spawn(move || engine.pay("r1", "BUS-12"))
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("payment thread should not panic"))
            .collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, LedgerError::InsufficientFunds { .. })));
        assert_eq!(db.rider("r1").unwrap().unwrap().wallet_balance, 40);
        assert_eq!(db.ticket_count(), 1);
    }
}
