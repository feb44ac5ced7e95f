// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! A [`LedgerStore`] wrapper that delegates to a [`LedgerDb`] and can stall
//! or fail selected calls. Test-only.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{LedgerDb, LedgerStore, PaymentCommit};
use crate::error::{LedgerError, LedgerResult};
use crate::model::{Owner, Rider, Ticket, TicketStatus};

type Hook = Box<dyn Fn() + Send + Sync>;

pub(crate) struct HookedStore {
    inner: Arc<LedgerDb>,
    rider_delay: Duration,
    commit_delay: Duration,
    fail_flush: bool,
    after_owner_scan: Option<Hook>,
    owner_scans: AtomicUsize,
}

impl HookedStore {
    pub(crate) fn new(inner: Arc<LedgerDb>) -> Self {
        Self {
            inner,
            rider_delay: Duration::ZERO,
            commit_delay: Duration::ZERO,
            fail_flush: false,
            after_owner_scan: None,
            owner_scans: AtomicUsize::new(0),
        }
    }

    /// Sleeps before every rider read.
    pub(crate) fn stall_rider_reads(mut self, delay: Duration) -> Self {
        self.rider_delay = delay;
        self
    }

    /// Sleeps after every payment commit has landed.
    pub(crate) fn stall_commits(mut self, delay: Duration) -> Self {
        self.commit_delay = delay;
        self
    }

    /// Makes every `flush` fail.
    pub(crate) fn failing_flush(mut self) -> Self {
        self.fail_flush = true;
        self
    }

    /// Runs `hook` after each owner index scan, before the ids are returned.
    pub(crate) fn after_owner_scan(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.after_owner_scan = Some(Box::new(hook));
        self
    }

    /// Number of owner index scans served so far.
    pub(crate) fn owner_scans(&self) -> usize {
        self.owner_scans.load(Ordering::SeqCst)
    }
}

impl LedgerStore for HookedStore {
    fn insert_rider(&self, rider: &Rider) -> LedgerResult<()> {
        self.inner.insert_rider(rider)
    }

    fn rider(&self, rider_id: &str) -> LedgerResult<Option<Rider>> {
        std::thread::sleep(self.rider_delay);
        self.inner.rider(rider_id)
    }

    fn insert_owner(&self, owner: &Owner) -> LedgerResult<()> {
        self.inner.insert_owner(owner)
    }

    fn owner(&self, owner_id: &str) -> LedgerResult<Option<Owner>> {
        self.inner.owner(owner_id)
    }

    fn owner_id_for_vehicle(&self, vehicle_id: &str) -> LedgerResult<Option<String>> {
        self.inner.owner_id_for_vehicle(vehicle_id)
    }

    fn update_owner<T, F>(&self, owner_id: &str, update: F) -> LedgerResult<(Owner, T)>
    where
        F: Fn(&mut Owner) -> LedgerResult<T>,
    {
        self.inner.update_owner(owner_id, update)
    }

    fn ticket(&self, ticket_id: &str) -> LedgerResult<Option<Ticket>> {
        self.inner.ticket(ticket_id)
    }

    fn ticket_ids_for_rider(&self, rider_id: &str) -> LedgerResult<Vec<String>> {
        self.inner.ticket_ids_for_rider(rider_id)
    }

    fn ticket_ids_for_owner(&self, owner_id: &str) -> LedgerResult<Vec<String>> {
        let ids = self.inner.ticket_ids_for_owner(owner_id)?;
        self.owner_scans.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = &self.after_owner_scan {
            hook();
        }
        Ok(ids)
    }

    fn commit_payment<F>(
        &self,
        rider_id: &str,
        owner_id: &str,
        settle: F,
    ) -> LedgerResult<PaymentCommit>
    where
        F: Fn(&mut Rider, &mut Owner) -> LedgerResult<Ticket>,
    {
        let commit = self.inner.commit_payment(rider_id, owner_id, settle);
        std::thread::sleep(self.commit_delay);
        commit
    }

    fn set_ticket_status(&self, ticket_id: &str, status: TicketStatus) -> LedgerResult<Ticket> {
        self.inner.set_ticket_status(ticket_id, status)
    }

    fn flush(&self) -> LedgerResult<()> {
        if self.fail_flush {
            return Err(LedgerError::StoreUnavailable("flush failed".into()));
        }
        self.inner.flush()
    }
}
