//! Ticket reservation logic, serialized per ticket through the lock service.

use crate::error::Result;
use crate::lock_client::LockClient;
use crate::store::{TicketState, TicketStore};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Reserve/book workflow over a ticket store, fenced by named locks.
///
/// The service keeps an in-memory snapshot of ticket states alongside the
/// store. Mutations write through: the snapshot only changes after the store
/// accepted the update, so a failed write leaves no split state.
pub struct TicketingService {
    store: Arc<dyn TicketStore>,
    locks: Arc<dyn LockClient>,
    lock_ttl: Duration,
    tickets: RwLock<HashMap<i32, (Option<String>, TicketState)>>,
}

impl TicketingService {
    /// Build the service, priming the snapshot from the store.
    pub async fn new(
        store: Arc<dyn TicketStore>,
        locks: Arc<dyn LockClient>,
        lock_ttl: Duration,
    ) -> Result<Self> {
        let service = Self {
            store,
            locks,
            lock_ttl,
            tickets: RwLock::new(HashMap::new()),
        };
        service.refresh().await?;
        Ok(service)
    }

    async fn refresh(&self) -> Result<()> {
        let rows = self.store.fetch_all().await?;
        let mut tickets = self.tickets.write();
        tickets.clear();
        for row in rows {
            tickets.insert(row.ticket_id, (row.sold_to, row.state));
        }
        debug!(count = tickets.len(), "loaded tickets from the store");
        Ok(())
    }

    fn lock_key(ticket_id: i32) -> String {
        format!("ticket_lock_{}", ticket_id)
    }

    /// Reserve `ticket_id` for `client_id`.
    ///
    /// The caller must win the ticket's lock first. Holding it, an available
    /// ticket can be reserved, as can one still marked reserved by a holder
    /// whose lock lapsed. Returns `false` when the ticket is unknown, the
    /// lock is held elsewhere, the ticket is sold, or the store update
    /// failed.
    pub async fn reserve(&self, ticket_id: i32, client_id: &str) -> Result<bool> {
        debug!(ticket_id, client_id, "attempting to reserve ticket");
        if !self.tickets.read().contains_key(&ticket_id) {
            return Ok(false);
        }
        if !self
            .locks
            .acquire(&Self::lock_key(ticket_id), client_id, self.lock_ttl)
            .await?
        {
            debug!(ticket_id, client_id, "could not acquire ticket lock");
            return Ok(false);
        }
        // Re-read under the lock: a sold ticket stays sold, but a lapsed
        // reservation may be taken over by the new lock holder.
        let Some((_, state)) = self.tickets.read().get(&ticket_id).cloned() else {
            return Ok(false);
        };
        if state == TicketState::Sold {
            return Ok(false);
        }
        if let Err(err) = self.store.mark_reserved(ticket_id, client_id).await {
            error!(ticket_id, %err, "failed to update ticket in the store");
            return Ok(false);
        }
        self.tickets.write().insert(
            ticket_id,
            (Some(client_id.to_string()), TicketState::Reserved),
        );
        Ok(true)
    }

    /// Book a previously reserved ticket.
    ///
    /// Requires that `client_id` still holds a live lock on the ticket and
    /// that the reservation is its own.
    pub async fn book(&self, ticket_id: i32, client_id: &str) -> Result<bool> {
        debug!(ticket_id, client_id, "attempting to book ticket");
        let Some((sold_to, state)) = self.tickets.read().get(&ticket_id).cloned() else {
            return Ok(false);
        };
        if !self
            .locks
            .holds(&Self::lock_key(ticket_id), client_id)
            .await?
        {
            debug!(ticket_id, client_id, "client does not hold the ticket lock");
            return Ok(false);
        }
        if state != TicketState::Reserved || sold_to.as_deref() != Some(client_id) {
            return Ok(false);
        }
        if let Err(err) = self.store.mark_sold(ticket_id).await {
            error!(ticket_id, %err, "failed to update ticket in the store");
            return Ok(false);
        }
        self.tickets
            .write()
            .insert(ticket_id, (Some(client_id.to_string()), TicketState::Sold));
        Ok(true)
    }

    /// Ids of tickets still available, in order.
    pub fn available(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self
            .tickets
            .read()
            .iter()
            .filter(|(_, (_, state))| *state == TicketState::Available)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Recreate the backing table with `total` fresh tickets and reload.
    pub async fn initialize(&self, total: u32) -> Result<()> {
        self.store.initialize(total).await?;
        self.refresh().await
    }
}
