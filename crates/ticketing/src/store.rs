//! Ticket storage.
//!
//! The service keeps an in-memory snapshot and writes every state change
//! through a `TicketStore`. The Postgres implementation owns the
//! `tickets(ticket_id serial pk, sold_to varchar, state ticket_state)` table;
//! the in-memory implementation backs tests.

use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tracing::info;

/// Lifecycle state of a ticket row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketState {
    Available,
    Reserved,
    Sold,
}

impl TicketState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketState::Available => "available",
            TicketState::Reserved => "reserved",
            TicketState::Sold => "sold",
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        match raw {
            "available" => Ok(TicketState::Available),
            "reserved" => Ok(TicketState::Reserved),
            "sold" => Ok(TicketState::Sold),
            other => Err(Error::InvalidState(other.to_string())),
        }
    }
}

/// One ticket row.
#[derive(Debug, Clone, Serialize)]
pub struct Ticket {
    pub ticket_id: i32,
    pub sold_to: Option<String>,
    pub state: TicketState,
}

/// Persistence seam for ticket rows.
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<Ticket>>;
    async fn mark_reserved(&self, ticket_id: i32, client_id: &str) -> Result<()>;
    async fn mark_sold(&self, ticket_id: i32) -> Result<()>;
    /// Recreate the table and seed `total` available tickets. Destructive.
    async fn initialize(&self, total: u32) -> Result<()>;
}

/// Postgres-backed ticket store.
pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn fetch_all(&self) -> Result<Vec<Ticket>> {
        let rows = sqlx::query("SELECT ticket_id, sold_to, state::text AS state FROM tickets")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                let state: String = row.try_get("state")?;
                Ok(Ticket {
                    ticket_id: row.try_get("ticket_id")?,
                    sold_to: row.try_get("sold_to")?,
                    state: TicketState::parse(&state)?,
                })
            })
            .collect()
    }

    async fn mark_reserved(&self, ticket_id: i32, client_id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE tickets SET sold_to = $1, state = 'reserved'::ticket_state \
             WHERE ticket_id = $2",
        )
        .bind(client_id)
        .bind(ticket_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_sold(&self, ticket_id: i32) -> Result<()> {
        sqlx::query("UPDATE tickets SET state = 'sold'::ticket_state WHERE ticket_id = $1")
            .bind(ticket_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn initialize(&self, total: u32) -> Result<()> {
        info!(total, "recreating tickets table, existing data will be deleted");
        sqlx::query("DROP TABLE IF EXISTS tickets")
            .execute(&self.pool)
            .await?;
        sqlx::query("DROP TYPE IF EXISTS ticket_state")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE TYPE ticket_state AS ENUM ('available', 'reserved', 'sold')")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tickets (\
                 ticket_id SERIAL PRIMARY KEY,\
                 sold_to VARCHAR(50),\
                 state ticket_state NOT NULL\
             )",
        )
        .execute(&self.pool)
        .await?;
        for _ in 0..total {
            sqlx::query("INSERT INTO tickets (state) VALUES ('available')")
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }
}

/// In-memory ticket store for tests and local runs without a database.
#[derive(Default)]
pub struct MemoryTicketStore {
    tickets: Mutex<HashMap<i32, Ticket>>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with tickets `1..=total`, all available.
    pub fn with_tickets(total: u32) -> Self {
        let store = Self::new();
        store.seed(total);
        store
    }

    fn seed(&self, total: u32) {
        let mut tickets = self.tickets.lock();
        tickets.clear();
        for id in 1..=total as i32 {
            tickets.insert(
                id,
                Ticket {
                    ticket_id: id,
                    sold_to: None,
                    state: TicketState::Available,
                },
            );
        }
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn fetch_all(&self) -> Result<Vec<Ticket>> {
        Ok(self.tickets.lock().values().cloned().collect())
    }

    async fn mark_reserved(&self, ticket_id: i32, client_id: &str) -> Result<()> {
        let mut tickets = self.tickets.lock();
        let ticket = tickets
            .get_mut(&ticket_id)
            .ok_or(Error::UnknownTicket(ticket_id))?;
        ticket.sold_to = Some(client_id.to_string());
        ticket.state = TicketState::Reserved;
        Ok(())
    }

    async fn mark_sold(&self, ticket_id: i32) -> Result<()> {
        let mut tickets = self.tickets.lock();
        let ticket = tickets
            .get_mut(&ticket_id)
            .ok_or(Error::UnknownTicket(ticket_id))?;
        ticket.state = TicketState::Sold;
        Ok(())
    }

    async fn initialize(&self, total: u32) -> Result<()> {
        self.seed(total);
        Ok(())
    }
}
