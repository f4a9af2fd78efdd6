//! Reservation scenarios against the real lock manager.
//!
//! # Test Strategy
//!
//! The lock contract is exercised in-process: a `LockClient` impl over
//! `coordination::LockManager` stands in for the HTTP lock service, and the
//! in-memory store stands in for Postgres. The serialization guarantees are
//! the same ones the deployed topology relies on.

use async_trait::async_trait;
use coordination::{LockManager, LockStatus};
use std::sync::Arc;
use std::time::Duration;
use ticketing::{LockClient, MemoryTicketStore, TicketingService};

struct InProcessLockClient {
    manager: Arc<LockManager>,
}

#[async_trait]
impl LockClient for InProcessLockClient {
    async fn acquire(
        &self,
        key: &str,
        client_id: &str,
        ttl: Duration,
    ) -> ticketing::Result<bool> {
        Ok(self.manager.acquire(key, client_id, ttl).is_ok())
    }

    async fn holds(&self, key: &str, client_id: &str) -> ticketing::Result<bool> {
        Ok(matches!(
            self.manager.status(key),
            Some((LockStatus::Locked, owner)) if owner == client_id
        ))
    }
}

async fn service_with(total: u32, lock_ttl: Duration) -> TicketingService {
    let manager = Arc::new(LockManager::new());
    TicketingService::new(
        Arc::new(MemoryTicketStore::with_tickets(total)),
        Arc::new(InProcessLockClient { manager }),
        lock_ttl,
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_racing_reserves_one_winner() {
    let service = service_with(2, Duration::from_secs(10)).await;

    let (first, second) = tokio::join!(
        service.reserve(1, "client_1"),
        service.reserve(1, "client_2")
    );
    let (first, second) = (first.unwrap(), second.unwrap());
    assert!(first ^ second, "exactly one reserve must win");

    // Only the winner may book.
    let winner = if first { "client_1" } else { "client_2" };
    let loser = if first { "client_2" } else { "client_1" };
    assert!(!service.book(1, loser).await.unwrap());
    assert!(service.book(1, winner).await.unwrap());
}

#[tokio::test]
async fn test_reserve_then_book_flow() {
    let service = service_with(3, Duration::from_secs(10)).await;
    assert_eq!(service.available(), vec![1, 2, 3]);

    assert!(service.reserve(2, "client_1").await.unwrap());
    assert_eq!(service.available(), vec![1, 3]);

    // Booking without a reservation of your own fails.
    assert!(!service.book(3, "client_1").await.unwrap());

    assert!(service.book(2, "client_1").await.unwrap());
    // A sold ticket cannot be reserved again, even by the lock holder.
    assert!(!service.reserve(2, "client_1").await.unwrap());
}

#[tokio::test]
async fn test_expired_lock_frees_reservation() {
    let lock_ttl = Duration::from_millis(50);
    let service = service_with(1, lock_ttl).await;

    assert!(service.reserve(1, "client_1").await.unwrap());
    // client_2 cannot take the ticket while client_1's lock is live.
    assert!(!service.reserve(1, "client_2").await.unwrap());

    tokio::time::sleep(Duration::from_millis(80)).await;

    // client_1 timed out; client_2 may now reserve, and client_1 may no
    // longer book with its lapsed lock.
    assert!(service.reserve(1, "client_2").await.unwrap());
    assert!(!service.book(1, "client_1").await.unwrap());
    assert!(service.book(1, "client_2").await.unwrap());
}

#[tokio::test]
async fn test_unknown_ticket_is_rejected() {
    let service = service_with(1, Duration::from_secs(10)).await;
    assert!(!service.reserve(99, "client_1").await.unwrap());
    assert!(!service.book(99, "client_1").await.unwrap());
}

#[tokio::test]
async fn test_initialize_resets_inventory() {
    let service = service_with(1, Duration::from_secs(10)).await;
    assert!(service.reserve(1, "client_1").await.unwrap());
    assert!(service.available().is_empty());

    service.initialize(4).await.unwrap();
    assert_eq!(service.available(), vec![1, 2, 3, 4]);
}
