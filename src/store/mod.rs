use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Event, EventPatch, EventStats, ExternalEvent, NewEvent, NewUser, Ticket, TicketPatch,
    TicketPurchase, User, UserPatch,
};

pub mod postgres;

#[cfg(test)]
pub mod memory;

pub use postgres::PgGateway;

/// Failures reported by a data gateway. "Not found" is never an error:
/// lookups return `Ok(None)` and deletes `Ok(false)` for absent rows.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A constraint rejected the operation (duplicate email, delete of a
    /// still-referenced row). Surfaced to clients as a conflict.
    #[error("{0}")]
    Conflict(String),

    /// Anything the backing store reports that the caller cannot act on.
    #[error("data store error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Rejections of a ticket purchase. The store re-checks these under the
/// event row lock, so concurrent purchases of the last ticket cannot
/// both succeed.
#[derive(Debug, Error)]
pub enum PurchaseError {
    #[error("event not found")]
    EventNotFound,
    #[error("event is not active")]
    EventInactive,
    #[error("event is sold out")]
    SoldOut,
    #[error("ticket sales have ended")]
    SalesClosed,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for PurchaseError {
    fn from(err: sqlx::Error) -> Self {
        PurchaseError::Store(StoreError::from(err))
    }
}

/// Uniform create/read/update/delete/list operations over the users,
/// events and tickets collections plus the read-only external aggregator.
/// Creation timestamps are computed gateway-side, never taken from caller
/// input.
#[async_trait]
pub trait DataGateway: Send + Sync {
    // Users
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn user(&self, id: i64) -> StoreResult<Option<User>>;
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn update_user(&self, id: i64, patch: UserPatch) -> StoreResult<Option<User>>;
    /// `Conflict` while events or tickets still reference the user.
    async fn delete_user(&self, id: i64) -> StoreResult<bool>;

    // Events
    async fn create_event(&self, event: NewEvent) -> StoreResult<Event>;
    async fn event(&self, id: i64) -> StoreResult<Option<Event>>;
    async fn events(&self, limit: i64, offset: i64) -> StoreResult<Vec<Event>>;
    async fn events_by_organizer(&self, organizer_id: i64) -> StoreResult<Vec<Event>>;
    async fn update_event(&self, id: i64, patch: EventPatch) -> StoreResult<Option<Event>>;
    /// `Conflict` while tickets still reference the event.
    async fn delete_event(&self, id: i64) -> StoreResult<bool>;
    async fn event_stats(&self, id: i64) -> StoreResult<Option<EventStats>>;

    // Tickets
    /// Transactional purchase: locks the event row, re-checks capacity and
    /// the sales window, assigns the next sequence number. Idempotent when
    /// `external_reference` is set: redelivery returns the existing row.
    async fn purchase_ticket(&self, purchase: TicketPurchase) -> Result<Ticket, PurchaseError>;
    async fn ticket(&self, id: i64) -> StoreResult<Option<Ticket>>;
    async fn ticket_by_qr(&self, qr_code: &str) -> StoreResult<Option<Ticket>>;
    async fn tickets_by_user(&self, user_id: i64) -> StoreResult<Vec<Ticket>>;
    async fn tickets_by_event(&self, event_id: i64) -> StoreResult<Vec<Ticket>>;
    async fn update_ticket(&self, id: i64, patch: TicketPatch) -> StoreResult<Option<Ticket>>;
    /// Marks the ticket finalized under `reference` as cancelled (refunds).
    async fn cancel_ticket_by_reference(&self, reference: &str) -> StoreResult<Option<Ticket>>;
    async fn delete_ticket(&self, id: i64) -> StoreResult<bool>;

    // External aggregator (read-only)
    async fn external_events(
        &self,
        limit: i64,
        offset: i64,
        city: Option<&str>,
    ) -> StoreResult<Vec<ExternalEvent>>;
    async fn featured_external_events(&self, limit: i64) -> StoreResult<Vec<ExternalEvent>>;
}
