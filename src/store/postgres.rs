use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::models::ticket::{new_qr_code, ticket_number};
use crate::models::{
    Event, EventPatch, EventStats, ExternalEvent, NewEvent, NewUser, Ticket, TicketPatch,
    TicketPurchase, User, UserPatch,
};

use super::{DataGateway, PurchaseError, StoreError, StoreResult};

/// Every event query carries the sold count so callers never re-derive it.
const EVENT_COLUMNS: &str =
    "e.*, (SELECT COUNT(*) FROM tickets t WHERE t.event_id = e.id) AS tickets_sold";

/// Postgres-backed data gateway over a shared connection pool.
#[derive(Clone)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&self.pool).await
    }
}

fn conflict_on_unique(err: sqlx::Error, message: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(message.to_string())
        }
        _ => StoreError::from(err),
    }
}

#[async_trait]
impl DataGateway for PgGateway {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (email, name, avatar_url, provider, provider_id, is_admin, created_at) \
             VALUES ($1, $2, $3, $4, $5, FALSE, $6) \
             RETURNING *",
        )
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.avatar_url)
        .bind(&user.provider)
        .bind(&user.provider_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email is already registered"))
    }

    async fn user(&self, id: i64) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_user(&self, id: i64, patch: UserPatch) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET \
               name = COALESCE($2, name), \
               avatar_url = COALESCE($3, avatar_url), \
               is_admin = COALESCE($4, is_admin) \
             WHERE id = $1 \
             RETURNING *",
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.avatar_url)
        .bind(patch.is_admin)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        let referenced: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM tickets WHERE buyer_id = $1) \
                 OR EXISTS(SELECT 1 FROM events WHERE organizer_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        if referenced {
            return Err(StoreError::Conflict(
                "user still owns events or tickets".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_event(&self, event: NewEvent) -> StoreResult<Event> {
        let created = sqlx::query_as::<_, Event>(
            "INSERT INTO events \
               (title, description, starts_at, venue, address, city, state, image_url, \
                max_tickets, price, is_active, sales_end_at, organizer_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, TRUE, $11, $12, $13) \
             RETURNING *, 0::BIGINT AS tickets_sold",
        )
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.starts_at)
        .bind(&event.venue)
        .bind(&event.address)
        .bind(&event.city)
        .bind(&event.state)
        .bind(&event.image_url)
        .bind(event.max_tickets)
        .bind(event.price)
        .bind(event.sales_end_at)
        .bind(event.organizer_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn event(&self, id: i64) -> StoreResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events e WHERE e.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn events(&self, limit: i64, offset: i64) -> StoreResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events e WHERE e.is_active = TRUE LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn events_by_organizer(&self, organizer_id: i64) -> StoreResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events e WHERE e.organizer_id = $1"
        ))
        .bind(organizer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn update_event(&self, id: i64, patch: EventPatch) -> StoreResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(
            "UPDATE events SET \
               title = COALESCE($2, title), \
               description = COALESCE($3, description), \
               starts_at = COALESCE($4, starts_at), \
               venue = COALESCE($5, venue), \
               address = COALESCE($6, address), \
               city = COALESCE($7, city), \
               state = COALESCE($8, state), \
               image_url = COALESCE($9, image_url), \
               max_tickets = COALESCE($10, max_tickets), \
               price = COALESCE($11, price), \
               is_active = COALESCE($12, is_active), \
               sales_end_at = COALESCE($13, sales_end_at) \
             WHERE id = $1 \
             RETURNING *, \
               (SELECT COUNT(*) FROM tickets t WHERE t.event_id = events.id) AS tickets_sold",
        )
        .bind(id)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.starts_at)
        .bind(patch.venue)
        .bind(patch.address)
        .bind(patch.city)
        .bind(patch.state)
        .bind(patch.image_url)
        .bind(patch.max_tickets)
        .bind(patch.price)
        .bind(patch.is_active)
        .bind(patch.sales_end_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn delete_event(&self, id: i64) -> StoreResult<bool> {
        let ticketed: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tickets WHERE event_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if ticketed {
            return Err(StoreError::Conflict(
                "event still has tickets sold".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn event_stats(&self, id: i64) -> StoreResult<Option<EventStats>> {
        let Some(event) = self.event(id).await? else {
            return Ok(None);
        };

        let (tickets_sold, total_revenue): (i64, Decimal) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(price_paid), 0::NUMERIC) \
             FROM tickets WHERE event_id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(EventStats::compute(&event, tickets_sold, total_revenue)))
    }

    async fn purchase_ticket(&self, purchase: TicketPurchase) -> Result<Ticket, PurchaseError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        // Row lock serializes purchases per event; the capacity check below
        // runs under it.
        let event = sqlx::query_as::<_, Event>(
            "SELECT *, 0::BIGINT AS tickets_sold FROM events WHERE id = $1 FOR UPDATE",
        )
        .bind(purchase.event_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(StoreError::from)?
        .ok_or(PurchaseError::EventNotFound)?;

        if let Some(reference) = &purchase.external_reference {
            let existing = sqlx::query_as::<_, Ticket>(
                "SELECT * FROM tickets WHERE external_reference = $1",
            )
            .bind(reference)
            .fetch_optional(&mut *tx)
            .await
            .map_err(StoreError::from)?;
            if let Some(ticket) = existing {
                return Ok(ticket);
            }
        }

        if !event.is_active {
            return Err(PurchaseError::EventInactive);
        }
        let now = Utc::now();
        if now > event.sales_end_at {
            return Err(PurchaseError::SalesClosed);
        }

        let sold: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE event_id = $1")
            .bind(purchase.event_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(StoreError::from)?;
        if sold >= i64::from(event.max_tickets) {
            return Err(PurchaseError::SoldOut);
        }

        let ticket = sqlx::query_as::<_, Ticket>(
            "INSERT INTO tickets \
               (event_id, buyer_id, ticket_number, qr_code, price_paid, status, \
                external_reference, purchased_at) \
             VALUES ($1, $2, $3, $4, $5, 'active', $6, $7) \
             RETURNING *",
        )
        .bind(purchase.event_id)
        .bind(purchase.buyer_id)
        .bind(ticket_number(event.id, sold + 1))
        .bind(new_qr_code())
        .bind(purchase.price_paid.unwrap_or(event.price))
        .bind(&purchase.external_reference)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::from)?;

        tx.commit().await.map_err(StoreError::from)?;
        Ok(ticket)
    }

    async fn ticket(&self, id: i64) -> StoreResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ticket)
    }

    async fn ticket_by_qr(&self, qr_code: &str) -> StoreResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE qr_code = $1")
            .bind(qr_code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ticket)
    }

    async fn tickets_by_user(&self, user_id: i64) -> StoreResult<Vec<Ticket>> {
        let tickets = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE buyer_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(tickets)
    }

    async fn tickets_by_event(&self, event_id: i64) -> StoreResult<Vec<Ticket>> {
        let tickets = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE event_id = $1")
            .bind(event_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(tickets)
    }

    async fn update_ticket(&self, id: i64, patch: TicketPatch) -> StoreResult<Option<Ticket>> {
        let status = patch.status.map(|s| s.as_str());
        let ticket = sqlx::query_as::<_, Ticket>(
            "UPDATE tickets SET \
               status = COALESCE($2, status), \
               used_at = CASE WHEN $2 = 'used' AND used_at IS NULL THEN $3 ELSE used_at END \
             WHERE id = $1 \
             RETURNING *",
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn cancel_ticket_by_reference(&self, reference: &str) -> StoreResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "UPDATE tickets SET status = 'cancelled' \
             WHERE external_reference = $1 \
             RETURNING *",
        )
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn delete_ticket(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn external_events(
        &self,
        limit: i64,
        offset: i64,
        city: Option<&str>,
    ) -> StoreResult<Vec<ExternalEvent>> {
        let events = sqlx::query_as::<_, ExternalEvent>(
            "SELECT * FROM external_events \
             WHERE occurs_at >= $1 AND ($2::TEXT IS NULL OR city = $2) \
             ORDER BY occurs_at ASC \
             LIMIT $3 OFFSET $4",
        )
        .bind(Utc::now())
        .bind(city)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn featured_external_events(&self, limit: i64) -> StoreResult<Vec<ExternalEvent>> {
        let events = sqlx::query_as::<_, ExternalEvent>(
            "SELECT * FROM external_events \
             WHERE occurs_at >= $1 \
             ORDER BY display_priority DESC, occurs_at ASC \
             LIMIT $2",
        )
        .bind(Utc::now())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }
}
