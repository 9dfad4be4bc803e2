//! In-memory gateway used by the router tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use crate::models::ticket::{new_qr_code, ticket_number};
use crate::models::{
    Event, EventPatch, EventStats, ExternalEvent, NewEvent, NewUser, Ticket, TicketPatch,
    TicketPurchase, TicketStatus, User, UserPatch,
};

use super::{DataGateway, PurchaseError, StoreError, StoreResult};

#[derive(Default)]
pub struct MemoryGateway {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    events: Vec<Event>,
    tickets: Vec<Ticket>,
    external_events: Vec<ExternalEvent>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// The aggregator collection is externally populated; tests seed it
    /// directly.
    pub fn seed_external_events(&self, events: Vec<ExternalEvent>) {
        self.inner.lock().unwrap().external_events.extend(events);
    }
}

fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().unwrap_or(0) + 1
}

fn sold(inner: &Inner, event_id: i64) -> i64 {
    inner
        .tickets
        .iter()
        .filter(|ticket| ticket.event_id == event_id)
        .count() as i64
}

fn with_count(inner: &Inner, mut event: Event) -> Event {
    event.tickets_sold = sold(inner, event.id);
    event
}

#[async_trait]
impl DataGateway for MemoryGateway {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("email is already registered".into()));
        }
        let created = User {
            id: next_id(inner.users.iter().map(|u| u.id)),
            email: user.email,
            name: user.name,
            avatar_url: user.avatar_url,
            provider: user.provider,
            provider_id: user.provider_id,
            is_admin: false,
            created_at: Utc::now(),
        };
        inner.users.push(created.clone());
        Ok(created)
    }

    async fn user(&self, id: i64) -> StoreResult<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, id: i64, patch: UserPatch) -> StoreResult<Option<User>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(user) = inner.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(avatar_url) = patch.avatar_url {
            user.avatar_url = Some(avatar_url);
        }
        if let Some(is_admin) = patch.is_admin {
            user.is_admin = is_admin;
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        let referenced = inner.tickets.iter().any(|t| t.buyer_id == id)
            || inner.events.iter().any(|e| e.organizer_id == id);
        if referenced {
            return Err(StoreError::Conflict(
                "user still owns events or tickets".into(),
            ));
        }
        let before = inner.users.len();
        inner.users.retain(|u| u.id != id);
        Ok(inner.users.len() < before)
    }

    async fn create_event(&self, event: NewEvent) -> StoreResult<Event> {
        let mut inner = self.inner.lock().unwrap();
        let created = Event {
            id: next_id(inner.events.iter().map(|e| e.id)),
            title: event.title,
            description: event.description,
            starts_at: event.starts_at,
            venue: event.venue,
            address: event.address,
            city: event.city,
            state: event.state,
            image_url: event.image_url,
            max_tickets: event.max_tickets,
            price: event.price,
            is_active: true,
            sales_end_at: event.sales_end_at,
            organizer_id: event.organizer_id,
            created_at: Utc::now(),
            tickets_sold: 0,
        };
        inner.events.push(created.clone());
        Ok(created)
    }

    async fn event(&self, id: i64) -> StoreResult<Option<Event>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .events
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .map(|event| with_count(&inner, event)))
    }

    async fn events(&self, limit: i64, offset: i64) -> StoreResult<Vec<Event>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .events
            .iter()
            .filter(|e| e.is_active)
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .map(|event| with_count(&inner, event))
            .collect())
    }

    async fn events_by_organizer(&self, organizer_id: i64) -> StoreResult<Vec<Event>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .events
            .iter()
            .filter(|e| e.organizer_id == organizer_id)
            .cloned()
            .map(|event| with_count(&inner, event))
            .collect())
    }

    async fn update_event(&self, id: i64, patch: EventPatch) -> StoreResult<Option<Event>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(index) = inner.events.iter().position(|e| e.id == id) else {
            return Ok(None);
        };
        {
            let event = &mut inner.events[index];
            if let Some(title) = patch.title {
                event.title = title;
            }
            if let Some(description) = patch.description {
                event.description = description;
            }
            if let Some(starts_at) = patch.starts_at {
                event.starts_at = starts_at;
            }
            if let Some(venue) = patch.venue {
                event.venue = venue;
            }
            if let Some(address) = patch.address {
                event.address = address;
            }
            if let Some(city) = patch.city {
                event.city = city;
            }
            if let Some(state) = patch.state {
                event.state = state;
            }
            if let Some(image_url) = patch.image_url {
                event.image_url = Some(image_url);
            }
            if let Some(max_tickets) = patch.max_tickets {
                event.max_tickets = max_tickets;
            }
            if let Some(price) = patch.price {
                event.price = price;
            }
            if let Some(is_active) = patch.is_active {
                event.is_active = is_active;
            }
            if let Some(sales_end_at) = patch.sales_end_at {
                event.sales_end_at = sales_end_at;
            }
        }
        let event = inner.events[index].clone();
        Ok(Some(with_count(&inner, event)))
    }

    async fn delete_event(&self, id: i64) -> StoreResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        if inner.tickets.iter().any(|t| t.event_id == id) {
            return Err(StoreError::Conflict("event still has tickets sold".into()));
        }
        let before = inner.events.len();
        inner.events.retain(|e| e.id != id);
        Ok(inner.events.len() < before)
    }

    async fn event_stats(&self, id: i64) -> StoreResult<Option<EventStats>> {
        let inner = self.inner.lock().unwrap();
        let Some(event) = inner.events.iter().find(|e| e.id == id).cloned() else {
            return Ok(None);
        };
        let event = with_count(&inner, event);
        let total_revenue = inner
            .tickets
            .iter()
            .filter(|t| t.event_id == id)
            .map(|t| t.price_paid)
            .sum::<Decimal>();
        Ok(Some(EventStats::compute(
            &event,
            event.tickets_sold,
            total_revenue,
        )))
    }

    async fn purchase_ticket(&self, purchase: TicketPurchase) -> Result<Ticket, PurchaseError> {
        let mut inner = self.inner.lock().unwrap();
        let event = inner
            .events
            .iter()
            .find(|e| e.id == purchase.event_id)
            .cloned()
            .ok_or(PurchaseError::EventNotFound)?;

        if let Some(reference) = &purchase.external_reference {
            if let Some(existing) = inner
                .tickets
                .iter()
                .find(|t| t.external_reference.as_deref() == Some(reference.as_str()))
            {
                return Ok(existing.clone());
            }
        }

        if !event.is_active {
            return Err(PurchaseError::EventInactive);
        }
        let now = Utc::now();
        if now > event.sales_end_at {
            return Err(PurchaseError::SalesClosed);
        }
        let sold = sold(&inner, event.id);
        if sold >= i64::from(event.max_tickets) {
            return Err(PurchaseError::SoldOut);
        }

        let ticket = Ticket {
            id: next_id(inner.tickets.iter().map(|t| t.id)),
            event_id: purchase.event_id,
            buyer_id: purchase.buyer_id,
            ticket_number: ticket_number(event.id, sold + 1),
            qr_code: new_qr_code(),
            price_paid: purchase.price_paid.unwrap_or(event.price),
            status: TicketStatus::Active.as_str().to_string(),
            external_reference: purchase.external_reference,
            purchased_at: now,
            used_at: None,
        };
        inner.tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn ticket(&self, id: i64) -> StoreResult<Option<Ticket>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.tickets.iter().find(|t| t.id == id).cloned())
    }

    async fn ticket_by_qr(&self, qr_code: &str) -> StoreResult<Option<Ticket>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.tickets.iter().find(|t| t.qr_code == qr_code).cloned())
    }

    async fn tickets_by_user(&self, user_id: i64) -> StoreResult<Vec<Ticket>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .tickets
            .iter()
            .filter(|t| t.buyer_id == user_id)
            .cloned()
            .collect())
    }

    async fn tickets_by_event(&self, event_id: i64) -> StoreResult<Vec<Ticket>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .tickets
            .iter()
            .filter(|t| t.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn update_ticket(&self, id: i64, patch: TicketPatch) -> StoreResult<Option<Ticket>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(ticket) = inner.tickets.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        if let Some(status) = patch.status {
            ticket.status = status.as_str().to_string();
            if status == TicketStatus::Used && ticket.used_at.is_none() {
                ticket.used_at = Some(Utc::now());
            }
        }
        Ok(Some(ticket.clone()))
    }

    async fn cancel_ticket_by_reference(&self, reference: &str) -> StoreResult<Option<Ticket>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(ticket) = inner
            .tickets
            .iter_mut()
            .find(|t| t.external_reference.as_deref() == Some(reference))
        else {
            return Ok(None);
        };
        ticket.status = TicketStatus::Cancelled.as_str().to_string();
        Ok(Some(ticket.clone()))
    }

    async fn delete_ticket(&self, id: i64) -> StoreResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.tickets.len();
        inner.tickets.retain(|t| t.id != id);
        Ok(inner.tickets.len() < before)
    }

    async fn external_events(
        &self,
        limit: i64,
        offset: i64,
        city: Option<&str>,
    ) -> StoreResult<Vec<ExternalEvent>> {
        let inner = self.inner.lock().unwrap();
        let now = Utc::now();
        let mut upcoming: Vec<ExternalEvent> = inner
            .external_events
            .iter()
            .filter(|e| e.occurs_at >= now)
            .filter(|e| city.is_none() || e.city.as_deref() == city)
            .cloned()
            .collect();
        upcoming.sort_by_key(|e| e.occurs_at);
        Ok(upcoming
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn featured_external_events(&self, limit: i64) -> StoreResult<Vec<ExternalEvent>> {
        let inner = self.inner.lock().unwrap();
        let now = Utc::now();
        let mut upcoming: Vec<ExternalEvent> = inner
            .external_events
            .iter()
            .filter(|e| e.occurs_at >= now)
            .cloned()
            .collect();
        upcoming.sort_by(|a, b| {
            b.display_priority
                .cmp(&a.display_priority)
                .then(a.occurs_at.cmp(&b.occurs_at))
        });
        Ok(upcoming.into_iter().take(limit as usize).collect())
    }
}
