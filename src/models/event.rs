use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Event row plus the `tickets_sold` count every event query carries.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub venue: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub image_url: Option<String>,
    pub max_tickets: i32,
    pub price: Decimal,
    pub is_active: bool,
    pub sales_end_at: DateTime<Utc>,
    pub organizer_id: i64,
    pub created_at: DateTime<Utc>,
    pub tickets_sold: i64,
}

impl Event {
    pub fn is_sold_out(&self) -> bool {
        self.tickets_sold >= i64::from(self.max_tickets)
    }

    pub fn sales_closed(&self, now: DateTime<Utc>) -> bool {
        now > self.sales_end_at
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub venue: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub image_url: Option<String>,
    pub max_tickets: i32,
    pub price: Decimal,
    pub sales_end_at: DateTime<Utc>,
    pub organizer_id: i64,
}

/// Partial event update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub venue: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub image_url: Option<String>,
    pub max_tickets: Option<i32>,
    pub price: Option<Decimal>,
    pub is_active: Option<bool>,
    pub sales_end_at: Option<DateTime<Utc>>,
}

/// Sales figures for one event, also fed to the report renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventStats {
    pub event_id: i64,
    pub event_title: String,
    pub max_tickets: i32,
    pub tickets_sold: i64,
    pub tickets_available: i64,
    pub total_revenue: Decimal,
    pub average_price: Decimal,
    pub occupancy_rate: f64,
}

impl EventStats {
    pub fn compute(event: &Event, tickets_sold: i64, total_revenue: Decimal) -> Self {
        let average_price = if tickets_sold > 0 {
            total_revenue / Decimal::from(tickets_sold)
        } else {
            Decimal::ZERO
        };
        let occupancy_rate = if event.max_tickets > 0 {
            tickets_sold as f64 / f64::from(event.max_tickets) * 100.0
        } else {
            0.0
        };

        Self {
            event_id: event.id,
            event_title: event.title.clone(),
            max_tickets: event.max_tickets,
            tickets_sold,
            tickets_available: i64::from(event.max_tickets) - tickets_sold,
            total_revenue,
            average_price,
            occupancy_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_event(max_tickets: i32, tickets_sold: i64) -> Event {
        Event {
            id: 7,
            title: "Iron Night".to_string(),
            description: "Doors at eight".to_string(),
            starts_at: Utc.with_ymd_and_hms(2026, 10, 1, 20, 0, 0).unwrap(),
            venue: "Underground Hall".to_string(),
            address: "Rua Augusta 1200".to_string(),
            city: "Sao Paulo".to_string(),
            state: "SP".to_string(),
            image_url: None,
            max_tickets,
            price: Decimal::new(8000, 2),
            is_active: true,
            sales_end_at: Utc.with_ymd_and_hms(2026, 9, 30, 23, 59, 59).unwrap(),
            organizer_id: 1,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            tickets_sold,
        }
    }

    #[test]
    fn sold_out_at_capacity() {
        assert!(!sample_event(3, 2).is_sold_out());
        assert!(sample_event(3, 3).is_sold_out());
    }

    #[test]
    fn sales_window_closes_after_deadline() {
        let event = sample_event(10, 0);
        assert!(!event.sales_closed(event.sales_end_at));
        assert!(event.sales_closed(event.sales_end_at + chrono::Duration::seconds(1)));
    }

    #[test]
    fn stats_for_empty_event_avoid_division() {
        let event = sample_event(100, 0);
        let stats = EventStats::compute(&event, 0, Decimal::ZERO);
        assert_eq!(stats.tickets_available, 100);
        assert_eq!(stats.average_price, Decimal::ZERO);
        assert_eq!(stats.occupancy_rate, 0.0);
    }

    #[test]
    fn stats_compute_revenue_figures() {
        let event = sample_event(200, 50);
        let stats = EventStats::compute(&event, 50, Decimal::new(400000, 2));
        assert_eq!(stats.total_revenue, Decimal::new(400000, 2));
        assert_eq!(stats.average_price, Decimal::new(8000, 2));
        assert_eq!(stats.occupancy_rate, 25.0);
    }
}
