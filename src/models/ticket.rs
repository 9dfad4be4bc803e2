use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: i64,
    pub event_id: i64,
    pub buyer_id: i64,
    pub ticket_number: String,
    pub qr_code: String,
    pub price_paid: Decimal,
    pub status: String,
    pub external_reference: Option<String>,
    pub purchased_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Active,
    Used,
    Cancelled,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Active => "active",
            TicketStatus::Used => "used",
            TicketStatus::Cancelled => "cancelled",
        }
    }
}

/// Direct purchase request body.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTicket {
    pub event_id: i64,
    pub buyer_id: i64,
}

/// Partial ticket update. Moving status to `used` stamps `used_at`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketPatch {
    pub status: Option<TicketStatus>,
}

/// Gateway-side purchase input. `external_reference` is set when the
/// purchase is finalized from a payment webhook and makes the insert
/// idempotent; `price_paid` overrides the event price (webhook amount).
#[derive(Debug, Clone)]
pub struct TicketPurchase {
    pub event_id: i64,
    pub buyer_id: i64,
    pub external_reference: Option<String>,
    pub price_paid: Option<Decimal>,
}

/// Human-readable ticket number: zero-padded event id and per-event
/// sequence number under a fixed prefix.
pub fn ticket_number(event_id: i64, sequence: i64) -> String {
    format!("GP{:04}{:04}", event_id, sequence)
}

/// Opaque QR payload stored with the ticket.
pub fn new_qr_code() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ticket_number_is_zero_padded() {
        assert_eq!(ticket_number(7, 1), "GP00070001");
        assert_eq!(ticket_number(123, 4567), "GP01234567");
    }

    #[test]
    fn ticket_numbers_and_qr_codes_do_not_collide() {
        let mut numbers = HashSet::new();
        let mut codes = HashSet::new();
        // 1,000 tickets across varying (event, sequence) pairs.
        for event_id in 1..=25 {
            for seq in 1..=40 {
                assert!(numbers.insert(ticket_number(event_id, seq)));
                assert!(codes.insert(new_qr_code()));
            }
        }
        assert_eq!(numbers.len(), 1000);
        assert_eq!(codes.len(), 1000);
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            TicketStatus::Active,
            TicketStatus::Used,
            TicketStatus::Cancelled,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}
