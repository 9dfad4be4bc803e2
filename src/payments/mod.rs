use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod mercadopago;

pub use mercadopago::MercadoPagoClient;

#[derive(Debug, Error)]
pub enum PaymentError {
    /// The gateway answered with a rejection; its message is preserved.
    #[error("payment gateway rejected the request: {0}")]
    Gateway(String),

    #[error("payment gateway unreachable: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        PaymentError::Transport(err.to_string())
    }
}

/// Inputs for a checkout preference covering one ticket.
#[derive(Debug, Clone)]
pub struct PreferenceRequest {
    pub event_title: String,
    pub price: Decimal,
    pub external_reference: String,
    pub buyer_email: String,
    pub buyer_name: String,
    pub success_url: String,
    pub failure_url: String,
    pub pending_url: String,
}

/// Gateway-side preference the buyer is redirected to.
#[derive(Debug, Clone, Serialize)]
pub struct Preference {
    pub preference_id: String,
    pub init_point: String,
    pub sandbox_init_point: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatus {
    pub status: String,
    pub status_detail: Option<String>,
    pub transaction_amount: Option<Decimal>,
    pub external_reference: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_approved: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Refund {
    pub refund_id: i64,
    pub status: String,
}

/// Normalized webhook result. Only `payment` notifications are resolved;
/// everything else is ignored and acknowledged upstream.
#[derive(Debug, Clone)]
pub enum WebhookOutcome {
    Payment {
        payment_id: String,
        status: String,
        transaction_amount: Option<Decimal>,
        external_reference: Option<String>,
    },
    Ignored,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_preference(
        &self,
        request: PreferenceRequest,
    ) -> Result<Preference, PaymentError>;
    async fn payment_status(&self, payment_id: &str) -> Result<PaymentStatus, PaymentError>;
    async fn process_webhook(
        &self,
        payload: &serde_json::Value,
    ) -> Result<WebhookOutcome, PaymentError>;
    async fn refund(
        &self,
        payment_id: &str,
        amount: Option<Decimal>,
    ) -> Result<Refund, PaymentError>;
}

/// External reference minted at preference time. Carries enough to finalize
/// the purchase when the webhook lands, and stays unique per attempt so
/// redelivery cannot create a second ticket.
pub fn purchase_reference(event_id: i64, buyer_id: i64) -> String {
    format!("{event_id}:{buyer_id}:{}", Uuid::new_v4())
}

/// The (event, buyer) pair behind a reference minted by
/// [`purchase_reference`]; `None` for references this service did not issue.
pub fn parse_purchase_reference(reference: &str) -> Option<(i64, i64)> {
    let mut parts = reference.splitn(3, ':');
    let event_id = parts.next()?.parse().ok()?;
    let buyer_id = parts.next()?.parse().ok()?;
    parts.next()?;
    Some((event_id, buyer_id))
}
