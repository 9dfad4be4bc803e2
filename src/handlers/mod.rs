use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::media::MediaStore;
use crate::payments::PaymentGateway;
use crate::store::DataGateway;
use crate::utils::response::success;

pub mod events;
pub mod images;
pub mod payments;
pub mod tickets;
pub mod users;


/// Adapter instances constructed once at startup and shared by every
/// request. Trait objects so tests can substitute fakes.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn DataGateway>,
    pub media: Arc<dyn MediaStore>,
    pub payments: Arc<dyn PaymentGateway>,
}

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
    timestamp: DateTime<Utc>,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "gatepass-api",
        timestamp: Utc::now(),
    };

    success(payload, "Health check successful").into_response()
}
