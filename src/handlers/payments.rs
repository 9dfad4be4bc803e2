use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::models::TicketPurchase;
use crate::payments::{
    parse_purchase_reference, purchase_reference, Preference, PreferenceRequest, WebhookOutcome,
};
use crate::utils::response::success;
use crate::utils::AppError;

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePreferenceRequest {
    pub event_id: i64,
    pub buyer_id: i64,
    pub buyer_email: String,
    pub buyer_name: String,
    pub success_url: String,
    pub failure_url: String,
    pub pending_url: String,
}

#[derive(Serialize)]
struct PreferenceCreated {
    #[serde(flatten)]
    preference: Preference,
    external_reference: String,
}

pub async fn create_preference(
    State(state): State<AppState>,
    Json(body): Json<CreatePreferenceRequest>,
) -> Result<Response, AppError> {
    if body.buyer_email.trim().is_empty() || !body.buyer_email.contains('@') {
        return Err(AppError::ValidationError(
            "A valid buyer email is required".to_string(),
        ));
    }

    let event = state
        .gateway
        .event(body.event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {} not found", body.event_id)))?;

    if !event.is_active {
        return Err(AppError::ValidationError("Event is not active".to_string()));
    }
    if event.sales_closed(Utc::now()) {
        return Err(AppError::ValidationError(
            "Ticket sales have ended".to_string(),
        ));
    }
    if event.is_sold_out() {
        return Err(AppError::ValidationError("Event is sold out".to_string()));
    }

    let reference = purchase_reference(event.id, body.buyer_id);
    let preference = state
        .payments
        .create_preference(PreferenceRequest {
            event_title: event.title.clone(),
            price: event.price,
            external_reference: reference.clone(),
            buyer_email: body.buyer_email,
            buyer_name: body.buyer_name,
            success_url: body.success_url,
            failure_url: body.failure_url,
            pending_url: body.pending_url,
        })
        .await?;

    Ok(success(
        PreferenceCreated {
            preference,
            external_reference: reference,
        },
        "Payment preference created",
    )
    .into_response())
}

/// Gateway deliveries are always acknowledged; a malformed or unexpected
/// payload must not make the gateway retry. An approved payment finalizes
/// the purchase keyed on its external reference, and the idempotent insert
/// means redelivery can never mint a second ticket.
pub async fn payment_webhook(
    State(state): State<AppState>,
    payload: Option<Json<Value>>,
) -> Response {
    let Some(Json(payload)) = payload else {
        warn!("webhook delivery carried no JSON body");
        return ack("received");
    };

    let outcome = match state.payments.process_webhook(&payload).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(error = %err, "webhook processing failed");
            return ack("received");
        }
    };

    let WebhookOutcome::Payment {
        payment_id,
        status,
        transaction_amount,
        external_reference,
    } = outcome
    else {
        return ack("received");
    };

    if status != "approved" {
        info!(%payment_id, %status, "payment not approved yet");
        return ack("received");
    }

    let Some(reference) = external_reference else {
        warn!(%payment_id, "approved payment carries no external reference");
        return ack("received");
    };
    let Some((event_id, buyer_id)) = parse_purchase_reference(&reference) else {
        warn!(%payment_id, %reference, "external reference was not issued by this service");
        return ack("received");
    };

    match state
        .gateway
        .purchase_ticket(TicketPurchase {
            event_id,
            buyer_id,
            external_reference: Some(reference),
            price_paid: transaction_amount,
        })
        .await
    {
        Ok(ticket) => {
            info!(%payment_id, ticket_number = %ticket.ticket_number, "purchase finalized");
            ack("success")
        }
        Err(err) => {
            // The payment is approved but the ticket could not be created
            // (e.g. the event sold out meanwhile). Operators resolve via
            // the refund endpoint; the gateway must not redeliver.
            error!(%payment_id, error = %err, "approved payment could not be finalized");
            ack("received")
        }
    }
}

fn ack(status: &'static str) -> Response {
    success(json!({ "status": status }), "Webhook received").into_response()
}

#[derive(Debug, Default, Deserialize)]
pub struct RefundRequest {
    pub amount: Option<Decimal>,
}

/// Refunds the payment (fully, or partially when an amount is given) and
/// cancels the ticket finalized under the payment's external reference.
pub async fn refund_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    body: Option<Json<RefundRequest>>,
) -> Result<Response, AppError> {
    let amount = body.and_then(|Json(request)| request.amount);

    let status = state.payments.payment_status(&payment_id).await?;
    let refund = state.payments.refund(&payment_id, amount).await?;

    let cancelled_ticket = match status.external_reference {
        Some(ref reference) => state.gateway.cancel_ticket_by_reference(reference).await?,
        None => None,
    };

    Ok(success(
        json!({
            "refund_id": refund.refund_id,
            "status": refund.status,
            "cancelled_ticket": cancelled_ticket,
        }),
        "Refund issued",
    )
    .into_response())
}
